use std::fmt;
use std::str::FromStr;

/// One LED color, in the RGB order the protocol carries on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    #[allow(dead_code)]
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    #[allow(dead_code)]
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Wire bytes (R, G, B)
    pub fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Parse `RRGGBB` or `#RRGGBB`
impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        let mut rgb = [0u8; 3];
        hex::decode_to_slice(digits, &mut rgb)
            .map_err(|e| format!("expected RRGGBB hex color, got {:?}: {}", s, e))?;

        Ok(Rgb::new(rgb[0], rgb[1], rgb[2]))
    }
}

/// `count` copies of one color
pub fn uniform(color: Rgb, count: usize) -> Vec<Rgb> {
    vec![color; count]
}

/// A strip of `length` LEDs, all off except `position`
pub fn single_pixel(length: usize, position: usize, color: Rgb) -> Vec<Rgb> {
    let mut colors = uniform(Rgb::OFF, length);
    if let Some(pixel) = colors.get_mut(position) {
        *pixel = color;
    }
    colors
}
