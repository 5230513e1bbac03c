/// Errors raised while building a command frame.
///
/// Every variant is produced before any byte reaches the link, so a failed
/// command is never partially transmitted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    /// The payload exceeds the frame's maximum payload size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A numeric field falls outside its declared domain.
    #[error("{field} out of range: {value} (allowed {allowed})")]
    OutOfRange {
        field: &'static str,
        value: String,
        allowed: &'static str,
    },

    /// Unknown strip setting identifier.
    #[error("invalid strip setting id: {0}")]
    InvalidSetting(u8),

    /// A strip setting was requested without the parameter it carries.
    #[error("strip setting {setting} requires {parameter}")]
    MissingParameter {
        setting: &'static str,
        parameter: &'static str,
    },

    /// A manual color range runs past the end of the strip.
    #[error("LED range {start}..{end} exceeds strip length {strip_length}")]
    LedRangeExceedsStrip {
        start: usize,
        end: usize,
        strip_length: usize,
    },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
