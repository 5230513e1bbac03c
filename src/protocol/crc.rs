/// CRC-16/CCITT-FALSE polynomial
const POLY: u16 = 0x1021;

/// Initial register value
const INIT: u16 = 0xFFFF;

/// Calculate the CRC-16/CCITT-FALSE checksum of `data`.
///
/// MSB-first, no reflection, no final XOR. The device validates every frame
/// against this exact variant.
pub fn crc16_ccitt_false(data: &[u8]) -> u16 {
    data.iter().fold(INIT, |crc, &byte| update_crc(crc, byte))
}

/// Feed one byte into the CRC register
fn update_crc(crc: u16, byte: u8) -> u16 {
    let mut crc = crc ^ ((byte as u16) << 8);

    for _ in 0..8 {
        crc = if crc & 0x8000 != 0 {
            (crc << 1) ^ POLY
        } else {
            crc << 1
        };
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        assert_eq!(crc16_ccitt_false(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_empty_input_is_initial_register() {
        assert_eq!(crc16_ccitt_false(&[]), 0xFFFF);
    }

    #[test]
    fn test_on_frame_checksum_input() {
        // action 0x01, length 0x0001, payload 0x01
        assert_eq!(crc16_ccitt_false(&[0x01, 0x00, 0x01, 0x01]), 0xD164);
        assert_eq!(crc16_ccitt_false(&[0x01, 0x00, 0x01, 0x00]), 0xC145);
    }

    #[test]
    fn test_matches_bit_serial_reference() {
        let data: Vec<u8> = (0u8..=255).collect();
        assert_eq!(crc16_ccitt_false(&data), bitwise_reference(&data));
    }

    #[test]
    fn test_differs_from_xmodem_seed() {
        // XMODEM starts from 0x0000 and gives 0x31C3 for the check string
        assert_ne!(crc16_ccitt_false(b"123456789"), 0x31C3);
    }

    #[test]
    fn test_single_bit_flip_changes_crc() {
        let a = crc16_ccitt_false(&[0x02, 0x00, 0x04, 0x3F, 0x80, 0x00, 0x00]);
        let b = crc16_ccitt_false(&[0x02, 0x00, 0x04, 0x3F, 0x80, 0x00, 0x01]);
        assert_ne!(a, b);
    }

    /// Bit-at-a-time shift register formulation of the same CRC.
    fn bitwise_reference(data: &[u8]) -> u16 {
        let mut crc: u32 = 0xFFFF;
        for &byte in data {
            for bit in (0..8).rev() {
                let input = ((byte >> bit) & 1) as u32;
                let top = (crc >> 15) & 1;
                crc = (crc << 1) & 0xFFFF;
                if top ^ input == 1 {
                    crc ^= 0x1021;
                }
            }
        }
        crc as u16
    }
}
