use crate::error::Result;
use crate::protocol::command::Action;
use crate::protocol::frame::{build_frame, START_MARKER};

/// Candidate frame with a valid marker and length but a wrong checksum:
/// action 0xFF, length 2, payload DE AD, checksum BE EF.
pub const CORRUPT_FRAME: [u8; 8] = [START_MARKER, 0xFF, 0x00, 0x02, 0xDE, 0xAD, 0xBE, 0xEF];

/// A corrupt frame immediately followed by a valid "LED ON" frame.
///
/// A conformant receiver drops the first candidate, resynchronizes on the
/// next start marker, and applies the ON command.
pub fn malformed_recovery_vector() -> Result<Vec<u8>> {
    let valid = build_frame(Action::ControlOnOff.as_byte(), &[1])?;

    let mut vector = Vec::with_capacity(CORRUPT_FRAME.len() + valid.len());
    vector.extend_from_slice(&CORRUPT_FRAME);
    vector.extend_from_slice(&valid);
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::crc::crc16_ccitt_false;

    #[test]
    fn test_second_frame_is_valid_on_frame() {
        let vector = malformed_recovery_vector().unwrap();
        let on = build_frame(0x01, &[1]).unwrap();

        assert_eq!(vector.len(), 8 + 7);
        assert_eq!(&vector[8..], &on[..]);
    }

    #[test]
    fn test_corrupt_frame_checksum_is_wrong() {
        let length = u16::from_be_bytes([CORRUPT_FRAME[2], CORRUPT_FRAME[3]]) as usize;
        assert_eq!(length, 2);
        assert_eq!(CORRUPT_FRAME.len(), 4 + length + 2);

        let expected = crc16_ccitt_false(&CORRUPT_FRAME[1..4 + length]);
        assert_ne!(expected, 0xBEEF);
    }

    #[test]
    fn test_no_start_marker_inside_corrupt_frame() {
        // Resync must land exactly on the valid frame
        assert!(!CORRUPT_FRAME[1..].contains(&START_MARKER));
    }
}
