use std::ops::Deref;

use crate::error::{ProtocolError, Result};
use crate::protocol::crc::crc16_ccitt_false;

/// Start-of-frame marker
pub const START_MARKER: u8 = 0xAA;

/// Marker (1) + action (1) + length (2)
pub const HEADER_SIZE: usize = 4;

/// Trailing checksum size
pub const CHECKSUM_SIZE: usize = 2;

/// Bytes a frame adds around its payload
pub const FRAME_OVERHEAD: usize = HEADER_SIZE + CHECKSUM_SIZE;

/// Largest payload the device will accept
pub const MAX_PAYLOAD_SIZE: usize = 1024;

/// A fully built wire frame. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    /// Action byte this frame carries
    #[allow(dead_code)]
    pub fn action(&self) -> u8 {
        self.bytes[1]
    }

    /// Payload length as encoded in the header
    pub fn payload_len(&self) -> usize {
        u16::from_be_bytes([self.bytes[2], self.bytes[3]]) as usize
    }

    #[allow(dead_code)]
    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_SIZE..self.bytes.len() - CHECKSUM_SIZE]
    }

    /// Checksum as transmitted
    #[allow(dead_code)]
    pub fn checksum(&self) -> u16 {
        let n = self.bytes.len();
        u16::from_be_bytes([self.bytes[n - 2], self.bytes[n - 1]])
    }
}

impl Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Build a wire frame around `payload`.
///
/// Layout:
/// ```text
/// ┌────────┬────────┬──────────┬───────────┬──────────┐
/// │ 0xAA   │ Action │ Length   │ Payload   │ CRC      │
/// │ 1 byte │ 1 byte │ u16 BE   │ N bytes   │ u16 BE   │
/// └────────┴────────┴──────────┴───────────┴──────────┘
/// ```
///
/// The CRC covers action, length and payload. The action is not interpreted.
pub fn build_frame(action: u8, payload: &[u8]) -> Result<Frame> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let length = (payload.len() as u16).to_be_bytes();

    let mut bytes = Vec::with_capacity(FRAME_OVERHEAD + payload.len());
    bytes.push(START_MARKER);
    bytes.push(action);
    bytes.extend_from_slice(&length);
    bytes.extend_from_slice(payload);

    // Everything after the marker is checksummed
    let crc = crc16_ccitt_false(&bytes[1..]);
    bytes.extend_from_slice(&crc.to_be_bytes());

    Ok(Frame { bytes })
}

/// Format bytes as space-separated uppercase hex
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_frame_bytes() {
        let frame = build_frame(0x01, &[0x01]).unwrap();
        assert_eq!(&frame[..], &[0xAA, 0x01, 0x00, 0x01, 0x01, 0xD1, 0x64]);
        assert_eq!(frame.action(), 0x01);
        assert_eq!(frame.payload(), &[0x01]);
        assert_eq!(frame.checksum(), 0xD164);
    }

    #[test]
    fn test_frame_length_invariant() {
        for len in [0usize, 1, 2, 3, 35, 255, 256, 842, 1023, 1024] {
            let payload = vec![0x5A; len];
            let frame = build_frame(0x04, &payload).unwrap();
            assert_eq!(frame.len(), FRAME_OVERHEAD + len);
            assert_eq!(frame.payload_len(), len);
            assert_eq!(frame.payload(), payload.as_slice());
        }
    }

    #[test]
    fn test_checksum_excludes_marker() {
        let frame = build_frame(0x07, &[30]).unwrap();
        assert_eq!(frame.checksum(), crc16_ccitt_false(&[0x07, 0x00, 0x01, 30]));
    }

    #[test]
    fn test_empty_payload() {
        let frame = build_frame(0x03, &[]).unwrap();
        assert_eq!(frame.len(), FRAME_OVERHEAD);
        assert_eq!(&frame[..4], &[0xAA, 0x03, 0x00, 0x00]);
        assert_eq!(frame.checksum(), crc16_ccitt_false(&[0x03, 0x00, 0x00]));
    }

    #[test]
    fn test_build_is_deterministic() {
        let payload = [0x3F, 0x00, 0x00, 0x00];
        assert_eq!(build_frame(0x02, &payload), build_frame(0x02, &payload));
    }

    #[test]
    fn test_max_payload_boundary() {
        assert!(build_frame(0x04, &vec![0; MAX_PAYLOAD_SIZE]).is_ok());

        let result = build_frame(0x04, &vec![0; MAX_PAYLOAD_SIZE + 1]);
        assert_eq!(
            result,
            Err(ProtocolError::PayloadTooLarge { size: 1025, max: 1024 })
        );
    }

    #[test]
    fn test_unknown_action_is_opaque() {
        let frame = build_frame(0xFE, &[1, 2]).unwrap();
        assert_eq!(frame.action(), 0xFE);
        assert_eq!(frame.len(), 8);
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0xAA, 0x01, 0x0F]), "AA 01 0F");
        assert_eq!(hex_dump(&[]), "");
    }
}
