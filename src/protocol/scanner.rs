//! Receiver-side frame reassembly.
//!
//! The host never reads frames back from the device. This scanner mirrors the
//! firmware's parser so that chunked delivery and corrupt-frame recovery can
//! be checked offline (tests and the `decode` subcommand).

use tracing::trace;

use crate::protocol::crc::crc16_ccitt_false;
use crate::protocol::frame::{CHECKSUM_SIZE, FRAME_OVERHEAD, HEADER_SIZE, MAX_PAYLOAD_SIZE, START_MARKER};

/// A frame that passed the checksum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub action: u8,
    pub payload: Vec<u8>,
}

/// Why a candidate frame was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    LengthTooLarge(usize),
    ChecksumMismatch { expected: u16, received: u16 },
}

/// Reassembles frames from arbitrarily fragmented input
#[derive(Debug, Default)]
pub struct FrameScanner {
    buffer: Vec<u8>,
    rejections: Vec<Rejection>,
}

impl FrameScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Candidates rejected so far, oldest first
    pub fn rejections(&self) -> &[Rejection] {
        &self.rejections
    }

    /// Bytes held while waiting for the rest of a frame
    #[allow(dead_code)]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Pull the next complete, valid frame out of the buffer.
    ///
    /// Returns `None` when more input is needed.
    pub fn next_frame(&mut self) -> Option<DecodedFrame> {
        loop {
            if self.buffer.is_empty() {
                return None;
            }

            if self.buffer[0] != START_MARKER {
                self.resync();
                continue;
            }

            if self.buffer.len() < HEADER_SIZE {
                return None;
            }

            let action = self.buffer[1];
            let length = u16::from_be_bytes([self.buffer[2], self.buffer[3]]) as usize;

            if length > MAX_PAYLOAD_SIZE {
                self.reject(Rejection::LengthTooLarge(length));
                continue;
            }

            let frame_size = FRAME_OVERHEAD + length;
            if self.buffer.len() < frame_size {
                return None;
            }

            let crc_offset = HEADER_SIZE + length;
            let received = u16::from_be_bytes([self.buffer[crc_offset], self.buffer[crc_offset + 1]]);
            let expected = crc16_ccitt_false(&self.buffer[1..crc_offset]);

            if received != expected {
                self.reject(Rejection::ChecksumMismatch { expected, received });
                continue;
            }

            let payload = self.buffer[HEADER_SIZE..frame_size - CHECKSUM_SIZE].to_vec();
            self.buffer.drain(..frame_size);
            return Some(DecodedFrame { action, payload });
        }
    }

    fn reject(&mut self, rejection: Rejection) {
        trace!(?rejection, "dropping candidate frame");
        self.rejections.push(rejection);
        self.resync();
    }

    /// Drop bytes up to the next start marker after the current position
    fn resync(&mut self) {
        match self.buffer[1..].iter().position(|&b| b == START_MARKER) {
            Some(offset) => {
                self.buffer.drain(..offset + 1);
            }
            None => self.buffer.clear(),
        }
    }
}

/// Decode every valid frame in a complete byte stream
pub fn decode_all(bytes: &[u8]) -> (Vec<DecodedFrame>, Vec<Rejection>) {
    let mut scanner = FrameScanner::new();
    scanner.push(bytes);

    let mut frames = Vec::new();
    while let Some(frame) = scanner.next_frame() {
        frames.push(frame);
    }
    (frames, scanner.rejections().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::build_frame;
    use crate::protocol::test_vector::malformed_recovery_vector;

    #[test]
    fn test_single_frame() {
        let frame = build_frame(0x02, &[0x3F, 0x00, 0x00, 0x00]).unwrap();
        let (frames, rejections) = decode_all(&frame);

        assert_eq!(
            frames,
            vec![DecodedFrame {
                action: 0x02,
                payload: vec![0x3F, 0x00, 0x00, 0x00]
            }]
        );
        assert!(rejections.is_empty());
    }

    #[test]
    fn test_byte_at_a_time() {
        let frame = build_frame(0x07, &[60]).unwrap();
        let mut scanner = FrameScanner::new();

        for (i, byte) in frame.iter().enumerate() {
            scanner.push(&[*byte]);
            let result = scanner.next_frame();
            if i + 1 < frame.len() {
                assert_eq!(result, None);
            } else {
                assert_eq!(result.unwrap().payload, vec![60]);
            }
        }
        assert_eq!(scanner.pending(), 0);
    }

    #[test]
    fn test_recovers_after_corrupt_frame() {
        let vector = malformed_recovery_vector().unwrap();
        let (frames, rejections) = decode_all(&vector);

        assert_eq!(
            frames,
            vec![DecodedFrame {
                action: 0x01,
                payload: vec![1]
            }]
        );
        assert_eq!(
            rejections,
            vec![Rejection::ChecksumMismatch {
                expected: 0x77AC,
                received: 0xBEEF
            }]
        );
    }

    #[test]
    fn test_skips_leading_garbage() {
        let mut stream = vec![0x00, 0x13, 0x37];
        stream.extend_from_slice(&build_frame(0x08, &[1]).unwrap());

        let (frames, rejections) = decode_all(&stream);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].action, 0x08);
        assert!(rejections.is_empty());
    }

    #[test]
    fn test_rejects_oversized_length() {
        let mut stream = vec![START_MARKER, 0x04, 0x04, 0x01];
        stream.extend_from_slice(&build_frame(0x01, &[0]).unwrap());

        let (frames, rejections) = decode_all(&stream);
        assert_eq!(rejections, vec![Rejection::LengthTooLarge(1025)]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, vec![0]);
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut stream = build_frame(0x01, &[1]).unwrap().to_vec();
        stream.extend_from_slice(&build_frame(0x05, &0.01f32.to_be_bytes()).unwrap());

        let (frames, _) = decode_all(&stream);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].action, 0x05);
    }
}
