//! Frame codec for the LED controller serial protocol.
//!
//! Every command travels as one self-delimiting frame:
//! start marker `0xAA`, action byte, big-endian payload length, payload,
//! and a big-endian CRC-16/CCITT-FALSE over action, length and payload.

pub mod command;
pub mod crc;
pub mod frame;
pub mod scanner;
pub mod test_vector;

pub use command::{Action, Command, StripSetting};
pub use frame::{hex_dump, MAX_PAYLOAD_SIZE};
pub use scanner::decode_all;
pub use test_vector::malformed_recovery_vector;
