//! Protocol-level errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("buffer too short: need {needed} more bytes, have {remaining}")]
    BufferTooShort { needed: usize, remaining: usize },

    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    #[error("invalid UTF-16 string")]
    InvalidUtf16,

    #[error("unknown packet id: 0x{0:02X}")]
    UnknownPacketId(u16),

    #[error("unknown inventory location: {0}")]
    UnknownInventoryLocation(String),

    #[error("unknown inventory action: {0}")]
    UnknownInventoryAction(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
