//! Framing and encoding error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame length {0} exceeds the {1} byte limit")]
    FrameTooLarge(u32, u32),
    #[error("connection closed")]
    Eof,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding error: {0}")]
    Encode(#[from] bincode::Error),
}
