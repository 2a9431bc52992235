//! Error types shared by every Hibiki crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HibikiError {
    #[error("track not found: {0}")]
    TrackNotFound(i32),
    #[error("clip not found: track {track} slot {slot}")]
    ClipNotFound { track: i32, slot: i32 },
    #[error("plugin position out of range: {0}")]
    PluginNotFound(usize),
    #[error("plugin load failed: {0}")]
    PluginLoad(String),
    #[error("plugin process error: {0}")]
    PluginProcess(String),
    #[error("clip load failed: {0}")]
    ClipLoad(String),
    #[error("sink unavailable: {0}")]
    SinkUnavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HibikiError>;
