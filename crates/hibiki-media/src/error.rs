//! Errors from the commodity decoders and the real-time output sink.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("WAV error: {0}")]
    Wav(String),
    #[error("MIDI error: {0}")]
    Midi(String),
    #[error("audio output error: {0}")]
    Output(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
