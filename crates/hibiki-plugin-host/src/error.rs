//! VST3 hosting error types.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Vst3Error {
    #[error("plugin not found: {0}")]
    NotFound(PathBuf),
    #[error("class index {subindex} out of range for {path}")]
    SubindexOutOfRange { path: PathBuf, subindex: i32 },
    #[error("failed to load plugin: {0}")]
    LoadError(String),
    #[error("failed to activate plugin: {0}")]
    ActivationError(String),
    #[error("processing error: {0}")]
    ProcessError(String),
    #[error("no plugins found in scan paths")]
    NoPluginsFound,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
