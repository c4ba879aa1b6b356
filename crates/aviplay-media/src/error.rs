//! Error types for aviplay-media.

use std::io;
use thiserror::Error;

/// Result type for aviplay-media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for aviplay-media operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid RIFF/AVI structure.
    #[error("Invalid AVI: {0}")]
    InvalidAvi(String),

    /// Missing required chunk in the header region.
    #[error("Missing required chunk: {0}")]
    MissingChunk(&'static str),

    /// A chunk body is shorter than its fixed layout requires.
    #[error("Truncated {chunk}: need {need} bytes, have {have}")]
    Truncated {
        chunk: &'static str,
        need: usize,
        have: usize,
    },

    /// The header region runs past the end of the supplied prefix.
    #[error("Header region needs {need} bytes but only {have} are available")]
    HeaderExceedsPrefix { need: usize, have: usize },
}

impl Error {
    /// Create an invalid AVI error.
    pub fn invalid_avi(msg: impl Into<String>) -> Self {
        Self::InvalidAvi(msg.into())
    }
}
