//! Error types for aviplay-engine.

use crate::session::PlaybackState;
use aviplay_media::FourCc;
use std::io;
use thiserror::Error;

/// Result type for aviplay-engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for aviplay-engine operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Operation attempted outside its valid session state.
    #[error("{op} is not allowed in state {state}")]
    InvalidState {
        op: &'static str,
        state: PlaybackState,
    },

    /// A buffer could not be allocated, or a buffer is too small for a frame.
    #[error("Out of memory: {0}")]
    NoMemory(String),

    /// File open or read failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed container or header region larger than the scratch buffer.
    #[error("Parse error: {0}")]
    Parse(#[from] aviplay_media::Error),

    /// A bounded wait expired.
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    /// Unrecognized chunk tag inside the payload region.
    #[error("Unsupported chunk {0} in payload region")]
    UnsupportedChunk(FourCc),

    /// Engine configuration rejected at init.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The control thread has exited and no longer accepts events.
    #[error("Control thread is not running")]
    ControlThreadGone,
}

impl Error {
    /// Create an out-of-memory error.
    pub fn no_memory(msg: impl Into<String>) -> Self {
        Self::NoMemory(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Allocate a zeroed buffer, reporting allocation failure instead of aborting.
pub(crate) fn try_alloc(len: usize, what: &str) -> Result<Box<[u8]>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::no_memory(format!("cannot allocate {} bytes for {}", len, what)))?;
    buf.resize(len, 0);
    Ok(buf.into_boxed_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_alloc_small() {
        let buf = try_alloc(64, "test").unwrap();
        assert_eq!(buf.len(), 64);
        assert!(buf.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_try_alloc_impossible_size() {
        let err = try_alloc(usize::MAX, "test").unwrap_err();
        assert!(matches!(err, Error::NoMemory(_)));
    }

    #[test]
    fn test_display_invalid_state() {
        let err = Error::InvalidState {
            op: "stop",
            state: PlaybackState::None,
        };
        assert_eq!(err.to_string(), "stop is not allowed in state none");
    }
}
