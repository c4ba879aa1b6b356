//! Engine configuration.
//!
//! Sizes and timings are plain data so the application can embed them in its
//! TOML file; the frame callbacks are supplied separately as a
//! [`crate::FrameSink`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Scratch buffer size used when the configured size is zero.
pub const DEFAULT_SCRATCH_BUFFER_SIZE: usize = 20 * 1024;

/// Ring buffer capacity for file playback.
pub const DEFAULT_RING_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Bytes the background reader pulls from the file per read.
pub const DEFAULT_READER_CHUNK_SIZE: usize = 128 * 1024;

/// Fraction of the ring buffer that must be filled before the first frame.
pub const DEFAULT_PREROLL_WATERMARK: f64 = 0.5;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Size of the reusable frame buffer. Must hold the whole header region
    /// and the largest chunk of any file played. Zero selects the default.
    #[serde(default = "default_scratch_buffer_size")]
    pub scratch_buffer_size: usize,

    /// Capacity of the file-mode ring buffer.
    #[serde(default = "default_ring_buffer_size")]
    pub ring_buffer_size: usize,

    /// Read size of the background reader; also the free space it waits for.
    #[serde(default = "default_reader_chunk_size")]
    pub reader_chunk_size: usize,

    /// Ring fill fraction to reach before demuxing starts, in (0, 1].
    #[serde(default = "default_preroll_watermark")]
    pub preroll_watermark: f64,

    /// Re-check interval while pre-rolling.
    #[serde(default = "default_preroll_poll_ms")]
    pub preroll_poll_ms: u64,

    /// Back-off of the reader while the ring buffer is full.
    #[serde(default = "default_reader_backoff_ms")]
    pub reader_backoff_ms: u64,

    /// How long teardown waits for the reader to acknowledge a stop.
    #[serde(default = "default_reader_join_timeout_ms")]
    pub reader_join_timeout_ms: u64,

    /// How long deinit waits for the control thread.
    #[serde(default = "default_deinit_timeout_ms")]
    pub deinit_timeout_ms: u64,

    /// Scheduling hints for the control thread.
    #[serde(default = "ThreadHints::control")]
    pub control_thread: ThreadHints,

    /// Scheduling hints for the background reader.
    #[serde(default = "ThreadHints::reader")]
    pub reader_thread: ThreadHints,
}

fn default_scratch_buffer_size() -> usize {
    DEFAULT_SCRATCH_BUFFER_SIZE
}
fn default_ring_buffer_size() -> usize {
    DEFAULT_RING_BUFFER_SIZE
}
fn default_reader_chunk_size() -> usize {
    DEFAULT_READER_CHUNK_SIZE
}
fn default_preroll_watermark() -> f64 {
    DEFAULT_PREROLL_WATERMARK
}
fn default_preroll_poll_ms() -> u64 {
    100
}
fn default_reader_backoff_ms() -> u64 {
    50
}
fn default_reader_join_timeout_ms() -> u64 {
    2000
}
fn default_deinit_timeout_ms() -> u64 {
    1000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scratch_buffer_size: default_scratch_buffer_size(),
            ring_buffer_size: default_ring_buffer_size(),
            reader_chunk_size: default_reader_chunk_size(),
            preroll_watermark: default_preroll_watermark(),
            preroll_poll_ms: default_preroll_poll_ms(),
            reader_backoff_ms: default_reader_backoff_ms(),
            reader_join_timeout_ms: default_reader_join_timeout_ms(),
            deinit_timeout_ms: default_deinit_timeout_ms(),
            control_thread: ThreadHints::control(),
            reader_thread: ThreadHints::reader(),
        }
    }
}

impl EngineConfig {
    /// Replace zero sizes with defaults and reject inconsistent values.
    pub fn resolve(mut self) -> Result<Self> {
        if self.scratch_buffer_size == 0 {
            self.scratch_buffer_size = DEFAULT_SCRATCH_BUFFER_SIZE;
        }
        if self.ring_buffer_size == 0 {
            return Err(Error::invalid_config("ring_buffer_size must be non-zero"));
        }
        if self.reader_chunk_size == 0 || self.reader_chunk_size > self.ring_buffer_size {
            return Err(Error::invalid_config(format!(
                "reader_chunk_size {} must be between 1 and ring_buffer_size {}",
                self.reader_chunk_size, self.ring_buffer_size
            )));
        }
        if !(self.preroll_watermark > 0.0 && self.preroll_watermark <= 1.0) {
            return Err(Error::invalid_config(format!(
                "preroll_watermark {} must be in (0, 1]",
                self.preroll_watermark
            )));
        }
        Ok(self)
    }

    /// Ring fill in bytes that ends pre-roll.
    ///
    /// The reader only writes while a whole chunk fits, so the fill can settle
    /// anywhere above `ring_buffer_size - reader_chunk_size`. The threshold is
    /// capped one byte above that.
    pub fn preroll_threshold(&self) -> usize {
        let wanted = (self.ring_buffer_size as f64 * self.preroll_watermark) as usize;
        let reachable = self
            .ring_buffer_size
            .saturating_sub(self.reader_chunk_size)
            .saturating_add(1);
        wanted.min(reachable).max(1)
    }

    pub fn preroll_poll(&self) -> Duration {
        Duration::from_millis(self.preroll_poll_ms)
    }

    pub fn reader_backoff(&self) -> Duration {
        Duration::from_millis(self.reader_backoff_ms)
    }

    pub fn reader_join_timeout(&self) -> Duration {
        Duration::from_millis(self.reader_join_timeout_ms)
    }

    pub fn deinit_timeout(&self) -> Duration {
        Duration::from_millis(self.deinit_timeout_ms)
    }
}

/// Execution-affinity hints for an engine thread.
///
/// `name` and `stack_size` are applied when the thread is spawned. `priority`
/// and `core_id` are passed through to the log for hosts whose scheduler is
/// configured outside the process.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThreadHints {
    pub name: String,

    /// Stack size in bytes; the platform default when unset.
    #[serde(default)]
    pub stack_size: Option<usize>,

    #[serde(default = "default_priority")]
    pub priority: u8,

    #[serde(default)]
    pub core_id: Option<usize>,
}

fn default_priority() -> u8 {
    5
}

impl ThreadHints {
    /// Defaults for the control thread.
    pub fn control() -> Self {
        Self {
            name: "avi-player".to_string(),
            stack_size: None,
            priority: default_priority(),
            core_id: None,
        }
    }

    /// Defaults for the background reader.
    pub fn reader() -> Self {
        Self {
            name: "avi-reader".to_string(),
            stack_size: None,
            priority: 10,
            core_id: Some(1),
        }
    }

    /// Spawn a thread with these hints.
    pub(crate) fn spawn<F, T>(&self, f: F) -> io::Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let mut builder = thread::Builder::new().name(self.name.clone());
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }
        tracing::debug!(
            thread = %self.name,
            priority = self.priority,
            core_id = ?self.core_id,
            "spawning engine thread"
        );
        builder.spawn(f)
    }
}
