//! Aviplay-Engine: timer-paced AVI playback
//!
//! Streams an AVI file from storage (or memory) through a bounded ring buffer
//! and delivers encoded video frames and raw audio blocks to a
//! [`FrameSink`], one video frame per frame interval.
//!
//! # Modules
//!
//! - `ring_buffer` - Fixed-capacity SPSC byte ring with blocking reads
//! - `reader` - Background thread filling the ring from a file
//! - `engine` - Lifecycle API: init, play, stop, deinit, pull accessors
//! - `sink` - Frame callbacks and stream metadata
//! - `config` - Sizes, timings and thread hints
//!
//! # Architecture
//!
//! Three threads cooperate:
//!
//! 1. The reader copies 128 KiB chunks from the file into the ring buffer
//! 2. The timer posts a tick every frame interval
//! 3. The control thread owns the session: it parses the header, then on
//!    every tick demuxes chunks, dispatching audio immediately, until it has
//!    dispatched one video frame
//!
//! Stop and deinit take priority over start and tick events queued in the
//! same wake. Every session ends with exactly one
//! [`FrameSink::on_playback_end`] call.

mod control;
mod demux;
mod event;
mod exchange;
mod session;
mod source;
mod timer;

pub mod config;
pub mod engine;
pub mod error;
pub mod reader;
pub mod ring_buffer;
pub mod sink;

pub use config::{EngineConfig, ThreadHints};
pub use engine::Engine;
pub use error::{Error, Result};
pub use reader::BackgroundReader;
pub use ring_buffer::RingBuffer;
pub use session::{PlayMode, PlaybackState, SessionOutcome, SessionStats};
pub use sink::{AudioFrame, AudioInfo, Callbacks, FrameInfo, FrameSink, VideoFrame, VideoInfo};
