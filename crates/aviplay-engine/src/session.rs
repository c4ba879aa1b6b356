//! Per-playback session state.

use crate::reader::BackgroundReader;
use crate::ring_buffer::RingBuffer;
use crate::sink::{AudioInfo, VideoInfo};
use crate::source::Source;
use aviplay_media::AviHeader;
use bytes::Bytes;
use serde::Serialize;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Idle; a new session may start.
    #[default]
    None,
    /// Parsing the container header.
    Header,
    /// Demultiplexing the payload on timer ticks.
    Data,
    /// Tearing down.
    End,
}

impl PlaybackState {
    /// True while a session is running and can be stopped.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Header | Self::Data)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Header => write!(f, "header"),
            Self::Data => write!(f, "data"),
            Self::End => write!(f, "end"),
        }
    }
}

/// Where the session reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    Memory,
    File,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOutcome {
    /// The whole payload region was dispatched.
    Completed,
    /// Stopped by the caller or by deinit.
    Stopped,
    /// Aborted by a parse, demux or I/O fault.
    Failed(String),
}

/// Counters of one session, published when it ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub mode: PlayMode,
    pub video_frames: u64,
    pub audio_frames: u64,
    /// Chunk bytes consumed from the payload region, headers and padding included.
    pub bytes_consumed: u64,
    /// Declared size of the payload region, zero if the header never parsed.
    pub payload_size: u64,
    pub outcome: SessionOutcome,
}

/// A source handed over by `play_*` and picked up by the control thread on Start.
pub(crate) enum PendingSource {
    Memory(Bytes),
    File {
        path: PathBuf,
        file: File,
        ring: Arc<RingBuffer>,
    },
}

impl PendingSource {
    pub(crate) fn mode(&self) -> PlayMode {
        match self {
            Self::Memory(_) => PlayMode::Memory,
            Self::File { .. } => PlayMode::File,
        }
    }
}

/// Stream metadata resolved from the header.
#[derive(Debug, Clone)]
pub(crate) struct Streams {
    pub header: AviHeader,
    pub video: VideoInfo,
    pub audio: AudioInfo,
}

/// State owned by the control thread for the lifetime of one playback.
pub(crate) struct Session {
    pub mode: PlayMode,
    pub source: Source,
    pub streams: Option<Streams>,
    pub consumed: u64,
    pub video_frames: u64,
    pub audio_frames: u64,
}

impl Session {
    pub(crate) fn new(pending: PendingSource) -> Self {
        let mode = pending.mode();
        let source = match pending {
            PendingSource::Memory(data) => Source::memory(data),
            PendingSource::File { path, file, ring } => {
                tracing::debug!(path = %path.display(), "opening file session");
                Source::file(file, ring)
            }
        };
        Self {
            mode,
            source,
            streams: None,
            consumed: 0,
            video_frames: 0,
            audio_frames: 0,
        }
    }

    /// Declared payload size, once the header is known.
    pub(crate) fn payload_size(&self) -> u64 {
        self.streams.as_ref().map_or(0, |s| s.header.movi_size)
    }

    /// Stop the reader, close the file and drop the ring buffer.
    pub(crate) fn close(self, reader_timeout: Duration, outcome: SessionOutcome) -> SessionStats {
        let stats = SessionStats {
            mode: self.mode,
            video_frames: self.video_frames,
            audio_frames: self.audio_frames,
            bytes_consumed: self.consumed,
            payload_size: self.payload_size(),
            outcome,
        };
        if let Source::File {
            reader: Some(reader),
            ..
        } = self.source
        {
            stop_reader(reader, reader_timeout);
        }
        stats
    }
}

fn stop_reader(reader: BackgroundReader, timeout: Duration) {
    if reader.stop(timeout) {
        tracing::debug!("background reader stopped");
    } else {
        tracing::warn!(
            timeout_ms = timeout.as_millis() as u64,
            "background reader did not acknowledge stop, detaching"
        );
    }
}
