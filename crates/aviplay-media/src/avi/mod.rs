//! AVI container parsing.
//!
//! This module provides the structures the playback engine needs from an AVI
//! file: stream geometry and format, and the location of the `movi` payload.

mod chunks;
mod header;

pub use chunks::{ChunkHeader, ChunkKind, FourCc, CHUNK_HEADER_SIZE};

use crate::Result;
use std::time::Duration;

/// Pixel format of the encoded video frames, derived from the `strf`
/// compression code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum PixelFormat {
    /// Motion JPEG, one baseline JPEG per chunk.
    Mjpeg,
    /// H.264 elementary stream.
    H264,
    /// Any other compression code.
    Other(FourCc),
}

impl PixelFormat {
    /// Map a BITMAPINFOHEADER compression code.
    pub fn from_compression(fourcc: FourCc) -> Self {
        match &fourcc.0 {
            b"MJPG" | b"mjpg" => Self::Mjpeg,
            b"H264" | b"h264" | b"avc1" | b"X264" | b"x264" => Self::H264,
            _ => Self::Other(fourcc),
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mjpeg => write!(f, "MJPEG"),
            Self::H264 => write!(f, "H.264"),
            Self::Other(code) => write!(f, "{}", code),
        }
    }
}

/// Sample encoding of the audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum AudioFormat {
    /// Linear PCM (`WAVE_FORMAT_PCM`).
    Pcm,
    /// Any other `wFormatTag`.
    Other(u16),
}

impl AudioFormat {
    /// Map a WAVEFORMATEX format tag.
    pub fn from_tag(tag: u16) -> Self {
        match tag {
            1 => Self::Pcm,
            other => Self::Other(other),
        }
    }
}

/// The video stream (`strh` type `vids`).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VideoStream {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels (absolute value; bottom-up images are negative on disk).
    pub height: u32,
    /// Encoded pixel format.
    pub pixel_format: PixelFormat,
    /// Raw compression code from `strf`.
    pub compression: FourCc,
    /// Frame rate numerator (`dwRate`).
    pub rate: u32,
    /// Frame rate denominator (`dwScale`).
    pub scale: u32,
    /// Declared number of frames (`dwLength`).
    pub frame_count: u32,
}

impl VideoStream {
    /// Whole frames per second, rounded down.
    pub fn fps(&self) -> u32 {
        self.rate / self.scale.max(1)
    }

    /// Exact frames per second.
    pub fn fps_exact(&self) -> f64 {
        self.rate as f64 / self.scale.max(1) as f64
    }

    /// Time between two video frames.
    pub fn frame_interval(&self) -> Duration {
        let micros = 1_000_000u64 * self.scale.max(1) as u64 / self.rate.max(1) as u64;
        Duration::from_micros(micros.max(1))
    }
}

/// The audio stream (`strh` type `auds`).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct AudioStream {
    /// Sample encoding.
    pub format: AudioFormat,
    /// Samples per second.
    pub sample_rate: u32,
    /// Bits per sample.
    pub bits_per_sample: u16,
    /// Channel count.
    pub channels: u16,
    /// Bytes per sample frame across all channels.
    pub block_align: u16,
}

/// Everything the engine needs from the header region of an AVI file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct AviHeader {
    /// The video stream.
    pub video: VideoStream,
    /// The audio stream, if the file has one.
    pub audio: Option<AudioStream>,
    /// Absolute offset of the first chunk inside `movi`.
    pub movi_start: u64,
    /// Bytes of chunks inside `movi` (list size without the `movi` tag).
    pub movi_size: u64,
    /// `dwMicroSecPerFrame` from the main header.
    pub micro_sec_per_frame: u32,
    /// `dwTotalFrames` from the main header.
    pub total_frames: u32,
}

impl AviHeader {
    /// Parse the header region from a prefix of the file.
    ///
    /// The prefix must reach at least the first byte after the `movi` list
    /// header, otherwise [`crate::Error::HeaderExceedsPrefix`] is returned.
    pub fn parse(prefix: &[u8]) -> Result<Self> {
        header::parse(prefix)
    }

    /// Playback duration implied by the declared frame count and rate.
    pub fn duration(&self) -> Duration {
        let frames = if self.video.frame_count > 0 {
            self.video.frame_count
        } else {
            self.total_frames
        };
        self.video.frame_interval() * frames
    }
}
