//! Frame delivery to the host application.
//!
//! Every callback runs on the control thread. Frame bytes borrow the engine's
//! scratch buffer and are only valid for the duration of the call.

use aviplay_media::{AudioFormat, AudioStream, PixelFormat, VideoStream};
use serde::Serialize;

/// Geometry and format of the video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
}

impl From<&VideoStream> for VideoInfo {
    fn from(stream: &VideoStream) -> Self {
        Self {
            width: stream.width,
            height: stream.height,
            pixel_format: stream.pixel_format,
        }
    }
}

/// Parameters of the audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AudioInfo {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
    pub format: AudioFormat,
}

impl AudioInfo {
    /// Clock reported when the container has no usable audio stream.
    pub const DEFAULT: Self = Self {
        sample_rate: 16_000,
        bits_per_sample: 16,
        channels: 2,
        format: AudioFormat::Pcm,
    };

    /// Audio parameters for a header, with defaults for missing or zero fields.
    pub fn from_stream(stream: Option<&AudioStream>) -> Self {
        let Some(stream) = stream else {
            return Self::DEFAULT;
        };
        Self {
            sample_rate: nonzero_or(stream.sample_rate, Self::DEFAULT.sample_rate),
            bits_per_sample: nonzero_or(stream.bits_per_sample, Self::DEFAULT.bits_per_sample),
            channels: nonzero_or(stream.channels, Self::DEFAULT.channels),
            format: stream.format,
        }
    }
}

fn nonzero_or<T: Default + PartialEq>(value: T, fallback: T) -> T {
    if value == T::default() {
        fallback
    } else {
        value
    }
}

/// An encoded video frame.
#[derive(Debug)]
pub struct VideoFrame<'a> {
    pub data: &'a [u8],
    pub info: VideoInfo,
}

/// A block of raw audio samples.
#[derive(Debug)]
pub struct AudioFrame<'a> {
    pub data: &'a [u8],
    pub info: AudioInfo,
}

/// Kind of the frame last written to the scratch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameInfo {
    Video(VideoInfo),
    Audio(AudioInfo),
}

/// Receiver of demultiplexed frames and session notifications.
///
/// All methods default to doing nothing. Implementations must not call the
/// engine's pull accessors from inside a callback.
pub trait FrameSink: Send {
    /// One encoded video frame, once per video chunk.
    fn on_video_frame(&mut self, _frame: VideoFrame<'_>) {}

    /// One block of samples, once per audio chunk.
    fn on_audio_frame(&mut self, _frame: AudioFrame<'_>) {}

    /// Audio output parameters, once per session before the first frame.
    fn on_audio_clock(&mut self, _info: AudioInfo) {}

    /// The session ended, whether naturally, stopped, or by a fault.
    fn on_playback_end(&mut self) {}
}

type VideoFn = Box<dyn FnMut(VideoFrame<'_>) + Send>;
type AudioFn = Box<dyn FnMut(AudioFrame<'_>) + Send>;
type ClockFn = Box<dyn FnMut(AudioInfo) + Send>;
type EndFn = Box<dyn FnMut() + Send>;

/// A [`FrameSink`] assembled from optional closures.
///
/// State the closures need is captured by them.
///
/// ```
/// use aviplay_engine::Callbacks;
///
/// let callbacks = Callbacks::new()
///     .on_video(|frame| println!("{} bytes", frame.data.len()))
///     .on_end(|| println!("done"));
/// ```
#[derive(Default)]
pub struct Callbacks {
    video: Option<VideoFn>,
    audio: Option<AudioFn>,
    clock: Option<ClockFn>,
    end: Option<EndFn>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_video(mut self, f: impl FnMut(VideoFrame<'_>) + Send + 'static) -> Self {
        self.video = Some(Box::new(f));
        self
    }

    pub fn on_audio(mut self, f: impl FnMut(AudioFrame<'_>) + Send + 'static) -> Self {
        self.audio = Some(Box::new(f));
        self
    }

    pub fn on_audio_clock(mut self, f: impl FnMut(AudioInfo) + Send + 'static) -> Self {
        self.clock = Some(Box::new(f));
        self
    }

    pub fn on_end(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.end = Some(Box::new(f));
        self
    }
}

impl FrameSink for Callbacks {
    fn on_video_frame(&mut self, frame: VideoFrame<'_>) {
        if let Some(f) = self.video.as_mut() {
            f(frame);
        }
    }

    fn on_audio_frame(&mut self, frame: AudioFrame<'_>) {
        if let Some(f) = self.audio.as_mut() {
            f(frame);
        }
    }

    fn on_audio_clock(&mut self, info: AudioInfo) {
        if let Some(f) = self.clock.as_mut() {
            f(info);
        }
    }

    fn on_playback_end(&mut self) {
        if let Some(f) = self.end.as_mut() {
            f();
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("video", &self.video.is_some())
            .field("audio", &self.audio.is_some())
            .field("clock", &self.clock.is_some())
            .field("end", &self.end.is_some())
            .finish()
    }
}
