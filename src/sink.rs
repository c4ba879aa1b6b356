//! Frame sinks used by the `play` command.

use aviplay_engine::{AudioFrame, AudioInfo, FrameSink, VideoFrame};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Instant;
use tracing::{debug, info};

/// Measures presentation rate over a fixed number of frames.
#[derive(Debug)]
pub struct FpsMeter {
    interval: u64,
    frames: u64,
    since: Instant,
}

impl FpsMeter {
    /// Report every `interval` frames; zero never reports.
    pub fn new(interval: u64) -> Self {
        Self {
            interval,
            frames: 0,
            since: Instant::now(),
        }
    }

    /// Count one frame. Returns the rate over the last `interval` frames
    /// when that many have been counted.
    pub fn frame(&mut self) -> Option<f64> {
        if self.interval == 0 {
            return None;
        }
        self.frames += 1;
        if self.frames < self.interval {
            return None;
        }

        let elapsed = self.since.elapsed().as_secs_f64();
        self.frames = 0;
        self.since = Instant::now();
        Some(if elapsed > 0.0 {
            self.interval as f64 / elapsed
        } else {
            f64::INFINITY
        })
    }

    pub fn reset(&mut self) {
        self.frames = 0;
        self.since = Instant::now();
    }
}

/// Logs what the engine delivers and signals each end of playback.
#[derive(Debug)]
pub struct LoggingSink {
    meter: FpsMeter,
    count_video: bool,
    video_frames: u64,
    video_bytes: u64,
    audio_frames: u64,
    audio_bytes: u64,
    ended: Sender<()>,
}

impl LoggingSink {
    /// A sink reporting FPS every `fps_interval` video frames, plus the
    /// receiver that gets one message per finished session.
    ///
    /// With `count_video` off, video frames are left to a puller and the
    /// push callback only drops them.
    pub fn new(fps_interval: u64, count_video: bool) -> (Self, Receiver<()>) {
        let (tx, rx) = mpsc::channel();
        let sink = Self {
            meter: FpsMeter::new(fps_interval),
            count_video,
            video_frames: 0,
            video_bytes: 0,
            audio_frames: 0,
            audio_bytes: 0,
            ended: tx,
        };
        (sink, rx)
    }

    fn reset(&mut self) {
        self.video_frames = 0;
        self.video_bytes = 0;
        self.audio_frames = 0;
        self.audio_bytes = 0;
        self.meter.reset();
    }
}

impl FrameSink for LoggingSink {
    fn on_video_frame(&mut self, frame: VideoFrame<'_>) {
        if !self.count_video {
            return;
        }
        self.video_frames += 1;
        self.video_bytes += frame.data.len() as u64;
        debug!(
            len = frame.data.len(),
            width = frame.info.width,
            height = frame.info.height,
            "video frame"
        );
        if let Some(fps) = self.meter.frame() {
            info!("Frame rate: {:.2} FPS", fps);
        }
    }

    fn on_audio_frame(&mut self, frame: AudioFrame<'_>) {
        self.audio_frames += 1;
        self.audio_bytes += frame.data.len() as u64;
        debug!(len = frame.data.len(), "audio frame");
    }

    fn on_audio_clock(&mut self, info: AudioInfo) {
        info!(
            "Audio clock: {} Hz, {} bit, {} channel(s)",
            info.sample_rate, info.bits_per_sample, info.channels
        );
        self.reset();
    }

    fn on_playback_end(&mut self) {
        info!(
            video_frames = self.video_frames,
            video_bytes = self.video_bytes,
            audio_frames = self.audio_frames,
            audio_bytes = self.audio_bytes,
            "Playback finished"
        );
        self.reset();
        let _ = self.ended.send(());
    }
}
