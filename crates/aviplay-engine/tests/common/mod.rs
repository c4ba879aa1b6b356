//! Shared helpers for engine integration tests.

#![allow(dead_code)]

use aviplay_engine::{AudioInfo, Engine, EngineConfig, FrameSink, PlaybackState, VideoInfo};
use aviplay_engine::{AudioFrame, VideoFrame};
use std::io::Write;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

// ---------------------------------------------------------------------------
// Synthetic AVI files
// ---------------------------------------------------------------------------

fn chunk(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 9);
    out.extend_from_slice(tag);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    if body.len() % 2 == 1 {
        out.push(0);
    }
    out
}

fn list(list_type: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    let mut body = list_type.to_vec();
    for c in children {
        body.extend_from_slice(c);
    }
    chunk(b"LIST", &body)
}

/// Builds a minimal single-video, optional-audio AVI file.
#[derive(Debug, Clone)]
pub struct AviBuilder {
    width: u32,
    height: u32,
    codec: [u8; 4],
    rate: u32,
    scale: u32,
    audio: Option<(u32, u16, u16)>,
    chunks: Vec<([u8; 4], Vec<u8>)>,
}

impl Default for AviBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AviBuilder {
    /// 320x240 MJPEG at 100 fps, no audio, no chunks.
    pub fn new() -> Self {
        Self {
            width: 320,
            height: 240,
            codec: *b"MJPG",
            rate: 100,
            scale: 1,
            audio: None,
            chunks: Vec::new(),
        }
    }

    pub fn fps(mut self, fps: u32) -> Self {
        self.rate = fps;
        self.scale = 1;
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn audio_stream(mut self, sample_rate: u32, bits: u16, channels: u16) -> Self {
        self.audio = Some((sample_rate, bits, channels));
        self
    }

    pub fn video(self, payload: &[u8]) -> Self {
        self.chunk(*b"00dc", payload)
    }

    pub fn audio(self, payload: &[u8]) -> Self {
        self.chunk(*b"01wb", payload)
    }

    pub fn chunk(mut self, tag: [u8; 4], payload: &[u8]) -> Self {
        self.chunks.push((tag, payload.to_vec()));
        self
    }

    /// Sum of header plus padded payload over all chunks.
    pub fn movi_size(&self) -> u64 {
        self.chunks
            .iter()
            .map(|(_, p)| 8 + p.len() as u64 + (p.len() as u64 & 1))
            .sum()
    }

    pub fn build(&self) -> Vec<u8> {
        let mut avih = Vec::new();
        avih.extend_from_slice(&(1_000_000 * self.scale / self.rate.max(1)).to_le_bytes());
        avih.extend_from_slice(&[0u8; 12]);
        let frames = self.chunks.iter().filter(|(t, _)| &t[2..] == b"dc").count() as u32;
        avih.extend_from_slice(&frames.to_le_bytes());
        avih.extend_from_slice(&[0u8; 12]);
        avih.extend_from_slice(&self.width.to_le_bytes());
        avih.extend_from_slice(&self.height.to_le_bytes());
        avih.extend_from_slice(&[0u8; 16]);

        let mut hdrl = vec![chunk(b"avih", &avih), self.video_strl(frames)];
        if let Some((rate, bits, channels)) = self.audio {
            hdrl.push(audio_strl(rate, bits, channels));
        }

        let movi: Vec<Vec<u8>> = self.chunks.iter().map(|(t, p)| chunk(t, p)).collect();

        let mut body = b"AVI ".to_vec();
        body.extend(list(b"hdrl", &hdrl));
        body.extend(chunk(b"JUNK", &[0u8; 12]));
        body.extend(list(b"movi", &movi));
        body.extend(chunk(b"idx1", &[]));
        chunk(b"RIFF", &body)
    }

    fn video_strl(&self, frames: u32) -> Vec<u8> {
        let mut strh = b"vids".to_vec();
        strh.extend_from_slice(&self.codec);
        strh.extend_from_slice(&[0u8; 12]);
        strh.extend_from_slice(&self.scale.to_le_bytes());
        strh.extend_from_slice(&self.rate.to_le_bytes());
        strh.extend_from_slice(&0u32.to_le_bytes());
        strh.extend_from_slice(&frames.to_le_bytes());
        strh.extend_from_slice(&[0u8; 20]);

        let mut bih = 40u32.to_le_bytes().to_vec();
        bih.extend_from_slice(&(self.width as i32).to_le_bytes());
        bih.extend_from_slice(&(self.height as i32).to_le_bytes());
        bih.extend_from_slice(&1u16.to_le_bytes());
        bih.extend_from_slice(&24u16.to_le_bytes());
        bih.extend_from_slice(&self.codec);
        bih.extend_from_slice(&[0u8; 20]);

        list(b"strl", &[chunk(b"strh", &strh), chunk(b"strf", &bih)])
    }
}

fn audio_strl(rate: u32, bits: u16, channels: u16) -> Vec<u8> {
    let block_align = channels * bits / 8;
    let mut strh = b"auds".to_vec();
    strh.extend_from_slice(&[0u8; 16]);
    strh.extend_from_slice(&(block_align as u32).to_le_bytes());
    strh.extend_from_slice(&(rate * block_align as u32).to_le_bytes());
    strh.extend_from_slice(&[0u8; 28]);

    let mut wf = 1u16.to_le_bytes().to_vec();
    wf.extend_from_slice(&channels.to_le_bytes());
    wf.extend_from_slice(&rate.to_le_bytes());
    wf.extend_from_slice(&(rate * block_align as u32).to_le_bytes());
    wf.extend_from_slice(&block_align.to_le_bytes());
    wf.extend_from_slice(&bits.to_le_bytes());

    list(b"strl", &[chunk(b"strh", &strh), chunk(b"strf", &wf)])
}

/// Write `bytes` to a temporary `.avi` file.
pub fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".avi")
        .tempfile()
        .expect("create temp file");
    file.write_all(bytes).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

// ---------------------------------------------------------------------------
// Recording sink
// ---------------------------------------------------------------------------

/// One callback invocation, with copied frame bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Clock(AudioInfo),
    Video(Vec<u8>, VideoInfo),
    Audio(Vec<u8>, AudioInfo),
    End,
}

/// Sink that records every callback and signals each end of playback.
pub struct RecordingSink {
    records: Arc<Mutex<Vec<Record>>>,
    ends: Sender<()>,
}

/// Test-side view of a [`RecordingSink`].
pub struct Recording {
    records: Arc<Mutex<Vec<Record>>>,
    ends: Receiver<()>,
}

pub fn recorder() -> (RecordingSink, Recording) {
    let records = Arc::new(Mutex::new(Vec::new()));
    let (tx, rx) = mpsc::channel();
    (
        RecordingSink {
            records: records.clone(),
            ends: tx,
        },
        Recording { records, ends: rx },
    )
}

impl RecordingSink {
    fn push(&self, record: Record) {
        self.records.lock().unwrap().push(record);
    }
}

impl FrameSink for RecordingSink {
    fn on_video_frame(&mut self, frame: VideoFrame<'_>) {
        self.push(Record::Video(frame.data.to_vec(), frame.info));
    }

    fn on_audio_frame(&mut self, frame: AudioFrame<'_>) {
        self.push(Record::Audio(frame.data.to_vec(), frame.info));
    }

    fn on_audio_clock(&mut self, info: AudioInfo) {
        self.push(Record::Clock(info));
    }

    fn on_playback_end(&mut self) {
        self.push(Record::End);
        let _ = self.ends.send(());
    }
}

impl Recording {
    /// Wait for the next end-of-playback callback.
    pub fn wait_end(&self, timeout: Duration) -> bool {
        self.ends.recv_timeout(timeout).is_ok()
    }

    /// True if another end-of-playback arrives within `timeout`.
    pub fn extra_end(&self, timeout: Duration) -> bool {
        self.ends.recv_timeout(timeout).is_ok()
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }

    pub fn end_count(&self) -> usize {
        self.records().iter().filter(|r| **r == Record::End).count()
    }

    pub fn video_frames(&self) -> usize {
        self.records()
            .iter()
            .filter(|r| matches!(r, Record::Video(..)))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Engine helpers
// ---------------------------------------------------------------------------

/// Small buffers and short polls so tests run quickly.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        scratch_buffer_size: 16 * 1024,
        ring_buffer_size: 64 * 1024,
        reader_chunk_size: 4 * 1024,
        preroll_poll_ms: 5,
        reader_backoff_ms: 5,
        ..Default::default()
    }
}

/// Poll until `check` holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    check()
}

pub fn wait_for_state(engine: &Engine, state: PlaybackState, timeout: Duration) -> bool {
    wait_until(timeout, || engine.state() == state)
}

/// `count` distinct video payloads of `len` bytes.
pub fn frames(count: usize, len: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| (0..len).map(|j| (i * 31 + j) as u8).collect())
        .collect()
}
