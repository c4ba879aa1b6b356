//! Scratch buffer and the pull-mode hand-off built on it.
//!
//! The control thread demuxes each chunk into the scratch buffer, runs the
//! push callback, then raises the matching ready flag. Pull accessors wait for
//! that flag and copy the frame out. A puller already waiting when the flag
//! goes up gets the frame before the scratch buffer is reused, bounded by
//! [`HANDOFF_TIMEOUT`]. The scratch lock is held for the whole chunk, so
//! callbacks must not call the pull accessors.

use crate::sink::{AudioInfo, FrameInfo, VideoInfo};
use crate::{Error, Result};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Longest the control thread holds a frame back for a waiting puller.
const HANDOFF_TIMEOUT: Duration = Duration::from_millis(100);

/// Which ready flag a frame raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BufferReady {
    Video,
    Audio,
}

pub(crate) struct Scratch {
    pub buf: Box<[u8]>,
    /// Length of the frame currently in `buf`.
    pub len: usize,
    pub frame: Option<FrameInfo>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Slot {
    ready: bool,
    waiters: usize,
}

#[derive(Debug, Default)]
struct ReadyFlags {
    video: Slot,
    audio: Slot,
}

impl ReadyFlags {
    fn slot(&mut self, kind: BufferReady) -> &mut Slot {
        match kind {
            BufferReady::Video => &mut self.video,
            BufferReady::Audio => &mut self.audio,
        }
    }
}

pub(crate) struct FrameExchange {
    scratch: Mutex<Scratch>,
    ready: Mutex<ReadyFlags>,
    ready_changed: Condvar,
}

impl FrameExchange {
    pub(crate) fn new(buf: Box<[u8]>) -> Self {
        Self {
            scratch: Mutex::new(Scratch {
                buf,
                len: 0,
                frame: None,
            }),
            ready: Mutex::new(ReadyFlags::default()),
            ready_changed: Condvar::new(),
        }
    }

    pub(crate) fn lock_scratch(&self) -> MutexGuard<'_, Scratch> {
        self.scratch.lock()
    }

    /// Drop both ready flags, at the start of each demux round.
    pub(crate) fn clear_ready(&self) {
        let mut ready = self.ready.lock();
        ready.video.ready = false;
        ready.audio.ready = false;
    }

    /// Raise the ready flag for the frame now in the scratch buffer and give
    /// any waiting puller the chance to copy it.
    pub(crate) fn signal(&self, kind: BufferReady) {
        let deadline = Instant::now() + HANDOFF_TIMEOUT;
        let mut ready = self.ready.lock();
        ready.slot(kind).ready = true;
        self.ready_changed.notify_all();

        while ready.slot(kind).ready && ready.slot(kind).waiters > 0 {
            if self.ready_changed.wait_until(&mut ready, deadline).timed_out() {
                tracing::debug!(?kind, "puller did not take frame in time");
                break;
            }
        }
    }

    pub(crate) fn pull_video(&self, out: &mut [u8], timeout: Duration) -> Result<(usize, VideoInfo)> {
        let (len, info) = self.pull(BufferReady::Video, out, timeout)?;
        match info {
            FrameInfo::Video(info) => Ok((len, info)),
            FrameInfo::Audio(_) => Err(Error::Timeout("video buffer")),
        }
    }

    pub(crate) fn pull_audio(&self, out: &mut [u8], timeout: Duration) -> Result<(usize, AudioInfo)> {
        let (len, info) = self.pull(BufferReady::Audio, out, timeout)?;
        match info {
            FrameInfo::Audio(info) => Ok((len, info)),
            FrameInfo::Video(_) => Err(Error::Timeout("audio buffer")),
        }
    }

    /// Wait for `kind` to become ready and copy the scratch frame into `out`.
    ///
    /// An undersized `out` fails with `NoMemory` and leaves the flag raised,
    /// so the caller can retry with a larger buffer.
    fn pull(&self, kind: BufferReady, out: &mut [u8], timeout: Duration) -> Result<(usize, FrameInfo)> {
        let deadline = Instant::now() + timeout;
        let mut ready = self.ready.lock();
        ready.slot(kind).waiters += 1;
        let result = self.take(&mut ready, kind, out, deadline);
        ready.slot(kind).waiters -= 1;
        drop(ready);
        self.ready_changed.notify_all();
        result
    }

    fn take(
        &self,
        ready: &mut MutexGuard<'_, ReadyFlags>,
        kind: BufferReady,
        out: &mut [u8],
        deadline: Instant,
    ) -> Result<(usize, FrameInfo)> {
        let what = match kind {
            BufferReady::Video => "video buffer",
            BufferReady::Audio => "audio buffer",
        };

        loop {
            while !ready.slot(kind).ready {
                if self.ready_changed.wait_until(ready, deadline).timed_out()
                    && !ready.slot(kind).ready
                {
                    return Err(Error::Timeout(what));
                }
            }

            let scratch = self.scratch.lock();
            let frame = scratch.frame.filter(|frame| {
                matches!(
                    (kind, frame),
                    (BufferReady::Video, FrameInfo::Video(_)) | (BufferReady::Audio, FrameInfo::Audio(_))
                )
            });

            let Some(frame) = frame else {
                // Overwritten by a later chunk of the other kind.
                ready.slot(kind).ready = false;
                continue;
            };

            if out.len() < scratch.len {
                return Err(Error::no_memory(format!(
                    "{} needs {} bytes, output holds {}",
                    what,
                    scratch.len,
                    out.len()
                )));
            }

            out[..scratch.len].copy_from_slice(&scratch.buf[..scratch.len]);
            ready.slot(kind).ready = false;
            return Ok((scratch.len, frame));
        }
    }
}
