//! Public lifecycle API.

use crate::config::EngineConfig;
use crate::control::{Controller, Shared, Status};
use crate::error::try_alloc;
use crate::event::{self, Event, EventPoster};
use crate::exchange::FrameExchange;
use crate::ring_buffer::RingBuffer;
use crate::session::{PendingSource, PlaybackState, SessionStats};
use crate::sink::{AudioInfo, FrameSink, VideoInfo};
use crate::timer::PeriodicTimer;
use crate::{Error, Result};
use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};
use std::fs::File;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// A playback engine hosting at most one session at a time.
///
/// Created by [`Engine::init`], which starts the control thread. Frames are
/// pushed to the [`FrameSink`] given at init, or pulled with
/// [`Engine::get_video_buffer`] and [`Engine::get_audio_buffer`].
pub struct Engine {
    shared: Arc<Shared>,
    events: EventPoster,
    control: Option<JoinHandle<()>>,
    ack: Mutex<Receiver<()>>,
}

impl Engine {
    /// Allocate the scratch buffer, create the timer and start the control
    /// thread.
    ///
    /// Allocation failure returns [`Error::NoMemory`] before any thread is
    /// started.
    pub fn init(config: EngineConfig, sink: impl FrameSink + 'static) -> Result<Self> {
        let config = config.resolve()?;
        let scratch = try_alloc(config.scratch_buffer_size, "scratch buffer")?;

        let (poster, queue) = event::channel();
        let timer = PeriodicTimer::spawn(poster.clone())?;
        let (ack_tx, ack_rx) = mpsc::channel();

        let shared = Arc::new(Shared {
            config,
            status: Mutex::new(Status::default()),
            exchange: FrameExchange::new(scratch),
        });
        let controller = Controller::new(
            shared.clone(),
            Box::new(sink),
            queue,
            poster.clone(),
            timer,
            ack_tx,
        );
        let control = shared.config.control_thread.spawn(move || controller.run())?;

        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            scratch = shared.config.scratch_buffer_size,
            ring = shared.config.ring_buffer_size,
            "AVI engine initialized"
        );
        Ok(Self {
            shared,
            events: poster,
            control: Some(control),
            ack: Mutex::new(ack_rx),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Current session state.
    pub fn state(&self) -> PlaybackState {
        self.shared.status.lock().state
    }

    /// Counters of the most recently ended session.
    pub fn stats(&self) -> Option<SessionStats> {
        self.shared.status.lock().last_session.clone()
    }

    /// Open `path`, allocate the ring buffer and start a file session.
    pub fn play_from_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut status = self.idle_status("play_from_file")?;

        let file = File::open(path).inspect_err(|e| {
            tracing::error!(path = %path.display(), error = %e, "cannot open file");
        })?;
        let ring = RingBuffer::with_capacity(self.shared.config.ring_buffer_size)?;

        tracing::info!(path = %path.display(), "play from file");
        status.pending = Some(PendingSource::File {
            path: path.to_path_buf(),
            file,
            ring: Arc::new(ring),
        });
        drop(status);
        self.post_start()
    }

    /// Start a session over an in-memory AVI image.
    pub fn play_from_memory(&self, data: impl Into<Bytes>) -> Result<()> {
        let data = data.into();
        let mut status = self.idle_status("play_from_memory")?;
        tracing::info!(len = data.len(), "play from memory");
        status.pending = Some(PendingSource::Memory(data));
        drop(status);
        self.post_start()
    }

    /// Stop the running session. The end-of-playback callback still fires.
    pub fn stop(&self) -> Result<()> {
        let state = self.state();
        if !state.is_active() {
            return Err(Error::InvalidState { op: "stop", state });
        }
        tracing::info!(%state, "stop requested");
        if !self.events.post(Event::Stop) {
            return Err(Error::ControlThreadGone);
        }
        Ok(())
    }

    /// Wait up to `timeout` for the next video frame and copy it into `out`.
    ///
    /// Returns the frame length and stream info. Fails with
    /// [`Error::NoMemory`] if `out` is too small, leaving the frame available,
    /// or [`Error::Timeout`] if no frame arrives in time.
    pub fn get_video_buffer(&self, out: &mut [u8], timeout: Duration) -> Result<(usize, VideoInfo)> {
        self.shared.exchange.pull_video(out, timeout)
    }

    /// Audio counterpart of [`Engine::get_video_buffer`].
    pub fn get_audio_buffer(&self, out: &mut [u8], timeout: Duration) -> Result<(usize, AudioInfo)> {
        self.shared.exchange.pull_audio(out, timeout)
    }

    /// Stop any session, shut down the control thread and release the engine.
    ///
    /// Fails with [`Error::Timeout`] if the control thread does not
    /// acknowledge within the configured deadline; the thread is then left to
    /// exit on its own.
    pub fn deinit(mut self) -> Result<()> {
        self.shutdown()
    }

    fn idle_status(&self, op: &'static str) -> Result<MutexGuard<'_, Status>> {
        let status = self.shared.status.lock();
        if status.state != PlaybackState::None || status.pending.is_some() {
            return Err(Error::InvalidState {
                op,
                state: status.state,
            });
        }
        Ok(status)
    }

    fn post_start(&self) -> Result<()> {
        if self.events.post(Event::Start) {
            return Ok(());
        }
        self.shared.status.lock().pending = None;
        Err(Error::ControlThreadGone)
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(control) = self.control.take() else {
            return Ok(());
        };

        if !self.events.post(Event::Deinit) {
            if control.join().is_err() {
                tracing::error!("control thread panicked");
            }
            return Ok(());
        }

        let timeout = self.shared.config.deinit_timeout();
        match self.ack.lock().recv_timeout(timeout) {
            Ok(()) => {
                if control.join().is_err() {
                    tracing::error!("control thread panicked");
                }
                tracing::info!("AVI engine deinitialized");
                Ok(())
            }
            Err(RecvTimeoutError::Disconnected) => {
                tracing::warn!("control thread exited without acknowledging deinit");
                let _ = control.join();
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::error!(
                    timeout_ms = timeout.as_millis() as u64,
                    "control thread did not acknowledge deinit"
                );
                Err(Error::Timeout("deinit acknowledgement"))
            }
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(error = %e, "engine dropped without a clean shutdown");
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state())
            .field("running", &self.control.is_some())
            .finish()
    }
}
