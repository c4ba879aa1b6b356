//! The control thread and its playback state machine.
//!
//! ```text
//!   Start            header ok             payload done / fault
//! None ────▶ Header ──────────▶ Data ──(ticks)──▶ End ──▶ None
//!              │                  │                ▲
//!              └── parse fault ───┴──── Stop ──────┘
//! ```
//!
//! The control thread is the only mutator of session state and the only
//! consumer of the ring buffer. It publishes the current state through
//! [`Status`] so the API can validate calls.

use crate::config::EngineConfig;
use crate::demux;
use crate::event::{Event, EventPoster, EventQueue, Wake};
use crate::exchange::{BufferReady, FrameExchange};
use crate::session::{PendingSource, PlaybackState, Session, SessionOutcome, SessionStats, Streams};
use crate::sink::{AudioFrame, AudioInfo, FrameInfo, FrameSink, VideoFrame, VideoInfo};
use crate::timer::PeriodicTimer;
use crate::{Error, Result};
use aviplay_media::{AviHeader, ChunkKind};
use parking_lot::Mutex;
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// State shared between the API and the control thread.
pub(crate) struct Shared {
    pub config: EngineConfig,
    pub status: Mutex<Status>,
    pub exchange: FrameExchange,
}

#[derive(Default)]
pub(crate) struct Status {
    pub state: PlaybackState,
    /// Source queued by `play_*`, taken by the control thread on Start.
    pub pending: Option<PendingSource>,
    pub last_session: Option<SessionStats>,
}

/// Result of one demux round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Round {
    /// A video frame was dispatched; wait for the next tick.
    Continue,
    /// The payload region is exhausted.
    Finished,
}

pub(crate) struct Controller {
    shared: Arc<Shared>,
    sink: Box<dyn FrameSink>,
    events: EventQueue,
    poster: EventPoster,
    timer: PeriodicTimer,
    ack: Sender<()>,
    state: PlaybackState,
    session: Option<Session>,
    /// Set when the session ends on its own, read by the End handler.
    outcome: Option<SessionOutcome>,
}

impl Controller {
    pub(crate) fn new(
        shared: Arc<Shared>,
        sink: Box<dyn FrameSink>,
        events: EventQueue,
        poster: EventPoster,
        timer: PeriodicTimer,
        ack: Sender<()>,
    ) -> Self {
        Self {
            shared,
            sink,
            events,
            poster,
            timer,
            ack,
            state: PlaybackState::None,
            session: None,
            outcome: None,
        }
    }

    /// Process events until Deinit.
    pub(crate) fn run(mut self) {
        tracing::debug!("control thread started");
        while let Some(wake) = self.events.wait() {
            if !self.handle(wake) {
                break;
            }
        }
        self.timer.disarm();
        tracing::debug!("control thread exiting");
        let _ = self.ack.send(());
    }

    /// Handle one wake: Stop and Deinit before Start, Start before Tick.
    /// Returns false on Deinit.
    fn handle(&mut self, wake: Wake) -> bool {
        tracing::trace!(?wake, "control thread woke");
        if wake.stop {
            self.on_stop();
        }
        if wake.deinit {
            self.on_stop();
            return false;
        }
        if wake.start {
            self.on_start();
        }
        if wake.tick {
            self.on_tick();
        }
        true
    }

    fn set_state(&mut self, state: PlaybackState) {
        tracing::debug!(from = %self.state, to = %state, "state transition");
        self.state = state;
        self.shared.status.lock().state = state;
    }

    // -- Start ---------------------------------------------------------------

    fn on_start(&mut self) {
        let pending = {
            let mut status = self.shared.status.lock();
            match status.pending.take() {
                Some(pending) => {
                    status.state = PlaybackState::Header;
                    pending
                }
                None => {
                    tracing::warn!("start event without a pending source");
                    return;
                }
            }
        };
        tracing::debug!(from = %self.state, to = %PlaybackState::Header, "state transition");
        self.state = PlaybackState::Header;
        self.outcome = None;

        let mut session = Session::new(pending);
        tracing::info!(mode = ?session.mode, "session starting");
        let parsed = self.parse_header(&mut session);
        self.session = Some(session);

        if let Err(e) = parsed {
            self.fail(e);
            return;
        }

        self.set_state(PlaybackState::Data);
        self.preroll();
        self.round();
    }

    /// Parse the header, report the audio clock, arm the timer and position
    /// the source at the first payload chunk.
    fn parse_header(&mut self, session: &mut Session) -> Result<()> {
        let header = {
            let mut scratch = self.shared.exchange.lock_scratch();
            scratch.len = 0;
            scratch.frame = None;
            let len = session.source.read_prefix(&mut scratch.buf)?;
            let header = AviHeader::parse(&scratch.buf[..len])?;
            header
        };

        let video = VideoInfo::from(&header.video);
        let audio = AudioInfo::from_stream(header.audio.as_ref());
        let interval = header.video.frame_interval();
        tracing::info!(
            width = video.width,
            height = video.height,
            format = %video.pixel_format,
            fps = header.video.fps(),
            sample_rate = audio.sample_rate,
            bits = audio.bits_per_sample,
            channels = audio.channels,
            movi_start = header.movi_start,
            movi_size = header.movi_size,
            "parsed AVI header"
        );
        if header.audio.is_none() {
            tracing::debug!("no audio stream, reporting default clock");
        }

        self.sink.on_audio_clock(audio);
        self.timer.arm(interval);
        session.source.begin_payload(header.movi_start, &self.shared.config)?;
        session.streams = Some(Streams {
            header,
            video,
            audio,
        });
        Ok(())
    }

    /// Block until the ring buffer reaches the pre-roll watermark.
    fn preroll(&self) {
        let Some(ring) = self.session.as_ref().and_then(|s| s.source.ring()) else {
            return;
        };
        let threshold = self.shared.config.preroll_threshold();
        if ring.fill() >= threshold || ring.is_finished() {
            return;
        }
        tracing::info!(threshold, "buffering");
        let fill = ring.wait_for_fill(threshold, self.shared.config.preroll_poll());
        tracing::info!(fill, "buffering done");
    }

    // -- Data ----------------------------------------------------------------

    fn on_tick(&mut self) {
        if self.state != PlaybackState::Data {
            tracing::trace!(state = %self.state, "ignoring timer tick");
            return;
        }
        self.round();
    }

    fn round(&mut self) {
        match self.demux_until_video() {
            Ok(Round::Continue) => {}
            Ok(Round::Finished) => {
                tracing::info!("payload fully dispatched");
                self.end(SessionOutcome::Completed);
            }
            Err(e) => self.fail(e),
        }
    }

    /// Dispatch audio chunks until one video chunk has been dispatched or the
    /// payload region is exhausted.
    fn demux_until_video(&mut self) -> Result<Round> {
        let Some(session) = self.session.as_mut() else {
            return Ok(Round::Finished);
        };
        let Some(streams) = session.streams.as_ref() else {
            return Ok(Round::Finished);
        };
        let (video, audio, payload_size) = (streams.video, streams.audio, streams.header.movi_size);
        let exchange = &self.shared.exchange;
        exchange.clear_ready();

        loop {
            if session.consumed >= payload_size {
                return Ok(Round::Finished);
            }

            let ready = {
                let mut guard = exchange.lock_scratch();
                let scratch = &mut *guard;
                let chunk = demux::read_chunk(&mut session.source, &mut scratch.buf)?;
                session.consumed += chunk.consumed();
                scratch.len = chunk.len;
                let data = &scratch.buf[..chunk.len];

                match chunk.kind {
                    ChunkKind::Video => {
                        session.video_frames += 1;
                        scratch.frame = Some(FrameInfo::Video(video));
                        tracing::debug!(
                            frame = session.video_frames,
                            len = chunk.len,
                            consumed = session.consumed,
                            "video frame"
                        );
                        self.sink.on_video_frame(VideoFrame { data, info: video });
                        BufferReady::Video
                    }
                    ChunkKind::Audio => {
                        session.audio_frames += 1;
                        scratch.frame = Some(FrameInfo::Audio(audio));
                        tracing::debug!(len = chunk.len, consumed = session.consumed, "audio frame");
                        self.sink.on_audio_frame(AudioFrame { data, info: audio });
                        BufferReady::Audio
                    }
                    ChunkKind::Unknown => return Err(Error::UnsupportedChunk(chunk.fourcc)),
                }
            };
            exchange.signal(ready);

            if ready == BufferReady::Video {
                return Ok(if session.consumed >= payload_size {
                    Round::Finished
                } else {
                    Round::Continue
                });
            }
        }
    }

    /// Record why the session ended and let the End handler tear it down.
    fn end(&mut self, outcome: SessionOutcome) {
        self.outcome = Some(outcome);
        self.set_state(PlaybackState::End);
        if !self.poster.post(Event::Stop) {
            tracing::warn!("could not post stop event");
        }
    }

    fn fail(&mut self, error: Error) {
        tracing::error!(error = %error, state = %self.state, "session aborted");
        self.end(SessionOutcome::Failed(error.to_string()));
    }

    // -- End -----------------------------------------------------------------

    fn on_stop(&mut self) {
        let Some(session) = self.session.take() else {
            tracing::debug!("stop without an active session");
            return;
        };
        if self.state != PlaybackState::End {
            self.set_state(PlaybackState::End);
        }

        self.timer.disarm();
        let outcome = self.outcome.take().unwrap_or(SessionOutcome::Stopped);
        let stats = session.close(self.shared.config.reader_join_timeout(), outcome);
        tracing::info!(
            video_frames = stats.video_frames,
            audio_frames = stats.audio_frames,
            bytes = stats.bytes_consumed,
            payload = stats.payload_size,
            outcome = ?stats.outcome,
            "session ended"
        );

        {
            let mut status = self.shared.status.lock();
            status.state = PlaybackState::None;
            status.last_session = Some(stats);
        }
        self.state = PlaybackState::None;
        self.sink.on_playback_end();
    }
}
