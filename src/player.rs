//! The `play` command: drive one engine through a playlist.

use crate::config::Config;
use crate::playlist::Playlist;
use crate::sink::{FpsMeter, LoggingSink};
use anyhow::{Context, Result};
use aviplay_engine::{Engine, Error as EngineError, SessionOutcome};
use std::path::Path;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How long one pull waits before re-checking for the end of playback.
const PULL_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Default)]
pub struct PlayOptions {
    /// Start over after the last file.
    pub loop_playback: bool,
    /// Load each file into memory first.
    pub memory: bool,
    /// Take video frames with the pull accessor instead of the callback.
    pub pull: bool,
}

/// Tally of one `play` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaySummary {
    pub completed: usize,
    pub failed: usize,
}

/// Play every file of `playlist` on one engine, once or forever.
pub fn play(config: &Config, playlist: &Playlist, options: PlayOptions) -> Result<PlaySummary> {
    let (sink, ended) = LoggingSink::new(config.report.fps_interval_frames, !options.pull);
    let engine =
        Engine::init(config.engine.clone(), sink).context("Failed to initialize playback engine")?;

    let result = run_playlist(&engine, &ended, config, playlist, options);

    if engine.state().is_active() {
        if let Err(e) = engine.stop() {
            debug!("Stop at exit: {}", e);
        }
    }
    engine.deinit().context("Failed to shut down playback engine")?;

    result
}

fn run_playlist(
    engine: &Engine,
    ended: &Receiver<()>,
    config: &Config,
    playlist: &Playlist,
    options: PlayOptions,
) -> Result<PlaySummary> {
    let mut summary = PlaySummary::default();
    let total = playlist.len();

    loop {
        info!("Starting file list playback");

        for (index, file) in playlist.files().iter().enumerate() {
            info!("Playing: {:?} ({}/{})", file, index + 1, total);

            if let Err(e) = start(engine, file, options.memory) {
                error!("Failed to play file: {:?}, error: {:#}", file, e);
                summary.failed += 1;
                thread::sleep(Duration::from_millis(config.playlist.retry_delay_ms));
                continue;
            }

            if options.pull {
                pull_until_end(engine, ended, config.report.fps_interval_frames)?;
            } else {
                ended
                    .recv()
                    .context("Playback engine went away before the file ended")?;
            }

            match engine.stats() {
                Some(stats) => {
                    info!(
                        video_frames = stats.video_frames,
                        audio_frames = stats.audio_frames,
                        bytes = stats.bytes_consumed,
                        payload = stats.payload_size,
                        "Session ended: {:?}",
                        stats.outcome
                    );
                    match stats.outcome {
                        SessionOutcome::Failed(_) => summary.failed += 1,
                        _ => summary.completed += 1,
                    }
                }
                None => summary.completed += 1,
            }
        }

        if !options.loop_playback {
            break;
        }
        thread::sleep(Duration::from_millis(config.playlist.loop_delay_ms));
    }

    Ok(summary)
}

fn start(engine: &Engine, file: &Path, memory: bool) -> Result<()> {
    if memory {
        let data = std::fs::read(file).with_context(|| format!("Failed to read {:?}", file))?;
        engine.play_from_memory(data)?;
    } else {
        engine.play_from_file(file)?;
    }
    Ok(())
}

/// Copy video frames out of the engine until the session ends.
fn pull_until_end(engine: &Engine, ended: &Receiver<()>, fps_interval: u64) -> Result<()> {
    let mut frame = vec![0u8; engine.config().scratch_buffer_size];
    let mut meter = FpsMeter::new(fps_interval);
    let mut frames = 0u64;

    loop {
        match ended.try_recv() {
            Ok(()) => break,
            Err(TryRecvError::Disconnected) => {
                anyhow::bail!("Playback engine went away before the file ended")
            }
            Err(TryRecvError::Empty) => {}
        }

        match engine.get_video_buffer(&mut frame, PULL_TIMEOUT) {
            Ok((len, info)) => {
                frames += 1;
                debug!(len, width = info.width, height = info.height, "pulled video frame");
                if let Some(fps) = meter.frame() {
                    info!("Frame rate: {:.2} FPS", fps);
                }
            }
            Err(EngineError::Timeout(_)) => {}
            Err(EngineError::NoMemory(msg)) => {
                warn!("Pulled frame does not fit: {}", msg);
                frame.resize(frame.len() * 2, 0);
            }
            Err(e) => return Err(e).context("Failed to pull video frame"),
        }
    }

    info!("Pulled {} video frames", frames);
    Ok(())
}
