use aviplay_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub playlist: PlaylistConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaylistConfig {
    /// Directory played when `play` is given no path
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// File extensions picked up from a directory, matched case-insensitively
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Start over after the last file
    #[serde(default)]
    pub loop_playback: bool,

    /// Pause after a file fails to start
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Pause between two passes over the playlist
    #[serde(default = "default_loop_delay_ms")]
    pub loop_delay_ms: u64,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            dir: None,
            extensions: default_extensions(),
            loop_playback: false,
            retry_delay_ms: default_retry_delay_ms(),
            loop_delay_ms: default_loop_delay_ms(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["avi".to_string()]
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_loop_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Log the measured frame rate every this many video frames (0 disables)
    #[serde(default = "default_fps_interval_frames")]
    pub fps_interval_frames: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            fps_interval_frames: default_fps_interval_frames(),
        }
    }
}

fn default_fps_interval_frames() -> u64 {
    100
}
