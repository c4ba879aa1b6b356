mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./aviplay.toml", "~/.config/aviplay/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    config
        .engine
        .clone()
        .resolve()
        .context("Invalid [engine] section")?;

    if config.playlist.extensions.iter().any(|e| e.is_empty()) {
        anyhow::bail!("playlist.extensions cannot contain an empty entry");
    }

    if let Some(ref dir) = config.playlist.dir {
        if !dir.is_dir() {
            tracing::warn!("Playlist directory does not exist: {:?}", dir);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.engine.ring_buffer_size, 4 * 1024 * 1024);
        assert_eq!(config.playlist.extensions, vec!["avi".to_string()]);
        assert!(!config.playlist.loop_playback);
        assert_eq!(config.playlist.retry_delay_ms, 2000);
        assert_eq!(config.report.fps_interval_frames, 100);
    }

    #[test]
    fn test_sections_override_defaults() {
        let file = write_config(
            r#"
[engine]
scratch_buffer_size = 65536
ring_buffer_size = 1048576
preroll_watermark = 0.25

[engine.reader_thread]
name = "reader"
priority = 3

[playlist]
extensions = ["avi", "AVI2"]
loop_playback = true
loop_delay_ms = 0

[report]
fps_interval_frames = 25
"#,
        );
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.engine.scratch_buffer_size, 65536);
        assert_eq!(config.engine.ring_buffer_size, 1048576);
        assert_eq!(config.engine.preroll_watermark, 0.25);
        assert_eq!(config.engine.reader_thread.name, "reader");
        assert_eq!(config.engine.reader_thread.priority, 3);
        assert_eq!(config.engine.control_thread.name, "avi-player");
        assert!(config.playlist.loop_playback);
        assert_eq!(config.playlist.loop_delay_ms, 0);
        assert_eq!(config.report.fps_interval_frames, 25);
    }

    #[test]
    fn test_rejects_chunk_larger_than_ring() {
        let file = write_config(
            r#"
[engine]
ring_buffer_size = 4096
reader_chunk_size = 8192
"#,
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("reader_chunk_size"));
    }

    #[test]
    fn test_rejects_watermark_out_of_range() {
        let mut config = Config::default();
        config.engine.preroll_watermark = 0.0;
        assert!(validate_config(&config).is_err());

        config.engine.preroll_watermark = 1.5;
        assert!(validate_config(&config).is_err());

        config.engine.preroll_watermark = 1.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_engine_section_checked_by_engine_rules() {
        let mut config = Config::default();
        config.engine.reader_chunk_size = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("Invalid [engine] section"));
        assert!(format!("{:#}", err).contains("reader_chunk_size 0"));

        config.engine.ring_buffer_size = 0;
        assert!(format!("{:#}", validate_config(&config).unwrap_err())
            .contains("ring_buffer_size must be non-zero"));

        config.engine.ring_buffer_size = 1000;
        config.engine.reader_chunk_size = 300;
        config.engine.preroll_watermark = 1.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let file = write_config("[engine\nring_buffer_size = ");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_missing_custom_path_fails() {
        let err = load_config_or_default(Some(Path::new("/nonexistent/aviplay.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
