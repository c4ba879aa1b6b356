mod cli;

use aviplay::{
    config,
    player::{self, PlayOptions},
    playlist::Playlist,
    probe,
};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};

fn play(
    path: Option<PathBuf>,
    config_path: Option<&Path>,
    options: PlayOptions,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    let path = match path.or_else(|| config.playlist.dir.clone()) {
        Some(path) => path,
        None => anyhow::bail!("No file or directory given and playlist.dir is not set"),
    };
    if !path.exists() {
        anyhow::bail!("Path does not exist: {:?}", path);
    }

    let playlist = Playlist::from_path(&path, &config.playlist.extensions)?;
    let options = PlayOptions {
        loop_playback: options.loop_playback || config.playlist.loop_playback,
        ..options
    };

    let summary = player::play(&config, &playlist, options)?;
    tracing::info!(
        "Played {} file(s), {} failed",
        summary.completed,
        summary.failed
    );

    if summary.completed == 0 && summary.failed > 0 {
        anyhow::bail!("No file could be played");
    }
    Ok(())
}

fn probe_path(path: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("File does not exist: {:?}", path);
    }

    let config = config::load_config_or_default(config_path)?;
    let prefix_len = config.engine.clone().resolve()?.scratch_buffer_size;
    let playlist = Playlist::from_path(path, &config.playlist.extensions)?;

    let mut reports = Vec::with_capacity(playlist.len());
    for file in playlist.files() {
        reports.push(probe::probe_file(file, prefix_len)?);
    }

    if json {
        let json_str = if reports.len() == 1 {
            serde_json::to_string_pretty(&reports[0])?
        } else {
            serde_json::to_string_pretty(&reports)?
        };
        println!("{}", json_str);
    } else {
        for report in &reports {
            println!("{}", report.render());
        }
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Scratch buffer: {} bytes", config.engine.scratch_buffer_size);
            println!("  Ring buffer: {} bytes", config.engine.ring_buffer_size);
            println!("  Reader chunk: {} bytes", config.engine.reader_chunk_size);
            println!("  Pre-roll watermark: {}", config.engine.preroll_watermark);
            match config.playlist.dir {
                Some(ref dir) => println!("  Playlist dir: {:?}", dir),
                None => println!("  Playlist dir: (none)"),
            }
            println!("  Loop playback: {}", config.playlist.loop_playback);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Ring buffer: {} bytes", config.engine.ring_buffer_size);
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "aviplay=trace,aviplay_engine=trace,aviplay_media=trace".to_string()
        } else {
            "aviplay=info,aviplay_engine=info,aviplay_media=info".to_string()
        }
    });

    // Logs go to stderr so `probe --json` output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Play {
            path,
            loop_playback,
            memory,
            pull,
        } => play(
            path,
            cli.config.as_deref(),
            PlayOptions {
                loop_playback,
                memory,
                pull,
            },
        ),
        Commands::Probe { path, json } => probe_path(&path, cli.config.as_deref(), json),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("aviplay {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
