use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aviplay")]
#[command(author, version, about = "AVI playback engine and player")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play an AVI file, or every AVI file in a directory
    Play {
        /// File or directory to play (defaults to playlist.dir from the config)
        path: Option<PathBuf>,

        /// Start over after the last file
        #[arg(short, long = "loop")]
        loop_playback: bool,

        /// Load each file into memory before playing it
        #[arg(long)]
        memory: bool,

        /// Take video frames with the pull accessor instead of the callback
        #[arg(long)]
        pull: bool,
    },

    /// Show the stream layout of an AVI file or directory
    Probe {
        /// File or directory to probe
        #[arg(required = true)]
        path: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Config file to validate
        config: Option<PathBuf>,
    },

    /// Show version information
    Version,
}
