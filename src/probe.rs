//! Header inspection for the `probe` command.

use anyhow::{Context, Result};
use aviplay_media::{AudioFormat, AviHeader};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// What `probe` reports for one file.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub file: PathBuf,
    pub file_size: u64,
    #[serde(flatten)]
    pub header: AviHeader,
}

impl ProbeReport {
    /// `name: WIDTHxHEIGHT @ FPSfps`
    pub fn summary_line(&self) -> String {
        let name = self
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file.display().to_string());
        let video = &self.header.video;
        format!("{}: {}x{} @ {}fps", name, video.width, video.height, video.fps())
    }

    /// Human-readable multi-line description.
    pub fn render(&self) -> String {
        let header = &self.header;
        let video = &header.video;
        let mut out = self.summary_line();
        out.push('\n');
        out.push_str(&format!(
            "  Video: {} ({}), {:.3} fps, {} frames\n",
            video.pixel_format, video.compression, video.fps_exact(), video.frame_count
        ));
        match header.audio {
            Some(ref audio) => {
                let format = match audio.format {
                    AudioFormat::Pcm => "PCM".to_string(),
                    AudioFormat::Other(tag) => format!("format 0x{:04x}", tag),
                };
                out.push_str(&format!(
                    "  Audio: {}, {} Hz, {} bit, {} channel(s)\n",
                    format, audio.sample_rate, audio.bits_per_sample, audio.channels
                ));
            }
            None => out.push_str("  Audio: none\n"),
        }
        let secs = header.duration().as_secs();
        out.push_str(&format!(
            "  Duration: {:02}:{:02}:{:02}\n",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        ));
        out.push_str(&format!(
            "  Payload: {} bytes at offset {}\n",
            header.movi_size, header.movi_start
        ));
        out.push_str(&format!("  Size: {} bytes", self.file_size));
        out
    }
}

/// Parse the header of `path`, reading at most `prefix_len` bytes.
///
/// `prefix_len` is normally the engine's scratch buffer size, so a file that
/// probes cleanly also starts playing.
pub fn probe_file(path: &Path, prefix_len: usize) -> Result<ProbeReport> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let file_size = file
        .metadata()
        .with_context(|| format!("Failed to stat {:?}", path))?
        .len();

    let mut prefix = Vec::with_capacity(prefix_len.min(file_size as usize));
    file.take(prefix_len as u64)
        .read_to_end(&mut prefix)
        .with_context(|| format!("Failed to read {:?}", path))?;

    let header = AviHeader::parse(&prefix)
        .with_context(|| format!("Failed to parse AVI header of {:?}", path))?;

    Ok(ProbeReport {
        file: path.to_path_buf(),
        file_size,
        header,
    })
}
