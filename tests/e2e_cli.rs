//! CLI end-to-end tests
//!
//! Tests for the aviplay command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the aviplay binary
#[allow(deprecated)]
fn aviplay_cmd() -> Command {
    let mut cmd = Command::cargo_bin("aviplay").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn chunk(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    if body.len() % 2 == 1 {
        out.push(0);
    }
    out
}

fn list(kind: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    let mut body = kind.to_vec();
    for child in children {
        body.extend_from_slice(child);
    }
    chunk(b"LIST", &body)
}

/// A 160x120 MJPEG file at 100 fps with 16 kHz mono PCM audio and
/// `frames` video/audio chunk pairs.
fn sample_avi(frames: usize) -> Vec<u8> {
    let mut avih = 10_000u32.to_le_bytes().to_vec();
    avih.extend_from_slice(&[0u8; 12]);
    avih.extend_from_slice(&(frames as u32).to_le_bytes());
    avih.extend_from_slice(&[0u8; 12]);
    avih.extend_from_slice(&160u32.to_le_bytes());
    avih.extend_from_slice(&120u32.to_le_bytes());
    avih.extend_from_slice(&[0u8; 16]);

    let mut vids = b"vidsMJPG".to_vec();
    vids.extend_from_slice(&[0u8; 12]);
    vids.extend_from_slice(&1u32.to_le_bytes());
    vids.extend_from_slice(&100u32.to_le_bytes());
    vids.extend_from_slice(&0u32.to_le_bytes());
    vids.extend_from_slice(&(frames as u32).to_le_bytes());
    vids.extend_from_slice(&[0u8; 20]);

    let mut bih = 40u32.to_le_bytes().to_vec();
    bih.extend_from_slice(&160i32.to_le_bytes());
    bih.extend_from_slice(&120i32.to_le_bytes());
    bih.extend_from_slice(&1u16.to_le_bytes());
    bih.extend_from_slice(&24u16.to_le_bytes());
    bih.extend_from_slice(b"MJPG");
    bih.extend_from_slice(&[0u8; 20]);

    let mut auds = b"auds".to_vec();
    auds.extend_from_slice(&[0u8; 16]);
    auds.extend_from_slice(&2u32.to_le_bytes());
    auds.extend_from_slice(&32_000u32.to_le_bytes());
    auds.extend_from_slice(&[0u8; 28]);

    let mut wf = 1u16.to_le_bytes().to_vec();
    wf.extend_from_slice(&1u16.to_le_bytes());
    wf.extend_from_slice(&16_000u32.to_le_bytes());
    wf.extend_from_slice(&32_000u32.to_le_bytes());
    wf.extend_from_slice(&2u16.to_le_bytes());
    wf.extend_from_slice(&16u16.to_le_bytes());

    let hdrl = list(
        b"hdrl",
        &[
            chunk(b"avih", &avih),
            list(b"strl", &[chunk(b"strh", &vids), chunk(b"strf", &bih)]),
            list(b"strl", &[chunk(b"strh", &auds), chunk(b"strf", &wf)]),
        ],
    );

    let mut movi = Vec::new();
    for i in 0..frames {
        movi.push(chunk(b"00dc", &vec![i as u8; 301]));
        movi.push(chunk(b"01wb", &vec![0u8; 320]));
    }

    let mut body = b"AVI ".to_vec();
    body.extend(hdrl);
    body.extend(list(b"movi", &movi));
    body.extend(chunk(b"idx1", &[]));
    chunk(b"RIFF", &body)
}

fn write_sample(dir: &Path, name: &str, frames: usize) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, sample_avi(frames)).unwrap();
    path
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = aviplay_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = aviplay_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("aviplay"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = aviplay_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "aviplay {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_cli_play_help() {
    let mut cmd = aviplay_cmd();
    cmd.args(["play", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--loop"))
        .stdout(predicate::str::contains("--memory"))
        .stdout(predicate::str::contains("--pull"));
}

#[test]
fn test_cli_probe_file() {
    let dir = tempdir().unwrap();
    let path = write_sample(dir.path(), "clip.avi", 3);

    let mut cmd = aviplay_cmd();
    cmd.arg("probe")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("clip.avi: 160x120 @ 100fps"))
        .stdout(predicate::str::contains("MJPEG"))
        .stdout(predicate::str::contains("16000 Hz"));
}

#[test]
fn test_cli_probe_json() {
    let dir = tempdir().unwrap();
    let path = write_sample(dir.path(), "clip.avi", 3);

    let mut cmd = aviplay_cmd();
    let output = cmd.args(["probe", "--json"]).arg(&path).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["video"]["width"], 160);
    assert_eq!(json["video"]["height"], 120);
    assert_eq!(json["audio"]["sample_rate"], 16000);
    assert_eq!(json["audio"]["channels"], 1);
}

#[test]
fn test_cli_probe_directory() {
    let dir = tempdir().unwrap();
    write_sample(dir.path(), "b.avi", 1);
    write_sample(dir.path(), "a.avi", 2);
    fs::write(dir.path().join("notes.txt"), "not a video").unwrap();

    let mut cmd = aviplay_cmd();
    let output = cmd.args(["probe", "--json"]).arg(dir.path()).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let files = json.as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert!(files[0]["file"].as_str().unwrap().ends_with("a.avi"));
}

#[test]
fn test_cli_probe_nonexistent_file() {
    let mut cmd = aviplay_cmd();
    cmd.args(["probe", "/nonexistent/file.avi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_probe_rejects_garbage() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.avi");
    fs::write(&path, b"definitely not RIFF").unwrap();

    let mut cmd = aviplay_cmd();
    cmd.arg("probe")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse AVI header"));
}

#[test]
fn test_cli_validate_config() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("aviplay.toml");
    fs::write(
        &config_path,
        r#"
[engine]
ring_buffer_size = 262144
reader_chunk_size = 16384

[playlist]
loop_playback = false
"#,
    )
    .unwrap();

    let mut cmd = aviplay_cmd();
    cmd.arg("validate")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("262144"));
}

#[test]
fn test_cli_validate_invalid_config() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("aviplay.toml");
    fs::write(&config_path, "[engine]\npreroll_watermark = 2.0\n").unwrap();

    let mut cmd = aviplay_cmd();
    cmd.arg("validate")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("preroll_watermark"));
}

#[test]
fn test_cli_play_file() {
    let dir = tempdir().unwrap();
    let path = write_sample(dir.path(), "clip.avi", 5);

    let mut cmd = aviplay_cmd();
    cmd.arg("play")
        .arg(&path)
        .assert()
        .success()
        .stderr(predicate::str::contains("Played 1 file(s), 0 failed"));
}

#[test]
fn test_cli_play_memory_and_pull() {
    let dir = tempdir().unwrap();
    let path = write_sample(dir.path(), "clip.avi", 5);

    let mut cmd = aviplay_cmd();
    cmd.args(["play", "--memory", "--pull"])
        .arg(&path)
        .assert()
        .success()
        .stderr(predicate::str::contains("Pulled"));
}

#[test]
fn test_cli_play_directory_skips_broken_file() {
    let dir = tempdir().unwrap();
    write_sample(dir.path(), "a.avi", 2);
    fs::write(dir.path().join("b.avi"), b"RIFF garbage").unwrap();
    write_sample(dir.path(), "c.avi", 2);

    let mut cmd = aviplay_cmd();
    cmd.arg("play")
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Played 2 file(s), 1 failed"));
}

#[test]
fn test_cli_play_empty_directory() {
    let dir = tempdir().unwrap();

    let mut cmd = aviplay_cmd();
    cmd.arg("play")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No AVI files found"));
}

#[test]
fn test_cli_play_without_path() {
    let dir = tempdir().unwrap();

    let mut cmd = aviplay_cmd();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("play")
        .assert()
        .failure()
        .stderr(predicate::str::contains("playlist.dir is not set"));
}
