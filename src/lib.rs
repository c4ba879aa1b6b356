//! Aviplay - AVI playback for constrained devices
//!
//! This library crate exposes the application layer of the `aviplay` binary
//! for integration testing. The engine itself lives in `aviplay-engine`.

pub mod config;
pub mod player;
pub mod playlist;
pub mod probe;
pub mod sink;
