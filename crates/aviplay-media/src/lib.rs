//! Aviplay-Media: RIFF/AVI container parsing
//!
//! This crate understands the single-video/single-audio AVI profile played by
//! the aviplay engine. It is pure: no threads, no I/O beyond byte slices.
//!
//! # Modules
//!
//! - `avi` - FourCC codes, chunk headers, chunk classification and the
//!   header parser that turns a file prefix into an [`AviHeader`]
//!
//! # Layout
//!
//! ```text
//! RIFF <size> AVI
//!   LIST <size> hdrl
//!     avih ...
//!     LIST <size> strl  (strh "vids", strf BITMAPINFOHEADER)
//!     LIST <size> strl  (strh "auds", strf WAVEFORMATEX)
//!   JUNK ...
//!   LIST <size> movi
//!     00dc <size> <payload> [pad]
//!     01wb <size> <payload> [pad]
//!     ...
//!   idx1 ...
//! ```
//!
//! Everything up to and including the `movi` list header must fit in the
//! prefix handed to [`AviHeader::parse`].

pub mod avi;
pub mod error;

pub use avi::{
    AudioFormat, AudioStream, AviHeader, ChunkHeader, ChunkKind, FourCc, PixelFormat,
    VideoStream, CHUNK_HEADER_SIZE,
};
pub use error::{Error, Result};
