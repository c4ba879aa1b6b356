//! Payload chunk demultiplexing.

use crate::source::Source;
use crate::{Error, Result};
use aviplay_media::{ChunkHeader, ChunkKind, FourCc, CHUNK_HEADER_SIZE};
use std::io;

/// One chunk read into the scratch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Chunk {
    pub fourcc: FourCc,
    pub kind: ChunkKind,
    /// Declared payload length; the frame bytes are `scratch[..len]`.
    pub len: usize,
    /// Payload length rounded up to even.
    pub padded_len: usize,
}

impl Chunk {
    /// Bytes this chunk occupies in the payload region.
    pub(crate) fn consumed(&self) -> u64 {
        (CHUNK_HEADER_SIZE + self.padded_len) as u64
    }
}

/// Read the next chunk header and its payload into `scratch`.
///
/// The tag is classified before the payload is read, so an unsupported chunk
/// leaves its payload in the source.
pub(crate) fn read_chunk(source: &mut Source, scratch: &mut [u8]) -> Result<Chunk> {
    let mut raw = [0u8; CHUNK_HEADER_SIZE];
    let got = source.read(&mut raw);
    if got < CHUNK_HEADER_SIZE {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("payload ended inside a chunk header ({} of 8 bytes)", got),
        )));
    }

    let header = ChunkHeader::parse(raw);
    let kind = header.kind();
    if kind == ChunkKind::Unknown {
        return Err(Error::UnsupportedChunk(header.fourcc));
    }

    let len = header.size as usize;
    let padded_len = header.padded_size() as usize;
    if padded_len > scratch.len() {
        return Err(Error::no_memory(format!(
            "chunk {} of {} bytes exceeds the {} byte scratch buffer",
            header.fourcc,
            padded_len,
            scratch.len()
        )));
    }

    let got = source.read(&mut scratch[..padded_len]);
    // A file may end right after an odd-sized final chunk without its pad byte.
    if got < len {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "chunk {} truncated: {} of {} bytes",
                header.fourcc, got, len
            ),
        )));
    }

    tracing::trace!(fourcc = %header.fourcc, ?kind, len, "demuxed chunk");
    Ok(Chunk {
        fourcc: header.fourcc,
        kind,
        len,
        padded_len,
    })
}
