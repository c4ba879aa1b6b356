//! Byte sources a session plays from.

use crate::config::EngineConfig;
use crate::reader::BackgroundReader;
use crate::ring_buffer::RingBuffer;
use crate::Result;
use bytes::Bytes;
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::sync::Arc;

/// Memory span or ring-buffered file, read through one interface.
pub(crate) enum Source {
    Memory {
        data: Bytes,
        cursor: usize,
    },
    File {
        ring: Arc<RingBuffer>,
        /// Held until the header is parsed, then moved into the reader.
        file: Option<File>,
        reader: Option<BackgroundReader>,
    },
}

impl Source {
    pub(crate) fn memory(data: Bytes) -> Self {
        Self::Memory { data, cursor: 0 }
    }

    pub(crate) fn file(file: File, ring: Arc<RingBuffer>) -> Self {
        Self::File {
            ring,
            file: Some(file),
            reader: None,
        }
    }

    /// Copy the first bytes of the source into `buf`, returning how many were
    /// available. Does not advance the payload cursor.
    pub(crate) fn read_prefix(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            Self::Memory { data, .. } => {
                let len = buf.len().min(data.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
            Self::File { file, .. } => match file {
                Some(file) => {
                    file.seek(SeekFrom::Start(0))?;
                    Ok(read_full(file, buf)?)
                }
                None => Ok(0),
            },
        }
    }

    /// Position the source at the first payload chunk. For files this starts
    /// the background reader.
    pub(crate) fn begin_payload(&mut self, movi_start: u64, config: &EngineConfig) -> Result<()> {
        match self {
            Self::Memory { data, cursor } => {
                *cursor = usize::try_from(movi_start)
                    .unwrap_or(usize::MAX)
                    .min(data.len());
                Ok(())
            }
            Self::File { ring, file, reader } => {
                if let Some(mut file) = file.take() {
                    file.seek(SeekFrom::Start(movi_start))?;
                    *reader = Some(BackgroundReader::spawn(
                        file,
                        ring.clone(),
                        config.reader_chunk_size,
                        config.reader_backoff(),
                        &config.reader_thread,
                    )?);
                }
                Ok(())
            }
        }
    }

    /// The ring buffer, in file mode.
    pub(crate) fn ring(&self) -> Option<&RingBuffer> {
        match self {
            Self::Memory { .. } => None,
            Self::File { ring, .. } => Some(ring),
        }
    }

    /// Fill `buf` from the payload. A short count means the source ran dry.
    pub(crate) fn read(&mut self, buf: &mut [u8]) -> usize {
        match self {
            Self::Memory { data, cursor } => {
                let len = buf.len().min(data.len() - *cursor);
                buf[..len].copy_from_slice(&data[*cursor..*cursor + len]);
                *cursor += len;
                len
            }
            Self::File { ring, .. } => ring.read(buf),
        }
    }
}

/// Read until `buf` is full or the reader hits end of file.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
