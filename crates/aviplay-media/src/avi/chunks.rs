//! RIFF chunk definitions and classification.

use bytes::Buf;

/// Size of a RIFF chunk header: FourCC plus little-endian u32 size.
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Mask selecting the two-letter type suffix of a stream chunk tag.
const STREAM_TYPE_MASK: u32 = 0xFFFF_0000;

/// Four-character chunk code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub const RIFF: Self = Self(*b"RIFF");
    pub const AVI: Self = Self(*b"AVI ");
    pub const LIST: Self = Self(*b"LIST");
    pub const HDRL: Self = Self(*b"hdrl");
    pub const AVIH: Self = Self(*b"avih");
    pub const STRL: Self = Self(*b"strl");
    pub const STRH: Self = Self(*b"strh");
    pub const STRF: Self = Self(*b"strf");
    pub const MOVI: Self = Self(*b"movi");
    pub const JUNK: Self = Self(*b"JUNK");
    pub const VIDS: Self = Self(*b"vids");
    pub const AUDS: Self = Self(*b"auds");

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// The code read as a little-endian u32, the way it sits on disk.
    pub fn as_u32(&self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    /// Get the 4-char code as a string.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl std::fmt::Display for FourCc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            write!(f, "{}", self.as_str())
        } else {
            write!(f, "{:#010x}", self.as_u32())
        }
    }
}

impl From<[u8; 4]> for FourCc {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

/// Kind of a chunk inside the `movi` payload region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Compressed video frame (`##dc`).
    Video,
    /// Audio samples (`##wb`).
    Audio,
    /// Anything else.
    Unknown,
}

impl ChunkKind {
    /// `00dc` with the stream number masked off.
    pub const VIDEO_CODE: u32 = u32::from_le_bytes(*b"00dc") & STREAM_TYPE_MASK;
    /// `00wb` with the stream number masked off.
    pub const AUDIO_CODE: u32 = u32::from_le_bytes(*b"00wb") & STREAM_TYPE_MASK;

    /// Classify a payload chunk tag, ignoring its two-digit stream number.
    pub fn classify(fourcc: FourCc) -> Self {
        match fourcc.as_u32() & STREAM_TYPE_MASK {
            Self::VIDEO_CODE => Self::Video,
            Self::AUDIO_CODE => Self::Audio,
            _ => Self::Unknown,
        }
    }
}

/// Parsed chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Chunk tag.
    pub fourcc: FourCc,
    /// Declared body size, excluding the header and the pad byte.
    pub size: u32,
}

impl ChunkHeader {
    /// Decode a chunk header from its 8 on-disk bytes.
    pub fn parse(bytes: [u8; CHUNK_HEADER_SIZE]) -> Self {
        let mut buf = &bytes[..];
        let mut tag = [0u8; 4];
        buf.copy_to_slice(&mut tag);
        Self {
            fourcc: FourCc(tag),
            size: buf.get_u32_le(),
        }
    }

    /// Body size rounded up to the RIFF word boundary.
    pub fn padded_size(&self) -> u64 {
        padded(self.size as u64)
    }

    /// Bytes occupied on disk, header included.
    pub fn total_size(&self) -> u64 {
        CHUNK_HEADER_SIZE as u64 + self.padded_size()
    }

    /// Classify this chunk as a payload chunk.
    pub fn kind(&self) -> ChunkKind {
        ChunkKind::classify(self.fourcc)
    }
}

/// Round a chunk body size up to an even byte count.
pub(crate) fn padded(size: u64) -> u64 {
    size + (size & 1)
}
