//! Header region parser.
//!
//! Walks the top-level RIFF chunks of a file prefix, descends into `hdrl`,
//! and stops at the `movi` list header.

use super::chunks::padded;
use super::{AudioFormat, AudioStream, AviHeader, FourCc, PixelFormat, VideoStream};
use crate::{Error, Result};
use bytes::Buf;

/// `RIFF <size> AVI `.
const RIFF_HEADER_SIZE: usize = 12;

/// Chunk header plus the list type that follows it.
const LIST_HEADER_SIZE: usize = 12;

/// Fields of MainAVIHeader up to and including dwHeight.
const AVIH_MIN_SIZE: usize = 40;

/// Fields of AVISTREAMHEADER up to and including dwLength.
const STRH_MIN_SIZE: usize = 36;

/// BITMAPINFOHEADER up to and including biCompression.
const BITMAPINFO_MIN_SIZE: usize = 20;

/// WAVEFORMAT plus wBitsPerSample.
const WAVEFORMAT_MIN_SIZE: usize = 16;

/// One child chunk inside a parent body.
struct RawChunk<'a> {
    fourcc: FourCc,
    body: &'a [u8],
}

impl RawChunk<'_> {
    /// List type and list body when this chunk is a `LIST`.
    fn as_list(&self) -> Option<(FourCc, &[u8])> {
        if self.fourcc != FourCc::LIST || self.body.len() < 4 {
            return None;
        }
        Some((fourcc_at(self.body, 0), &self.body[4..]))
    }
}

/// Iterate the chunks of a fully-present parent body.
fn children(data: &[u8]) -> impl Iterator<Item = Result<RawChunk<'_>>> {
    let mut pos = 0usize;
    std::iter::from_fn(move || {
        if pos + 8 > data.len() {
            return None;
        }
        let fourcc = fourcc_at(data, pos);
        let size = u32_at(data, pos + 4) as usize;
        let start = pos + 8;
        let end = match start.checked_add(size) {
            Some(end) if end <= data.len() => end,
            _ => {
                pos = data.len();
                return Some(Err(Error::invalid_avi(format!(
                    "chunk {} of {} bytes overruns its parent",
                    fourcc, size
                ))));
            }
        };
        pos = start.saturating_add(padded(size as u64) as usize);
        Some(Ok(RawChunk {
            fourcc,
            body: &data[start..end],
        }))
    })
}

fn fourcc_at(data: &[u8], pos: usize) -> FourCc {
    FourCc([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

fn u32_at(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

fn require(chunk: &'static str, body: &[u8], need: usize) -> Result<()> {
    if body.len() < need {
        return Err(Error::Truncated {
            chunk,
            need,
            have: body.len(),
        });
    }
    Ok(())
}

/// Values collected from `avih`.
#[derive(Default)]
struct MainHeader {
    micro_sec_per_frame: u32,
    total_frames: u32,
    width: u32,
    height: u32,
}

/// Values collected from one `strl`.
enum StreamEntry {
    Video(VideoStream),
    Audio(AudioStream),
    Other(FourCc),
}

/// Parse the header region. See [`AviHeader::parse`].
pub(super) fn parse(data: &[u8]) -> Result<AviHeader> {
    if data.len() < RIFF_HEADER_SIZE {
        return Err(Error::HeaderExceedsPrefix {
            need: RIFF_HEADER_SIZE,
            have: data.len(),
        });
    }
    if fourcc_at(data, 0) != FourCc::RIFF {
        return Err(Error::invalid_avi(format!(
            "expected RIFF signature, found {}",
            fourcc_at(data, 0)
        )));
    }
    if fourcc_at(data, 8) != FourCc::AVI {
        return Err(Error::invalid_avi(format!(
            "expected AVI form type, found {}",
            fourcc_at(data, 8)
        )));
    }

    let mut pos = RIFF_HEADER_SIZE;
    let mut hdrl: Option<(MainHeader, Option<VideoStream>, Option<AudioStream>)> = None;

    let (movi_start, movi_size) = loop {
        if pos.saturating_add(LIST_HEADER_SIZE) > data.len() {
            return Err(Error::HeaderExceedsPrefix {
                need: pos.saturating_add(LIST_HEADER_SIZE),
                have: data.len(),
            });
        }

        let fourcc = fourcc_at(data, pos);
        let size = u32_at(data, pos + 4) as usize;

        if fourcc == FourCc::LIST {
            let list_type = fourcc_at(data, pos + 8);
            if list_type == FourCc::MOVI {
                if size < 4 {
                    return Err(Error::invalid_avi("movi list shorter than its type tag"));
                }
                break ((pos + LIST_HEADER_SIZE) as u64, (size - 4) as u64);
            }

            let end = pos.saturating_add(8).saturating_add(size);
            if list_type == FourCc::HDRL {
                if end > data.len() {
                    return Err(Error::HeaderExceedsPrefix {
                        need: end,
                        have: data.len(),
                    });
                }
                if size < 4 {
                    return Err(Error::invalid_avi("hdrl list shorter than its type tag"));
                }
                hdrl = Some(parse_hdrl(&data[pos + LIST_HEADER_SIZE..end])?);
            } else {
                tracing::debug!(list = %list_type, size, "skipping top-level list");
            }
        } else {
            tracing::debug!(chunk = %fourcc, size, "skipping top-level chunk");
        }

        pos = pos
            .saturating_add(8)
            .saturating_add(padded(size as u64) as usize);
    };

    let (main, video, audio) = hdrl.ok_or(Error::MissingChunk("hdrl"))?;
    let mut video = video.ok_or(Error::MissingChunk("strh (vids)"))?;

    if video.rate == 0 || video.scale == 0 {
        if main.micro_sec_per_frame == 0 {
            return Err(Error::invalid_avi("video stream declares no frame rate"));
        }
        video.rate = 1_000_000;
        video.scale = main.micro_sec_per_frame;
    }
    if video.width == 0 && video.height == 0 {
        video.width = main.width;
        video.height = main.height;
    }

    Ok(AviHeader {
        video,
        audio,
        movi_start,
        movi_size,
        micro_sec_per_frame: main.micro_sec_per_frame,
        total_frames: main.total_frames,
    })
}

fn parse_hdrl(body: &[u8]) -> Result<(MainHeader, Option<VideoStream>, Option<AudioStream>)> {
    let mut main = None;
    let mut video = None;
    let mut audio = None;

    for chunk in children(body) {
        let chunk = chunk?;
        if chunk.fourcc == FourCc::AVIH {
            main = Some(parse_avih(chunk.body)?);
            continue;
        }
        match chunk.as_list() {
            Some((FourCc::STRL, strl)) => match parse_strl(strl)? {
                StreamEntry::Video(v) if video.is_none() => video = Some(v),
                StreamEntry::Audio(a) if audio.is_none() => audio = Some(a),
                StreamEntry::Video(_) | StreamEntry::Audio(_) => {
                    tracing::debug!("ignoring additional stream of an already-seen type");
                }
                StreamEntry::Other(kind) => {
                    tracing::debug!(stream_type = %kind, "ignoring unsupported stream");
                }
            },
            _ => tracing::debug!(chunk = %chunk.fourcc, "skipping hdrl child"),
        }
    }

    let main = main.ok_or(Error::MissingChunk("avih"))?;
    Ok((main, video, audio))
}

fn parse_avih(body: &[u8]) -> Result<MainHeader> {
    require("avih", body, AVIH_MIN_SIZE)?;
    let mut buf = body;
    let micro_sec_per_frame = buf.get_u32_le();
    buf.advance(12); // max bytes/sec, padding granularity, flags
    let total_frames = buf.get_u32_le();
    buf.advance(12); // initial frames, streams, suggested buffer size
    let width = buf.get_u32_le();
    let height = buf.get_u32_le();
    Ok(MainHeader {
        micro_sec_per_frame,
        total_frames,
        width,
        height,
    })
}

fn parse_strl(body: &[u8]) -> Result<StreamEntry> {
    let mut strh = None;
    let mut strf = None;
    for chunk in children(body) {
        let chunk = chunk?;
        match chunk.fourcc {
            FourCc::STRH if strh.is_none() => strh = Some(chunk.body),
            FourCc::STRF if strf.is_none() => strf = Some(chunk.body),
            _ => {}
        }
    }

    let strh = strh.ok_or(Error::MissingChunk("strh"))?;
    require("strh", strh, STRH_MIN_SIZE)?;
    let mut buf = strh;
    let mut stream_type = [0u8; 4];
    buf.copy_to_slice(&mut stream_type);
    let stream_type = FourCc(stream_type);
    buf.advance(16); // handler, flags, priority, language, initial frames
    let scale = buf.get_u32_le();
    let rate = buf.get_u32_le();
    buf.advance(4); // start
    let length = buf.get_u32_le();

    match stream_type {
        FourCc::VIDS => {
            let strf = strf.ok_or(Error::MissingChunk("strf"))?;
            require("strf (vids)", strf, BITMAPINFO_MIN_SIZE)?;
            let mut buf = strf;
            buf.advance(4); // biSize
            let width = buf.get_i32_le().unsigned_abs();
            let height = buf.get_i32_le().unsigned_abs();
            buf.advance(4); // planes, bit count
            let mut compression = [0u8; 4];
            buf.copy_to_slice(&mut compression);
            let compression = FourCc(compression);
            Ok(StreamEntry::Video(VideoStream {
                width,
                height,
                pixel_format: PixelFormat::from_compression(compression),
                compression,
                rate,
                scale,
                frame_count: length,
            }))
        }
        FourCc::AUDS => {
            let strf = strf.ok_or(Error::MissingChunk("strf"))?;
            require("strf (auds)", strf, WAVEFORMAT_MIN_SIZE)?;
            let mut buf = strf;
            let format = AudioFormat::from_tag(buf.get_u16_le());
            let channels = buf.get_u16_le();
            let sample_rate = buf.get_u32_le();
            buf.advance(4); // avg bytes/sec
            let block_align = buf.get_u16_le();
            let bits_per_sample = buf.get_u16_le();
            Ok(StreamEntry::Audio(AudioStream {
                format,
                sample_rate,
                bits_per_sample,
                channels,
                block_align,
            }))
        }
        other => Ok(StreamEntry::Other(other)),
    }
}
