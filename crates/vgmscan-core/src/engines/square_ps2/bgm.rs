//! `BGM ` sequence files.

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{EngineVersion, Sequence};
use crate::source::{ByteSource, ReadBytes};

pub const MAGIC: &[u8; 4] = b"BGM ";

const HEADER_SIZE: u32 = 0x20;
const MAX_TRACKS: u8 = 32;

/// Cheap structural check used to filter tag matches
pub fn looks_valid(src: &ByteSource, offset: u32) -> bool {
    [0x14, 0x18, 0x1C]
        .iter()
        .all(|&field| src.read_u32_le(offset + field).is_ok_and(|word| word == 0))
}

pub fn parse(src: &ByteSource, offset: u32) -> Result<Sequence> {
    if !looks_valid(src, offset) {
        return Err(Error::malformed(offset, "reserved header words are not zero"));
    }
    let id = src.read_u16_le(offset + 4)?;
    let wd = src.read_u16_le(offset + 6)?;
    let count = src.read_u8(offset + 8)?;
    let ppqn = src.read_u16_le(offset + 0xA)?;
    let length = src.read_u32_le(offset + 0xC)?;

    if count == 0 || count > MAX_TRACKS {
        return Err(Error::malformed(
            offset,
            format!("track count {} out of range", count),
        ));
    }
    if length < HEADER_SIZE {
        return Err(Error::malformed(
            offset,
            format!("sequence length 0x{:X} shorter than header", length),
        ));
    }
    src.bytes_at(offset, length)?;

    let end = u64::from(offset) + u64::from(length);
    let mut tracks = Vec::with_capacity(count as usize);
    let mut pos = u64::from(offset + HEADER_SIZE);
    for _ in 0..count {
        if pos + 4 > end {
            return Err(Error::malformed(
                offset,
                format!("track {} starts past sequence end", tracks.len()),
            ));
        }
        let track_len = src.read_u32_le(pos as u32)?;
        let data = pos + 4;
        if data + u64::from(track_len) > end {
            return Err(Error::malformed(
                pos as u32,
                format!("track of 0x{:X} bytes overruns sequence", track_len),
            ));
        }
        tracks.push(data as u32);
        pos = data + u64::from(track_len);
    }

    debug!(
        "BGM {:04} at 0x{:X}: wd {:04}, ppqn {}, {} tracks",
        id,
        offset,
        wd,
        ppqn,
        count
    );
    Ok(Sequence {
        name: format!("BGM {:04}", id),
        source_offset: offset,
        length,
        version: EngineVersion::SquareBgm,
        tracks,
    })
}
