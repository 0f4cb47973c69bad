//! SSEQ sequence files.

use crate::error::{Error, Result};
use crate::model::{EngineVersion, Sequence};
use crate::source::{ByteOrder, ByteSource, ReadBytes};

use super::sdat::FileSpan;

pub const MAGIC: &[u8; 4] = b"SSEQ";

const DATA_OFFSET_FIELD: u32 = 0x18;
const ALLOC_TRACKS: u8 = 0xFE;
const OPEN_TRACK: u8 = 0x93;
const MAX_TRACKS: usize = 16;

/// Parse an SSEQ file
///
/// Track 0 starts right after the track allocation and open-track events;
/// every open-track event adds another track at a 24-bit offset into the
/// data block.
pub fn parse(src: &ByteSource, file: FileSpan, name: String) -> Result<Sequence> {
    let data_rel = src.read_u32_le(file.offset + DATA_OFFSET_FIELD)?;
    if data_rel >= file.size {
        return Err(Error::malformed(
            file.offset,
            format!("data offset 0x{:X} past file end", data_rel),
        ));
    }
    let data = file.offset + data_rel;
    let end = file.offset + file.size;

    let mut pos = data;
    if src.read_u8(pos)? == ALLOC_TRACKS {
        pos += 3;
    }

    let mut opened = Vec::new();
    while pos < end && opened.len() < MAX_TRACKS && src.read_u8(pos)? == OPEN_TRACK {
        let rel = src.read_u24(pos + 2, ByteOrder::Little)?;
        let track = data.saturating_add(rel);
        if track >= end {
            return Err(Error::malformed(
                pos,
                format!("track offset 0x{:X} outside file", rel),
            ));
        }
        opened.push(track);
        pos += 5;
    }

    let mut tracks = Vec::with_capacity(opened.len() + 1);
    tracks.push(pos);
    tracks.extend(opened);

    Ok(Sequence {
        name,
        source_offset: file.offset,
        length: file.size,
        version: EngineVersion::NdsSdat,
        tracks,
    })
}
