//! Compile's SNES driver, found in 64 KiB ARAM captures.
//!
//! The song list address is an immediate operand of the driver's song
//! setup routine.

use tracing::debug;

use crate::detect::{BytePattern, OutOfRangePolicy, TableSpec};
use crate::error::{Error, Result};
use crate::model::{EngineVersion, Sequence};
use crate::scanner::{Discovery, ScanContext, Scanner};
use crate::source::{ByteSource, ReadBytes};

use super::snes;

/// `mov y,#$06 ; mul ya ; ... mov a,song_list+x`
const SET_SONG_LIST: &str = "8D 06 CF 5D F5 ?? ?? FD F5 ?? ?? FC F5 ?? ?? 5D";
const SONG_LIST_OPERAND: u32 = 5;
/// The driver indexes the song list with an 8-bit register
const MAX_SONGS: u32 = 43;
const MAX_TRACKS: u8 = 8;
const TRACK_HEADER_SIZE: u32 = 14;

#[derive(Debug, Default)]
pub struct CompileSnesScanner;

impl Scanner for CompileSnesScanner {
    fn name(&self) -> &'static str {
        "compile_snes"
    }

    fn discovery(&self) -> Discovery {
        Discovery::Pattern
    }

    fn description(&self) -> &'static str {
        "Compile SNES driver (ARAM song list pattern)"
    }

    fn scan(&self, ctx: &mut ScanContext<'_>) -> Result<()> {
        let src = ctx.source();
        snes::require_aram(src)?;

        let pattern = BytePattern::parse(SET_SONG_LIST)?;
        let at = ctx.find_pattern(&pattern)?;
        let song_list = u32::from(src.read_u16_le(at + SONG_LIST_OPERAND)?);
        debug!("Compile SNES song list at 0x{:04X}", song_list);

        let version = EngineVersion::CompileSnes;
        let spec = TableSpec::new(
            song_list,
            version.table_stride(),
            version.pointer_width(),
            version.byte_order(),
        )
        .count(MAX_SONGS);

        ctx.walk_entries(&spec, OutOfRangePolicy::Stop, |ctx, entry| {
            let sequence = parse_song(ctx.source(), entry.index, entry.target)?;
            ctx.add_sequence(sequence);
            Ok(())
        });
        Ok(())
    }
}

fn parse_song(src: &ByteSource, index: u32, offset: u32) -> Result<Sequence> {
    let count = src.read_u8(offset)?;
    if count == 0 || count > MAX_TRACKS {
        return Err(Error::malformed(
            offset,
            format!("track count {} out of range", count),
        ));
    }

    let mut tracks = Vec::with_capacity(count as usize);
    for i in 0..u32::from(count) {
        let header = offset + 1 + i * TRACK_HEADER_SIZE;
        src.bytes_at(header, TRACK_HEADER_SIZE)?;
        let start = u32::from(src.read_u16_le(header + 1)?);
        if start == 0 {
            return Err(Error::malformed(header, "null track pointer"));
        }
        tracks.push(start);
    }

    Ok(Sequence {
        name: format!("song_{:02}", index),
        source_offset: offset,
        length: 1 + u32::from(count) * TRACK_HEADER_SIZE,
        version: EngineVersion::CompileSnes,
        tracks,
    })
}
