//! Hudson Soft's SNES driver.
//!
//! The song table address comes from the `aram/song_table` hint. Each song
//! header is a short event list naming its tracks and, depending on the
//! driver revision, an inline or pointed-to instrument table.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::build::{
    InstrumentLayout, InstrumentRecord, RegionRecord, SampleRef, SampleSpan, SetHeader,
    build_instrument_set,
};
use crate::detect::{OutOfRangePolicy, TableEntry, TableSpec, TableWalk};
use crate::error::{Error, Result};
use crate::model::{EngineVersion, Envelope, Sequence};
use crate::scanner::{Discovery, ScanContext, Scanner};
use crate::source::{ByteSource, ReadBytes};

use super::snes;

const HINT_GROUP: &str = "aram";
const HINT_SONG_TABLE: &str = "song_table";
const HINT_SPC_DIR: &str = "spc_dir";
const HINT_VERSION: &str = "version";

const INSTRUMENT_SIZE: u32 = 4;
const DEFAULT_UNITY_KEY: u8 = 60;

mod op {
    pub const END: u8 = 0x00;
    pub const TRACKS: u8 = 0x01;
    pub const INSTRUMENTS_INLINE: u8 = 0x02;
    pub const PERCUSSION_INLINE: u8 = 0x03;
    pub const TEMPO: u8 = 0x04;
    pub const INSTRUMENTS_POINTER: u8 = 0x05;
    pub const PERCUSSION_POINTER: u8 = 0x06;
}

#[derive(Debug, Default)]
pub struct HudsonSnesScanner;

impl Scanner for HudsonSnesScanner {
    fn name(&self) -> &'static str {
        "hudson_snes"
    }

    fn discovery(&self) -> Discovery {
        Discovery::Hint
    }

    fn description(&self) -> &'static str {
        "Hudson SNES driver (hint aram/song_table, DIR pattern fallback)"
    }

    fn scan(&self, ctx: &mut ScanContext<'_>) -> Result<()> {
        let src = ctx.source();
        snes::require_aram(src)?;

        let song_table = ctx.require_hint(HINT_GROUP, HINT_SONG_TABLE)?;
        let directory = match ctx.hint(HINT_GROUP, HINT_SPC_DIR) {
            Some(directory) => directory,
            None => snes::find_sample_directory(ctx)?,
        };
        let version = match ctx.hint(HINT_GROUP, HINT_VERSION) {
            Some(1) => EngineVersion::HudsonSnesV1,
            Some(2) => EngineVersion::HudsonSnesV2,
            Some(other) => {
                return Err(Error::UnknownVersion(format!("version hint {}", other)));
            }
            None => {
                let first = u32::from(src.read_u16_le(song_table)?);
                if first == 0 {
                    return Err(Error::PatternNotFound("empty song table".into()));
                }
                probe_version(src, first)?
            }
        };
        info!(
            "{} song table 0x{:04X}, DIR 0x{:04X}",
            version, song_table, directory
        );

        let spec = TableSpec::new(
            song_table,
            version.table_stride(),
            version.pointer_width(),
            version.byte_order(),
        );
        let mut built = HashSet::new();

        ctx.walk_entries(&spec, OutOfRangePolicy::Stop, |ctx, entry| {
            let header = parse_song_header(ctx.source(), entry.target, version)?;
            ctx.add_sequence(Sequence {
                name: format!("song_{:02}", entry.index),
                source_offset: header.offset,
                length: header.length,
                version,
                tracks: header.tracks,
            });

            if let Some(table) = header.instruments
                && table.count() > 0
                && built.insert(table.offset)
            {
                let layout = HudsonLayout {
                    version,
                    directory,
                    count: table.count(),
                };
                build_instrument_set(ctx, &layout, table.offset)?;
            }
            Ok(())
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TableRef {
    offset: u32,
    /// Size in bytes
    size: u32,
}

impl TableRef {
    fn count(&self) -> u32 {
        self.size / INSTRUMENT_SIZE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    End,
    Tracks(Vec<u32>),
    InlineInstruments(TableRef),
    PointerInstruments(TableRef),
    InlinePercussion(TableRef),
    PointerPercussion(TableRef),
    Tempo,
}

/// Decode the header event at `pos`, returning it and the next position
fn read_event(src: &ByteSource, pos: u32) -> Result<(Event, u32)> {
    let opcode = src.read_u8(pos)?;
    let at = pos + 1;
    let event = match opcode {
        op::END => (Event::End, at),
        op::TRACKS => {
            let mask = src.read_u8(at)?;
            let mut tracks = Vec::new();
            let mut next = at + 1;
            for bit in 0..8 {
                if mask & (1 << bit) != 0 {
                    tracks.push(u32::from(src.read_u16_le(next)?));
                    next += 2;
                }
            }
            (Event::Tracks(tracks), next)
        }
        op::INSTRUMENTS_INLINE | op::PERCUSSION_INLINE => {
            let size = u32::from(src.read_u8(at)?);
            src.bytes_at(at + 1, size)?;
            let table = TableRef {
                offset: at + 1,
                size,
            };
            let event = if opcode == op::INSTRUMENTS_INLINE {
                Event::InlineInstruments(table)
            } else {
                Event::InlinePercussion(table)
            };
            (event, at + 1 + size)
        }
        op::INSTRUMENTS_POINTER | op::PERCUSSION_POINTER => {
            let table = TableRef {
                offset: u32::from(src.read_u16_le(at)?),
                size: u32::from(src.read_u8(at + 2)?),
            };
            let event = if opcode == op::INSTRUMENTS_POINTER {
                Event::PointerInstruments(table)
            } else {
                Event::PointerPercussion(table)
            };
            (event, at + 3)
        }
        op::TEMPO => {
            src.read_u8(at)?;
            (Event::Tempo, at + 1)
        }
        other => {
            return Err(Error::malformed(
                pos,
                format!("unknown header event 0x{:02X}", other),
            ));
        }
    };
    Ok(event)
}

/// Revision from the first instrument event of a song header
fn probe_version(src: &ByteSource, offset: u32) -> Result<EngineVersion> {
    let mut pos = offset;
    loop {
        let (event, next) = read_event(src, pos)
            .map_err(|e| Error::UnknownVersion(format!("song header 0x{:04X}: {}", offset, e)))?;
        match event {
            Event::InlineInstruments(_) => return Ok(EngineVersion::HudsonSnesV1),
            Event::PointerInstruments(_) => return Ok(EngineVersion::HudsonSnesV2),
            Event::End => {
                return Err(Error::UnknownVersion(format!(
                    "song header 0x{:04X} has no instrument event",
                    offset
                )));
            }
            _ => pos = next,
        }
    }
}

#[derive(Debug)]
struct SongHeader {
    offset: u32,
    length: u32,
    tracks: Vec<u32>,
    instruments: Option<TableRef>,
}

fn parse_song_header(src: &ByteSource, offset: u32, version: EngineVersion) -> Result<SongHeader> {
    let v1 = version == EngineVersion::HudsonSnesV1;
    let mut header = SongHeader {
        offset,
        length: 0,
        tracks: Vec::new(),
        instruments: None,
    };

    let mut pos = offset;
    loop {
        let (event, next) = read_event(src, pos)?;
        match event {
            Event::End => {
                header.length = next - offset;
                break;
            }
            Event::Tracks(tracks) => header.tracks.extend(tracks),
            Event::InlineInstruments(table) if v1 => header.instruments = Some(table),
            Event::PointerInstruments(table) if !v1 => header.instruments = Some(table),
            Event::InlinePercussion(_) if v1 => {}
            Event::PointerPercussion(_) if !v1 => {}
            Event::Tempo => {}
            _ => {
                return Err(Error::malformed(
                    pos,
                    format!("event not valid for {}", version),
                ));
            }
        }
        pos = next;
    }

    if header.tracks.is_empty() {
        return Err(Error::malformed(offset, "song has no tracks"));
    }
    debug!(
        "Song header 0x{:04X}: {} tracks, instruments {:?}",
        offset,
        header.tracks.len(),
        header.instruments
    );
    Ok(header)
}

/// Instrument tables: 4-byte records `srcn, adsr1, adsr2, gain`
struct HudsonLayout {
    version: EngineVersion,
    directory: u32,
    count: u32,
}

impl InstrumentLayout for HudsonLayout {
    fn version(&self) -> EngineVersion {
        self.version
    }

    fn parse_header(&self, src: &ByteSource, offset: u32) -> Result<SetHeader> {
        let length = self.count * INSTRUMENT_SIZE;
        src.bytes_at(offset, length)?;
        Ok(SetHeader {
            name: format!("instr_{:04X}", offset),
            offset,
            length,
            sample_directory: self.directory,
        })
    }

    fn instrument_table(
        &self,
        _src: &ByteSource,
        header: &SetHeader,
        limit: usize,
    ) -> Result<TableWalk> {
        let entries = (0..self.count)
            .take(limit)
            .map(|index| {
                let at = header.offset + index * INSTRUMENT_SIZE;
                TableEntry {
                    index,
                    slot: at,
                    target: at,
                }
            })
            .collect();
        Ok(TableWalk::from_entries(entries))
    }

    fn parse_regions(
        &self,
        src: &ByteSource,
        _header: &SetHeader,
        entry: &TableEntry,
    ) -> Result<InstrumentRecord> {
        let at = entry.target;
        let record = src.bytes_at(at, INSTRUMENT_SIZE)?;
        Ok(InstrumentRecord {
            length: INSTRUMENT_SIZE,
            regions: vec![RegionRecord {
                offset: at,
                length: INSTRUMENT_SIZE,
                key_low: 0,
                key_high: 0x7F,
                unity_key: DEFAULT_UNITY_KEY,
                sample: SampleRef {
                    bank: 0,
                    number: u32::from(record[0]),
                },
                envelope: Envelope::Snes {
                    adsr1: record[1],
                    adsr2: record[2],
                    gain: record[3],
                },
            }],
            rejected: Vec::new(),
        })
    }

    fn resolve_sample(&self, src: &ByteSource, directory: u32, number: u32) -> Result<SampleSpan> {
        snes::resolve_dir_entry(src, directory, number)
    }
}
