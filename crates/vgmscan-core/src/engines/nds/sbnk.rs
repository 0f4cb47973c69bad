//! SBNK instrument banks and the SWAR wave archives they play from.

use tracing::debug;

use crate::build::{
    InstrumentLayout, InstrumentRecord, RegionRecord, SampleRef, SampleSpan, SetHeader,
};
use crate::detect::{SkippedEntry, TableEntry, TableWalk, WalkEnd};
use crate::error::{Error, Result};
use crate::model::{EngineVersion, Envelope};
use crate::source::{ByteSource, ReadBytes};

pub const MAGIC: &[u8; 4] = b"SBNK";
pub const SWAR_MAGIC: &[u8; 4] = b"SWAR";

/// Instrument count in SBNK, sample count in SWAR
const COUNT_FIELD: u32 = 0x38;
/// First instrument record in SBNK, first sample pointer in SWAR
const TABLE_START: u32 = 0x3C;
const RECORD_SIZE: u32 = 4;
const REGION_SIZE: u32 = 10;
/// Drumset and key split entries: `u16` type, then a region
const ENTRY_SIZE: u32 = 12;
const SWAV_HEADER: u32 = 12;

mod kind {
    pub const EMPTY: u8 = 0;
    pub const PCM: u8 = 1;
    pub const PSG: u8 = 2;
    pub const NOISE: u8 = 3;
    pub const DIRECT_PCM: u8 = 4;
    pub const DRUMSET: u8 = 16;
    pub const KEY_SPLIT: u8 = 17;
}

fn is_tone_generator(kind: u8) -> bool {
    matches!(kind, kind::PSG | kind::NOISE)
}

/// One SBNK plus the up to four SWARs its BANK record names
pub struct BankLayout {
    pub name: String,
    pub size: u32,
    /// Absolute SWAR offsets per wave archive slot
    pub wave_archives: [Option<u32>; 4],
}

impl BankLayout {
    fn region(
        &self,
        src: &ByteSource,
        at: u32,
        key_low: u8,
        key_high: u8,
    ) -> Result<RegionRecord> {
        let raw = src.bytes_at(at, REGION_SIZE)?;
        let swav = u32::from(u16::from_le_bytes([raw[0], raw[1]]));
        let swar = u32::from(u16::from_le_bytes([raw[2], raw[3]]));
        if swar as usize >= self.wave_archives.len() {
            return Err(Error::malformed(
                at,
                format!("wave archive slot {} out of range", swar),
            ));
        }
        if key_low > key_high {
            return Err(Error::malformed(
                at,
                format!("key range {}..{} is inverted", key_low, key_high),
            ));
        }
        Ok(RegionRecord {
            offset: at,
            length: REGION_SIZE,
            key_low,
            key_high,
            unity_key: raw[4],
            sample: SampleRef {
                bank: swar,
                number: swav,
            },
            envelope: Envelope::Nds {
                attack: raw[5],
                decay: raw[6],
                sustain: raw[7],
                release: raw[8],
            },
        })
    }

    /// Drumset and key split entries; tone generator entries carry no sample
    fn entry(
        &self,
        src: &ByteSource,
        record: &mut InstrumentRecord,
        at: u32,
        key_low: u8,
        key_high: u8,
    ) {
        match src.read_u8(at) {
            Ok(kind) if is_tone_generator(kind) => {}
            Ok(_) => match self.region(src, at + 2, key_low, key_high) {
                Ok(region) => record.regions.push(region),
                Err(e) => record.rejected.push((at, e)),
            },
            Err(e) => record.rejected.push((at, e)),
        }
    }
}

impl InstrumentLayout for BankLayout {
    fn version(&self) -> EngineVersion {
        EngineVersion::NdsSdat
    }

    fn parse_header(&self, src: &ByteSource, offset: u32) -> Result<SetHeader> {
        if src.bytes_at(offset, 4)? != MAGIC.as_slice() {
            return Err(Error::malformed(offset, "missing SBNK tag"));
        }
        src.bytes_at(offset, self.size)?;
        src.read_u32_le(offset + COUNT_FIELD)?;
        let sample_directory = self
            .wave_archives
            .iter()
            .flatten()
            .next()
            .map_or(0, |swar| swar + TABLE_START);
        Ok(SetHeader {
            name: self.name.clone(),
            offset,
            length: self.size,
            sample_directory,
        })
    }

    fn instrument_table(
        &self,
        src: &ByteSource,
        header: &SetHeader,
        limit: usize,
    ) -> Result<TableWalk> {
        let count = src.read_u32_le(header.offset + COUNT_FIELD)?;
        let mut entries = Vec::new();
        let mut skipped = Vec::new();

        for index in (0..count).take(limit) {
            let slot = src.seek(
                header.offset,
                u64::from(TABLE_START) + u64::from(index) * u64::from(RECORD_SIZE),
            )?;
            let kind = src.read_u8(slot)?;
            let rel = u32::from(src.read_u16_le(slot + 1)?);
            if kind == kind::EMPTY || rel == 0 {
                continue;
            }
            if is_tone_generator(kind) {
                debug!(
                    "{}: instrument {} is a tone generator, skipped",
                    header.name, index
                );
                continue;
            }
            let target = u64::from(header.offset) + u64::from(rel);
            if target >= header.end() {
                skipped.push(SkippedEntry {
                    index,
                    slot,
                    target,
                });
                continue;
            }
            entries.push(TableEntry {
                index,
                slot,
                target: target as u32,
            });
        }

        Ok(TableWalk {
            entries,
            skipped,
            end: WalkEnd::TableEnd,
        })
    }

    fn parse_regions(
        &self,
        src: &ByteSource,
        _header: &SetHeader,
        entry: &TableEntry,
    ) -> Result<InstrumentRecord> {
        let kind = src.read_u8(entry.slot)?;
        let at = entry.target;
        let mut record = InstrumentRecord::default();

        match kind {
            kind::PCM | kind::DIRECT_PCM => {
                record.length = REGION_SIZE;
                record.regions.push(self.region(src, at, 0, 0x7F)?);
            }
            kind::DRUMSET => {
                let low = src.read_u8(at)?;
                let high = src.read_u8(at + 1)?;
                if low > high {
                    return Err(Error::malformed(
                        at,
                        format!("drumset range {}..{} is inverted", low, high),
                    ));
                }
                let count = u32::from(high - low) + 1;
                record.length = 2 + count * ENTRY_SIZE;
                for (i, key) in (low..=high).enumerate() {
                    let entry_at = at + 2 + i as u32 * ENTRY_SIZE;
                    self.entry(src, &mut record, entry_at, key, key);
                }
            }
            kind::KEY_SPLIT => {
                let splits = src.bytes_at(at, 8)?;
                let used = splits.iter().take_while(|&&key| key != 0).count();
                if used == 0 {
                    return Err(Error::malformed(at, "key split without keys"));
                }
                record.length = 8 + used as u32 * ENTRY_SIZE;
                let mut key_low = 0u8;
                for (i, &key_high) in splits[..used].iter().enumerate() {
                    let entry_at = at + 8 + i as u32 * ENTRY_SIZE;
                    self.entry(src, &mut record, entry_at, key_low, key_high);
                    key_low = key_high.saturating_add(1);
                }
            }
            other => {
                return Err(Error::malformed(
                    entry.slot,
                    format!("unknown instrument type {}", other),
                ));
            }
        }
        Ok(record)
    }

    fn sample_directory(
        &self,
        _src: &ByteSource,
        header: &SetHeader,
        sample: &SampleRef,
    ) -> Result<u32> {
        self.wave_archives
            .get(sample.bank as usize)
            .copied()
            .flatten()
            .map(|swar| swar + TABLE_START)
            .ok_or_else(|| {
                Error::unresolved(
                    header.sample_directory,
                    sample.number,
                    format!("wave archive slot {} not loaded", sample.bank),
                )
            })
    }

    fn resolve_sample(&self, src: &ByteSource, directory: u32, number: u32) -> Result<SampleSpan> {
        let unresolved = |reason: String| Error::unresolved(directory, number, reason);
        let swar = directory
            .checked_sub(TABLE_START)
            .ok_or_else(|| unresolved("directory below archive header".into()))?;

        let count = src
            .read_u32_le(swar + COUNT_FIELD)
            .map_err(|e| unresolved(e.to_string()))?;
        if number >= count {
            return Err(unresolved(format!("archive holds {} samples", count)));
        }
        let rel = src
            .seek(directory, u64::from(number) * 4)
            .and_then(|slot| src.read_u32_le(slot))
            .map_err(|e| unresolved(e.to_string()))?;
        let offset = src
            .seek(swar, u64::from(rel))
            .map_err(|e| unresolved(e.to_string()))?;

        let loop_words = src
            .read_u16_le(offset + 6)
            .map_err(|e| unresolved(e.to_string()))?;
        let data_words = src
            .read_u32_le(offset + 8)
            .map_err(|e| unresolved(e.to_string()))?;
        let length = u64::from(SWAV_HEADER) + 4 * (u64::from(loop_words) + u64::from(data_words));
        if u64::from(offset) + length > u64::from(src.len()) {
            return Err(unresolved(format!("sample of {} bytes runs past source end", length)));
        }

        Ok(SampleSpan {
            offset,
            length: length as u32,
        })
    }
}
