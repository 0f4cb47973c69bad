//! `WD` instrument sets.
//!
//! Header: `id:u16` at +2, set length at +4, sample section size at +8,
//! instrument count at +0xC, sixteen reserved zero bytes, then instrument
//! offsets relative to the set. Samples live in the section that follows
//! the set.

use crate::build::{
    InstrumentLayout, InstrumentRecord, RegionRecord, SampleRef, SampleSpan, SetHeader,
    spu_adpcm_length,
};
use crate::detect::{OutOfRangePolicy, TableEntry, TableSpec, TableWalk, walk_table};
use crate::error::{Error, Result};
use crate::model::{EngineVersion, Envelope};
use crate::source::{ByteOrder, ByteSource, ReadBytes, Width};

pub const MAGIC: &[u8; 2] = b"WD";

const POINTER_TABLE: u32 = 0x20;
const MAX_INSTRUMENTS: u32 = 0x200;
const REGION_SIZE: u32 = 0x20;
const LAST_REGION: u8 = 0x01;
const SAMPLE_ALIGN: u32 = 0xF;

/// Cheap structural check used to filter tag matches
pub fn looks_valid(src: &ByteSource, offset: u32) -> bool {
    let Ok(count) = src.read_u32_le(offset + 0xC) else {
        return false;
    };
    let Ok(reserved) = src.bytes_at(offset + 0x10, 0x10) else {
        return false;
    };
    count > 0 && count <= MAX_INSTRUMENTS && reserved.iter().all(|&b| b == 0)
}

#[derive(Debug, Default)]
pub struct WdLayout;

impl InstrumentLayout for WdLayout {
    fn version(&self) -> EngineVersion {
        EngineVersion::SquareWd
    }

    fn parse_header(&self, src: &ByteSource, offset: u32) -> Result<SetHeader> {
        if !looks_valid(src, offset) {
            return Err(Error::malformed(offset, "not a WD header"));
        }
        let id = src.read_u16_le(offset + 2)?;
        let length = src.read_u32_le(offset + 4)?;
        let section_size = src.read_u32_le(offset + 8)?;
        let count = src.read_u32_le(offset + 0xC)?;
        if section_size == 0 {
            return Err(Error::malformed(offset, "empty sample section"));
        }
        if u64::from(length) < u64::from(POINTER_TABLE) + u64::from(count) * 4 {
            return Err(Error::malformed(
                offset,
                format!("set length 0x{:X} cannot hold {} instruments", length, count),
            ));
        }
        src.bytes_at(offset, length)?;
        // Sample section immediately follows the set
        let sample_directory = src.seek(offset, u64::from(length))?;

        Ok(SetHeader {
            name: format!("WD {:04}", id),
            offset,
            length,
            sample_directory,
        })
    }

    fn instrument_table(
        &self,
        src: &ByteSource,
        header: &SetHeader,
        limit: usize,
    ) -> Result<TableWalk> {
        let count = src.read_u32_le(header.offset + 0xC)?;
        let spec = TableSpec::new(header.offset + POINTER_TABLE, 4, Width::U32, ByteOrder::Little)
            .relative_to(header.offset)
            .count(count);
        Ok(walk_table(src, &spec, OutOfRangePolicy::Skip, limit))
    }

    fn parse_regions(
        &self,
        src: &ByteSource,
        header: &SetHeader,
        entry: &TableEntry,
    ) -> Result<InstrumentRecord> {
        let section_size = src.read_u32_le(header.offset + 8)?;
        let mut record = InstrumentRecord::default();
        let mut at = entry.target;
        let mut key_low = 0u8;

        while u64::from(at) + u64::from(REGION_SIZE) <= header.end() {
            let raw = src.bytes_at(at, REGION_SIZE)?;
            let flags = raw[0];
            let sample = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]) & !SAMPLE_ALIGN;
            let adsr1 = u16::from_le_bytes([raw[0xC], raw[0xD]]);
            let adsr2 = u16::from_le_bytes([raw[0xE], raw[0xF]]);
            let unity_key = raw[0x11];
            let key_high = raw[0x12];

            if key_high < key_low {
                record.rejected.push((
                    at,
                    Error::malformed(
                        at,
                        format!("key high {} below key low {}", key_high, key_low),
                    ),
                ));
            } else if sample >= section_size {
                record.rejected.push((
                    at,
                    Error::unresolved(
                        header.sample_directory,
                        sample,
                        format!("past the 0x{:X} byte sample section", section_size),
                    ),
                ));
            } else {
                record.regions.push(RegionRecord {
                    offset: at,
                    length: REGION_SIZE,
                    key_low,
                    key_high,
                    unity_key,
                    sample: SampleRef {
                        bank: 0,
                        number: sample,
                    },
                    envelope: Envelope::Spu { adsr1, adsr2 },
                });
            }

            key_low = key_high.saturating_add(1);
            at += REGION_SIZE;
            if flags & LAST_REGION != 0 {
                break;
            }
        }

        if record.regions.is_empty() && record.rejected.is_empty() {
            return Err(Error::malformed(entry.target, "instrument has no regions"));
        }
        record.length = at - entry.target;
        Ok(record)
    }

    /// Sample numbers are byte offsets into the sample section, already
    /// checked against its size in `parse_regions`
    fn resolve_sample(&self, src: &ByteSource, directory: u32, number: u32) -> Result<SampleSpan> {
        let offset = src
            .seek(directory, u64::from(number))
            .map_err(|e| Error::unresolved(directory, number, e.to_string()))?;
        let length = spu_adpcm_length(src, offset)
            .ok_or_else(|| Error::unresolved(directory, number, "ADPCM data has no end block"))?;
        Ok(SampleSpan { offset, length })
    }
}
