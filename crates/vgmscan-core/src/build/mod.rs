//! Instrument set construction shared by every engine.
//!
//! Engines describe their on-disk layout through [`InstrumentLayout`];
//! [`build_instrument_set`] walks it, validates every piece and only then
//! commits the set to the graph.

mod adpcm;

pub use adpcm::{brr_length, spu_adpcm_length};

use std::collections::HashMap;

use tracing::{debug, info};

use crate::detect::{TableEntry, TableWalk};
use crate::error::{Error, Result};
use crate::model::{
    EngineVersion, Envelope, Instrument, InstrumentSet, InstrumentSetId, Region,
    SampleCollection, SampleKey, SampleRequest,
};
use crate::scanner::ScanContext;
use crate::source::{ByteSource, ReadBytes};

/// Parsed instrument set header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetHeader {
    pub name: String,
    pub offset: u32,
    pub length: u32,
    /// Default directory for samples referenced by this set
    pub sample_directory: u32,
}

impl SetHeader {
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.length)
    }

    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.offset && u64::from(offset) < self.end()
    }
}

/// Engine-level reference to a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRef {
    /// Engine-specific directory selector; zero means the set's default directory
    pub bank: u32,
    pub number: u32,
}

/// Location of a sample's data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSpan {
    pub offset: u32,
    pub length: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRecord {
    pub offset: u32,
    pub length: u32,
    pub key_low: u8,
    pub key_high: u8,
    pub unity_key: u8,
    pub sample: SampleRef,
    pub envelope: Envelope,
}

/// One instrument as read from the source
#[derive(Debug, Default)]
pub struct InstrumentRecord {
    pub length: u32,
    pub regions: Vec<RegionRecord>,
    /// Regions that failed to parse, with the offset of each
    pub rejected: Vec<(u32, Error)>,
}

/// Per-engine description of how instrument sets are laid out
pub trait InstrumentLayout {
    fn version(&self) -> EngineVersion;

    fn parse_header(&self, src: &ByteSource, offset: u32) -> Result<SetHeader>;

    /// Instrument offsets in table order; out-of-range entries go in `skipped`
    fn instrument_table(
        &self,
        src: &ByteSource,
        header: &SetHeader,
        limit: usize,
    ) -> Result<TableWalk>;

    fn parse_regions(
        &self,
        src: &ByteSource,
        header: &SetHeader,
        entry: &TableEntry,
    ) -> Result<InstrumentRecord>;

    /// Directory a sample reference resolves against
    fn sample_directory(
        &self,
        _src: &ByteSource,
        header: &SetHeader,
        _sample: &SampleRef,
    ) -> Result<u32> {
        Ok(header.sample_directory)
    }

    fn resolve_sample(&self, src: &ByteSource, directory: u32, number: u32) -> Result<SampleSpan>;
}

struct StagedRegion {
    record: RegionRecord,
    key: SampleKey,
    /// Resolved here when the ledger had no entry yet
    span: Option<SampleSpan>,
}

struct StagedInstrument {
    index: u32,
    offset: u32,
    length: u32,
    regions: Vec<StagedRegion>,
}

/// Build the instrument set whose header sits at `offset`
///
/// Broken instruments and regions are dropped with a diagnostic. The set is
/// only added to the graph once at least one instrument survived; on error
/// nothing of it is visible.
pub fn build_instrument_set<L: InstrumentLayout + ?Sized>(
    ctx: &mut ScanContext<'_>,
    layout: &L,
    offset: u32,
) -> Result<InstrumentSetId> {
    let src = ctx.source();
    let header = layout.parse_header(src, offset)?;
    let walk = layout.instrument_table(src, &header, ctx.config().max_table_entries)?;

    for skipped in &walk.skipped {
        let error = Error::OutOfRange {
            offset: skipped.target,
            width: 1,
            len: src.len(),
        };
        ctx.record(skipped.slot, &error);
    }

    let mut resolved: HashMap<SampleKey, SampleSpan> = HashMap::new();
    let mut staged = Vec::new();

    for entry in &walk.entries {
        let record = match layout.parse_regions(src, &header, entry) {
            Ok(record) => record,
            Err(e) => {
                ctx.record(entry.target, &e);
                continue;
            }
        };
        for (at, e) in &record.rejected {
            ctx.record(*at, e);
        }

        let mut regions = Vec::new();
        for region in record.regions {
            match stage_region(ctx, layout, &header, region, &mut resolved) {
                Ok(staged_region) => regions.push(staged_region),
                Err((at, e)) => ctx.record(at, &e),
            }
        }

        if regions.is_empty() {
            debug!(
                "Instrument {} at 0x{:X} has no usable regions",
                entry.index, entry.target
            );
            continue;
        }
        staged.push(StagedInstrument {
            index: entry.index,
            offset: entry.target,
            length: record.length,
            regions,
        });
    }

    if staged.is_empty() {
        return Err(Error::malformed(header.offset, "no usable instruments"));
    }

    Ok(commit(ctx, layout.version(), header, &walk, staged))
}

fn stage_region<L: InstrumentLayout + ?Sized>(
    ctx: &ScanContext<'_>,
    layout: &L,
    header: &SetHeader,
    record: RegionRecord,
    resolved: &mut HashMap<SampleKey, SampleSpan>,
) -> std::result::Result<StagedRegion, (u32, Error)> {
    if !header.contains(record.offset) {
        return Err((
            record.offset,
            Error::malformed(
                record.offset,
                format!(
                    "region outside set 0x{:X}..0x{:X}",
                    header.offset,
                    header.end()
                ),
            ),
        ));
    }

    let src = ctx.source();
    let directory = layout
        .sample_directory(src, header, &record.sample)
        .map_err(|e| (record.offset, e))?;
    let key = SampleKey {
        directory,
        number: record.sample.number,
    };

    let span = if ctx.ledger.get(directory, key.number).is_some() {
        None
    } else if let Some(span) = resolved.get(&key) {
        Some(*span)
    } else {
        let span = layout
            .resolve_sample(src, directory, key.number)
            .map_err(|e| (record.offset, e))?;
        resolved.insert(key, span);
        Some(span)
    };

    Ok(StagedRegion { record, key, span })
}

fn commit(
    ctx: &mut ScanContext<'_>,
    version: EngineVersion,
    header: SetHeader,
    walk: &TableWalk,
    staged: Vec<StagedInstrument>,
) -> InstrumentSetId {
    let instrument_count = staged.len();
    let set = ctx.graph.push_instrument_set(InstrumentSet {
        name: header.name.clone(),
        source_offset: header.offset,
        length: header.length,
        version,
        sample_directory: header.sample_directory,
        instrument_pointers: walk.entries.iter().map(|e| e.target).collect(),
        used_sample_numbers: Default::default(),
        instruments: Vec::new(),
    });

    for instrument in staged {
        let id = ctx.graph.push_instrument(Instrument {
            owner: set,
            index: instrument.index,
            source_offset: instrument.offset,
            length: instrument.length,
            regions: Vec::new(),
        });

        for region in instrument.regions {
            let SampleKey { directory, number } = region.key;
            let sample = match ctx.ledger.request(directory, number) {
                SampleRequest::Built(existing) => existing,
                SampleRequest::Vacant(slot) => {
                    let span = region.span.unwrap_or(SampleSpan {
                        offset: 0,
                        length: 0,
                    });
                    let created = ctx.graph.push_sample(SampleCollection {
                        sample_number: number,
                        directory,
                        source_offset: span.offset,
                        length: span.length,
                    });
                    slot.insert(created)
                }
            };

            let record = region.record;
            ctx.graph.push_region(Region {
                owner: id,
                source_offset: record.offset,
                length: record.length,
                key_low: record.key_low,
                key_high: record.key_high,
                unity_key: record.unity_key,
                sample_number: number,
                sample_directory: directory,
                envelope: record.envelope,
                sample,
            });
        }
    }

    info!(
        "[{}] instrument set '{}' at 0x{:X}: {} instruments",
        ctx.scanner(),
        header.name,
        header.offset,
        instrument_count
    );
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use crate::detect::{OutOfRangePolicy, TableSpec, walk_table};
    use crate::model::{SampleLedger, ScanGraph};
    use crate::scanner::Diagnostic;
    use crate::source::fixture::Fixture;
    use crate::source::{ByteOrder, Width};

    /// Minimal layout:
    /// header `count:u8, pad:u8, length:u16, dir:u16`, then `count` u16 pointers;
    /// instrument `n:u8` then `n` records `key_high, srcn, adsr1, adsr2`;
    /// directory entries `start:u16, len:u16`.
    struct ToyLayout;

    impl InstrumentLayout for ToyLayout {
        fn version(&self) -> EngineVersion {
            EngineVersion::HudsonSnesV1
        }

        fn parse_header(&self, src: &ByteSource, offset: u32) -> Result<SetHeader> {
            let count = src.read_u8(offset)?;
            if count == 0 {
                return Err(Error::malformed(offset, "empty table"));
            }
            Ok(SetHeader {
                name: format!("toy_{:X}", offset),
                offset,
                length: u32::from(src.read_u16_le(offset + 2)?),
                sample_directory: u32::from(src.read_u16_le(offset + 4)?),
            })
        }

        fn instrument_table(
            &self,
            src: &ByteSource,
            header: &SetHeader,
            limit: usize,
        ) -> Result<TableWalk> {
            let count = u32::from(src.read_u8(header.offset)?);
            let spec = TableSpec::new(header.offset + 6, 2, Width::U16, ByteOrder::Little)
                .count(count);
            Ok(walk_table(src, &spec, OutOfRangePolicy::Skip, limit))
        }

        fn parse_regions(
            &self,
            src: &ByteSource,
            _header: &SetHeader,
            entry: &TableEntry,
        ) -> Result<InstrumentRecord> {
            let offset = entry.target;
            let n = u32::from(src.read_u8(offset)?);
            let mut record = InstrumentRecord {
                length: 1 + n * 4,
                ..Default::default()
            };
            for i in 0..n {
                let at = offset + 1 + i * 4;
                let key_high = src.read_u8(at)?;
                if key_high > 127 {
                    record.rejected.push((at, Error::malformed(at, "key out of range")));
                    continue;
                }
                record.regions.push(RegionRecord {
                    offset: at,
                    length: 4,
                    key_low: 0,
                    key_high,
                    unity_key: 60,
                    sample: SampleRef {
                        bank: 0,
                        number: u32::from(src.read_u8(at + 1)?),
                    },
                    envelope: Envelope::Snes {
                        adsr1: src.read_u8(at + 2)?,
                        adsr2: src.read_u8(at + 3)?,
                        gain: 0,
                    },
                });
            }
            Ok(record)
        }

        fn resolve_sample(
            &self,
            src: &ByteSource,
            directory: u32,
            number: u32,
        ) -> Result<SampleSpan> {
            let entry = directory + number * 4;
            let start = u32::from(src.read_u16_le(entry)?);
            if start == 0 {
                return Err(Error::unresolved(directory, number, "null start"));
            }
            Ok(SampleSpan {
                offset: start,
                length: u32::from(src.read_u16_le(entry + 2)?),
            })
        }
    }

    struct Harness {
        graph: ScanGraph,
        ledger: SampleLedger,
        diagnostics: Vec<Diagnostic>,
        config: ScanConfig,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                graph: ScanGraph::new(),
                ledger: SampleLedger::new(),
                diagnostics: Vec::new(),
                config: ScanConfig::default(),
            }
        }

        fn build(&mut self, src: &ByteSource, offset: u32) -> Result<InstrumentSetId> {
            let mut ctx = ScanContext::new(
                src,
                None,
                &self.config,
                "toy",
                &mut self.graph,
                &mut self.ledger,
                &mut self.diagnostics,
            );
            build_instrument_set(&mut ctx, &ToyLayout, offset)
        }
    }

    /// Set at 0x100 spanning 0x40 bytes, directory at 0x200 with samples 0..4
    fn base_image() -> Fixture {
        Fixture::new(0x400)
            .u16_le(0x200, 0x300)
            .u16_le(0x202, 0x12)
            .u16_le(0x204, 0x320)
            .u16_le(0x206, 0x09)
            .u16_le(0x208, 0x340)
            .u16_le(0x20A, 0x1B)
    }

    fn set_header(fixture: Fixture, offset: usize, pointers: &[u16]) -> Fixture {
        let mut fixture = fixture
            .u8(offset, pointers.len() as u8)
            .u16_le(offset + 2, 0x40)
            .u16_le(offset + 4, 0x200);
        for (i, &p) in pointers.iter().enumerate() {
            fixture = fixture.u16_le(offset + 6 + i * 2, p);
        }
        fixture
    }

    #[test]
    fn test_builds_full_set() {
        let src = set_header(base_image(), 0x100, &[0x110, 0x120])
            .bytes(0x110, &[1, 127, 0, 0x8F, 0xE0])
            .bytes(0x120, &[2, 40, 1, 0x8F, 0xE0, 127, 2, 0x8F, 0xE0])
            .build();
        let mut h = Harness::new();

        let set = h.build(&src, 0x100).unwrap();
        let graph = &h.graph;
        assert_eq!(graph[set].instrument_pointers, vec![0x110, 0x120]);
        assert_eq!(graph[set].instruments.len(), 2);
        assert_eq!(graph.region_count(), 3);
        assert_eq!(graph.sample_count(), 3);
        assert_eq!(
            graph[set].used_sample_numbers.iter().copied().collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        let last = graph.instruments_of(set).last().unwrap();
        assert_eq!(last.length, 9);
        assert!(h.diagnostics.is_empty());
    }

    #[test]
    fn test_bad_instrument_does_not_affect_siblings() {
        // Second pointer lands past the source end, third instrument has a broken region.
        let src = set_header(base_image(), 0x100, &[0x110, 0xFFF0, 0x120])
            .bytes(0x110, &[1, 127, 0, 0x8F, 0xE0])
            .bytes(0x120, &[2, 200, 1, 0x8F, 0xE0, 127, 2, 0x8F, 0xE0])
            .build();
        let mut h = Harness::new();

        let set = h.build(&src, 0x100).unwrap();
        assert_eq!(h.graph[set].instruments.len(), 2);
        assert_eq!(h.graph.region_count(), 2);
        assert_eq!(h.diagnostics.len(), 2);
        assert_eq!(h.diagnostics[0].offset, 0x108);
        assert_eq!(h.diagnostics[1].offset, 0x121);
    }

    #[test]
    fn test_shared_samples_are_built_once() {
        // Two sets share directory 0x200 and both use sample 1.
        let image = set_header(base_image(), 0x100, &[0x110, 0x118]);
        let src = set_header(image, 0x180, &[0x190])
            .bytes(0x110, &[1, 127, 1, 0x8F, 0xE0])
            .bytes(0x118, &[1, 127, 1, 0x8F, 0xE0])
            .bytes(0x190, &[1, 127, 1, 0x8F, 0xE0])
            .build();
        let mut h = Harness::new();

        let first = h.build(&src, 0x100).unwrap();
        let second = h.build(&src, 0x180).unwrap();

        assert_eq!(h.graph.sample_count(), 1);
        assert_eq!(h.graph.region_count(), 3);
        let (sample_id, sample) = h.graph.samples().next().unwrap();
        assert_eq!(sample.source_offset, 0x320);
        assert_eq!(sample.length, 9);
        for set in [first, second] {
            for &instrument in &h.graph[set].instruments {
                for region in h.graph.regions_of(instrument) {
                    assert_eq!(region.sample, sample_id);
                }
            }
        }
    }

    #[test]
    fn test_region_outside_set_is_dropped() {
        // Instrument at 0x150 lies past the 0x40-byte set span.
        let src = set_header(base_image(), 0x100, &[0x110, 0x150])
            .bytes(0x110, &[1, 127, 0, 0x8F, 0xE0])
            .bytes(0x150, &[1, 127, 1, 0x8F, 0xE0])
            .build();
        let mut h = Harness::new();

        let set = h.build(&src, 0x100).unwrap();
        assert_eq!(h.graph[set].instruments.len(), 1);
        assert_eq!(h.diagnostics.len(), 1);
        assert_eq!(
            h.diagnostics[0].kind,
            crate::scanner::DiagnosticKind::MalformedHeader
        );
        for (_, set) in h.graph.instrument_sets() {
            for &instrument in &set.instruments {
                for region in h.graph.regions_of(instrument) {
                    assert!(region.source_offset >= set.source_offset);
                    assert!(region.source_offset < set.source_offset + set.length);
                }
            }
        }
    }

    #[test]
    fn test_set_without_instruments_leaves_no_trace() {
        // The only instrument references a sample whose directory entry is null.
        let src = set_header(base_image(), 0x100, &[0x110])
            .bytes(0x110, &[1, 127, 5, 0x8F, 0xE0])
            .build();
        let mut h = Harness::new();

        let err = h.build(&src, 0x100).unwrap_err();
        assert!(matches!(err, Error::MalformedHeader { offset: 0x100, .. }));
        assert!(h.graph.is_empty());
        assert_eq!(h.graph.instrument_count(), 0);
        assert_eq!(h.graph.sample_count(), 0);
        assert!(h.ledger.is_empty());
        assert_eq!(
            h.diagnostics[0].kind,
            crate::scanner::DiagnosticKind::UnresolvedSample
        );
    }
}
