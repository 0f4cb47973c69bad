//! Konami System GX (68000 sound CPU, big-endian).
//!
//! The sequence table location comes from the `soundcpu/seq_table` hint.
//! Entries are 12 bytes with the sequence pointer in the first word. Sets
//! without a `shared` sample ROM group are not scanned.

use memchr::memchr;

use crate::detect::{OutOfRangePolicy, TableSpec};
use crate::error::{Error, Result};
use crate::model::{EngineVersion, Sequence};
use crate::scanner::{Discovery, ScanContext, Scanner};
use crate::source::{ByteOrder, ByteSource, ReadBytes, Width};

const HINT_GROUP: &str = "soundcpu";
const HINT_SEQ_TABLE: &str = "seq_table";
const SAMPLE_GROUP: &str = "shared";
const MAX_TRACKS: u8 = 16;
const END_OF_TRACK: u8 = 0xFF;
const MAX_TRACK_LEN: u32 = 0x10000;

#[derive(Debug, Default)]
pub struct KonamiGxScanner;

impl Scanner for KonamiGxScanner {
    fn name(&self) -> &'static str {
        "konami_gx"
    }

    fn discovery(&self) -> Discovery {
        Discovery::Hint
    }

    fn description(&self) -> &'static str {
        "Konami System GX sequences (hint soundcpu/seq_table)"
    }

    fn scan(&self, ctx: &mut ScanContext<'_>) -> Result<()> {
        ctx.require_group(SAMPLE_GROUP)?;
        let table = ctx.require_hint(HINT_GROUP, HINT_SEQ_TABLE)?;
        let version = EngineVersion::KonamiGx;
        let spec = TableSpec::new(
            table,
            version.table_stride(),
            version.pointer_width(),
            version.byte_order(),
        );

        ctx.walk_entries(&spec, OutOfRangePolicy::Stop, |ctx, entry| {
            let sequence = parse_sequence(ctx.source(), entry.target)?;
            ctx.add_sequence(sequence);
            Ok(())
        });
        Ok(())
    }
}

fn parse_sequence(src: &ByteSource, offset: u32) -> Result<Sequence> {
    let count = src.read_u8(offset)?;
    if count == 0 || count > MAX_TRACKS {
        return Err(Error::malformed(
            offset,
            format!("track count {} out of range", count),
        ));
    }

    let header_end = u64::from(offset) + 2 + u64::from(count) * 4;
    let mut end = header_end;
    let mut tracks = Vec::with_capacity(count as usize);

    for i in 0..u32::from(count) {
        let track = src.read_word(offset + 2 + i * 4, Width::U32, ByteOrder::Big)?;
        let track_end = find_track_end(src, track)?;
        if track >= offset {
            end = end.max(track_end);
        }
        tracks.push(track);
    }

    Ok(Sequence {
        name: format!("seq_{:X}", offset),
        source_offset: offset,
        length: (end - u64::from(offset)) as u32,
        version: EngineVersion::KonamiGx,
        tracks,
    })
}

/// Offset just past the end-of-track byte
fn find_track_end(src: &ByteSource, track: u32) -> Result<u64> {
    if track >= src.len() {
        return Err(Error::OutOfRange {
            offset: u64::from(track),
            width: 1,
            len: src.len(),
        });
    }
    let window = (src.len() - track).min(MAX_TRACK_LEN);
    let data = src.bytes_at(track, window)?;
    memchr(END_OF_TRACK, data)
        .map(|pos| u64::from(track) + pos as u64 + 1)
        .ok_or_else(|| Error::malformed(track, "track has no end marker"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use crate::detect::HintSet;
    use crate::scanner::{DiagnosticKind, ScanRequest, ScannerRegistry, ScannerStatus, Session};
    use crate::source::fixture::Fixture;

    /// One-track sequence at `offset` whose track follows the header
    fn sequence(fixture: Fixture, offset: usize) -> Fixture {
        fixture
            .u8(offset, 1)
            .u32_be(offset + 2, offset as u32 + 6)
            .bytes(offset + 6, &[0x90, 0x3C, 0x40, END_OF_TRACK])
    }

    fn scan(src: &ByteSource, table: u32) -> crate::scanner::ScanReport {
        let registry = ScannerRegistry::builtin();
        let session = Session::new(&registry, ScanConfig::default());
        let hints = HintSet::new("gx")
            .with("soundcpu", "seq_table", table)
            .with("shared", "rom", 0);
        session.scan(src, &ScanRequest::engine("konami_gx").with_hints(&hints))
    }

    #[test]
    fn test_table_walk_stops_at_zero_entry() {
        let fixture = Fixture::new(0x400)
            .u32_be(0x100, 0x200)
            .u32_be(0x10C, 0x300)
            .u32_be(0x118, 0)
            .u32_be(0x124, 0x380);
        let fixture = sequence(fixture, 0x200);
        let fixture = sequence(fixture, 0x300);
        let src = sequence(fixture, 0x380).build();

        let report = scan(&src, 0x100);
        let offsets: Vec<u32> = report
            .graph
            .sequences()
            .map(|(_, seq)| seq.source_offset)
            .collect();
        assert_eq!(offsets, vec![0x200, 0x300]);
        assert!(report.diagnostics.is_empty());
        assert_eq!(
            report.outcomes[0].status,
            ScannerStatus::Detected { objects: 2 }
        );
    }

    #[test]
    fn test_out_of_range_entry_ends_walk() {
        let fixture = Fixture::new(0x400)
            .u32_be(0x100, 0x200)
            .u32_be(0x10C, 0x400)
            .u32_be(0x118, 0x300);
        let fixture = sequence(fixture, 0x200);
        let src = sequence(fixture, 0x300).build();

        let report = scan(&src, 0x100);
        assert_eq!(report.graph.sequence_count(), 1);
        let (_, seq) = report.graph.sequences().next().unwrap();
        assert_eq!(seq.source_offset, 0x200);
        assert_eq!(seq.tracks, vec![0x206]);
        assert_eq!(seq.length, 10);
    }

    #[test]
    fn test_broken_sequence_is_isolated() {
        let fixture = Fixture::new(0x400)
            .u32_be(0x100, 0x200)
            .u32_be(0x10C, 0x280)
            .u32_be(0x118, 0x300)
            .u8(0x280, 40);
        let fixture = sequence(fixture, 0x200);
        let src = sequence(fixture, 0x300).build();

        let report = scan(&src, 0x100);
        assert_eq!(report.graph.sequence_count(), 2);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].offset, 0x280);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::MalformedHeader);
    }

    #[test]
    fn test_missing_hint_is_not_present() {
        let src = Fixture::new(0x100).build();
        let registry = ScannerRegistry::builtin();
        let session = Session::new(&registry, ScanConfig::default());
        let report = session.scan(&src, &ScanRequest::engine("konami_gx"));
        assert!(matches!(
            report.outcomes[0].status,
            ScannerStatus::NotPresent { .. }
        ));
    }

    #[test]
    fn test_missing_sample_group_is_not_present() {
        let fixture = Fixture::new(0x400).u32_be(0x100, 0x200);
        let src = sequence(fixture, 0x200).build();
        let registry = ScannerRegistry::builtin();
        let session = Session::new(&registry, ScanConfig::default());
        let hints = HintSet::new("gx").with("soundcpu", "seq_table", 0x100);
        let report = session.scan(&src, &ScanRequest::engine("konami_gx").with_hints(&hints));

        assert!(report.graph.is_empty());
        assert!(matches!(
            report.outcomes[0].status,
            ScannerStatus::NotPresent { .. }
        ));
    }

    #[test]
    fn test_unterminated_track() {
        let src = Fixture::new(0x20)
            .u8(0x00, 1)
            .u32_be(0x02, 0x10)
            .build();
        assert!(matches!(
            parse_sequence(&src, 0),
            Err(Error::MalformedHeader { offset: 0x10, .. })
        ));
    }
}
