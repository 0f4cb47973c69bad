use memchr::memmem;
use serde::Serialize;
use strum::{Display, EnumString};
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::detect::{
    BytePattern, HintProvider, OutOfRangePolicy, TableEntry, TableSpec, TableWalk, walk_table,
};
use crate::error::{Error, Result};
use crate::model::{SampleLedger, ScanGraph, Sequence, SequenceId};
use crate::source::{ByteSource, ReadBytes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    OutOfRange,
    MalformedHeader,
    UnresolvedSample,
    UnknownVersion,
    Other,
}

impl From<&Error> for DiagnosticKind {
    fn from(error: &Error) -> Self {
        match error {
            Error::OutOfRange { .. } => Self::OutOfRange,
            Error::MalformedHeader { .. } => Self::MalformedHeader,
            Error::UnresolvedSample { .. } => Self::UnresolvedSample,
            Error::UnknownVersion(_) => Self::UnknownVersion,
            _ => Self::Other,
        }
    }
}

/// A dropped entry, instrument or region
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub scanner: String,
    /// Offset of the entry being built when the failure happened
    pub offset: u32,
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Everything one scanner sees during a scan
///
/// The graph, ledger and diagnostics are shared by every scanner of the same
/// scan; the source, hints and config are read-only.
pub struct ScanContext<'a> {
    source: &'a ByteSource,
    hints: Option<&'a dyn HintProvider>,
    config: &'a ScanConfig,
    scanner: &'static str,
    pub(crate) graph: &'a mut ScanGraph,
    pub(crate) ledger: &'a mut SampleLedger,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl<'a> ScanContext<'a> {
    pub(crate) fn new(
        source: &'a ByteSource,
        hints: Option<&'a dyn HintProvider>,
        config: &'a ScanConfig,
        scanner: &'static str,
        graph: &'a mut ScanGraph,
        ledger: &'a mut SampleLedger,
        diagnostics: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Self {
            source,
            hints,
            config,
            scanner,
            graph,
            ledger,
            diagnostics,
        }
    }

    pub fn source(&self) -> &'a ByteSource {
        self.source
    }

    pub fn config(&self) -> &ScanConfig {
        self.config
    }

    pub fn scanner(&self) -> &'static str {
        self.scanner
    }

    pub fn hint(&self, group: &str, key: &str) -> Option<u32> {
        self.hints.and_then(|hints| hints.hint(group, key))
    }

    /// Like [`hint`](Self::hint), but a missing value means the engine is absent
    pub fn require_hint(&self, group: &str, key: &str) -> Result<u32> {
        self.hint(group, key).ok_or_else(|| Error::HintMissing {
            group: group.to_string(),
            key: key.to_string(),
        })
    }

    /// A missing group means the engine is absent
    pub fn require_group(&self, group: &str) -> Result<()> {
        if self.hints.is_some_and(|hints| hints.has_group(group)) {
            Ok(())
        } else {
            Err(Error::HintGroupMissing(group.to_string()))
        }
    }

    /// Record an entry-level failure and carry on
    pub fn record(&mut self, offset: u32, error: &Error) {
        warn!("[{}] dropped entry at 0x{:X}: {}", self.scanner, offset, error);
        self.diagnostics.push(Diagnostic {
            scanner: self.scanner.to_string(),
            offset,
            kind: DiagnosticKind::from(error),
            message: error.to_string(),
        });
    }

    pub fn add_sequence(&mut self, sequence: Sequence) -> SequenceId {
        info!(
            "[{}] sequence '{}' at 0x{:X} ({} tracks)",
            self.scanner,
            sequence.name,
            sequence.source_offset,
            sequence.tracks.len()
        );
        self.graph.push_sequence(sequence)
    }

    /// Walk a table, capped by the configured entry limit
    pub fn walk(&self, spec: &TableSpec, policy: OutOfRangePolicy) -> TableWalk {
        walk_table(self.source, spec, policy, self.config.max_table_entries)
    }

    /// Walk a table and build every entry independently
    ///
    /// Skipped slots and failed builds become diagnostics; siblings are
    /// unaffected. Returns the walk for callers that need the terminator.
    pub fn walk_entries<F>(
        &mut self,
        spec: &TableSpec,
        policy: OutOfRangePolicy,
        mut build: F,
    ) -> TableWalk
    where
        F: FnMut(&mut Self, &TableEntry) -> Result<()>,
    {
        let walk = self.walk(spec, policy);
        for skipped in &walk.skipped {
            let error = Error::OutOfRange {
                offset: skipped.target,
                width: 1,
                len: self.source.len(),
            };
            self.record(skipped.slot, &error);
        }
        for entry in &walk.entries {
            if let Err(e) = build(self, entry) {
                self.record(entry.target, &e);
            }
        }
        walk
    }

    /// Offsets of every occurrence of `tag`, capped by the configured match limit
    pub fn find_signatures(&self, tag: &[u8]) -> Vec<u32> {
        self.find_signatures_where(tag, |_| true)
    }

    /// Like [`find_signatures`](Self::find_signatures), counting only
    /// occurrences accepted by `accept` towards the limit
    pub fn find_signatures_where<F>(&self, tag: &[u8], mut accept: F) -> Vec<u32>
    where
        F: FnMut(u32) -> bool,
    {
        let found: Vec<u32> = memmem::find_iter(self.source.as_bytes(), tag)
            .map(|pos| pos as u32)
            .filter(|&pos| accept(pos))
            .take(self.config.max_matches)
            .collect();
        debug!(
            "[{}] {} candidate(s) for {:?}",
            self.scanner,
            found.len(),
            String::from_utf8_lossy(tag)
        );
        found
    }

    /// First match of a code pattern
    pub fn find_pattern(&self, pattern: &BytePattern) -> Result<u32> {
        pattern
            .find(self.source.as_bytes())
            .map(|pos| pos as u32)
            .ok_or_else(|| Error::PatternNotFound(pattern.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::HintSet;
    use crate::source::fixture::Fixture;
    use crate::source::{ByteOrder, Width};

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

        fn context<'a>(
            &'a mut self,
            source: &'a ByteSource,
            hints: Option<&'a dyn HintProvider>,
        ) -> ScanContext<'a> {
            ScanContext::new(
                source,
                hints,
                &self.config,
                "test",
                &mut self.graph,
                &mut self.ledger,
                &mut self.diagnostics,
            )
        }
    }

    #[test]
    fn test_require_hint() {
        let source = Fixture::new(4).build();
        let hints = HintSet::new("t").with("soundcpu", "seq_table", 0x10);
        let mut harness = Harness::new();

        let ctx = harness.context(&source, Some(&hints));
        assert_eq!(ctx.require_hint("SoundCPU", "seq_table").unwrap(), 0x10);
        assert!(matches!(
            ctx.require_hint("soundcpu", "bank_table"),
            Err(Error::HintMissing { .. })
        ));
        assert!(ctx.require_group("SoundCPU").is_ok());
        assert!(ctx.require_group("shared").unwrap_err().is_absence());

        let ctx = harness.context(&source, None);
        assert!(ctx.require_hint("soundcpu", "seq_table").unwrap_err().is_absence());
    }

    #[test]
    fn test_walk_entries_isolates_failures() {
        let source = Fixture::new(0x100)
            .u32_le(0x00, 0x40)
            .u32_le(0x04, 0x50)
            .u32_le(0x08, 0x60)
            .build();
        let spec = TableSpec::new(0, 4, Width::U32, ByteOrder::Little);
        let mut harness = Harness::new();
        let mut built = Vec::new();

        let mut ctx = harness.context(&source, None);
        let walk = ctx.walk_entries(&spec, OutOfRangePolicy::Stop, |_, entry| {
            if entry.target == 0x50 {
                return Err(Error::malformed(entry.target, "bad entry"));
            }
            built.push(entry.target);
            Ok(())
        });

        assert_eq!(walk.entries.len(), 3);
        assert_eq!(built, vec![0x40, 0x60]);
        assert_eq!(harness.diagnostics.len(), 1);
        assert_eq!(harness.diagnostics[0].offset, 0x50);
        assert_eq!(harness.diagnostics[0].kind, DiagnosticKind::MalformedHeader);
        assert_eq!(harness.diagnostics[0].scanner, "test");
    }

    #[test]
    fn test_skipped_slots_are_recorded() {
        let source = Fixture::new(0x40)
            .u32_le(0x00, 0x20)
            .u32_le(0x04, 0x1000)
            .build();
        let spec = TableSpec::new(0, 4, Width::U32, ByteOrder::Little).count(2);
        let mut harness = Harness::new();

        let mut ctx = harness.context(&source, None);
        ctx.walk_entries(&spec, OutOfRangePolicy::Skip, |_, _| Ok(()));

        assert_eq!(harness.diagnostics.len(), 1);
        assert_eq!(harness.diagnostics[0].kind, DiagnosticKind::OutOfRange);
        assert_eq!(harness.diagnostics[0].offset, 0x04);
    }

    #[test]
    fn test_find_signatures_respects_limit() {
        let source = Fixture::new(0x40)
            .bytes(0x00, b"SDAT")
            .bytes(0x10, b"SDAT")
            .bytes(0x20, b"SDAT")
            .build();
        let mut harness = Harness::new();
        harness.config.max_matches = 2;

        let ctx = harness.context(&source, None);
        assert_eq!(ctx.find_signatures(b"SDAT"), vec![0x00, 0x10]);
    }

    #[test]
    fn test_find_pattern_absent() {
        let source = Fixture::new(0x10).build();
        let pattern = BytePattern::parse("8F ?? F2").unwrap();
        let mut harness = Harness::new();

        let ctx = harness.context(&source, None);
        assert!(matches!(
            ctx.find_pattern(&pattern),
            Err(Error::PatternNotFound(text)) if text == "8F ?? F2"
        ));
    }
}
