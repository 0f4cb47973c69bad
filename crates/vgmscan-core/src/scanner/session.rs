use serde::Serialize;
use tracing::{debug, info};

use super::{Diagnostic, ScanContext, Scanner, ScannerRegistry};
use crate::config::ScanConfig;
use crate::detect::HintProvider;
use crate::error::Error;
use crate::model::{SampleLedger, ScanGraph};
use crate::source::{ByteSource, ReadBytes};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTarget {
    /// Run the named scanner only
    Engine(String),
    /// Run every enabled scanner in registration order
    Sweep,
}

/// What to look for, plus optional location hints
#[derive(Clone)]
pub struct ScanRequest<'a> {
    pub target: ScanTarget,
    pub hints: Option<&'a dyn HintProvider>,
}

impl<'a> ScanRequest<'a> {
    pub fn engine(name: impl Into<String>) -> Self {
        Self {
            target: ScanTarget::Engine(name.into()),
            hints: None,
        }
    }

    pub fn sweep() -> Self {
        Self {
            target: ScanTarget::Sweep,
            hints: None,
        }
    }

    pub fn with_hints(mut self, hints: &'a dyn HintProvider) -> Self {
        self.hints = Some(hints);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScannerStatus {
    Detected { objects: usize },
    NotPresent { reason: String },
    UnknownVersion { reason: String },
    Failed { reason: String },
    /// Disabled by configuration
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannerOutcome {
    pub scanner: String,
    #[serde(flatten)]
    pub status: ScannerStatus,
}

/// Result of one scan call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub source: String,
    pub source_len: u32,
    pub graph: ScanGraph,
    pub diagnostics: Vec<Diagnostic>,
    pub outcomes: Vec<ScannerOutcome>,
}

impl ScanReport {
    /// Names of the scanners that produced at least one object
    pub fn detected(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|outcome| match outcome.status {
            ScannerStatus::Detected { .. } => Some(outcome.scanner.as_str()),
            _ => None,
        })
    }

    pub fn is_match(&self) -> bool {
        self.detected().next().is_some()
    }
}

/// Scan driver: a registry plus the configuration applied to every scan
pub struct Session<'r> {
    registry: &'r ScannerRegistry,
    config: ScanConfig,
}

impl<'r> Session<'r> {
    pub fn new(registry: &'r ScannerRegistry, config: ScanConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &ScannerRegistry {
        self.registry
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan a source. Never fails; every problem ends up in the report.
    pub fn scan(&self, source: &ByteSource, request: &ScanRequest<'_>) -> ScanReport {
        let mut graph = ScanGraph::new();
        let mut ledger = SampleLedger::new();
        let mut diagnostics = Vec::new();
        let mut outcomes = Vec::new();

        let selected: Vec<(&'static str, &dyn Scanner, bool)> = match &request.target {
            ScanTarget::Engine(name) => match self.registry.lookup(name) {
                Ok(scanner) => vec![(scanner.name(), scanner, true)],
                Err(e) => {
                    outcomes.push(ScannerOutcome {
                        scanner: name.clone(),
                        status: ScannerStatus::Failed {
                            reason: e.to_string(),
                        },
                    });
                    Vec::new()
                }
            },
            ScanTarget::Sweep => self
                .registry
                .all()
                .map(|(name, scanner)| (name, scanner, self.config.is_enabled(name)))
                .collect(),
        };

        for (name, scanner, enabled) in selected {
            if !enabled {
                debug!("Scanner {} disabled by configuration", name);
                outcomes.push(ScannerOutcome {
                    scanner: name.to_string(),
                    status: ScannerStatus::Skipped,
                });
                continue;
            }

            let before = graph.top_level().len();
            let result = {
                let mut ctx = ScanContext::new(
                    source,
                    request.hints,
                    &self.config,
                    name,
                    &mut graph,
                    &mut ledger,
                    &mut diagnostics,
                );
                let result = scanner.scan(&mut ctx);
                if let Err(e) = &result
                    && e.is_entry_scoped()
                {
                    ctx.record(e.offset().unwrap_or(0), e);
                }
                result
            };
            let objects = graph.top_level().len() - before;

            let status = match result {
                Ok(()) if objects > 0 => ScannerStatus::Detected { objects },
                Ok(()) => ScannerStatus::NotPresent {
                    reason: "no valid entries".to_string(),
                },
                Err(e) if e.is_absence() => ScannerStatus::NotPresent {
                    reason: e.to_string(),
                },
                Err(e @ Error::UnknownVersion(_)) => ScannerStatus::UnknownVersion {
                    reason: e.to_string(),
                },
                Err(e) => ScannerStatus::Failed {
                    reason: e.to_string(),
                },
            };
            match &status {
                ScannerStatus::Detected { objects } => {
                    info!("{}: {} detected ({} objects)", source.name(), name, objects)
                }
                other => debug!("{}: {} {:?}", source.name(), name, other),
            }
            outcomes.push(ScannerOutcome {
                scanner: name.to_string(),
                status,
            });
        }

        ScanReport {
            source: source.name().to_string(),
            source_len: source.len(),
            graph,
            diagnostics,
            outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::model::{EngineVersion, Sequence};
    use crate::scanner::Discovery;
    use crate::source::fixture::Fixture;

    /// Adds one sequence per `SEQ!` tag found
    struct TagScanner;

    impl Scanner for TagScanner {
        fn name(&self) -> &'static str {
            "tag"
        }

        fn discovery(&self) -> Discovery {
            Discovery::Signature
        }

        fn scan(&self, ctx: &mut ScanContext<'_>) -> Result<()> {
            let found = ctx.find_signatures(b"SEQ!");
            if found.is_empty() {
                return Err(Error::PatternNotFound("SEQ!".into()));
            }
            for offset in found {
                ctx.add_sequence(Sequence {
                    name: format!("seq_{:X}", offset),
                    source_offset: offset,
                    length: 4,
                    version: EngineVersion::KonamiGx,
                    tracks: Vec::new(),
                });
            }
            Ok(())
        }
    }

    struct VersionScanner;

    impl Scanner for VersionScanner {
        fn name(&self) -> &'static str {
            "version"
        }

        fn discovery(&self) -> Discovery {
            Discovery::Hint
        }

        fn scan(&self, _ctx: &mut ScanContext<'_>) -> Result<()> {
            Err(Error::UnknownVersion("opcode 0x09".into()))
        }
    }

    fn tag() -> Box<dyn Scanner> {
        Box::new(TagScanner)
    }

    fn version() -> Box<dyn Scanner> {
        Box::new(VersionScanner)
    }

    fn registry() -> ScannerRegistry {
        let mut registry = ScannerRegistry::new();
        registry.register("tag", tag).unwrap();
        registry.register("version", version).unwrap();
        registry
    }

    fn source() -> ByteSource {
        Fixture::new(0x40)
            .bytes(0x08, b"SEQ!")
            .bytes(0x20, b"SEQ!")
            .build()
    }

    #[test]
    fn test_sweep_reports_every_scanner() {
        let registry = registry();
        let session = Session::new(&registry, ScanConfig::default());
        let report = session.scan(&source(), &ScanRequest::sweep());

        assert_eq!(report.graph.sequence_count(), 2);
        assert_eq!(
            report.outcomes,
            vec![
                ScannerOutcome {
                    scanner: "tag".into(),
                    status: ScannerStatus::Detected { objects: 2 },
                },
                ScannerOutcome {
                    scanner: "version".into(),
                    status: ScannerStatus::UnknownVersion {
                        reason: "Unknown engine version: opcode 0x09".into()
                    },
                },
            ]
        );
        assert_eq!(report.detected().collect::<Vec<_>>(), vec!["tag"]);
    }

    #[test]
    fn test_scan_is_idempotent() {
        let registry = registry();
        let session = Session::new(&registry, ScanConfig::default());
        let src = source();
        let first = session.scan(&src, &ScanRequest::sweep());
        let second = session.scan(&src, &ScanRequest::sweep());
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_engine_is_reported_not_raised() {
        let registry = registry();
        let session = Session::new(&registry, ScanConfig::default());
        let report = session.scan(&source(), &ScanRequest::engine("psf"));

        assert!(report.graph.is_empty());
        assert!(!report.is_match());
        assert!(matches!(
            report.outcomes[0].status,
            ScannerStatus::Failed { .. }
        ));
    }

    #[test]
    fn test_absent_engine_is_not_present() {
        let registry = registry();
        let session = Session::new(&registry, ScanConfig::default());
        let report = session.scan(&Fixture::new(0x10).build(), &ScanRequest::engine("TAG"));

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].scanner, "tag");
        assert!(matches!(
            report.outcomes[0].status,
            ScannerStatus::NotPresent { .. }
        ));
    }

    #[test]
    fn test_disabled_scanner_is_skipped_in_sweep() {
        let registry = registry();
        let config = ScanConfig::builder().disable("tag").build();
        let session = Session::new(&registry, config);
        let report = session.scan(&source(), &ScanRequest::sweep());

        assert!(report.graph.is_empty());
        assert_eq!(report.outcomes[0].status, ScannerStatus::Skipped);
    }
}
