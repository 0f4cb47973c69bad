//! # vgmscan-core
//!
//! Detection and parsing of game sound-driver data inside ROM and ARAM
//! dumps.
//!
//! This crate provides:
//! - Bounds-checked byte sources and table walking
//! - Hint, byte-pattern and signature based engine detection
//! - A registry of engine scanners and a total scan entry point
//! - An arena object model of sequences, instrument sets, instruments,
//!   regions and sample collections
//! - JSON and TSV export of scan reports
//!
//! ```ignore
//! use vgmscan_core::prelude::*;
//!
//! let registry = ScannerRegistry::builtin();
//! let session = Session::new(&registry, ScanConfig::default());
//! let source = ByteSource::from_file("title.spc.aram")?;
//! let report = session.scan(&source, &ScanRequest::sweep());
//! ```

pub mod build;
pub mod config;
pub mod detect;
pub mod engines;
pub mod error;
pub mod export;
pub mod model;
pub mod prelude;
pub mod scanner;
pub mod source;

pub use config::{ScanConfig, ScanConfigBuilder};
pub use detect::{BytePattern, HintProvider, HintSet, load_hints, save_hints};
pub use error::{Error, Result};
pub use export::{ExportFormat, JsonExporter, TsvExporter, to_json, to_json_all, to_tsv};
pub use model::{
    EngineVersion, Envelope, Instrument, InstrumentSet, Region, SampleCollection, ScanGraph,
    Sequence, TopLevel,
};
pub use scanner::{
    Diagnostic, DiagnosticKind, Discovery, ScanReport, ScanRequest, ScanTarget, Scanner,
    ScannerOutcome, ScannerRegistry, ScannerStatus, Session,
};
pub use source::{ByteOrder, ByteSource, ReadBytes, Width};
