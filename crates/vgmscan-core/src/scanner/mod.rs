//! Engine detection.
//!
//! A [`Scanner`] knows how to find one engine family inside a
//! [`ByteSource`](crate::source::ByteSource) and turn its tables into graph
//! nodes. Scanners are looked up through a [`ScannerRegistry`] and driven by a
//! [`Session`], which hands each of them a [`ScanContext`] and collects the
//! results into a [`ScanReport`].

mod context;
mod registry;
mod session;

pub use context::{Diagnostic, DiagnosticKind, ScanContext};
pub use registry::{ScannerFactory, ScannerRegistry};
pub use session::{ScanReport, ScanRequest, ScanTarget, ScannerOutcome, ScannerStatus, Session};

use serde::Serialize;
use strum::{Display, EnumString};

use crate::error::Result;

/// How a scanner finds its entry tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Discovery {
    /// Table base supplied by the hint provider
    Hint,
    /// Table base read out of matched driver code
    Pattern,
    /// Self-describing container found by its magic tag
    Signature,
}

pub trait Scanner: Send + Sync {
    fn name(&self) -> &'static str;

    fn discovery(&self) -> Discovery;

    /// Short human-readable description for listings
    fn description(&self) -> &'static str {
        ""
    }

    /// Locate this engine in `ctx.source()` and add what it finds to the graph.
    ///
    /// Returning [`Error::PatternNotFound`](crate::Error::PatternNotFound) or
    /// [`Error::HintMissing`](crate::Error::HintMissing) means the engine is
    /// absent. Per-entry failures are recorded on the context instead of
    /// being returned.
    fn scan(&self, ctx: &mut ScanContext<'_>) -> Result<()>;
}
