//! Object model produced by a scan.
//!
//! All nodes live in one [`ScanGraph`] arena and refer to each other through
//! typed handles. Instrument sets own instruments, instruments own regions;
//! regions point at shared [`SampleCollection`]s whose construction is
//! deduplicated by the [`SampleLedger`].

mod graph;
mod ledger;
mod nodes;
mod version;

pub use graph::*;
pub use ledger::*;
pub use nodes::*;
pub use version::*;
