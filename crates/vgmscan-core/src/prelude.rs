//! Prelude module for convenient imports
//!
//! ```ignore
//! use vgmscan_core::prelude::*;
//! ```
//!
//! This brings the following into scope:
//!
//! - Scan driving: `Session`, `ScanRequest`, `ScannerRegistry`, `ScanConfig`
//! - Inputs: `ByteSource`, `ReadBytes`, `HintSet`
//! - Results: `ScanReport`, `ScanGraph`, `ScannerStatus`, `Diagnostic`
//! - Error handling: `Error`, `Result`

// Scan driving
pub use crate::config::ScanConfig;
pub use crate::scanner::{ScanRequest, Scanner, ScannerRegistry, Session};

// Error handling
pub use crate::error::{Error, Result};

// Inputs
pub use crate::detect::{HintProvider, HintSet};
pub use crate::source::{ByteSource, ReadBytes};

// Results
pub use crate::model::{EngineVersion, ScanGraph, TopLevel};
pub use crate::scanner::{Diagnostic, ScanReport, ScannerStatus};

// Export format trait
pub use crate::export::ExportFormat;
