use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Read of {width} byte(s) at {offset:#x} exceeds source length {len:#x}")]
    OutOfRange { offset: u64, width: u32, len: u32 },

    #[error("Malformed header at {offset:#x}: {reason}")]
    MalformedHeader { offset: u32, reason: String },

    #[error("Unresolved sample {number} in directory {directory:#x}: {reason}")]
    UnresolvedSample {
        directory: u32,
        number: u32,
        reason: String,
    },

    #[error("Pattern not found: {0}")]
    PatternNotFound(String),

    #[error("Unknown engine version: {0}")]
    UnknownVersion(String),

    #[error("Hint '{group}/{key}' not supplied")]
    HintMissing { group: String, key: String },

    #[error("Hint group '{0}' not supplied")]
    HintGroupMissing(String),

    #[error("Unknown scanner: {0}")]
    UnknownScanner(String),

    #[error("Scanner already registered: {0}")]
    DuplicateScanner(String),

    #[error("Invalid byte pattern: {0}")]
    InvalidPattern(String),

    #[error("Source is too large ({0} bytes)")]
    SourceTooLarge(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn malformed(offset: u32, reason: impl Into<String>) -> Self {
        Error::MalformedHeader {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn unresolved(directory: u32, number: u32, reason: impl Into<String>) -> Self {
        Error::UnresolvedSample {
            directory,
            number,
            reason: reason.into(),
        }
    }

    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Errors that mean "this engine is not present", as opposed to a broken entry.
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            Error::PatternNotFound(_) | Error::HintMissing { .. } | Error::HintGroupMissing(_)
        )
    }

    /// Source offset the error points at, when it carries one
    pub fn offset(&self) -> Option<u32> {
        match self {
            Error::OutOfRange { offset, .. } => Some(u32::try_from(*offset).unwrap_or(u32::MAX)),
            Error::MalformedHeader { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Errors scoped to a single entry, instrument or region.
    pub fn is_entry_scoped(&self) -> bool {
        matches!(
            self,
            Error::OutOfRange { .. }
                | Error::MalformedHeader { .. }
                | Error::UnresolvedSample { .. }
        )
    }
}
