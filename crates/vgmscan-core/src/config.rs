//! Scan tuning.
//!
//! ```ignore
//! use vgmscan_core::ScanConfig;
//!
//! let config = ScanConfig::builder()
//!     .disable("square_ps2")
//!     .max_table_entries(0x200)
//!     .build();
//!
//! // Or from a TOML file
//! let config = ScanConfig::load("vgmscan.toml")?;
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Configuration for a scan session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Scanners skipped during a sweep (names are case-insensitive)
    pub disabled_scanners: Vec<String>,
    /// Upper bound on slots read per table walk
    pub max_table_entries: usize,
    /// Upper bound on signature candidates examined per scanner
    pub max_matches: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            disabled_scanners: Vec::new(),
            max_table_entries: 0x1000,
            max_matches: 256,
        }
    }
}

impl ScanConfig {
    /// Create a new configuration builder
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Load from a TOML file; missing keys keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        debug!("Loaded scan config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn is_enabled(&self, scanner: &str) -> bool {
        !self
            .disabled_scanners
            .iter()
            .any(|name| name.eq_ignore_ascii_case(scanner))
    }
}

/// Builder for ScanConfig
#[derive(Debug, Clone, Default)]
pub struct ScanConfigBuilder {
    disabled_scanners: Vec<String>,
    max_table_entries: Option<usize>,
    max_matches: Option<usize>,
}

impl ScanConfigBuilder {
    /// Skip a scanner during sweeps
    pub fn disable(mut self, scanner: impl Into<String>) -> Self {
        self.disabled_scanners.push(scanner.into());
        self
    }

    pub fn max_table_entries(mut self, limit: usize) -> Self {
        self.max_table_entries = Some(limit);
        self
    }

    pub fn max_matches(mut self, limit: usize) -> Self {
        self.max_matches = Some(limit);
        self
    }

    /// Build the configuration
    pub fn build(self) -> ScanConfig {
        let default = ScanConfig::default();
        ScanConfig {
            disabled_scanners: self.disabled_scanners,
            max_table_entries: self.max_table_entries.unwrap_or(default.max_table_entries),
            max_matches: self.max_matches.unwrap_or(default.max_matches),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builder_defaults() {
        let config = ScanConfig::builder().build();
        assert_eq!(config, ScanConfig::default());
        assert_eq!(config.max_table_entries, 0x1000);
        assert_eq!(config.max_matches, 256);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ScanConfig::builder()
            .disable("NDS")
            .max_table_entries(16)
            .build();
        assert_eq!(config.max_table_entries, 16);
        assert!(!config.is_enabled("nds"));
        assert!(config.is_enabled("konami_gx"));
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "disabled_scanners = [\"compile_snes\"]").unwrap();
        writeln!(file, "max_matches = 8").unwrap();

        let config = ScanConfig::load(file.path()).unwrap();
        assert_eq!(config.disabled_scanners, vec!["compile_snes".to_string()]);
        assert_eq!(config.max_matches, 8);
        assert_eq!(config.max_table_entries, 0x1000);
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_matches = \"many\"").unwrap();
        assert!(matches!(
            ScanConfig::load(file.path()),
            Err(crate::Error::Toml(_))
        ));
    }
}
