use tracing::{debug, warn};

use super::Scanner;
use crate::error::{Error, Result};

pub type ScannerFactory = fn() -> Box<dyn Scanner>;

struct Registered {
    name: &'static str,
    scanner: Box<dyn Scanner>,
}

/// Name-indexed set of scanners, built once and shared by reference
///
/// Names are write-once and compared case-insensitively. Enumeration follows
/// registration order, which is also the order of a sweep.
#[derive(Default)]
pub struct ScannerRegistry {
    entries: Vec<Registered>,
}

impl ScannerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every engine shipped with this crate
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for &(name, factory) in crate::engines::BUILTIN {
            if let Err(e) = registry.register(name, factory) {
                warn!("Skipping builtin scanner: {}", e);
            }
        }
        registry
    }

    pub fn register(&mut self, name: &'static str, factory: ScannerFactory) -> Result<()> {
        if self.position(name).is_some() {
            return Err(Error::DuplicateScanner(name.to_string()));
        }
        debug!("Registered scanner {}", name);
        self.entries.push(Registered {
            name,
            scanner: factory(),
        });
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&dyn Scanner> {
        self.position(name)
            .map(|index| self.entries[index].scanner.as_ref())
            .ok_or_else(|| Error::UnknownScanner(name.to_string()))
    }

    /// Registered name and scanner, in registration order
    pub fn all(&self) -> impl Iterator<Item = (&'static str, &dyn Scanner)> {
        self.entries
            .iter()
            .map(|entry| (entry.name, entry.scanner.as_ref()))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.name).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.name.eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Debug for ScannerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
