use std::collections::HashMap;
use std::collections::hash_map::{Entry, VacantEntry};

use super::SampleCollectionId;

/// Identity of a sample: the directory it is listed in and its number there
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleKey {
    pub directory: u32,
    pub number: u32,
}

/// Per-scan record of samples already materialized
///
/// Regions of different instruments, and of different instrument sets that
/// share a sample directory, all end up pointing at the same collection.
#[derive(Debug, Default)]
pub struct SampleLedger {
    built: HashMap<SampleKey, SampleCollectionId>,
}

pub enum SampleRequest<'a> {
    Built(SampleCollectionId),
    Vacant(VacantSample<'a>),
}

pub struct VacantSample<'a> {
    entry: VacantEntry<'a, SampleKey, SampleCollectionId>,
}

impl VacantSample<'_> {
    pub fn key(&self) -> SampleKey {
        *self.entry.key()
    }

    pub fn insert(self, id: SampleCollectionId) -> SampleCollectionId {
        *self.entry.insert(id)
    }
}

impl SampleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, directory: u32, number: u32) -> SampleRequest<'_> {
        match self.built.entry(SampleKey { directory, number }) {
            Entry::Occupied(entry) => SampleRequest::Built(*entry.get()),
            Entry::Vacant(entry) => SampleRequest::Vacant(VacantSample { entry }),
        }
    }

    pub fn get(&self, directory: u32, number: u32) -> Option<SampleCollectionId> {
        self.built.get(&SampleKey { directory, number }).copied()
    }

    pub fn len(&self) -> usize {
        self.built.len()
    }

    pub fn is_empty(&self) -> bool {
        self.built.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_request_returns_existing() {
        let mut ledger = SampleLedger::new();
        let first = match ledger.request(0x200, 5) {
            SampleRequest::Vacant(slot) => {
                assert_eq!(
                    slot.key(),
                    SampleKey {
                        directory: 0x200,
                        number: 5
                    }
                );
                slot.insert(SampleCollectionId(7))
            }
            SampleRequest::Built(_) => panic!("ledger starts empty"),
        };

        for _ in 0..3 {
            match ledger.request(0x200, 5) {
                SampleRequest::Built(id) => assert_eq!(id, first),
                SampleRequest::Vacant(_) => panic!("sample built twice"),
            }
        }
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_directory_is_part_of_the_key() {
        let mut ledger = SampleLedger::new();
        if let SampleRequest::Vacant(slot) = ledger.request(0x200, 5) {
            slot.insert(SampleCollectionId(0));
        }
        assert!(matches!(ledger.request(0x300, 5), SampleRequest::Vacant(_)));
        assert!(matches!(ledger.request(0x200, 6), SampleRequest::Vacant(_)));
        assert_eq!(ledger.get(0x200, 5), Some(SampleCollectionId(0)));
        assert_eq!(ledger.get(0x300, 5), None);
    }
}
