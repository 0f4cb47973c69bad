use std::ops::Index;

use serde::Serialize;

use super::{
    Instrument, InstrumentId, InstrumentSet, InstrumentSetId, Region, RegionId,
    SampleCollection, SampleCollectionId, Sequence, SequenceId, TopLevel,
};

/// Arena holding every node produced by one scan
///
/// Parents own their children through handle lists; child-to-parent links
/// and region-to-sample links are plain handles. Dropping the graph drops
/// everything at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanGraph {
    instrument_sets: Vec<InstrumentSet>,
    instruments: Vec<Instrument>,
    regions: Vec<Region>,
    samples: Vec<SampleCollection>,
    sequences: Vec<Sequence>,
    top_level: Vec<TopLevel>,
}

fn next_id(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl ScanGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn top_level(&self) -> &[TopLevel] {
        &self.top_level
    }

    pub fn is_empty(&self) -> bool {
        self.top_level.is_empty()
    }

    pub fn instrument_sets(&self) -> impl Iterator<Item = (InstrumentSetId, &InstrumentSet)> {
        self.instrument_sets
            .iter()
            .enumerate()
            .map(|(i, set)| (InstrumentSetId(i as u32), set))
    }

    pub fn sequences(&self) -> impl Iterator<Item = (SequenceId, &Sequence)> {
        self.sequences
            .iter()
            .enumerate()
            .map(|(i, seq)| (SequenceId(i as u32), seq))
    }

    pub fn samples(&self) -> impl Iterator<Item = (SampleCollectionId, &SampleCollection)> {
        self.samples
            .iter()
            .enumerate()
            .map(|(i, sample)| (SampleCollectionId(i as u32), sample))
    }

    pub fn instrument_set_count(&self) -> usize {
        self.instrument_sets.len()
    }

    pub fn instrument_count(&self) -> usize {
        self.instruments.len()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    /// Instruments of a set, in table order
    pub fn instruments_of(&self, set: InstrumentSetId) -> impl Iterator<Item = &Instrument> {
        self[set].instruments.iter().map(|&id| &self[id])
    }

    pub fn regions_of(&self, instrument: InstrumentId) -> impl Iterator<Item = &Region> {
        self[instrument].regions.iter().map(|&id| &self[id])
    }

    /// Set that owns a region, following the non-owning back links
    pub fn set_of_region(&self, region: RegionId) -> InstrumentSetId {
        self[self[region].owner].owner
    }

    pub(crate) fn push_sequence(&mut self, sequence: Sequence) -> SequenceId {
        let id = SequenceId(next_id(self.sequences.len()));
        self.sequences.push(sequence);
        self.top_level.push(TopLevel::Sequence(id));
        id
    }

    pub(crate) fn push_instrument_set(&mut self, set: InstrumentSet) -> InstrumentSetId {
        let id = InstrumentSetId(next_id(self.instrument_sets.len()));
        self.instrument_sets.push(set);
        self.top_level.push(TopLevel::InstrumentSet(id));
        id
    }

    pub(crate) fn push_instrument(&mut self, instrument: Instrument) -> InstrumentId {
        let id = InstrumentId(next_id(self.instruments.len()));
        let owner = instrument.owner;
        self.instruments.push(instrument);
        self.instrument_sets[owner.index()].instruments.push(id);
        id
    }

    pub(crate) fn push_region(&mut self, region: Region) -> RegionId {
        let id = RegionId(next_id(self.regions.len()));
        let owner = region.owner;
        let set = self.instruments[owner.index()].owner;
        self.instrument_sets[set.index()]
            .used_sample_numbers
            .insert(region.sample_number);
        self.regions.push(region);
        self.instruments[owner.index()].regions.push(id);
        id
    }

    pub(crate) fn push_sample(&mut self, sample: SampleCollection) -> SampleCollectionId {
        let id = SampleCollectionId(next_id(self.samples.len()));
        self.samples.push(sample);
        id
    }
}

impl Index<InstrumentSetId> for ScanGraph {
    type Output = InstrumentSet;

    fn index(&self, id: InstrumentSetId) -> &InstrumentSet {
        &self.instrument_sets[id.index()]
    }
}

impl Index<InstrumentId> for ScanGraph {
    type Output = Instrument;

    fn index(&self, id: InstrumentId) -> &Instrument {
        &self.instruments[id.index()]
    }
}

impl Index<RegionId> for ScanGraph {
    type Output = Region;

    fn index(&self, id: RegionId) -> &Region {
        &self.regions[id.index()]
    }
}

impl Index<SampleCollectionId> for ScanGraph {
    type Output = SampleCollection;

    fn index(&self, id: SampleCollectionId) -> &SampleCollection {
        &self.samples[id.index()]
    }
}

impl Index<SequenceId> for ScanGraph {
    type Output = Sequence;

    fn index(&self, id: SequenceId) -> &Sequence {
        &self.sequences[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EngineVersion, Envelope};
    use std::collections::BTreeSet;

    fn empty_set() -> InstrumentSet {
        InstrumentSet {
            name: "set".into(),
            source_offset: 0x100,
            length: 0x10,
            version: EngineVersion::HudsonSnesV1,
            sample_directory: 0x200,
            instrument_pointers: vec![0x100],
            used_sample_numbers: BTreeSet::new(),
            instruments: Vec::new(),
        }
    }

    #[test]
    fn test_children_are_linked_to_parents() {
        let mut graph = ScanGraph::new();
        let set = graph.push_instrument_set(empty_set());
        let instrument = graph.push_instrument(Instrument {
            owner: set,
            index: 0,
            source_offset: 0x100,
            length: 4,
            regions: Vec::new(),
        });
        let sample = graph.push_sample(SampleCollection {
            sample_number: 3,
            directory: 0x200,
            source_offset: 0x300,
            length: 9,
        });
        let region = graph.push_region(Region {
            owner: instrument,
            source_offset: 0x100,
            length: 4,
            key_low: 0,
            key_high: 127,
            unity_key: 60,
            sample_number: 3,
            sample_directory: 0x200,
            envelope: Envelope::Snes {
                adsr1: 0x8F,
                adsr2: 0xE0,
                gain: 0,
            },
            sample,
        });

        assert_eq!(graph.top_level(), &[TopLevel::InstrumentSet(set)]);
        assert_eq!(graph[set].instruments, vec![instrument]);
        assert_eq!(graph[instrument].regions, vec![region]);
        assert_eq!(graph.set_of_region(region), set);
        assert_eq!(graph[graph[region].sample].source_offset, 0x300);
        assert!(graph[set].used_sample_numbers.contains(&3));
        assert_eq!(graph.regions_of(instrument).count(), 1);
        assert_eq!(graph.instruments_of(set).count(), 1);
    }

    #[test]
    fn test_top_level_keeps_discovery_order() {
        let mut graph = ScanGraph::new();
        let seq = graph.push_sequence(Sequence {
            name: "seq".into(),
            source_offset: 0x40,
            length: 8,
            version: EngineVersion::KonamiGx,
            tracks: vec![0x48],
        });
        let set = graph.push_instrument_set(empty_set());
        assert_eq!(
            graph.top_level(),
            &[TopLevel::Sequence(seq), TopLevel::InstrumentSet(set)]
        );
        assert_eq!(graph.sequence_count(), 1);
        assert_eq!(graph.instrument_set_count(), 1);
    }
}
