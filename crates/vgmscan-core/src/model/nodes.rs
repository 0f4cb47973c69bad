use std::collections::BTreeSet;

use serde::Serialize;

use super::EngineVersion;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub(crate) u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

handle!(
    /// Handle of an [`InstrumentSet`] inside a [`ScanGraph`](super::ScanGraph)
    InstrumentSetId
);
handle!(InstrumentId);
handle!(RegionId);
handle!(SampleCollectionId);
handle!(SequenceId);

/// Envelope parameters as stored by the sound hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Envelope {
    /// S-DSP ADSR registers
    Snes { adsr1: u8, adsr2: u8, gain: u8 },
    /// NDS sound bank rates
    Nds {
        attack: u8,
        decay: u8,
        sustain: u8,
        release: u8,
    },
    /// PS2 SPU ADSR words
    Spu { adsr1: u16, adsr2: u16 },
}

/// Instrument bank discovered in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstrumentSet {
    pub name: String,
    pub source_offset: u32,
    pub length: u32,
    pub version: EngineVersion,
    pub sample_directory: u32,
    /// Every instrument offset read from the pointer table, in table order
    pub instrument_pointers: Vec<u32>,
    pub used_sample_numbers: BTreeSet<u32>,
    pub instruments: Vec<InstrumentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instrument {
    pub owner: InstrumentSetId,
    pub index: u32,
    pub source_offset: u32,
    pub length: u32,
    pub regions: Vec<RegionId>,
}

/// Key zone mapping a range of notes to one sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    pub owner: InstrumentId,
    pub source_offset: u32,
    pub length: u32,
    pub key_low: u8,
    pub key_high: u8,
    pub unity_key: u8,
    pub sample_number: u32,
    pub sample_directory: u32,
    pub envelope: Envelope,
    /// Shared with every other region using the same directory entry
    pub sample: SampleCollectionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleCollection {
    pub sample_number: u32,
    pub directory: u32,
    pub source_offset: u32,
    pub length: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sequence {
    pub name: String,
    pub source_offset: u32,
    pub length: u32,
    pub version: EngineVersion,
    /// Absolute offsets of the track event streams
    pub tracks: Vec<u32>,
}

/// Top-level object, in discovery order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum TopLevel {
    InstrumentSet(InstrumentSetId),
    Sequence(SequenceId),
}
