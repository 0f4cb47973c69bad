//! Fixed-stride pointer table walking.
//!
//! Every engine stores its entry points as an array of pointers. The walk
//! reads one pointer per stride and ends on whichever comes first:
//!
//! - a zero pointer (the usual terminator),
//! - a pointer at or past the end of the source (only under
//!   [`OutOfRangePolicy::Stop`]),
//! - the declared table length,
//! - the end of the source itself.
//!
//! Because the slot address advances by `stride >= 1` and every slot must be
//! readable, a walk over a source of length `L` visits at most
//! `L / stride + 1` slots no matter what the table contains.

use serde::Serialize;
use tracing::debug;

use crate::source::{ByteOrder, ReadBytes, Width};

/// What to do with a pointer that lands outside the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutOfRangePolicy {
    /// Treat it as a terminator (top-level entry tables)
    Stop,
    /// Drop that entry and keep walking (instrument pointer tables)
    Skip,
}

/// Location and shape of a pointer table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub base: u32,
    pub stride: u32,
    /// Offset of the pointer field inside each entry
    pub field: u32,
    pub width: Width,
    pub order: ByteOrder,
    /// Added to every raw pointer; zero for absolute pointers
    pub relative_to: u32,
    /// Declared number of entries, if the format has one
    pub count: Option<u32>,
}

impl TableSpec {
    pub fn new(base: u32, stride: u32, width: Width, order: ByteOrder) -> Self {
        Self {
            base,
            stride,
            field: 0,
            width,
            order,
            relative_to: 0,
            count: None,
        }
    }

    pub fn field(mut self, field: u32) -> Self {
        self.field = field;
        self
    }

    pub fn relative_to(mut self, base: u32) -> Self {
        self.relative_to = base;
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableEntry {
    pub index: u32,
    /// Address of the table slot the pointer was read from
    pub slot: u32,
    /// Resolved pointer
    pub target: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub index: u32,
    pub slot: u32,
    pub target: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WalkEnd {
    Sentinel { index: u32 },
    OutOfRange { index: u32, target: u64 },
    TableEnd,
    SourceEnd,
    Limit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableWalk {
    pub entries: Vec<TableEntry>,
    pub skipped: Vec<SkippedEntry>,
    pub end: WalkEnd,
}

impl TableWalk {
    pub fn from_entries(entries: Vec<TableEntry>) -> Self {
        Self {
            entries,
            skipped: Vec::new(),
            end: WalkEnd::TableEnd,
        }
    }

    /// Number of slots read, terminator included
    pub fn visited(&self) -> usize {
        let terminator = match self.end {
            WalkEnd::Sentinel { .. } | WalkEnd::OutOfRange { .. } => 1,
            _ => 0,
        };
        self.entries.len() + self.skipped.len() + terminator
    }
}

/// Walk `spec` over `source`, reading at most `max_entries` slots
pub fn walk_table<R: ReadBytes + ?Sized>(
    source: &R,
    spec: &TableSpec,
    policy: OutOfRangePolicy,
    max_entries: usize,
) -> TableWalk {
    let len = u64::from(source.len());
    let mut entries = Vec::new();
    let mut skipped = Vec::new();

    if spec.stride == 0 {
        debug!("Refusing to walk zero-stride table at 0x{:X}", spec.base);
        return TableWalk {
            entries,
            skipped,
            end: WalkEnd::TableEnd,
        };
    }

    let mut index: u32 = 0;
    let end = loop {
        if spec.count.is_some_and(|count| index >= count) {
            break WalkEnd::TableEnd;
        }
        if index as usize >= max_entries {
            break WalkEnd::Limit;
        }

        let slot = u64::from(spec.base) + u64::from(index) * u64::from(spec.stride);
        let field = slot + u64::from(spec.field);
        if field + u64::from(spec.width.bytes()) > len {
            break WalkEnd::SourceEnd;
        }
        let Ok(raw) = source.read_word(field as u32, spec.width, spec.order) else {
            break WalkEnd::SourceEnd;
        };

        if raw == 0 {
            break WalkEnd::Sentinel { index };
        }

        let target = u64::from(raw) + u64::from(spec.relative_to);
        if target >= len {
            match policy {
                OutOfRangePolicy::Stop => break WalkEnd::OutOfRange { index, target },
                OutOfRangePolicy::Skip => skipped.push(SkippedEntry {
                    index,
                    slot: slot as u32,
                    target,
                }),
            }
        } else {
            entries.push(TableEntry {
                index,
                slot: slot as u32,
                target: target as u32,
            });
        }

        index += 1;
    };

    debug!(
        "Table at 0x{:X}: {} entries, {} skipped, end {:?}",
        spec.base,
        entries.len(),
        skipped.len(),
        end
    );

    TableWalk {
        entries,
        skipped,
        end,
    }
}
