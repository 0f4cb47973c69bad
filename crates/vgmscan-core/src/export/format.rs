//! ExportFormat trait and the flat row view of a report

use serde::Serialize;
use strum::Display;

use crate::model::{EngineVersion, TopLevel};
use crate::scanner::ScanReport;

/// Kind of object a row describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    InstrumentSet,
    Sequence,
    Sample,
}

/// One detected object, flattened for line-oriented formats
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRow {
    pub source: String,
    pub kind: ObjectKind,
    pub name: String,
    pub version: Option<EngineVersion>,
    pub offset: u32,
    pub length: u32,
    /// Kind-specific summary, e.g. `instruments=4 regions=9`
    pub detail: String,
}

/// Top-level objects in discovery order, then every sample collection
pub fn object_rows(report: &ScanReport) -> Vec<ObjectRow> {
    let graph = &report.graph;
    let mut rows = Vec::with_capacity(graph.top_level().len() + graph.sample_count());

    for object in graph.top_level() {
        let row = match *object {
            TopLevel::InstrumentSet(id) => {
                let set = &graph[id];
                let regions: usize = graph
                    .instruments_of(id)
                    .map(|instrument| instrument.regions.len())
                    .sum();
                ObjectRow {
                    source: report.source.clone(),
                    kind: ObjectKind::InstrumentSet,
                    name: set.name.clone(),
                    version: Some(set.version),
                    offset: set.source_offset,
                    length: set.length,
                    detail: format!(
                        "instruments={} regions={} samples={}",
                        set.instruments.len(),
                        regions,
                        set.used_sample_numbers.len()
                    ),
                }
            }
            TopLevel::Sequence(id) => {
                let sequence = &graph[id];
                ObjectRow {
                    source: report.source.clone(),
                    kind: ObjectKind::Sequence,
                    name: sequence.name.clone(),
                    version: Some(sequence.version),
                    offset: sequence.source_offset,
                    length: sequence.length,
                    detail: format!("tracks={}", sequence.tracks.len()),
                }
            }
        };
        rows.push(row);
    }

    for (_, sample) in graph.samples() {
        rows.push(ObjectRow {
            source: report.source.clone(),
            kind: ObjectKind::Sample,
            name: format!("sample_{:X}_{}", sample.directory, sample.sample_number),
            version: None,
            offset: sample.source_offset,
            length: sample.length,
            detail: format!(
                "directory=0x{:X} number={}",
                sample.directory, sample.sample_number
            ),
        });
    }
    rows
}

/// Trait for export format implementations
///
/// Provides a common interface for different export formats (TSV, JSON, etc.)
pub trait ExportFormat {
    /// Returns the header line for the format (empty for formats without headers)
    fn header(&self) -> Option<String>;

    fn format_row(&self, row: &ObjectRow) -> String;

    fn format_rows(&self, rows: &[ObjectRow]) -> String {
        let mut output = String::new();
        if let Some(header) = self.header() {
            output.push_str(&header);
            output.push('\n');
        }
        for row in rows {
            output.push_str(&self.format_row(row));
            output.push('\n');
        }
        output
    }

    fn format_report(&self, report: &ScanReport) -> String {
        self.format_rows(&object_rows(report))
    }
}
