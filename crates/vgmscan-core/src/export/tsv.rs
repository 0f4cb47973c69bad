//! TSV export format implementation

use super::format::{ExportFormat, ObjectRow};
use crate::scanner::ScanReport;

const COLUMNS: [&str; 7] = [
    "source", "kind", "name", "version", "offset", "length", "detail",
];

/// TSV (Tab-Separated Values) exporter
#[derive(Debug, Clone, Copy, Default)]
pub struct TsvExporter;

impl ExportFormat for TsvExporter {
    fn header(&self) -> Option<String> {
        Some(COLUMNS.join("\t"))
    }

    fn format_row(&self, row: &ObjectRow) -> String {
        let version = row.version.map(|v| v.to_string()).unwrap_or_default();
        [
            sanitize(&row.source),
            row.kind.to_string(),
            sanitize(&row.name),
            version,
            format!("0x{:X}", row.offset),
            row.length.to_string(),
            row.detail.clone(),
        ]
        .join("\t")
    }
}

/// Tabs and newlines in names would break the column layout
fn sanitize(field: &str) -> String {
    field.replace(['\t', '\n', '\r'], " ")
}

/// Render a report as TSV with a header line
pub fn to_tsv(report: &ScanReport) -> String {
    TsvExporter.format_report(report)
}
