//! JSON export format implementation

use chrono::Utc;
use serde::Serialize;
use serde_json::{Value as JsonValue, json};

use super::format::{ExportFormat, ObjectRow};
use crate::error::Result;
use crate::scanner::ScanReport;

const GENERATOR: &str = concat!("vgmscan ", env!("CARGO_PKG_VERSION"));

/// JSON exporter (one object per line, NDJSON format)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

impl ExportFormat for JsonExporter {
    fn header(&self) -> Option<String> {
        None // JSON doesn't need a header
    }

    fn format_row(&self, row: &ObjectRow) -> String {
        format_json_entry(row).to_string()
    }
}

pub fn format_json_entry(row: &ObjectRow) -> JsonValue {
    json!({
        "source": row.source,
        "kind": row.kind,
        "name": row.name,
        "version": row.version.map(|v| v.to_string()),
        "offset": row.offset,
        "length": row.length,
        "detail": row.detail
    })
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    generated_at: String,
    generator: &'static str,
    #[serde(flatten)]
    report: &'a ScanReport,
}

/// Full report as pretty-printed JSON: graph, diagnostics and outcomes
pub fn to_json(report: &ScanReport) -> Result<String> {
    let document = ReportDocument {
        generated_at: Utc::now().to_rfc3339(),
        generator: GENERATOR,
        report,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

#[derive(Serialize)]
struct BatchDocument<'a> {
    generated_at: String,
    generator: &'static str,
    reports: &'a [ScanReport],
}

/// Several reports in one document, for multi-file scans
pub fn to_json_all(reports: &[ScanReport]) -> Result<String> {
    let document = BatchDocument {
        generated_at: Utc::now().to_rfc3339(),
        generator: GENERATOR,
        reports,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}
