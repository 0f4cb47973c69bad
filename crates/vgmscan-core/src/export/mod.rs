//! Report export: pretty JSON documents and flat TSV/NDJSON rows.

mod format;
mod json;
mod tsv;

pub use format::{ExportFormat, ObjectKind, ObjectRow, object_rows};
pub use json::{JsonExporter, format_json_entry, to_json, to_json_all};
pub use tsv::{TsvExporter, to_tsv};
