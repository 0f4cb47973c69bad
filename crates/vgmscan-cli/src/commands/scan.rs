//! Scan command implementation.
//!
//! Every file is scanned on its own rayon worker into its own report;
//! reports are rendered together once all scans are done.

use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use owo_colors::{OwoColorize, Style};
use rayon::prelude::*;
use tracing::{error, info};
use vgmscan_core::export::object_rows;
use vgmscan_core::{
    ByteSource, ExportFormat, HintProvider, HintSet, ScanConfig, ScanReport, ScanRequest,
    ScannerRegistry, ScannerStatus, Session, TsvExporter, load_hints, to_json, to_json_all,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

pub struct ScanArgs {
    pub files: Vec<PathBuf>,
    pub engine: Option<String>,
    pub hints: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
}

/// Run the scan command
pub fn run(args: ScanArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => ScanConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ScanConfig::default(),
    };
    let hints = match &args.hints {
        Some(path) => {
            let hints = load_hints(path)
                .with_context(|| format!("Failed to load hints {}", path.display()))?;
            info!("Loaded hints '{}' ({} groups)", hints.name, hints.groups.len());
            Some(hints)
        }
        None => None,
    };

    let registry = ScannerRegistry::builtin();
    if let Some(engine) = &args.engine {
        registry.lookup(engine)?;
    }
    let session = Session::new(&registry, config);

    let results: Vec<(&PathBuf, Result<ScanReport>)> = args
        .files
        .par_iter()
        .map(|path| {
            let report = scan_file(&session, path, args.engine.as_deref(), hints.as_ref());
            (path, report)
        })
        .collect();

    let mut reports = Vec::with_capacity(results.len());
    let mut failed = 0usize;
    for (path, result) in results {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!("{}: {:#}", path.display(), e);
                failed += 1;
            }
        }
    }

    let color = args.output.is_none() && std::io::stdout().is_terminal();
    let rendered = render(&reports, args.format, color)?;
    match &args.output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote report to {}", path.display());
        }
        None => print!("{}", rendered),
    }

    if failed > 0 {
        bail!("{} of {} files could not be scanned", failed, args.files.len());
    }
    Ok(())
}

fn scan_file(
    session: &Session<'_>,
    path: &Path,
    engine: Option<&str>,
    hints: Option<&HintSet>,
) -> Result<ScanReport> {
    let source = ByteSource::from_file(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut request = match engine {
        Some(name) => ScanRequest::engine(name),
        None => ScanRequest::sweep(),
    };
    if let Some(hints) = hints {
        request = request.with_hints(hints as &dyn HintProvider);
    }

    let report = session.scan(&source, &request);
    info!(
        "{}: {} objects, {} diagnostics",
        report.source,
        report.graph.top_level().len(),
        report.diagnostics.len()
    );
    Ok(report)
}

pub fn render(reports: &[ScanReport], format: OutputFormat, color: bool) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => reports
            .iter()
            .map(|report| render_text(report, color))
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => {
            let mut out = match reports {
                [report] => to_json(report)?,
                _ => to_json_all(reports)?,
            };
            out.push('\n');
            out
        }
        OutputFormat::Tsv => {
            let rows: Vec<_> = reports.iter().flat_map(object_rows).collect();
            TsvExporter.format_rows(&rows)
        }
    })
}

fn paint(text: &str, style: Style, color: bool) -> String {
    if color {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

fn status_line(status: &ScannerStatus) -> (String, Style) {
    match status {
        ScannerStatus::Detected { objects } => (
            format!("detected ({} objects)", objects),
            Style::new().green().bold(),
        ),
        ScannerStatus::NotPresent { reason } => {
            (format!("not present: {}", reason), Style::new().dimmed())
        }
        ScannerStatus::UnknownVersion { reason } => {
            (format!("unknown version: {}", reason), Style::new().yellow())
        }
        ScannerStatus::Failed { reason } => (format!("failed: {}", reason), Style::new().red()),
        ScannerStatus::Skipped => ("skipped".to_string(), Style::new().dimmed()),
    }
}

/// Human-readable summary of one report
pub fn render_text(report: &ScanReport, color: bool) -> String {
    let mut out = String::new();
    let title = format!("== {} (0x{:X} bytes) ==", report.source, report.source_len);
    out.push_str(&paint(&title, Style::new().bold(), color));
    out.push('\n');

    let width = report
        .outcomes
        .iter()
        .map(|o| o.scanner.len())
        .max()
        .unwrap_or(0);
    for outcome in &report.outcomes {
        let (text, style) = status_line(&outcome.status);
        out.push_str(&format!(
            "  {:<width$}  {}\n",
            outcome.scanner,
            paint(&text, style, color),
            width = width
        ));
    }

    let rows = object_rows(report);
    if !rows.is_empty() {
        out.push_str("\n  Objects:\n");
        for row in &rows {
            let version = row.version.map(|v| v.to_string()).unwrap_or_default();
            out.push_str(&format!(
                "    {:<14} 0x{:08X} {:>8}  {:<14} {}  {}\n",
                row.kind.to_string(),
                row.offset,
                row.length,
                version,
                row.name,
                row.detail
            ));
        }
    }

    if !report.diagnostics.is_empty() {
        out.push_str(&format!("\n  Diagnostics ({}):\n", report.diagnostics.len()));
        for diagnostic in &report.diagnostics {
            let line = format!(
                "[{}] 0x{:X} {}: {}",
                diagnostic.scanner, diagnostic.offset, diagnostic.kind, diagnostic.message
            );
            out.push_str("    ");
            out.push_str(&paint(&line, Style::new().yellow(), color));
            out.push('\n');
        }
    }
    out
}
