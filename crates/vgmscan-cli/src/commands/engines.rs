//! Engines command implementation.

use anyhow::Result;
use owo_colors::OwoColorize;
use vgmscan_core::ScannerRegistry;

/// Run the engines command
pub fn run() -> Result<()> {
    let registry = ScannerRegistry::builtin();
    println!("{} built-in engines (sweep order):", registry.len());
    println!();
    for line in engine_lines(&registry) {
        println!("{}", line);
    }
    Ok(())
}

/// One `name  discovery  description` line per scanner, aligned
fn engine_lines(registry: &ScannerRegistry) -> Vec<String> {
    let width = registry.names().iter().map(|n| n.len()).max().unwrap_or(0);
    registry
        .all()
        .map(|(name, scanner)| {
            format!(
                "  {:<width$}  {:<9}  {}",
                name.bold(),
                scanner.discovery().to_string(),
                scanner.description(),
                width = width
            )
        })
        .collect()
}
