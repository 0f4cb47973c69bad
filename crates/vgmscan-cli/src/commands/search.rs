//! Search command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use vgmscan_core::{BytePattern, ByteSource};

use super::hex_utils::format_hex_bytes;

const CONTEXT_BYTES: usize = 16;

/// Run the search command
pub fn run(file: &Path, pattern: &str, limit: usize) -> Result<()> {
    let pattern = BytePattern::parse(pattern)?;
    let source = ByteSource::from_file(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    println!(
        "Searching {} (0x{:X} bytes) for pattern: {} ({} bytes)",
        source.name(),
        source.as_bytes().len(),
        pattern,
        pattern.len()
    );
    println!();

    let found = find_matches(&source, &pattern, limit);
    let bytes = source.as_bytes();
    for (i, &offset) in found.iter().enumerate() {
        println!("[{}] 0x{:X}", i + 1, offset);
        let start = offset as usize;
        let end = (start + CONTEXT_BYTES).min(bytes.len());
        println!("     {}", format_hex_bytes(&bytes[start..end]));
    }

    println!();
    if found.len() >= limit {
        println!("Stopped after {} matches", limit);
    } else {
        println!("Total matches: {}", found.len());
    }
    Ok(())
}

/// Offsets of the first `limit` matches, overlapping ones included
pub fn find_matches(source: &ByteSource, pattern: &BytePattern, limit: usize) -> Vec<u32> {
    pattern
        .find_iter(source.as_bytes())
        .take(limit)
        .map(|pos| pos as u32)
        .collect()
}
