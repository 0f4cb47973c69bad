//! Hexdump command implementation.
//!
//! Displays raw bytes of a dump in traditional hexdump format, useful for
//! checking table layouts by hand.
//!
//! # Output Format
//!
//! ```text
//! 0x00001A00: 48 65 6C 6C 6F 20 57 6F  72 6C 64 00 00 00 00 00  |Hello World.....|
//! ```

use std::path::Path;

use anyhow::{Context, Result, bail};
use vgmscan_core::{ByteSource, ReadBytes};

/// Run the hexdump command
pub fn run(file: &Path, offset: u32, size: usize, ascii: bool) -> Result<()> {
    let source = ByteSource::from_file(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    if offset >= source.len() {
        bail!(
            "Offset 0x{:X} is past the end of {} (0x{:X} bytes)",
            offset,
            source.name(),
            source.len()
        );
    }

    // Clamp to the end of the source instead of failing the whole dump
    let available = source.len() - offset;
    let len = u32::try_from(size).unwrap_or(u32::MAX).min(available);
    let bytes = source.bytes_at(offset, len)?;

    println!(
        "Hexdump of {} at 0x{:X} ({} bytes):",
        source.name(),
        offset,
        bytes.len()
    );
    println!();
    print!("{}", format_dump(offset, bytes, ascii));

    Ok(())
}

/// Render `bytes` as hexdump lines whose addresses start at `base`
pub fn format_dump(base: u32, bytes: &[u8], ascii: bool) -> String {
    let mut out = String::new();

    for (i, chunk) in bytes.chunks(16).enumerate() {
        let address = u64::from(base) + i as u64 * 16;
        out.push_str(&format!("0x{:08X}: ", address));

        for (j, byte) in chunk.iter().enumerate() {
            if j == 8 {
                out.push(' ');
            }
            out.push_str(&format!("{:02X} ", byte));
        }

        // Padding for incomplete lines
        for j in chunk.len()..16 {
            if j == 8 {
                out.push(' ');
            }
            out.push_str("   ");
        }

        if ascii {
            out.push_str(" |");
            for &byte in chunk {
                out.push(if (0x20..0x7F).contains(&byte) {
                    byte as char
                } else {
                    '.'
                });
            }
            for _ in chunk.len()..16 {
                out.push(' ');
            }
            out.push('|');
        }

        out.push('\n');
    }
    out
}
