//! Hex offset parsing and byte formatting utilities.

use anyhow::{Result, anyhow};

/// Parse a hex offset string (with or without 0x prefix).
///
/// Sources are addressed with 32-bit offsets, so anything wider is rejected.
pub fn parse_hex_offset(s: &str) -> Result<u32> {
    let digits = s
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|e| anyhow!("Invalid hex offset '{}': {}", s, e))
}

/// Space-separated upper-case hex bytes, e.g. `8D 06 CF`
pub fn format_hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
