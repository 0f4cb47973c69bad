use std::fmt;

use memchr::memchr;

use crate::error::{Error, Result};

/// Byte sequence with "don't care" positions
///
/// Each cell is either a concrete byte that must match or a wildcard that
/// matches anything. Patterns come either from text (`"8D 06 ?? 5D"`) or
/// from a byte string plus a mask where `x` means "must match" and `?`
/// means "ignore".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BytePattern {
    cells: Vec<Option<u8>>,
    anchor: Option<usize>,
}

impl BytePattern {
    pub fn from_cells(cells: Vec<Option<u8>>) -> Result<Self> {
        if cells.is_empty() {
            return Err(Error::InvalidPattern("pattern is empty".to_string()));
        }
        let anchor = cells.iter().position(Option::is_some);
        Ok(Self { cells, anchor })
    }

    /// Parse whitespace-separated hex bytes, `??` or `?` for wildcards
    pub fn parse(pattern: &str) -> Result<Self> {
        let mut cells = Vec::new();
        for token in pattern.split_whitespace() {
            if token == "??" || token == "?" {
                cells.push(None);
                continue;
            }

            let value = u8::from_str_radix(token, 16).map_err(|e| {
                Error::InvalidPattern(format!("invalid token '{}': {}", token, e))
            })?;
            cells.push(Some(value));
        }
        Self::from_cells(cells)
    }

    /// Build from raw bytes and an `x`/`?` mask of the same length
    pub fn from_masked(bytes: &[u8], mask: &str) -> Result<Self> {
        if bytes.len() != mask.len() {
            return Err(Error::InvalidPattern(format!(
                "mask length {} does not match pattern length {}",
                mask.len(),
                bytes.len()
            )));
        }

        let cells = bytes
            .iter()
            .zip(mask.bytes())
            .map(|(&byte, m)| match m {
                b'x' | b'X' => Ok(Some(byte)),
                b'?' => Ok(None),
                other => Err(Error::InvalidPattern(format!(
                    "invalid mask character '{}'",
                    other as char
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_cells(cells)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Option<u8>] {
        &self.cells
    }

    /// True if the pattern matches `haystack` starting at `pos`
    pub fn matches_at(&self, haystack: &[u8], pos: usize) -> bool {
        let Some(window) = haystack.get(pos..pos.saturating_add(self.cells.len())) else {
            return false;
        };
        if window.len() != self.cells.len() {
            return false;
        }
        self.cells
            .iter()
            .zip(window)
            .all(|(cell, byte)| cell.is_none_or(|expected| expected == *byte))
    }

    /// First match at or after `start`
    pub fn find_from(&self, haystack: &[u8], start: usize) -> Option<usize> {
        let last = haystack.len().checked_sub(self.cells.len())?;
        if start > last {
            return None;
        }

        let Some(anchor) = self.anchor else {
            // All wildcards: every position matches.
            return Some(start);
        };
        let Some(anchor_byte) = self.cells[anchor] else {
            return None;
        };

        let mut pos = start;
        while pos <= last {
            let from = pos + anchor;
            let hit = memchr(anchor_byte, &haystack[from..=last + anchor])?;
            let candidate = pos + hit;
            if self.matches_at(haystack, candidate) {
                return Some(candidate);
            }
            pos = candidate + 1;
        }
        None
    }

    pub fn find(&self, haystack: &[u8]) -> Option<usize> {
        self.find_from(haystack, 0)
    }

    /// Every match position, overlapping matches included
    pub fn find_iter<'p, 'h>(&'p self, haystack: &'h [u8]) -> Matches<'p, 'h> {
        Matches {
            pattern: self,
            haystack,
            next: 0,
        }
    }
}

impl fmt::Display for BytePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .cells
            .iter()
            .map(|b| match b {
                Some(value) => format!("{:02X}", value),
                None => "??".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ");
        f.write_str(&text)
    }
}

pub struct Matches<'p, 'h> {
    pattern: &'p BytePattern,
    haystack: &'h [u8],
    next: usize,
}

impl Iterator for Matches<'_, '_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let pos = self.pattern.find_from(self.haystack, self.next)?;
        self.next = pos + 1;
        Some(pos)
    }
}
