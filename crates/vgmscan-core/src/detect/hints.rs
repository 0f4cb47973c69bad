use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Lookup interface of an external metadata database
///
/// Returns, for a resource group (e.g. `soundcpu`) and a key naming a table
/// role (e.g. `seq_table`), the address recorded for the current input.
pub trait HintProvider: Sync {
    fn hint(&self, group: &str, key: &str) -> Option<u32>;

    /// Whether the input carries a resource of this group at all
    fn has_group(&self, group: &str) -> bool;
}

/// Named group of hex-valued hints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintGroup {
    pub name: String,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

/// Hints for one input, as stored in a JSON hint file
///
/// ```json
/// { "name": "Salamander 2", "groups": [
///     { "name": "soundcpu", "values": { "seq_table": "0x1A0C" } } ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintSet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub groups: Vec<HintGroup>,
}

impl HintSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    pub fn group(&self, name: &str) -> Option<&HintGroup> {
        self.groups
            .iter()
            .find(|group| group.name.eq_ignore_ascii_case(name))
    }

    pub fn insert(&mut self, group: &str, key: &str, value: u32) {
        let index = match self
            .groups
            .iter()
            .position(|g| g.name.eq_ignore_ascii_case(group))
        {
            Some(index) => index,
            None => {
                self.groups.push(HintGroup {
                    name: group.to_string(),
                    values: BTreeMap::new(),
                });
                self.groups.len() - 1
            }
        };
        self.groups[index]
            .values
            .insert(key.to_string(), format!("0x{:X}", value));
    }

    pub fn with(mut self, group: &str, key: &str, value: u32) -> Self {
        self.insert(group, key, value);
        self
    }
}

impl HintProvider for HintSet {
    fn hint(&self, group: &str, key: &str) -> Option<u32> {
        let raw = self.group(group)?.values.get(key)?;
        let value = parse_hex(raw);
        if value.is_none() {
            warn!("Ignoring malformed hint {}/{} = {:?}", group, key, raw);
        }
        value
    }

    fn has_group(&self, group: &str) -> bool {
        self.group(group).is_some()
    }
}

/// Parse a hex value with or without a `0x` prefix
pub fn parse_hex(s: &str) -> Option<u32> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(s, 16).ok()
}

pub fn load_hints<P: AsRef<Path>>(path: P) -> Result<HintSet> {
    let content = fs::read_to_string(&path)?;
    let data = serde_json::from_str(&content)?;
    Ok(data)
}

pub fn save_hints<P: AsRef<Path>>(path: P, hints: &HintSet) -> Result<()> {
    let content = serde_json::to_string_pretty(hints)?;
    fs::write(path, content)?;
    Ok(())
}
