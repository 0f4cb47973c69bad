//! SDAT container: header, INFO records, FAT and SYMB names.

use encoding_rs::SHIFT_JIS;
use memchr::memchr;

use crate::error::{Error, Result};
use crate::source::{ByteSource, ReadBytes};

pub const MAGIC: &[u8; 4] = b"SDAT";
const BOM: u16 = 0xFEFF;
const VERSION: u16 = 0x0100;
const HEADER_SIZE: u32 = 0x30;
const MAX_NAME_LEN: u32 = 0x100;

/// Record kinds shared by INFO and SYMB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Seq = 0,
    Bank = 2,
    WaveArc = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Absolute offset in the source
    pub offset: u32,
    pub size: u32,
}

/// A member file as listed in the FAT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSpan {
    pub offset: u32,
    pub size: u32,
}

impl FileSpan {
    pub fn starts_with(&self, src: &ByteSource, magic: &[u8; 4]) -> bool {
        self.size >= 4
            && src
                .bytes_at(self.offset, 4)
                .is_ok_and(|bytes| bytes == magic.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sdat {
    pub offset: u32,
    pub size: u32,
    pub symb: Option<Block>,
    pub info: Block,
    pub fat: Block,
}

impl Sdat {
    /// Validate the container at a `SDAT` tag
    ///
    /// `Ok(None)` when the byte-order mark is wrong, i.e. the tag is most
    /// likely a coincidence. A correct mark with an unsupported version is
    /// `UnknownVersion`.
    pub fn parse(src: &ByteSource, offset: u32) -> Result<Option<Self>> {
        if src.bytes_at(offset, 4)? != MAGIC.as_slice() {
            return Ok(None);
        }
        let Ok(bom) = src.read_u16_le(offset + 4) else {
            return Ok(None);
        };
        if bom != BOM {
            return Ok(None);
        }
        let version = src.read_u16_le(offset + 6)?;
        if version != VERSION {
            return Err(Error::UnknownVersion(format!(
                "SDAT version 0x{:04X} at 0x{:X}",
                version, offset
            )));
        }

        src.bytes_at(offset, HEADER_SIZE)?;
        let size = src.read_u32_le(offset + 8)?;
        src.bytes_at(offset, size)?;

        let block = |at: u32, magic: &[u8; 4]| -> Result<Option<Block>> {
            let rel = src.read_u32_le(offset + at)?;
            let len = src.read_u32_le(offset + at + 4)?;
            if rel == 0 {
                return Ok(None);
            }
            if u64::from(rel) + u64::from(len) > u64::from(size) {
                return Err(Error::malformed(
                    offset + at,
                    format!("{} block exceeds SDAT size", String::from_utf8_lossy(magic)),
                ));
            }
            let block = Block {
                offset: offset + rel,
                size: len,
            };
            if src.bytes_at(block.offset, 4)? != magic.as_slice() {
                return Err(Error::malformed(
                    block.offset,
                    format!("missing {} tag", String::from_utf8_lossy(magic)),
                ));
            }
            Ok(Some(block))
        };

        let symb = block(0x10, b"SYMB")?;
        let info = block(0x18, b"INFO")?
            .ok_or_else(|| Error::malformed(offset + 0x18, "SDAT has no INFO block"))?;
        let fat = block(0x20, b"FAT ")?
            .ok_or_else(|| Error::malformed(offset + 0x20, "SDAT has no FAT block"))?;

        Ok(Some(Self {
            offset,
            size,
            symb,
            info,
            fat,
        }))
    }

    /// Non-empty INFO entries of one kind as `(index, absolute offset)`
    pub fn info_entries(
        &self,
        src: &ByteSource,
        kind: RecordKind,
        limit: usize,
    ) -> Result<Vec<(u32, u32)>> {
        let Some(record) = self.record(src, self.info, kind)? else {
            return Ok(Vec::new());
        };
        let count = src.read_u32_le(record)?;
        let mut entries = Vec::new();
        for index in (0..count).take(limit) {
            let rel = src.read_u32_le(slot(src, record, index)?)?;
            if rel != 0 {
                entries.push((index, src.seek(self.info.offset, u64::from(rel))?));
            }
        }
        Ok(entries)
    }

    /// Single INFO entry, `None` if the slot is empty or missing
    pub fn info_entry(
        &self,
        src: &ByteSource,
        kind: RecordKind,
        index: u32,
    ) -> Result<Option<u32>> {
        let Some(record) = self.record(src, self.info, kind)? else {
            return Ok(None);
        };
        if index >= src.read_u32_le(record)? {
            return Ok(None);
        }
        let rel = src.read_u32_le(slot(src, record, index)?)?;
        if rel == 0 {
            return Ok(None);
        }
        Ok(Some(src.seek(self.info.offset, u64::from(rel))?))
    }

    /// FAT lookup; the returned span lies inside the source
    pub fn file(&self, src: &ByteSource, id: u32) -> Result<FileSpan> {
        let count = src.read_u32_le(self.fat.offset + 8)?;
        if id >= count {
            return Err(Error::malformed(
                self.fat.offset,
                format!("file id {} past FAT end ({} files)", id, count),
            ));
        }
        let entry = src.seek(self.fat.offset, 0xC + u64::from(id) * 16)?;
        let rel = src.read_u32_le(entry)?;
        let size = src.read_u32_le(entry + 4)?;
        let offset = src.seek(self.offset, u64::from(rel))?;
        src.bytes_at(offset, size)?;
        Ok(FileSpan { offset, size })
    }

    /// Name from the SYMB block, if the archive carries one
    pub fn symbol(&self, src: &ByteSource, kind: RecordKind, index: u32) -> Option<String> {
        let symb = self.symb?;
        let record = self.record(src, symb, kind).ok()??;
        if index >= src.read_u32_le(record).ok()? {
            return None;
        }
        let rel = src.read_u32_le(slot(src, record, index).ok()?).ok()?;
        if rel == 0 {
            return None;
        }
        let at = symb.offset.checked_add(rel)?;
        let window = src.len().saturating_sub(at).min(MAX_NAME_LEN);
        let bytes = src.bytes_at(at, window).ok()?;
        let len = memchr(0, bytes).unwrap_or(bytes.len());
        let (decoded, _, _) = SHIFT_JIS.decode(&bytes[..len]);
        (!decoded.is_empty()).then(|| decoded.into_owned())
    }

    /// Absolute offset of the record of `kind` inside an INFO or SYMB block
    fn record(&self, src: &ByteSource, block: Block, kind: RecordKind) -> Result<Option<u32>> {
        let rel = src.read_u32_le(block.offset + 8 + kind as u32 * 4)?;
        if rel == 0 {
            return Ok(None);
        }
        Ok(Some(src.seek(block.offset, u64::from(rel))?))
    }
}

/// Offset of entry `index` in a record's `count`-prefixed pointer list
fn slot(src: &ByteSource, record: u32, index: u32) -> Result<u32> {
    src.seek(record, 4 + u64::from(index) * 4)
}
