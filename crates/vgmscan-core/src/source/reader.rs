use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{Error, Result};

/// Byte order of a multi-byte field
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum ByteOrder {
    Little,
    Big,
}

/// Width of a pointer or integer field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Width {
    U8,
    U16,
    U24,
    U32,
}

impl Width {
    pub fn bytes(self) -> u32 {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U24 => 3,
            Self::U32 => 4,
        }
    }
}

/// Range-checked reads over a finite byte buffer
///
/// Implementors only provide [`len`](ReadBytes::len) and
/// [`bytes_at`](ReadBytes::bytes_at); every integer reader is built on top of
/// those two, so a read succeeds iff `offset + width <= len`.
pub trait ReadBytes {
    fn len(&self) -> u32;

    fn bytes_at(&self, offset: u32, len: u32) -> Result<&[u8]>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `width` bytes starting at `offset` are inside the source
    fn contains(&self, offset: u32, width: u32) -> bool {
        u64::from(offset) + u64::from(width) <= u64::from(self.len())
    }

    /// `base + delta`, failing if the result lies past the end of the source
    fn seek(&self, base: u32, delta: u64) -> Result<u32> {
        let target = u64::from(base) + delta;
        if target > u64::from(self.len()) {
            return Err(Error::OutOfRange {
                offset: target,
                width: 0,
                len: self.len(),
            });
        }
        Ok(target as u32)
    }

    fn read_u8(&self, offset: u32) -> Result<u8> {
        Ok(self.bytes_at(offset, 1)?[0])
    }

    fn read_u16(&self, offset: u32, order: ByteOrder) -> Result<u16> {
        let b = self.bytes_at(offset, 2)?;
        let raw = [b[0], b[1]];
        Ok(match order {
            ByteOrder::Little => u16::from_le_bytes(raw),
            ByteOrder::Big => u16::from_be_bytes(raw),
        })
    }

    fn read_u24(&self, offset: u32, order: ByteOrder) -> Result<u32> {
        let b = self.bytes_at(offset, 3)?;
        Ok(match order {
            ByteOrder::Little => u32::from_le_bytes([b[0], b[1], b[2], 0]),
            ByteOrder::Big => u32::from_be_bytes([0, b[0], b[1], b[2]]),
        })
    }

    fn read_u32(&self, offset: u32, order: ByteOrder) -> Result<u32> {
        let b = self.bytes_at(offset, 4)?;
        let raw = [b[0], b[1], b[2], b[3]];
        Ok(match order {
            ByteOrder::Little => u32::from_le_bytes(raw),
            ByteOrder::Big => u32::from_be_bytes(raw),
        })
    }

    /// Read a field of the given width, zero-extended to 32 bits
    fn read_word(&self, offset: u32, width: Width, order: ByteOrder) -> Result<u32> {
        match width {
            Width::U8 => self.read_u8(offset).map(u32::from),
            Width::U16 => self.read_u16(offset, order).map(u32::from),
            Width::U24 => self.read_u24(offset, order),
            Width::U32 => self.read_u32(offset, order),
        }
    }

    fn read_u16_le(&self, offset: u32) -> Result<u16> {
        self.read_u16(offset, ByteOrder::Little)
    }

    fn read_u32_le(&self, offset: u32) -> Result<u32> {
        self.read_u32(offset, ByteOrder::Little)
    }

    fn read_u32_be(&self, offset: u32) -> Result<u32> {
        self.read_u32(offset, ByteOrder::Big)
    }
}

/// Read-only view over a ROM image or a sound-chip memory capture
///
/// Cloning is cheap: the backing buffer is shared.
#[derive(Clone, PartialEq, Eq)]
pub struct ByteSource {
    name: Arc<str>,
    bytes: Arc<[u8]>,
}

impl ByteSource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes: Vec<u8> = bytes.into();
        if bytes.len() > u32::MAX as usize {
            return Err(Error::SourceTooLarge(bytes.len()));
        }
        Ok(Self {
            name: Arc::from(name.into()),
            bytes: Arc::from(bytes),
        })
    }

    /// Read a whole file into memory
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(name, bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl ReadBytes for ByteSource {
    fn len(&self) -> u32 {
        self.bytes.len() as u32
    }

    fn bytes_at(&self, offset: u32, len: u32) -> Result<&[u8]> {
        let start = offset as usize;
        let end = u64::from(offset) + u64::from(len);
        if end > self.bytes.len() as u64 {
            return Err(Error::OutOfRange {
                offset: u64::from(offset),
                width: len,
                len: self.len(),
            });
        }
        Ok(&self.bytes[start..end as usize])
    }
}

impl fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteSource")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(bytes: &[u8]) -> ByteSource {
        ByteSource::new("test", bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_read_succeeds_iff_in_bounds() {
        for len in 0u32..8 {
            let src = source(&vec![0xAB; len as usize]);
            for offset in 0u32..10 {
                for width in [Width::U8, Width::U16, Width::U24, Width::U32] {
                    let ok = src.read_word(offset, width, ByteOrder::Little).is_ok();
                    assert_eq!(
                        ok,
                        offset + width.bytes() <= len,
                        "len={len} offset={offset} width={width:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_read_near_u32_max_does_not_overflow() {
        let src = source(&[1, 2, 3, 4]);
        assert!(src.read_u32_le(u32::MAX).is_err());
        assert!(src.read_u8(u32::MAX).is_err());
        assert!(src.bytes_at(2, u32::MAX).is_err());
    }

    #[test]
    fn test_byte_orders() {
        let src = source(&[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(src.read_u16(0, ByteOrder::Little).unwrap(), 0x3412);
        assert_eq!(src.read_u16(0, ByteOrder::Big).unwrap(), 0x1234);
        assert_eq!(src.read_u24(1, ByteOrder::Little).unwrap(), 0x785634);
        assert_eq!(src.read_u24(1, ByteOrder::Big).unwrap(), 0x345678);
        assert_eq!(src.read_u32_le(0).unwrap(), 0x78563412);
        assert_eq!(src.read_u32_be(0).unwrap(), 0x12345678);
    }

    #[test]
    fn test_out_of_range_reports_request() {
        let src = source(&[0; 6]);
        match src.read_u32_be(4) {
            Err(Error::OutOfRange { offset, width, len }) => {
                assert_eq!(offset, 4);
                assert_eq!(width, 4);
                assert_eq!(len, 6);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_seek() {
        let src = source(&[0; 0x10]);
        assert_eq!(src.seek(4, 8).unwrap(), 12);
        assert_eq!(src.seek(0, 0x10).unwrap(), 0x10);
        assert!(src.seek(8, 9).is_err());
        assert!(src.seek(u32::MAX, u64::from(u32::MAX)).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.bin");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let src = ByteSource::from_file(&path).unwrap();
        assert_eq!(src.name(), "dump.bin");
        assert_eq!(src.len(), 3);
        assert_eq!(src.read_u8(2).unwrap(), 3);
    }

    #[test]
    fn test_from_missing_file() {
        let err = ByteSource::from_file("/nonexistent/dump.bin").unwrap_err();
        assert!(err.is_not_found());
    }
}
