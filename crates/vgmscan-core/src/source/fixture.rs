//! Synthetic image builder for tests.

use super::ByteSource;

pub(crate) struct Fixture {
    bytes: Vec<u8>,
}

impl Fixture {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    pub fn u8(mut self, offset: usize, value: u8) -> Self {
        self.bytes[offset] = value;
        self
    }

    pub fn u16_le(self, offset: usize, value: u16) -> Self {
        self.bytes(offset, &value.to_le_bytes())
    }

    pub fn u32_le(self, offset: usize, value: u32) -> Self {
        self.bytes(offset, &value.to_le_bytes())
    }

    pub fn u32_be(self, offset: usize, value: u32) -> Self {
        self.bytes(offset, &value.to_be_bytes())
    }

    pub fn bytes(mut self, offset: usize, data: &[u8]) -> Self {
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        self
    }

    pub fn build(self) -> ByteSource {
        ByteSource::new("fixture", self.bytes).expect("fixture fits in u32")
    }
}
