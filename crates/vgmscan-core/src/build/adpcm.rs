//! Length of compressed sample runs.

use crate::source::ReadBytes;

const BRR_BLOCK: u32 = 9;
const SPU_BLOCK: u32 = 16;

/// Length of the SNES BRR sample starting at `start`
///
/// BRR data is a run of 9-byte blocks; bit 0 of the block header marks the
/// last one. `None` if the source ends first.
pub fn brr_length<R: ReadBytes + ?Sized>(src: &R, start: u32) -> Option<u32> {
    block_run(src, start, BRR_BLOCK, 0)
}

/// Length of the PS2 SPU ADPCM sample starting at `start`
///
/// 16-byte blocks; bit 0 of the flag byte at +1 marks the last one.
pub fn spu_adpcm_length<R: ReadBytes + ?Sized>(src: &R, start: u32) -> Option<u32> {
    block_run(src, start, SPU_BLOCK, 1)
}

fn block_run<R: ReadBytes + ?Sized>(src: &R, start: u32, block: u32, flag_at: u32) -> Option<u32> {
    let mut pos = start;
    while src.contains(pos, block) {
        let flags = src.read_u8(pos + flag_at).ok()?;
        pos += block;
        if flags & 1 != 0 {
            return Some(pos - start);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fixture::Fixture;

    #[test]
    fn test_brr_end_flag() {
        let src = Fixture::new(0x40)
            .u8(0x10, 0xB0)
            .u8(0x19, 0xB2)
            .u8(0x22, 0xB3)
            .build();
        assert_eq!(brr_length(&src, 0x10), Some(27));
        assert_eq!(brr_length(&src, 0x22), Some(9));
    }

    #[test]
    fn test_brr_without_end_block() {
        let src = Fixture::new(0x20).build();
        assert_eq!(brr_length(&src, 0), None);
        assert_eq!(brr_length(&src, 0x1C), None);
    }

    #[test]
    fn test_spu_end_flag() {
        let src = Fixture::new(0x60).u8(0x21, 0x02).u8(0x41, 0x01).build();
        assert_eq!(spu_adpcm_length(&src, 0x20), Some(0x30));
        assert_eq!(spu_adpcm_length(&src, 0x50), None);
    }
}
