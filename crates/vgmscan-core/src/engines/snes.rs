//! SPC700 sound RAM helpers shared by the SNES engines.

use crate::build::{SampleSpan, brr_length};
use crate::detect::BytePattern;
use crate::error::{Error, Result};
use crate::scanner::ScanContext;
use crate::source::{ByteSource, ReadBytes};

/// Size of a full ARAM capture
pub const ARAM_SIZE: u32 = 0x10000;

/// `mov $F2,#$5D ; mov $F3,#dir` (DSP DIR register write)
const DIR_WRITE: &str = "8F 5D F2 8F ?? F3";

/// SNES drivers are only looked for in complete 64 KiB ARAM images
pub fn require_aram(src: &ByteSource) -> Result<()> {
    if src.len() != ARAM_SIZE {
        return Err(Error::PatternNotFound(format!(
            "not a 64 KiB ARAM image ({} bytes)",
            src.len()
        )));
    }
    Ok(())
}

/// Sample directory page written to DSP register DIR by the driver
pub fn find_sample_directory(ctx: &ScanContext<'_>) -> Result<u32> {
    let pattern = BytePattern::parse(DIR_WRITE)?;
    let at = ctx.find_pattern(&pattern)?;
    let page = ctx.source().read_u8(at + 4)?;
    Ok(u32::from(page) << 8)
}

/// Resolve sample `srcn` through the DIR table at `directory`
///
/// Each entry holds the BRR start and loop addresses.
pub fn resolve_dir_entry(src: &ByteSource, directory: u32, srcn: u32) -> Result<SampleSpan> {
    let entry = directory + srcn * 4;
    let start = u32::from(src.read_u16_le(entry)?);
    let loop_start = u32::from(src.read_u16_le(entry + 2)?);

    if start < directory {
        return Err(Error::unresolved(
            directory,
            srcn,
            format!("start 0x{:04X} below directory", start),
        ));
    }
    if loop_start < start {
        return Err(Error::unresolved(
            directory,
            srcn,
            format!("loop 0x{:04X} before start 0x{:04X}", loop_start, start),
        ));
    }
    let length = brr_length(src, start)
        .ok_or_else(|| Error::unresolved(directory, srcn, "BRR data has no end block"))?;

    Ok(SampleSpan {
        offset: start,
        length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fixture::Fixture;

    #[test]
    fn test_require_aram() {
        assert!(require_aram(&Fixture::new(0x10000).build()).is_ok());
        assert!(
            require_aram(&Fixture::new(0x8000).build())
                .unwrap_err()
                .is_absence()
        );
    }

    #[test]
    fn test_resolve_dir_entry() {
        let src = Fixture::new(0x10000)
            .u16_le(0x3C04, 0x4000)
            .u16_le(0x3C06, 0x4009)
            .u8(0x4009, 0x03)
            .build();
        let span = resolve_dir_entry(&src, 0x3C00, 1).unwrap();
        assert_eq!(span.offset, 0x4000);
        assert_eq!(span.length, 18);
    }

    #[test]
    fn test_resolve_rejects_bad_entries() {
        let src = Fixture::new(0x10000)
            .u16_le(0x3C00, 0x1000)
            .u16_le(0x3C04, 0x4000)
            .u16_le(0x3C06, 0x3000)
            .build();
        assert!(matches!(
            resolve_dir_entry(&src, 0x3C00, 0),
            Err(Error::UnresolvedSample { number: 0, .. })
        ));
        assert!(matches!(
            resolve_dir_entry(&src, 0x3C00, 1),
            Err(Error::UnresolvedSample { number: 1, .. })
        ));
    }
}
