//! Nintendo DS sound archives (SDAT).
//!
//! SDAT containers are found by their tag, either standalone or embedded in
//! a ROM image. Sequences come from SSEQ files, instrument sets from SBNK
//! files whose samples live in SWAR wave archives.

mod sbnk;
mod sdat;
mod sseq;

use tracing::{debug, warn};

use crate::build::build_instrument_set;
use crate::error::{Error, Result};
use crate::scanner::{Discovery, ScanContext, Scanner};
use crate::source::ReadBytes;

use sbnk::BankLayout;
use sdat::{RecordKind, Sdat};

const NO_WAVE_ARCHIVE: u16 = 0xFFFF;

#[derive(Debug, Default)]
pub struct NdsScanner;

impl Scanner for NdsScanner {
    fn name(&self) -> &'static str {
        "nds"
    }

    fn discovery(&self) -> Discovery {
        Discovery::Signature
    }

    fn description(&self) -> &'static str {
        "Nintendo DS SDAT archives (SSEQ, SBNK, SWAR)"
    }

    fn scan(&self, ctx: &mut ScanContext<'_>) -> Result<()> {
        let src = ctx.source();
        let candidates = ctx.find_signatures(sdat::MAGIC);
        if candidates.is_empty() {
            return Err(Error::PatternNotFound("SDAT".into()));
        }

        let mut loaded = 0usize;
        let mut version_error = None;
        for offset in candidates {
            match Sdat::parse(src, offset) {
                Ok(Some(archive)) => {
                    loaded += 1;
                    load_archive(ctx, &archive);
                }
                Ok(None) => debug!("SDAT tag at 0x{:X} has no byte-order mark", offset),
                Err(e @ Error::UnknownVersion(_)) => {
                    warn!("{}", e);
                    version_error = Some(e);
                }
                Err(e) => ctx.record(offset, &e),
            }
        }

        if loaded == 0 {
            return Err(version_error
                .unwrap_or_else(|| Error::PatternNotFound("SDAT with valid header".into())));
        }
        Ok(())
    }
}

fn load_archive(ctx: &mut ScanContext<'_>, archive: &Sdat) {
    let src = ctx.source();
    let limit = ctx.config().max_table_entries;

    match archive.info_entries(src, RecordKind::Seq, limit) {
        Ok(entries) => {
            for (index, at) in entries {
                if let Err(e) = load_sequence(ctx, archive, index, at) {
                    ctx.record(at, &e);
                }
            }
        }
        Err(e) => ctx.record(archive.info.offset, &e),
    }

    match archive.info_entries(src, RecordKind::Bank, limit) {
        Ok(entries) => {
            for (index, at) in entries {
                if let Err(e) = load_bank(ctx, archive, index, at) {
                    ctx.record(at, &e);
                }
            }
        }
        Err(e) => ctx.record(archive.info.offset, &e),
    }
}

fn load_sequence(ctx: &mut ScanContext<'_>, archive: &Sdat, index: u32, at: u32) -> Result<()> {
    let src = ctx.source();
    let file = archive.file(src, u32::from(src.read_u16_le(at)?))?;
    if !file.starts_with(src, sseq::MAGIC) {
        debug!("SEQ {} does not point at an SSEQ file", index);
        return Ok(());
    }
    let name = archive
        .symbol(src, RecordKind::Seq, index)
        .unwrap_or_else(|| format!("SSEQ_{:03}", index));
    let sequence = sseq::parse(src, file, name)?;
    ctx.add_sequence(sequence);
    Ok(())
}

fn load_bank(ctx: &mut ScanContext<'_>, archive: &Sdat, index: u32, at: u32) -> Result<()> {
    let src = ctx.source();
    let file = archive.file(src, u32::from(src.read_u16_le(at)?))?;
    if !file.starts_with(src, sbnk::MAGIC) {
        debug!("BANK {} does not point at an SBNK file", index);
        return Ok(());
    }

    let mut wave_archives = [None; 4];
    for (slot, wave_archive) in wave_archives.iter_mut().enumerate() {
        let id = src.read_u16_le(at + 4 + slot as u32 * 2)?;
        if id == NO_WAVE_ARCHIVE {
            continue;
        }
        *wave_archive = wave_archive_file(ctx, archive, u32::from(id));
    }

    let layout = BankLayout {
        name: archive
            .symbol(src, RecordKind::Bank, index)
            .unwrap_or_else(|| format!("SBNK_{:03}", index)),
        size: file.size,
        wave_archives,
    };
    build_instrument_set(ctx, &layout, file.offset)?;
    Ok(())
}

/// Absolute offset of the SWAR behind WAVEARC entry `id`
fn wave_archive_file(ctx: &ScanContext<'_>, archive: &Sdat, id: u32) -> Option<u32> {
    let src = ctx.source();
    let resolved = archive
        .info_entry(src, RecordKind::WaveArc, id)
        .and_then(|entry| match entry {
            Some(at) => archive.file(src, u32::from(src.read_u16_le(at)?)).map(Some),
            None => Ok(None),
        });
    match resolved {
        Ok(Some(file)) if file.starts_with(src, sbnk::SWAR_MAGIC) => Some(file.offset),
        Ok(_) => {
            debug!("WAVEARC {} has no SWAR file", id);
            None
        }
        Err(e) => {
            debug!("WAVEARC {} unreadable: {}", id, e);
            None
        }
    }
}
