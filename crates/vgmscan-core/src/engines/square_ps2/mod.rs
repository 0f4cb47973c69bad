//! Square PS2 sound driver (`BGM ` sequences and `WD` wave data).
//!
//! Both file kinds are found by tag anywhere in a memory or disc dump and
//! filtered by their reserved header fields before parsing.

mod bgm;
mod wd;

use tracing::debug;

use crate::build::build_instrument_set;
use crate::error::{Error, Result};
use crate::scanner::{Discovery, ScanContext, Scanner};

use wd::WdLayout;

#[derive(Debug, Default)]
pub struct SquarePs2Scanner;

impl Scanner for SquarePs2Scanner {
    fn name(&self) -> &'static str {
        "square_ps2"
    }

    fn discovery(&self) -> Discovery {
        Discovery::Signature
    }

    fn description(&self) -> &'static str {
        "Square PS2 BGM sequences and WD instrument sets"
    }

    fn scan(&self, ctx: &mut ScanContext<'_>) -> Result<()> {
        let src = ctx.source();
        let sequences =
            ctx.find_signatures_where(bgm::MAGIC, |offset| bgm::looks_valid(src, offset));
        let sets = ctx.find_signatures_where(wd::MAGIC, |offset| wd::looks_valid(src, offset));
        if sequences.is_empty() && sets.is_empty() {
            return Err(Error::PatternNotFound("BGM or WD header".into()));
        }
        debug!("{} BGM and {} WD candidates", sequences.len(), sets.len());

        for offset in sequences {
            match bgm::parse(src, offset) {
                Ok(sequence) => {
                    ctx.add_sequence(sequence);
                }
                Err(e) => ctx.record(offset, &e),
            }
        }
        for offset in sets {
            if let Err(e) = build_instrument_set(ctx, &WdLayout, offset) {
                ctx.record(offset, &e);
            }
        }
        Ok(())
    }
}
