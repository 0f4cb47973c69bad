//! Built-in engine families.

mod compile_snes;
mod hudson_snes;
mod konami_gx;
mod nds;
mod snes;
mod square_ps2;

pub use compile_snes::CompileSnesScanner;
pub use hudson_snes::HudsonSnesScanner;
pub use konami_gx::KonamiGxScanner;
pub use nds::NdsScanner;
pub use square_ps2::SquarePs2Scanner;

use crate::scanner::{Scanner, ScannerFactory};

fn boxed<S: Scanner + Default + 'static>() -> Box<dyn Scanner> {
    Box::new(S::default())
}

/// Registration order is sweep order
pub(crate) const BUILTIN: &[(&str, ScannerFactory)] = &[
    ("konami_gx", boxed::<KonamiGxScanner>),
    ("compile_snes", boxed::<CompileSnesScanner>),
    ("hudson_snes", boxed::<HudsonSnesScanner>),
    ("nds", boxed::<NdsScanner>),
    ("square_ps2", boxed::<SquarePs2Scanner>),
];
