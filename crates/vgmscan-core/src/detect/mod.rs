//! Entry-point discovery: wildcard byte patterns, externally supplied
//! location hints and fixed-stride pointer table walks.

mod hints;
mod pattern;
mod table;

pub use hints::*;
pub use pattern::*;
pub use table::*;
