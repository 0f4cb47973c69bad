//! Bounds-checked access to binary blobs.
//!
//! Every scanner reads through [`ReadBytes`], which refuses any access that
//! would touch bytes past the end of the source. Integer reads come in both
//! byte orders and in 8/16/24/32-bit widths.

mod reader;

#[cfg(test)]
pub(crate) mod fixture;

pub use reader::{ByteOrder, ByteSource, ReadBytes, Width};
