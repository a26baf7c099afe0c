//! DNSSEC-aware reading of resolver answers.
//!
//! Nothing here verifies signatures: the AD bit set by a validating
//! resolver is taken as proof that the answer is authentic.

pub mod bitmap;
pub mod denial;

pub use bitmap::{BitmapError, TypeBitmap, TypeSet};
pub use denial::BlackLiesDetector;
