//! Input/output helpers.
//!
//! - raw CSV discovery + reading (`raw`)
//! - cleaned table CSV read/write (`clean`)
//! - columnar copy of the cleaned table (`parquet`)
//! - filtered-view download (`export`)

pub mod clean;
pub mod export;
pub mod parquet;
pub mod raw;

pub use clean::*;
pub use export::*;
pub use raw::*;
