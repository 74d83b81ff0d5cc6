//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - canonical columns of the cleaned table (`Column`)
//! - cleaned sales records (`CleanedRecord`, `CleanTable`)
//! - presentation filters and outputs (`FilterSet`, `Kpis`, `Breakdown`, `Dashboard`)
//! - run configuration (`EtlConfig`, `DashboardConfig`)

pub mod types;

pub use types::*;
