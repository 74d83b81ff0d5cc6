//! `sales-dashboard` library crate.
//!
//! The binary (`sales`) is a thin wrapper around this library so that:
//!
//! - the transform pipeline and aggregates are testable without spawning processes
//! - the CLI report and the TUI share one session/aggregation path

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod etl;
pub mod io;
pub mod plot;
pub mod report;
pub mod tui;
