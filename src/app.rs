//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - runs the transform pipeline
//! - prints reports or launches the dashboard
//! - writes optional exports

use std::collections::BTreeSet;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, EtlArgs, ReportArgs, TuiArgs};
use crate::domain::{DashboardConfig, EXPORT_FILE_NAME, EtlConfig, FilterSet};
use crate::error::AppError;

pub mod session;

/// Entry point for the `sales` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // We want `sales` and `sales --data x.csv` to behave like `sales tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Etl(args) => {
            init_logging("info");
            handle_etl(args)
        }
        Command::Report(args) => {
            init_logging("info");
            handle_report(args)
        }
        Command::Tui(args) => {
            // Log lines would tear the alternate screen; keep them quiet by default.
            init_logging("warn");
            handle_tui(args)
        }
    }
}

/// Install the stderr subscriber; `RUST_LOG` overrides `default_filter`.
fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_etl(args: EtlArgs) -> Result<(), AppError> {
    let config = etl_config_from_args(&args);
    crate::etl::run(&config)?;
    Ok(())
}

fn handle_report(args: ReportArgs) -> Result<(), AppError> {
    let config = dashboard_config_from_report(&args);
    let session = session::Session::open(&config.data_path)?;
    let dashboard = session.dashboard(&config.filters);

    if args.json {
        let json = serde_json::to_string_pretty(&dashboard)
            .map_err(|e| AppError::io(format!("Failed to serialize dashboard: {e}")))?;
        println!("{json}");
    } else {
        println!("{}", crate::report::format_dashboard(&dashboard));
    }

    // Optional export.
    if let Some(path) = &config.export_path {
        let view = session.apply(&config.filters);
        let bytes = crate::io::export::export_filtered_csv(&view)?;
        crate::io::export::write_export(path, &bytes)?;
        eprintln!("Wrote {} rows to {}", view.len(), path.display());
    }

    Ok(())
}

fn handle_tui(args: TuiArgs) -> Result<(), AppError> {
    crate::tui::run(dashboard_config_from_tui(&args))
}

pub fn etl_config_from_args(args: &EtlArgs) -> EtlConfig {
    EtlConfig {
        raw_dir: args.raw_dir.clone(),
        out_dir: args.out_dir.clone(),
        write_parquet: !args.no_parquet,
    }
}

pub fn dashboard_config_from_report(args: &ReportArgs) -> DashboardConfig {
    DashboardConfig {
        data_path: args.data.data.clone(),
        filters: FilterSet {
            countries: args.countries.iter().cloned().collect::<BTreeSet<_>>(),
            months: args.months.iter().cloned().collect::<BTreeSet<_>>(),
            include_returns: !args.exclude_returns,
        },
        export_path: args.export.clone(),
    }
}

pub fn dashboard_config_from_tui(args: &TuiArgs) -> DashboardConfig {
    DashboardConfig {
        data_path: args.data.data.clone(),
        filters: FilterSet::default(),
        export_path: Some(args.export_dir.join(EXPORT_FILE_NAME)),
    }
}

/// Rewrite argv so `sales` defaults to `sales tui`.
///
/// Rules:
/// - `sales`                      -> `sales tui`
/// - `sales --data x.csv ...`     -> `sales tui --data x.csv ...`
/// - `sales --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "etl" | "report" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
