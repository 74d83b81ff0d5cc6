//! Command-line parsing for the sales ETL and dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the pipeline and aggregation code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sales", version, about = "Sales ETL and revenue dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Clean the raw CSV exports and write the processed table.
    Etl(EtlArgs),
    /// Print the dashboard for a filter selection (text or JSON).
    Report(ReportArgs),
    /// Launch the interactive dashboard.
    ///
    /// This uses the same session and aggregates as `sales report`, but renders
    /// them in a terminal UI using Ratatui.
    Tui(TuiArgs),
}

/// Options for the transform pipeline.
#[derive(Debug, Args, Clone)]
pub struct EtlArgs {
    /// Directory holding the raw `*.csv` exports.
    #[arg(long, default_value = "data/raw")]
    pub raw_dir: PathBuf,

    /// Directory the cleaned table is written to.
    #[arg(long, default_value = "data/processed")]
    pub out_dir: PathBuf,

    /// Skip the Parquet copy.
    #[arg(long)]
    pub no_parquet: bool,
}

/// Input shared by the presentation commands.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Cleaned table produced by `sales etl`.
    #[arg(long, default_value = "data/processed/sales_clean.csv")]
    pub data: PathBuf,
}

/// Options for the text/JSON report.
#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Keep only these countries (repeatable).
    #[arg(long = "country", value_name = "COUNTRY")]
    pub countries: Vec<String>,

    /// Keep only these months, `YYYY-MM` (repeatable).
    #[arg(long = "month", value_name = "YYYY-MM")]
    pub months: Vec<String>,

    /// Drop return lines (negative quantity).
    #[arg(long)]
    pub exclude_returns: bool,

    /// Print the dashboard as JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Also write the filtered rows to this CSV file.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,
}

/// Options for the interactive dashboard.
#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Directory the download action writes `sales_filtered.csv` into.
    #[arg(long, default_value = ".")]
    pub export_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_flags_repeat() {
        let cli = Cli::parse_from([
            "sales",
            "report",
            "--country",
            "France",
            "--country",
            "Spain",
            "--month",
            "2011-03",
            "--exclude-returns",
            "--json",
        ]);
        let Command::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.countries, vec!["France", "Spain"]);
        assert_eq!(args.months, vec!["2011-03"]);
        assert!(args.exclude_returns);
        assert!(args.json);
        assert_eq!(args.data.data, PathBuf::from("data/processed/sales_clean.csv"));
    }

    #[test]
    fn etl_defaults() {
        let cli = Cli::parse_from(["sales", "etl"]);
        let Command::Etl(args) = cli.command else {
            panic!("expected etl");
        };
        assert_eq!(args.raw_dir, PathBuf::from("data/raw"));
        assert_eq!(args.out_dir, PathBuf::from("data/processed"));
        assert!(!args.no_parquet);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
