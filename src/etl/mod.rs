//! Transform pipeline: raw CSVs -> cleaned table (+ best-effort Parquet copy).
//!
//! Steps, in order:
//! 1) discover and concatenate raw files (`io::raw`)
//! 2) normalize column names (`columns`)
//! 3) coerce InvoiceDate / Quantity / UnitPrice (`coerce`)
//! 4) drop rows missing a required value, then rows with UnitPrice <= 0
//! 5) derive Revenue, OrderDate, Year, Month, SalesChannel
//! 6) write `sales_clean.csv` (fatal on failure) and `sales_clean.parquet` (never fatal)

use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::domain::{CleanTable, CleanedRecord, Column, EtlConfig, SourceFields};
use crate::error::AppError;
use crate::io::raw::{RawTable, discover_raw_files, load_raw_files};

pub mod coerce;
pub mod columns;

use columns::ColumnMapping;

/// Row accounting for one transform run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub rows_read: usize,
    /// Missing or unparseable InvoiceDate / Quantity / UnitPrice.
    pub dropped_missing: usize,
    /// UnitPrice <= 0.
    pub dropped_non_positive_price: usize,
    pub rows_retained: usize,
}

/// What `write_outputs` produced.
#[derive(Debug, Clone)]
pub struct WriteReport {
    pub csv_path: PathBuf,
    /// `None` when the columnar copy was disabled or failed.
    pub parquet_path: Option<PathBuf>,
    /// Failure message for a skipped columnar copy.
    pub parquet_error: Option<String>,
}

/// Outcome of a full `sales etl` run.
#[derive(Debug, Clone)]
pub struct EtlSummary {
    pub files: Vec<PathBuf>,
    pub stats: TransformStats,
    pub outputs: WriteReport,
}

/// Run the whole pipeline for `config`.
pub fn run(config: &EtlConfig) -> Result<EtlSummary, AppError> {
    let files = discover_raw_files(&config.raw_dir)?;
    info!(count = files.len(), dir = %config.raw_dir.display(), "discovered raw files");

    let raw = load_raw_files(&files)?;
    let (table, stats) = transform(&raw)?;
    info!(
        read = stats.rows_read,
        dropped_missing = stats.dropped_missing,
        dropped_price = stats.dropped_non_positive_price,
        retained = stats.rows_retained,
        "transform complete"
    );
    if table.is_empty() {
        warn!("no rows survived cleaning; writing an empty table");
    }

    let outputs = write_outputs(&table, config)?;
    println!("Wrote processed file to: {}", outputs.csv_path.display());
    println!("Processed rows: {}", crate::report::format::fmt_count(stats.rows_retained));

    Ok(EtlSummary { files, stats, outputs })
}

/// Clean a raw table.
///
/// Errors only when a required column is absent from every input file;
/// individual bad rows are dropped and counted.
pub fn transform(raw: &RawTable) -> Result<(CleanTable, TransformStats), AppError> {
    let mapping = ColumnMapping::resolve(raw)?;
    let mut stats = TransformStats {
        rows_read: raw.len(),
        ..TransformStats::default()
    };

    let mut records = Vec::new();
    for row in 0..raw.len() {
        let get = |c: Column| mapping.get(raw, row, c);

        let invoice_date = get(Column::InvoiceDate).and_then(coerce::parse_invoice_date);
        let quantity = get(Column::Quantity).and_then(coerce::parse_number);
        let unit_price = get(Column::UnitPrice).and_then(coerce::parse_number);

        let (Some(invoice_date), Some(quantity), Some(unit_price)) = (invoice_date, quantity, unit_price) else {
            stats.dropped_missing += 1;
            continue;
        };
        if unit_price <= 0.0 {
            stats.dropped_non_positive_price += 1;
            continue;
        }

        let owned = |c: Column| get(c).map(str::to_string);
        let fields = SourceFields {
            invoice: owned(Column::Invoice),
            stock_code: owned(Column::StockCode),
            description: owned(Column::Description),
            customer_id: owned(Column::CustomerId),
            country: owned(Column::Country),
        };
        records.push(CleanedRecord::derive(fields, quantity, invoice_date, unit_price));
    }

    stats.rows_retained = records.len();
    let table = CleanTable {
        columns: mapping.output_columns(),
        records,
    };
    Ok((table, stats))
}

/// Write the cleaned CSV (always) and the Parquet copy (best effort).
pub fn write_outputs(table: &CleanTable, config: &EtlConfig) -> Result<WriteReport, AppError> {
    fs::create_dir_all(&config.out_dir).map_err(|e| {
        AppError::io(format!(
            "Failed to create output directory '{}': {e}",
            config.out_dir.display()
        ))
    })?;

    let csv_path = config.clean_csv_path();
    crate::io::clean::write_clean_file(&csv_path, table)?;
    info!(path = %csv_path.display(), rows = table.len(), "wrote cleaned csv");

    let mut report = WriteReport {
        csv_path,
        parquet_path: None,
        parquet_error: None,
    };
    if !config.write_parquet {
        return Ok(report);
    }

    let parquet_path = config.parquet_path();
    match crate::io::parquet::write_parquet(&parquet_path, table) {
        Ok(bytes) => {
            info!(path = %parquet_path.display(), bytes, "wrote parquet copy");
            report.parquet_path = Some(parquet_path);
        }
        Err(e) => {
            warn!(path = %parquet_path.display(), "parquet export failed: {e}");
            println!("Parquet export skipped: {e}");
            report.parquet_error = Some(e.to_string());
        }
    }

    Ok(report)
}
