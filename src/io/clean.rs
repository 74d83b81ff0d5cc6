//! Cleaned-table CSV format.
//!
//! The cleaned CSV is the only contract between `sales etl` and the
//! dashboard. Layout:
//! - header: present columns in canonical order
//! - date-times `YYYY-MM-DD HH:MM:SS[.fff]`, dates `YYYY-MM-DD`
//! - numbers in shortest round-trip form, so values reload exactly
//! - missing optional values as empty cells

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use tracing::warn;

use crate::domain::{CleanTable, CleanedRecord, Column, SALES_CHANNEL};
use crate::error::AppError;
use crate::etl::coerce::{parse_invoice_date, parse_number};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATE_FMT: &str = "%Y-%m-%d";

/// Columns the dashboard cannot work without.
const LOAD_REQUIRED: [Column; 5] = [
    Column::InvoiceDate,
    Column::Quantity,
    Column::UnitPrice,
    Column::Revenue,
    Column::Month,
];

/// Write `records` as CSV with the given column set.
pub fn write_clean_csv<'a, W, I>(writer: W, columns: &[Column], records: I) -> csv::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a CleanedRecord>,
{
    let mut out = csv::WriterBuilder::new().from_writer(writer);
    out.write_record(columns.iter().map(|c| c.name()))?;

    let mut row: Vec<String> = Vec::with_capacity(columns.len());
    for record in records {
        row.clear();
        row.extend(columns.iter().map(|c| format_cell(record, *c)));
        out.write_record(&row)?;
    }
    out.flush()?;
    Ok(())
}

/// Write the full table to `path`, replacing any previous file.
pub fn write_clean_file(path: &Path, table: &CleanTable) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", path.display())))?;
    write_clean_csv(file, &table.columns, &table.records)
        .map_err(|e| AppError::io(format!("Failed to write '{}': {e}", path.display())))
}

/// Render one cell.
pub fn format_cell(record: &CleanedRecord, column: Column) -> String {
    match column {
        Column::Invoice => opt(&record.invoice),
        Column::StockCode => opt(&record.stock_code),
        Column::Description => opt(&record.description),
        Column::Quantity => format_number(record.quantity),
        Column::InvoiceDate => record.invoice_date.format(DATETIME_FMT).to_string(),
        Column::UnitPrice => format_number(record.unit_price),
        Column::CustomerId => opt(&record.customer_id),
        Column::Country => opt(&record.country),
        Column::Revenue => format_number(record.revenue),
        Column::OrderDate => record.order_date.format(DATE_FMT).to_string(),
        Column::Year => record.year.to_string(),
        Column::Month => record.month.clone(),
        Column::SalesChannel => record.sales_channel.clone(),
    }
}

/// Shortest representation that parses back to the same `f64`.
pub fn format_number(v: f64) -> String {
    format!("{v}")
}

fn opt(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

/// Result of reading a cleaned CSV.
#[derive(Debug, Clone)]
pub struct CleanLoad {
    pub table: CleanTable,
    /// Rows whose required values no longer parse.
    pub skipped_rows: usize,
}

/// Read a cleaned CSV back into memory.
///
/// `InvoiceDate` is re-parsed with the pipeline's own parser, so loading a
/// file written by `sales etl` is lossless.
pub fn read_clean_csv(path: &Path) -> Result<CleanLoad, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = reader
        .headers()
        .map_err(|e| AppError::io(format!("Failed to read headers of '{}': {e}", path.display())))?
        .clone();

    let index: HashMap<Column, usize> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| {
            let name = name.trim_start_matches('\u{feff}').trim();
            Column::from_name(name).map(|c| (c, idx))
        })
        .collect();

    let missing: Vec<&str> = LOAD_REQUIRED
        .iter()
        .filter(|c| !index.contains_key(c))
        .map(|c| c.name())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::schema(format!(
            "'{}' is not a cleaned sales table (missing: {})",
            path.display(),
            missing.join(", ")
        )));
    }

    let columns: Vec<Column> = Column::ALL
        .into_iter()
        .filter(|c| index.contains_key(c))
        .collect();

    let mut records = Vec::new();
    let mut skipped_rows = 0usize;
    for result in reader.records() {
        let Ok(record) = result else {
            skipped_rows += 1;
            continue;
        };
        let get = |c: Column| {
            let idx = *index.get(&c)?;
            record.get(idx).filter(|s| !s.is_empty())
        };
        match parse_clean_row(get) {
            Some(r) => records.push(r),
            None => skipped_rows += 1,
        }
    }

    if skipped_rows > 0 {
        warn!(path = %path.display(), rows = skipped_rows, "skipped unparseable cleaned rows");
    }

    Ok(CleanLoad {
        table: CleanTable { columns, records },
        skipped_rows,
    })
}

fn parse_clean_row<'a>(get: impl Fn(Column) -> Option<&'a str>) -> Option<CleanedRecord> {
    let owned = |c: Column| get(c).map(str::to_string);

    let invoice_date = parse_invoice_date(get(Column::InvoiceDate)?)?;
    let quantity = parse_number(get(Column::Quantity)?)?;
    let unit_price = parse_number(get(Column::UnitPrice)?)?;
    let revenue = parse_number(get(Column::Revenue)?)?;
    let month = owned(Column::Month)?;

    let order_date = get(Column::OrderDate)
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FMT).ok())
        .unwrap_or_else(|| invoice_date.date());
    let year = get(Column::Year)
        .and_then(|s| s.trim().parse::<i32>().ok())
        .unwrap_or_else(|| order_date.year());
    let sales_channel = owned(Column::SalesChannel).unwrap_or_else(|| SALES_CHANNEL.to_string());

    Some(CleanedRecord {
        invoice: owned(Column::Invoice),
        stock_code: owned(Column::StockCode),
        description: owned(Column::Description),
        quantity,
        invoice_date,
        unit_price,
        customer_id: owned(Column::CustomerId),
        country: owned(Column::Country),
        revenue,
        order_date,
        year,
        month,
        sales_channel,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceFields;

    fn sample_table() -> CleanTable {
        let ts = NaiveDate::from_ymd_opt(2010, 12, 1).unwrap().and_hms_opt(8, 26, 0).unwrap();
        let a = CleanedRecord::derive(
            SourceFields {
                invoice: Some("536365".into()),
                stock_code: Some("85123A".into()),
                description: Some("WHITE HANGING HEART, T-LIGHT".into()),
                customer_id: Some("17850".into()),
                country: Some("United Kingdom".into()),
            },
            6.0,
            ts,
            2.55,
        );
        let b = CleanedRecord::derive(SourceFields::default(), -3.0, ts, 0.1 + 0.2);
        CleanTable {
            columns: Column::ALL.to_vec(),
            records: vec![a, b],
        }
    }

    #[test]
    fn header_and_cells_use_canonical_layout() {
        let table = sample_table();
        let mut buf = Vec::new();
        write_clean_csv(&mut buf, &table.columns, &table.records).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Invoice,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country,Revenue,OrderDate,Year,Month,SalesChannel"
        );
        assert_eq!(
            lines.next().unwrap(),
            "536365,85123A,\"WHITE HANGING HEART, T-LIGHT\",6,2010-12-01 08:26:00,2.55,17850,United Kingdom,15.299999999999999,2010-12-01,2010,2010-12,Online"
        );
        assert!(lines.next().unwrap().starts_with(",,,-3,2010-12-01 08:26:00,0.30000000000000004,,,"));
    }

    #[test]
    fn written_file_reloads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales_clean.csv");
        let table = sample_table();
        write_clean_file(&path, &table).unwrap();

        let loaded = read_clean_csv(&path).unwrap();
        assert_eq!(loaded.skipped_rows, 0);
        assert_eq!(loaded.table, table);
    }

    #[test]
    fn rejects_files_that_are_not_cleaned_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.csv");
        std::fs::write(&path, "Invoice,Quantity\n1,2\n").unwrap();
        let err = read_clean_csv(&path).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("InvoiceDate"));
    }

    #[test]
    fn unparseable_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales_clean.csv");
        std::fs::write(
            &path,
            "Quantity,InvoiceDate,UnitPrice,Revenue,Month\n\
             2,2011-01-05 10:00:00,1.5,3,2011-01\n\
             2,yesterday,1.5,3,2011-01\n",
        )
        .unwrap();
        let loaded = read_clean_csv(&path).unwrap();
        assert_eq!(loaded.table.len(), 1);
        assert_eq!(loaded.skipped_rows, 1);
        let r = &loaded.table.records[0];
        assert_eq!(r.year, 2011);
        assert_eq!(r.sales_channel, "Online");
        assert!(!loaded.table.has_column(Column::Invoice));
    }
}
