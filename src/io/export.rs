//! Export the filtered view as CSV.
//!
//! The bytes are exactly what a spreadsheet download would contain: the same
//! layout as the cleaned table, restricted to the rows currently in view.

use std::fs;
use std::path::Path;

use crate::domain::FilteredView;
use crate::error::AppError;
use crate::io::clean::write_clean_csv;

/// Serialize the view (all present columns) as UTF-8 CSV.
pub fn export_filtered_csv(view: &FilteredView<'_>) -> Result<Vec<u8>, AppError> {
    let mut buf = Vec::new();
    write_clean_csv(&mut buf, view.columns, view.records.iter().copied())
        .map_err(|e| AppError::io(format!("Failed to serialize filtered view: {e}")))?;
    Ok(buf)
}

/// Save exported bytes to `path`, creating the parent directory if needed.
pub fn write_export(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", parent.display())))?;
    }
    fs::write(path, bytes)
        .map_err(|e| AppError::io(format!("Failed to write export '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CleanTable, CleanedRecord, Column, FilterSet, SourceFields};
    use chrono::NaiveDate;

    fn table() -> CleanTable {
        let ts = NaiveDate::from_ymd_opt(2011, 5, 6).unwrap().and_hms_opt(9, 30, 0).unwrap();
        let row = |country: &str, qty: f64| {
            CleanedRecord::derive(
                SourceFields {
                    invoice: Some("1".into()),
                    country: Some(country.into()),
                    ..SourceFields::default()
                },
                qty,
                ts,
                2.0,
            )
        };
        CleanTable {
            columns: vec![
                Column::Invoice,
                Column::Quantity,
                Column::InvoiceDate,
                Column::UnitPrice,
                Column::Country,
                Column::Revenue,
                Column::OrderDate,
                Column::Year,
                Column::Month,
                Column::SalesChannel,
            ],
            records: vec![row("France", 1.0), row("Spain", 2.0), row("France", -1.0)],
        }
    }

    #[test]
    fn exports_only_matching_rows() {
        let table = table();
        let mut filters = FilterSet::default();
        filters.toggle_country("France");
        filters.include_returns = false;

        let view = FilteredView::new(&table, &filters);
        let text = String::from_utf8(export_filtered_csv(&view).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Invoice,Quantity,InvoiceDate,UnitPrice,Country,Revenue,OrderDate,Year,Month,SalesChannel",
                "1,1,2011-05-06 09:30:00,2,France,2,2011-05-06,2011,2011-05,Online",
            ]
        );
    }

    #[test]
    fn empty_view_still_has_header() {
        let table = table();
        let mut filters = FilterSet::default();
        filters.toggle_month("1999-01");
        let view = FilteredView::new(&table, &filters);
        let text = String::from_utf8(export_filtered_csv(&view).unwrap()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn write_export_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("downloads").join("sales_filtered.csv");
        write_export(&path, b"a,b\n").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"a,b\n");
    }
}
