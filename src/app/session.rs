//! Dashboard session shared by the `report` and `tui` front-ends.
//!
//! A session loads the cleaned table once and keeps it read-only for its
//! lifetime. Every filter change recomputes the view and all aggregates from
//! scratch:
//! cleaned CSV -> cached table -> filtered view -> KPIs + breakdowns
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::{CleanTable, Column, Dashboard, FilterSet, FilteredView};
use crate::error::AppError;
use crate::io::clean::read_clean_csv;

/// Distinct values offered by the filter widgets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub countries: Vec<String>,
    pub months: Vec<String>,
}

/// A loaded cleaned table plus where it came from.
#[derive(Debug, Clone)]
pub struct Session {
    path: PathBuf,
    table: CleanTable,
    skipped_rows: usize,
}

impl Session {
    /// Load the cleaned table at `path`.
    ///
    /// A missing file is fatal: the user has to run the transform first.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        if !path.is_file() {
            return Err(AppError::io(format!(
                "Processed file not found: {}. Run `sales etl` first.",
                path.display()
            )));
        }

        let load = read_clean_csv(path)?;
        if load.skipped_rows > 0 {
            warn!(rows = load.skipped_rows, "cleaned file has rows that no longer parse");
        }
        info!(path = %path.display(), rows = load.table.len(), "loaded cleaned table");

        Ok(Self::from_table(path.to_path_buf(), load.table, load.skipped_rows))
    }

    /// Wrap an in-memory table (tests and callers that already hold one).
    pub fn from_table(path: PathBuf, table: CleanTable, skipped_rows: usize) -> Self {
        Self {
            path,
            table,
            skipped_rows,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &CleanTable {
        &self.table
    }

    pub fn loaded_rows(&self) -> usize {
        self.table.len()
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// Sorted distinct countries and months present in the table.
    pub fn filter_options(&self) -> FilterOptions {
        let mut countries = BTreeSet::new();
        let mut months = BTreeSet::new();
        for r in &self.table.records {
            if let Some(c) = &r.country {
                countries.insert(c.as_str());
            }
            months.insert(r.month.as_str());
        }

        FilterOptions {
            countries: if self.table.has_column(Column::Country) {
                countries.into_iter().map(str::to_string).collect()
            } else {
                Vec::new()
            },
            months: months.into_iter().map(str::to_string).collect(),
        }
    }

    /// Rows matching `filters`, in table order.
    pub fn apply(&self, filters: &FilterSet) -> FilteredView<'_> {
        FilteredView::new(&self.table, filters)
    }

    /// Recompute the whole dashboard for `filters`.
    pub fn dashboard(&self, filters: &FilterSet) -> Dashboard {
        let view = self.apply(filters);
        crate::report::build_dashboard(&view, filters, self.loaded_rows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CLEAN_CSV_NAME, CleanedRecord, SourceFields};
    use crate::io::clean::write_clean_file;
    use chrono::NaiveDate;

    fn rec(country: Option<&str>, day: (i32, u32, u32), qty: f64, price: f64) -> CleanedRecord {
        let ts = NaiveDate::from_ymd_opt(day.0, day.1, day.2)
            .unwrap()
            .and_hms_opt(10, 15, 0)
            .unwrap();
        CleanedRecord::derive(
            SourceFields {
                invoice: Some(format!("{}-{}", day.1, day.2)),
                customer_id: Some("c".into()),
                country: country.map(str::to_string),
                description: Some("ITEM".into()),
                ..SourceFields::default()
            },
            qty,
            ts,
            price,
        )
    }

    fn session() -> Session {
        let table = CleanTable {
            columns: Column::ALL.to_vec(),
            records: vec![
                rec(Some("United Kingdom"), (2010, 12, 1), 6.0, 2.55),
                rec(Some("France"), (2011, 3, 4), -3.0, 5.0),
                rec(None, (2011, 1, 9), 2.0, 1.0),
                rec(Some("France"), (2011, 1, 10), 1.0, 10.0),
            ],
        };
        Session::from_table(PathBuf::from("mem.csv"), table, 0)
    }

    #[test]
    fn missing_file_is_a_remediation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CLEAN_CSV_NAME);
        let err = Session::open(&path).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("Processed file not found"));
        assert!(err.to_string().contains("sales etl"));
    }

    #[test]
    fn opens_a_written_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CLEAN_CSV_NAME);
        let s = session();
        write_clean_file(&path, s.table()).unwrap();

        let opened = Session::open(&path).unwrap();
        assert_eq!(opened.table(), s.table());
        assert_eq!(opened.skipped_rows(), 0);
        assert_eq!(opened.path(), path.as_path());
    }

    #[test]
    fn filter_options_are_sorted_and_distinct() {
        let opts = session().filter_options();
        assert_eq!(opts.countries, vec!["France", "United Kingdom"]);
        assert_eq!(opts.months, vec!["2010-12", "2011-01", "2011-03"]);
    }

    #[test]
    fn return_line_follows_the_toggle() {
        let s = session();
        let mut filters = FilterSet::default();
        filters.toggle_month("2011-03");

        let included = s.dashboard(&filters);
        assert_eq!(included.filtered_rows, 1);
        assert_eq!(included.kpis.total_revenue, -15.0);

        filters.include_returns = false;
        let excluded = s.dashboard(&filters);
        assert_eq!(excluded.filtered_rows, 0);
        assert_eq!(excluded.kpis.total_revenue, 0.0);
        assert!(excluded.top_products.is_empty());
    }

    #[test]
    fn missing_country_never_matches_a_selection() {
        let s = session();
        let mut filters = FilterSet::default();
        filters.toggle_country("France");
        let view = s.apply(&filters);
        assert_eq!(view.len(), 2);
        assert!(view.records.iter().all(|r| r.country.as_deref() == Some("France")));
    }

    #[test]
    fn dashboard_is_deterministic() {
        let s = session();
        let filters = FilterSet::default();
        assert_eq!(s.dashboard(&filters), s.dashboard(&filters));
        assert_eq!(s.dashboard(&filters).loaded_rows, 4);
    }
}
