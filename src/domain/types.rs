//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - produced by the transform pipeline and written to CSV/Parquet
//! - reloaded and filtered by the dashboard session
//! - exported as JSON from `sales report --json`

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Constant label written to every cleaned record.
pub const SALES_CHANNEL: &str = "Online";

/// Row cap for the top-products and top-countries breakdowns.
pub const TOP_N: usize = 15;

/// File name of the cleaned table inside the processed directory.
pub const CLEAN_CSV_NAME: &str = "sales_clean.csv";

/// File name of the best-effort columnar copy.
pub const CLEAN_PARQUET_NAME: &str = "sales_clean.parquet";

/// File name used for the filtered-data download.
pub const EXPORT_FILE_NAME: &str = "sales_filtered.csv";

/// Canonical columns of the cleaned table, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Invoice,
    StockCode,
    Description,
    Quantity,
    InvoiceDate,
    UnitPrice,
    CustomerId,
    Country,
    Revenue,
    OrderDate,
    Year,
    Month,
    SalesChannel,
}

impl Column {
    /// Every canonical column, in output order.
    pub const ALL: [Column; 13] = [
        Column::Invoice,
        Column::StockCode,
        Column::Description,
        Column::Quantity,
        Column::InvoiceDate,
        Column::UnitPrice,
        Column::CustomerId,
        Column::Country,
        Column::Revenue,
        Column::OrderDate,
        Column::Year,
        Column::Month,
        Column::SalesChannel,
    ];

    /// Columns that come from the raw files (everything else is derived).
    pub const SOURCE: [Column; 8] = [
        Column::Invoice,
        Column::StockCode,
        Column::Description,
        Column::Quantity,
        Column::InvoiceDate,
        Column::UnitPrice,
        Column::CustomerId,
        Column::Country,
    ];

    /// Source columns a row cannot be cleaned without.
    pub const REQUIRED: [Column; 3] = [Column::InvoiceDate, Column::Quantity, Column::UnitPrice];

    /// Derived columns, in computation order.
    pub const DERIVED: [Column; 5] = [
        Column::Revenue,
        Column::OrderDate,
        Column::Year,
        Column::Month,
        Column::SalesChannel,
    ];

    /// Header name in the cleaned CSV.
    pub fn name(self) -> &'static str {
        match self {
            Column::Invoice => "Invoice",
            Column::StockCode => "StockCode",
            Column::Description => "Description",
            Column::Quantity => "Quantity",
            Column::InvoiceDate => "InvoiceDate",
            Column::UnitPrice => "UnitPrice",
            Column::CustomerId => "CustomerID",
            Column::Country => "Country",
            Column::Revenue => "Revenue",
            Column::OrderDate => "OrderDate",
            Column::Year => "Year",
            Column::Month => "Month",
            Column::SalesChannel => "SalesChannel",
        }
    }

    /// Inverse of [`Column::name`].
    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Raw header names that are renamed to this column.
    ///
    /// The first entry is the current export format; the rest are simple
    /// renames used by older exports of the same data.
    pub fn source_aliases(self) -> &'static [&'static str] {
        match self {
            Column::Invoice => &["Invoice", "InvoiceNo"],
            Column::StockCode => &["StockCode"],
            Column::Description => &["Description"],
            Column::Quantity => &["Quantity"],
            Column::InvoiceDate => &["InvoiceDate"],
            Column::UnitPrice => &["Price", "UnitPrice"],
            Column::CustomerId => &["Customer ID", "CustomerID"],
            Column::Country => &["Country"],
            Column::Revenue
            | Column::OrderDate
            | Column::Year
            | Column::Month
            | Column::SalesChannel => &[],
        }
    }
}

/// A cleaned sales line with its derived metrics.
///
/// Invariant: `unit_price > 0` and the three required source fields are present.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRecord {
    pub invoice: Option<String>,
    pub stock_code: Option<String>,
    pub description: Option<String>,
    /// Negative for returns.
    pub quantity: f64,
    pub invoice_date: NaiveDateTime,
    pub unit_price: f64,
    pub customer_id: Option<String>,
    pub country: Option<String>,

    pub revenue: f64,
    pub order_date: NaiveDate,
    pub year: i32,
    /// `YYYY-MM` period label.
    pub month: String,
    pub sales_channel: String,
}

/// Source fields that survived coercion and filtering.
#[derive(Debug, Clone, Default)]
pub struct SourceFields {
    pub invoice: Option<String>,
    pub stock_code: Option<String>,
    pub description: Option<String>,
    pub customer_id: Option<String>,
    pub country: Option<String>,
}

impl CleanedRecord {
    /// Compute the derived columns for a validated row.
    pub fn derive(fields: SourceFields, quantity: f64, invoice_date: NaiveDateTime, unit_price: f64) -> Self {
        let revenue = quantity * unit_price;
        let order_date = invoice_date.date();
        let year = order_date.year();
        let month = invoice_date.format("%Y-%m").to_string();

        Self {
            invoice: fields.invoice,
            stock_code: fields.stock_code,
            description: fields.description,
            quantity,
            invoice_date,
            unit_price,
            customer_id: fields.customer_id,
            country: fields.country,
            revenue,
            order_date,
            year,
            month,
            sales_channel: SALES_CHANNEL.to_string(),
        }
    }

    pub fn is_return(&self) -> bool {
        self.quantity < 0.0
    }
}

/// The cleaned table: present columns (canonical order) plus records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanTable {
    pub columns: Vec<Column>,
    pub records: Vec<CleanedRecord>,
}

impl CleanTable {
    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// User-selected filters for the presentation layer.
///
/// Empty selections do not filter on that dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSet {
    pub countries: BTreeSet<String>,
    pub months: BTreeSet<String>,
    pub include_returns: bool,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            countries: BTreeSet::new(),
            months: BTreeSet::new(),
            include_returns: true,
        }
    }
}

impl FilterSet {
    /// Conjunction of the country, month, and returns predicates.
    pub fn matches(&self, record: &CleanedRecord) -> bool {
        if !self.countries.is_empty() {
            match &record.country {
                Some(country) if self.countries.contains(country) => {}
                _ => return false,
            }
        }
        if !self.months.is_empty() && !self.months.contains(&record.month) {
            return false;
        }
        if !self.include_returns && record.is_return() {
            return false;
        }
        true
    }

    pub fn toggle_country(&mut self, country: &str) {
        toggle(&mut self.countries, country);
    }

    pub fn toggle_month(&mut self, month: &str) {
        toggle(&mut self.months, month);
    }
}

fn toggle(set: &mut BTreeSet<String>, value: &str) {
    if !set.remove(value) {
        set.insert(value.to_string());
    }
}

/// Rows of a cached table that match a [`FilterSet`], in table order.
///
/// Borrowed from the session's table; recomputed on every filter change.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    pub columns: &'a [Column],
    pub records: Vec<&'a CleanedRecord>,
}

impl<'a> FilteredView<'a> {
    pub fn new(table: &'a CleanTable, filters: &FilterSet) -> Self {
        Self {
            columns: &table.columns,
            records: table.records.iter().filter(|r| filters.matches(r)).collect(),
        }
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Headline metrics over a filtered view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub total_revenue: f64,
    pub orders: usize,
    pub customers: usize,
    /// `total_revenue / orders`, or 0 when there are no orders.
    pub avg_basket: f64,
}

/// Summed revenue for one group key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub key: String,
    pub revenue: f64,
}

/// A grouped aggregate, plus the message shown when it has no rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub rows: Vec<GroupTotal>,
    #[serde(skip)]
    pub empty_message: &'static str,
}

impl Breakdown {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows to render, or `Err(message)` when there is nothing to show.
    pub fn rows_or_message(&self) -> Result<&[GroupTotal], &'static str> {
        if self.rows.is_empty() {
            Err(self.empty_message)
        } else {
            Ok(&self.rows)
        }
    }
}

/// Everything the dashboard renders for one filter selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub filters: FilterSet,
    pub loaded_rows: usize,
    pub filtered_rows: usize,
    pub kpis: Kpis,
    pub revenue_by_month: Breakdown,
    pub top_products: Breakdown,
    pub top_countries: Breakdown,
}

/// Transform pipeline configuration.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub raw_dir: PathBuf,
    pub out_dir: PathBuf,
    /// Attempt the columnar copy next to the CSV.
    pub write_parquet: bool,
}

impl EtlConfig {
    pub fn clean_csv_path(&self) -> PathBuf {
        self.out_dir.join(CLEAN_CSV_NAME)
    }

    pub fn parquet_path(&self) -> PathBuf {
        self.out_dir.join(CLEAN_PARQUET_NAME)
    }
}

/// Presentation layer configuration shared by `report` and `tui`.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    pub filters: FilterSet,
    /// Destination of the filtered-rows export; `None` skips it.
    pub export_path: Option<PathBuf>,
}
