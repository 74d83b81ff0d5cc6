//! Column normalization: raw header names -> canonical columns.

use crate::domain::Column;
use crate::error::AppError;
use crate::io::raw::RawTable;

/// Which raw column feeds each canonical source column.
///
/// Canonical columns no raw file carried are absent from the mapping (and
/// therefore from the cleaned table). Unrecognized raw columns are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    entries: Vec<(Column, usize)>,
}

impl ColumnMapping {
    /// Build the mapping for a raw table.
    ///
    /// When several raw headers alias the same canonical column, the one that
    /// appears first in the raw table wins.
    pub fn resolve(raw: &RawTable) -> Result<Self, AppError> {
        let mut entries = Vec::new();
        for column in Column::SOURCE {
            let aliases = column.source_aliases();
            let idx = raw
                .headers
                .iter()
                .position(|h| aliases.contains(&h.as_str()));
            if let Some(idx) = idx {
                entries.push((column, idx));
            }
        }

        let mapping = Self { entries };
        let missing: Vec<&str> = Column::REQUIRED
            .iter()
            .filter(|c| !mapping.contains(**c))
            .map(|c| c.source_aliases()[0])
            .collect();
        if !missing.is_empty() {
            return Err(AppError::schema(format!(
                "Missing required column(s) in raw data: {}",
                missing.join(", ")
            )));
        }

        Ok(mapping)
    }

    pub fn contains(&self, column: Column) -> bool {
        self.entries.iter().any(|(c, _)| *c == column)
    }

    pub fn raw_index(&self, column: Column) -> Option<usize> {
        self.entries
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, idx)| *idx)
    }

    /// Cell of `row` for a canonical column, if mapped and non-empty.
    pub fn get<'a>(&self, raw: &'a RawTable, row: usize, column: Column) -> Option<&'a str> {
        raw.cell(row, self.raw_index(column)?)
    }

    /// Columns of the cleaned table: mapped source columns, then derived ones.
    pub fn output_columns(&self) -> Vec<Column> {
        Column::SOURCE
            .into_iter()
            .filter(|c| self.contains(*c))
            .chain(Column::DERIVED)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(headers: &[&str]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            ..RawTable::default()
        }
    }

    #[test]
    fn renames_price_and_customer_id() {
        let table = raw(&[
            "Invoice",
            "StockCode",
            "Description",
            "Quantity",
            "InvoiceDate",
            "Price",
            "Customer ID",
            "Country",
            "Notes",
        ]);
        let mapping = ColumnMapping::resolve(&table).unwrap();
        assert_eq!(mapping.raw_index(Column::UnitPrice), Some(5));
        assert_eq!(mapping.raw_index(Column::CustomerId), Some(6));
        assert_eq!(mapping.output_columns(), Column::ALL.to_vec());
    }

    #[test]
    fn unmapped_optional_columns_are_absent() {
        let table = raw(&["Quantity", "Price", "InvoiceDate", "Extra"]);
        let mapping = ColumnMapping::resolve(&table).unwrap();
        assert!(!mapping.contains(Column::Invoice));
        assert!(!mapping.contains(Column::CustomerId));
        assert_eq!(
            mapping.output_columns(),
            vec![
                Column::Quantity,
                Column::InvoiceDate,
                Column::UnitPrice,
                Column::Revenue,
                Column::OrderDate,
                Column::Year,
                Column::Month,
                Column::SalesChannel,
            ]
        );
    }

    #[test]
    fn legacy_names_are_accepted() {
        let table = raw(&["InvoiceNo", "Quantity", "InvoiceDate", "UnitPrice", "CustomerID"]);
        let mapping = ColumnMapping::resolve(&table).unwrap();
        assert_eq!(mapping.raw_index(Column::Invoice), Some(0));
        assert_eq!(mapping.raw_index(Column::UnitPrice), Some(3));
        assert_eq!(mapping.raw_index(Column::CustomerId), Some(4));
    }

    #[test]
    fn first_alias_in_table_order_wins() {
        let table = raw(&["UnitPrice", "Quantity", "InvoiceDate", "Price"]);
        let mapping = ColumnMapping::resolve(&table).unwrap();
        assert_eq!(mapping.raw_index(Column::UnitPrice), Some(0));
    }

    #[test]
    fn missing_required_column_is_a_schema_error() {
        let table = raw(&["Invoice", "Quantity", "InvoiceDate"]);
        let err = ColumnMapping::resolve(&table).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("Price"));
    }
}
