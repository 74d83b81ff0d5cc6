//! Columnar (Parquet) copy of the cleaned table.
//!
//! Column types:
//! - Invoice, StockCode, Description, CustomerID, Country,
//!   Month, SalesChannel           → Utf8 (nullable)
//! - Quantity, UnitPrice, Revenue  → Float64
//! - InvoiceDate                   → Timestamp(µs, no tz)
//! - OrderDate                     → Date32
//! - Year                          → Int32

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Float64Array, Int32Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::domain::{CleanTable, CleanedRecord, Column};
use crate::error::AppError;

/// Arrow type for a canonical column.
pub fn arrow_type(column: Column) -> DataType {
    match column {
        Column::Quantity | Column::UnitPrice | Column::Revenue => DataType::Float64,
        Column::InvoiceDate => DataType::Timestamp(TimeUnit::Microsecond, None),
        Column::OrderDate => DataType::Date32,
        Column::Year => DataType::Int32,
        Column::Invoice
        | Column::StockCode
        | Column::Description
        | Column::CustomerId
        | Column::Country
        | Column::Month
        | Column::SalesChannel => DataType::Utf8,
    }
}

/// Arrow schema for the table's present columns.
pub fn build_arrow_schema(columns: &[Column]) -> Arc<Schema> {
    let fields: Vec<Field> = columns
        .iter()
        .map(|c| Field::new(c.name(), arrow_type(*c), is_nullable(*c)))
        .collect();
    Arc::new(Schema::new(fields))
}

fn is_nullable(column: Column) -> bool {
    matches!(
        column,
        Column::Invoice | Column::StockCode | Column::Description | Column::CustomerId | Column::Country
    )
}

/// Convert the cleaned table into a single Arrow batch.
pub fn to_record_batch(table: &CleanTable) -> Result<RecordBatch, AppError> {
    let schema = build_arrow_schema(&table.columns);
    let arrays: Vec<ArrayRef> = table
        .columns
        .iter()
        .map(|c| column_array(&table.records, *c))
        .collect();

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| AppError::io(format!("Failed to build Arrow batch: {e}")))
}

fn column_array(records: &[CleanedRecord], column: Column) -> ArrayRef {
    match column {
        Column::Invoice => string_array(records, |r| r.invoice.as_deref()),
        Column::StockCode => string_array(records, |r| r.stock_code.as_deref()),
        Column::Description => string_array(records, |r| r.description.as_deref()),
        Column::CustomerId => string_array(records, |r| r.customer_id.as_deref()),
        Column::Country => string_array(records, |r| r.country.as_deref()),
        Column::Month => string_array(records, |r| Some(r.month.as_str())),
        Column::SalesChannel => string_array(records, |r| Some(r.sales_channel.as_str())),
        Column::Quantity => float_array(records, |r| r.quantity),
        Column::UnitPrice => float_array(records, |r| r.unit_price),
        Column::Revenue => float_array(records, |r| r.revenue),
        Column::InvoiceDate => Arc::new(TimestampMicrosecondArray::from(
            records
                .iter()
                .map(|r| r.invoice_date.and_utc().timestamp_micros())
                .collect::<Vec<i64>>(),
        )),
        Column::OrderDate => Arc::new(Date32Array::from(
            records.iter().map(|r| days_since_epoch(r.order_date)).collect::<Vec<i32>>(),
        )),
        Column::Year => Arc::new(Int32Array::from(
            records.iter().map(|r| r.year).collect::<Vec<i32>>(),
        )),
    }
}

fn string_array<'a>(records: &'a [CleanedRecord], f: impl Fn(&'a CleanedRecord) -> Option<&'a str>) -> ArrayRef {
    Arc::new(records.iter().map(f).collect::<StringArray>())
}

fn float_array(records: &[CleanedRecord], f: impl Fn(&CleanedRecord) -> f64) -> ArrayRef {
    Arc::new(Float64Array::from(records.iter().map(f).collect::<Vec<f64>>()))
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (date - epoch).num_days() as i32
}

/// Write the table to `path` as Snappy-compressed Parquet; returns bytes written.
pub fn write_parquet(path: &Path, table: &CleanTable) -> Result<u64, AppError> {
    let batch = to_record_batch(table)?;

    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", path.display())))?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .map_err(|e| AppError::io(format!("Failed to create Parquet writer: {e}")))?;
    writer
        .write(&batch)
        .map_err(|e| AppError::io(format!("Failed to write Parquet batch: {e}")))?;
    writer
        .close()
        .map_err(|e| AppError::io(format!("Failed to close Parquet writer: {e}")))?;

    let metadata = fs::metadata(path)
        .map_err(|e| AppError::io(format!("Failed to stat '{}': {e}", path.display())))?;
    Ok(metadata.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceFields;
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn table() -> CleanTable {
        let ts = NaiveDate::from_ymd_opt(2011, 3, 4).unwrap().and_hms_opt(12, 0, 0).unwrap();
        let records = vec![
            CleanedRecord::derive(
                SourceFields {
                    invoice: Some("C1".into()),
                    country: Some("France".into()),
                    ..SourceFields::default()
                },
                2.0,
                ts,
                1.25,
            ),
            CleanedRecord::derive(SourceFields::default(), -1.0, ts, 4.0),
        ];
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
            records,
        }
    }

    #[test]
    fn schema_follows_present_columns() {
        let schema = build_arrow_schema(&[Column::InvoiceDate, Column::OrderDate, Column::Year]);
        assert_eq!(schema.fields().len(), 3);
        assert_eq!(
            schema.field(0).data_type(),
            &DataType::Timestamp(TimeUnit::Microsecond, None)
        );
        assert_eq!(schema.field(1).data_type(), &DataType::Date32);
        assert_eq!(schema.field(2).data_type(), &DataType::Int32);
    }

    #[test]
    fn batch_keeps_nulls_and_values() {
        let batch = to_record_batch(&table()).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 10);

        let invoice = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(invoice.value(0), "C1");
        assert!(invoice.is_null(1));

        let revenue = batch.column(5).as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(revenue.value(0), 2.5);
        assert_eq!(revenue.value(1), -4.0);

        let order_date = batch.column(6).as_any().downcast_ref::<Date32Array>().unwrap();
        assert_eq!(order_date.value(0), 15037);
    }

    #[test]
    fn parquet_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales_clean.parquet");
        let bytes = write_parquet(&path, &table()).unwrap();
        assert!(bytes > 0);

        let file = File::open(&path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file).unwrap().build().unwrap();
        let rows: usize = reader.map(|b| b.unwrap().num_rows()).sum();
        assert_eq!(rows, 2);
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("sales_clean.parquet");
        let err = write_parquet(&path, &table()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
