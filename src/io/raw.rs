//! Raw CSV discovery and loading.
//!
//! Raw files are read as loosely typed text: every cell is an optional string
//! and nothing is validated here. Files are concatenated into one [`RawTable`]
//! whose column set is the union of all headers (first-seen order); rows from
//! a file that lacks a column simply have no value for it.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::error::AppError;

/// Concatenated raw rows from one or more files.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Union of header names across files, in first-seen order.
    pub headers: Vec<String>,
    /// One entry per data row; indices line up with `headers`.
    ///
    /// Rows read before a later file introduced new headers are shorter than
    /// `headers`; missing trailing cells are treated as absent.
    pub rows: Vec<Vec<Option<String>>>,
    pub files_read: usize,
    /// Rows the CSV reader could not decode (bad UTF-8, broken quoting).
    pub unreadable_rows: usize,
}

impl RawTable {
    pub fn header_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell value, `None` when absent or empty.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// List `*.csv` files directly inside `raw_dir`, sorted by name.
///
/// An absent directory or a directory without CSV files is an error: the
/// pipeline has nothing to do.
pub fn discover_raw_files(raw_dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    if !raw_dir.is_dir() {
        return Err(AppError::io(format!(
            "No CSVs found in {} (directory does not exist)",
            raw_dir.display()
        )));
    }

    let pattern = format!(
        "{}/*.csv",
        glob::Pattern::escape(&raw_dir.to_string_lossy())
    );
    let entries = glob::glob(&pattern)
        .map_err(|e| AppError::io(format!("Invalid raw directory pattern '{pattern}': {e}")))?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!("skipping unreadable entry: {e}"),
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(AppError::io(format!("No CSVs found in {}", raw_dir.display())));
    }
    Ok(files)
}

/// Read every file in order and concatenate the rows.
pub fn load_raw_files(files: &[PathBuf]) -> Result<RawTable, AppError> {
    let mut table = RawTable::default();
    let mut union_index: HashMap<String, usize> = HashMap::new();

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        println!("Reading {name} ...");

        let before = table.rows.len();
        append_file(path, &mut table, &mut union_index)?;
        table.files_read += 1;
        info!(file = %name, rows = table.rows.len() - before, "read raw file");
    }

    if table.unreadable_rows > 0 {
        warn!(rows = table.unreadable_rows, "skipped unreadable raw rows");
    }
    Ok(table)
}

fn append_file(
    path: &Path,
    table: &mut RawTable,
    union_index: &mut HashMap<String, usize>,
) -> Result<(), AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::io(format!("Failed to read CSV headers of '{}': {e}", path.display())))?
        .clone();

    if headers.is_empty() {
        warn!(file = %path.display(), "raw file has no header row; skipping");
        return Ok(());
    }

    let file_columns = map_file_columns(&headers, table, union_index);

    for (idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                // +2: header line plus 1-based numbering.
                debug!(file = %path.display(), line = idx + 2, "unreadable row: {e}");
                table.unreadable_rows += 1;
                continue;
            }
        };

        let mut row = vec![None; table.headers.len()];
        for (pos, value) in record.iter().enumerate() {
            let Some(&target) = file_columns.get(pos) else {
                continue;
            };
            if !value.is_empty() {
                row[target] = Some(value.to_string());
            }
        }
        table.rows.push(row);
    }

    Ok(())
}

/// Map this file's header positions to union column indices, registering new
/// headers as they appear. Repeated names within one file get `.1`, `.2`, ...
/// suffixes so each position keeps its own column.
fn map_file_columns(
    headers: &StringRecord,
    table: &mut RawTable,
    union_index: &mut HashMap<String, usize>,
) -> Vec<usize> {
    let mut seen_in_file: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(headers.len());

    for raw_name in headers.iter() {
        let base = normalize_header_name(raw_name);
        let count = seen_in_file.entry(base.clone()).or_insert(0);
        let name = if *count == 0 {
            base.clone()
        } else {
            format!("{base}.{count}")
        };
        *count += 1;

        let idx = *union_index.entry(name.clone()).or_insert_with(|| {
            table.headers.push(name);
            table.headers.len() - 1
        });
        out.push(idx);
    }

    out
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, the first column never matches.
    name.trim_start_matches('\u{feff}').trim().to_string()
}
