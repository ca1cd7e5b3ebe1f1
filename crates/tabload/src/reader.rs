//! Delimited file reader
//!
//! Reads a whole file into a [`RowBatch`]. Cells are typed per column, the
//! way dataframe readers do it: a column becomes booleans, integers or floats
//! only when every non-missing cell parses as one; otherwise all of its cells
//! stay text.

use crate::batch::{RowBatch, Value};
use crate::error::{LoadError, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Cell spellings read as a missing value
pub const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Field delimiter byte
    pub delimiter: u8,
    /// Whether the first column is an exported row index to drop
    pub index_column: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            index_column: true,
        }
    }
}

/// Read `path` into a batch.
///
/// A missing file is [`LoadError::FileNotFound`]; anything malformed
/// (ragged rows, invalid UTF-8, duplicate or absent columns) is
/// [`LoadError::Parse`].
pub fn read_batch(path: &Path, options: &ReadOptions) -> Result<RowBatch> {
    if !path.is_file() {
        return Err(LoadError::FileNotFound(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .from_path(path)
        .map_err(|e| LoadError::parse(path, e.to_string()))?;

    let skip = usize::from(options.index_column);
    let headers = reader
        .headers()
        .map_err(|e| LoadError::parse(path, e.to_string()))?
        .clone();

    if skip == 1 {
        debug!(
            file = %path.display(),
            column = headers.get(0).unwrap_or_default(),
            "Dropping index column"
        );
    }

    let columns: Vec<String> = headers.iter().skip(skip).map(str::to_string).collect();
    if columns.is_empty() {
        return Err(LoadError::parse(path, "header has no data columns"));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
        return Err(LoadError::parse(path, format!("duplicate column '{}'", dup)));
    }

    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); columns.len()];
    for record in reader.records() {
        let record = record.map_err(|e| LoadError::parse(path, e.to_string()))?;
        for (cells, field) in raw.iter_mut().zip(record.iter().skip(skip)) {
            cells.push((!MISSING_MARKERS.contains(&field)).then(|| field.to_string()));
        }
    }

    let typed: Vec<Vec<Value>> = raw.into_iter().map(type_column).collect();
    let row_count = typed.first().map_or(0, Vec::len);

    let mut rows: Vec<Vec<Value>> = (0..row_count)
        .map(|_| Vec::with_capacity(columns.len()))
        .collect();
    for column in typed {
        for (row, cell) in rows.iter_mut().zip(column) {
            row.push(cell);
        }
    }

    debug!(
        file = %path.display(),
        rows = row_count,
        columns = columns.len(),
        "Read delimited file"
    );

    RowBatch::new(columns, rows).map_err(|message| LoadError::parse(path, message))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "True" | "true" | "TRUE" => Some(true),
        "False" | "false" | "FALSE" => Some(false),
        _ => None,
    }
}

/// Convert every present cell with `parse`, or give up if any cell fails.
fn convert<T>(
    raw: &[Option<String>],
    parse: impl Fn(&str) -> Option<T>,
    wrap: impl Fn(T) -> Value,
) -> Option<Vec<Value>> {
    raw.iter()
        .map(|cell| match cell {
            None => Some(Value::Null),
            Some(s) => parse(s.as_str()).map(&wrap),
        })
        .collect()
}

fn type_column(raw: Vec<Option<String>>) -> Vec<Value> {
    if raw.iter().all(Option::is_none) {
        return raw.into_iter().map(|_| Value::Null).collect();
    }

    convert(&raw, parse_bool, Value::Boolean)
        .or_else(|| convert(&raw, |s| s.parse::<i64>().ok(), Value::Integer))
        .or_else(|| convert(&raw, |s| s.parse::<f64>().ok(), Value::Numeric))
        .unwrap_or_else(|| {
            raw.into_iter()
                .map(|cell| cell.map_or(Value::Null, Value::Text))
                .collect()
        })
}
