//! In-memory rows of one input file

use chrono::NaiveDateTime;
use std::fmt;

/// Fixed rendering and parsing format for timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Numeric(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Boolean(true) => f.write_str("True"),
            Value::Boolean(false) => f.write_str("False"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Numeric(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

/// Every row of one file, with the header it was read under.
///
/// Rows are stored row-major and always have exactly `columns.len()` cells,
/// in header order. That order is the one used for both CREATE TABLE and
/// INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RowBatch {
    /// Build a batch, rejecting rows whose width differs from the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, String> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(format!(
                "row {} has {} values, expected {}",
                idx + 1,
                row.len(),
                columns.len()
            ));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of column `idx`, top to bottom
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| &row[idx])
    }

    /// Rewrite every cell of column `idx` in place
    pub fn map_column(&mut self, idx: usize, mut f: impl FnMut(Value) -> Value) {
        for row in &mut self.rows {
            let cell = std::mem::replace(&mut row[idx], Value::Null);
            row[idx] = f(cell);
        }
    }
}
