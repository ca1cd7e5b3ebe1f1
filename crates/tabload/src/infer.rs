//! Column type inference
//!
//! A column is profiled once (how many cells of each kind it holds), then the
//! profile is matched against the candidate types in a fixed order. The first
//! match wins, so the order of the arms in [`infer_column_type`] is the
//! contract:
//!
//! 1. all booleans → `boolean`
//! 2. all integers → `integer`
//! 3. all integers or floats → `numeric`
//! 4. all text → `varchar(n)`, `n` the longest rendering
//! 5. timestamps, possibly with nulls → `timestamp without time zone`
//! 6. anything else → `text`
//!
//! An empty column is `text`. Missing values only survive in timestamp
//! columns, where date normalization is what put them there; anywhere else a
//! null makes the column mixed and it falls through to `text`.

use crate::batch::Value;
use std::fmt;

/// Inferred PostgreSQL storage type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Boolean,
    Integer,
    Numeric,
    Varchar(usize),
    Timestamp,
    Text,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Boolean => f.write_str("boolean"),
            SqlType::Integer => f.write_str("integer"),
            SqlType::Numeric => f.write_str("numeric"),
            SqlType::Varchar(n) => write!(f, "varchar({})", n),
            SqlType::Timestamp => f.write_str("timestamp without time zone"),
            SqlType::Text => f.write_str("text"),
        }
    }
}

/// Cell counts per kind, plus the longest rendering seen
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ColumnProfile {
    total: usize,
    nulls: usize,
    booleans: usize,
    integers: usize,
    numerics: usize,
    texts: usize,
    timestamps: usize,
    max_chars: usize,
}

impl ColumnProfile {
    fn of<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut profile = Self::default();
        for value in values {
            profile.total += 1;
            match value {
                Value::Null => profile.nulls += 1,
                Value::Boolean(_) => profile.booleans += 1,
                Value::Integer(_) => profile.integers += 1,
                Value::Numeric(_) => profile.numerics += 1,
                Value::Text(_) => profile.texts += 1,
                Value::Timestamp(_) => profile.timestamps += 1,
            }
            profile.max_chars = profile.max_chars.max(rendered_len(value));
        }
        profile
    }
}

fn rendered_len(value: &Value) -> usize {
    match value {
        Value::Text(s) => s.chars().count(),
        other => other.to_string().chars().count(),
    }
}

/// Pick the storage type for a column from its full set of values.
///
/// Total: every input yields exactly one type.
pub fn infer_column_type<'a>(values: impl IntoIterator<Item = &'a Value>) -> SqlType {
    let p = ColumnProfile::of(values);

    match p {
        ColumnProfile { total: 0, .. } => SqlType::Text,
        p if p.booleans == p.total => SqlType::Boolean,
        p if p.integers == p.total => SqlType::Integer,
        p if p.integers + p.numerics == p.total => SqlType::Numeric,
        // varchar(0) is not a valid PostgreSQL type
        p if p.texts == p.total => SqlType::Varchar(p.max_chars.max(1)),
        p if p.timestamps > 0 && p.timestamps + p.nulls == p.total => SqlType::Timestamp,
        _ => SqlType::Text,
    }
}
