//! Date column detection
//!
//! A text column is reinterpreted as timestamps only when every one of its
//! values looks like `YYYY-MM-DD HH:MM:SS`. Values that look right but are not
//! real instants (February 30th, hour 25) become nulls instead of failing the
//! load. The format is fixed.

use crate::batch::{RowBatch, Value, TIMESTAMP_FORMAT};
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}$").expect("timestamp pattern is valid")
    })
}

/// One column that was converted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedColumn {
    pub name: String,
    /// Values that matched the pattern but did not parse, now null
    pub coerced: usize,
}

/// Convert every all-matching text column of `batch` to timestamps.
pub fn normalize_timestamps(batch: &mut RowBatch) -> Vec<NormalizedColumn> {
    let mut converted = Vec::new();

    for idx in 0..batch.column_count() {
        if !is_timestamp_column(batch, idx) {
            continue;
        }

        let mut coerced = 0;
        batch.map_column(idx, |value| match value {
            Value::Text(s) => match NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT) {
                Ok(ts) => Value::Timestamp(ts),
                Err(_) => {
                    coerced += 1;
                    Value::Null
                },
            },
            other => other,
        });

        let name = batch.columns()[idx].clone();
        if coerced > 0 {
            warn!(column = %name, coerced, "Unparsable timestamps replaced with NULL");
        } else {
            debug!(column = %name, "Column normalized to timestamps");
        }
        converted.push(NormalizedColumn { name, coerced });
    }

    converted
}

/// Every non-null value is text matching the pattern, and there is at least one.
fn is_timestamp_column(batch: &RowBatch, idx: usize) -> bool {
    let mut any = false;
    for value in batch.column(idx) {
        match value {
            Value::Null => {},
            Value::Text(s) if timestamp_pattern().is_match(s) => any = true,
            _ => return false,
        }
    }
    any
}
