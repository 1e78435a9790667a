//! Shared helpers for reading and rewriting relation columns.

use crate::error::{CleaningError, Result};
use polars::prelude::*;

// =============================================================================
// Column Access
// =============================================================================

/// Names of all columns in the frame, as owned strings.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}

/// Borrow a column as a Series, mapping a missing column to
/// [`CleaningError::ColumnNotFound`].
pub fn series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|col| col.as_materialized_series())
        .map_err(|_| CleaningError::ColumnNotFound(name.to_string()))
}

/// Borrow a String column, rejecting any other dtype.
pub fn string_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked> {
    let series = series(df, name)?;
    if series.dtype() != &DataType::String {
        return Err(CleaningError::UnexpectedType {
            column: name.to_string(),
            expected: DataType::String.to_string(),
            found: series.dtype().to_string(),
        });
    }
    Ok(series.str()?)
}

// =============================================================================
// Column Rewriting
// =============================================================================

/// What to do with one non-null string cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellEdit {
    /// Leave the value untouched.
    Keep,
    /// Replace the value.
    Set(String),
    /// Replace the value with null.
    Clear,
}

/// Rewrite every non-null cell of a String column and return how many cells
/// changed. Null cells are never passed to `edit`. The column is only
/// replaced when at least one cell changed.
pub fn rewrite_string_column<F>(df: &mut DataFrame, name: &str, mut edit: F) -> Result<usize>
where
    F: FnMut(&str) -> CellEdit,
{
    let values = string_column(df, name)?;
    let mut changed = 0usize;

    let rewritten: Vec<Option<String>> = values
        .into_iter()
        .map(|opt_val| match opt_val {
            Some(val) => match edit(val) {
                CellEdit::Keep => Some(val.to_string()),
                CellEdit::Set(new_val) => {
                    if new_val != val {
                        changed += 1;
                    }
                    Some(new_val)
                }
                CellEdit::Clear => {
                    changed += 1;
                    None
                }
            },
            None => None,
        })
        .collect();

    if changed > 0 {
        df.replace(name, Series::new(name.into(), rewritten))?;
    }

    Ok(changed)
}

/// Column-major string views of `columns`, with nulls preserved.
///
/// Non-string columns are cast to String first so that every column can take
/// part in an equality key.
pub fn string_views(df: &DataFrame, columns: &[&str]) -> Result<Vec<Vec<Option<String>>>> {
    let mut views = Vec::with_capacity(columns.len());
    for name in columns {
        let casted = series(df, name)?.cast(&DataType::String)?;
        let values: Vec<Option<String>> = casted
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();
        views.push(values);
    }
    Ok(views)
}

// =============================================================================
// Numeric Parsing
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 4] = [',', '$', '%', ' '];

/// Clean a string for numeric parsing by removing formatting characters.
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Parse a loosely formatted number.
///
/// A trailing `%` scales the value to a fraction, so `"15%"` and `"0.15"`
/// parse to the same value.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    let cleaned = clean_numeric_string(trimmed);
    if cleaned.is_empty() {
        return None;
    }
    let value = cleaned.parse::<f64>().ok().filter(|v| v.is_finite())?;
    if trimmed.ends_with('%') {
        Some(value / 100.0)
    } else {
        Some(value)
    }
}
