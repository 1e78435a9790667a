//! Column layout of a layoff record and conformance of a source relation.
//!
//! [`conform`] turns whatever the extract supplies into the working schema:
//! exactly the nine business columns in canonical order, text columns as
//! String, measures as numbers, and import null markers replaced by nulls.

use crate::cleaner::converters::{dates_to_series, string_to_numeric};
use crate::config::CleaningConfig;
use crate::error::{CleaningError, Result, ResultExt};
use crate::utils::{CellEdit, column_names, rewrite_string_column, series, string_column};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, warn};

pub const COMPANY: &str = "company";
pub const LOCATION: &str = "location";
pub const INDUSTRY: &str = "industry";
pub const TOTAL_LAID_OFF: &str = "total_laid_off";
pub const PERCENTAGE_LAID_OFF: &str = "percentage_laid_off";
/// The event date. The public extract names this column `date`.
pub const EVENT_DATE: &str = "date";
pub const STAGE: &str = "stage";
pub const COUNTRY: &str = "country";
pub const FUNDS_RAISED_MILLIONS: &str = "funds_raised_millions";

/// Transient duplicate rank, present only while cleaning.
pub const RANK_COLUMN: &str = "row_num";

/// The nine business columns in canonical order.
pub const BUSINESS_COLUMNS: [&str; 9] = [
    COMPANY,
    LOCATION,
    INDUSTRY,
    TOTAL_LAID_OFF,
    PERCENTAGE_LAID_OFF,
    EVENT_DATE,
    STAGE,
    COUNTRY,
    FUNDS_RAISED_MILLIONS,
];

/// Free-text columns that must be String.
pub const TEXT_COLUMNS: [&str; 5] = [COMPANY, LOCATION, INDUSTRY, STAGE, COUNTRY];

/// Numeric measures and the dtype each is coerced to.
pub const MEASURE_COLUMNS: [(&str, DataType); 3] = [
    (TOTAL_LAID_OFF, DataType::Int64),
    (PERCENTAGE_LAID_OFF, DataType::Float64),
    (FUNDS_RAISED_MILLIONS, DataType::Int64),
];

/// What conformance changed in the working copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConformStats {
    /// Source columns outside the business schema that were dropped.
    pub dropped_columns: Vec<String>,
    /// Cells equal to an import null marker that became null.
    pub null_markers_replaced: usize,
    /// Non-null measure cells that could not be parsed as numbers.
    pub unparseable_measures: usize,
}

/// Fail with every business column the frame lacks.
pub fn check_columns(df: &DataFrame) -> Result<()> {
    let present: HashSet<String> = column_names(df).into_iter().collect();
    let missing: Vec<String> = BUSINESS_COLUMNS
        .iter()
        .filter(|name| !present.contains(**name))
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CleaningError::MissingColumns(missing))
    }
}

/// Bring a snapshot of the source relation into the working schema.
pub fn conform(df: DataFrame, config: &CleaningConfig) -> Result<(DataFrame, ConformStats)> {
    check_columns(&df)?;

    let mut stats = ConformStats {
        dropped_columns: column_names(&df)
            .into_iter()
            .filter(|name| !BUSINESS_COLUMNS.contains(&name.as_str()))
            .collect(),
        ..Default::default()
    };
    if !stats.dropped_columns.is_empty() {
        debug!("Dropping non-business columns: {:?}", stats.dropped_columns);
    }

    let mut df = df
        .select(BUSINESS_COLUMNS)
        .context("Selecting business columns")?;

    // Text columns (and a textual event date) must be String; all-null
    // columns come in typed as Null and are widened.
    for name in TEXT_COLUMNS.iter().chain(std::iter::once(&EVENT_DATE)) {
        let dtype = series(&df, name)?.dtype().clone();
        match dtype {
            DataType::String => {}
            DataType::Date if *name == EVENT_DATE => {}
            DataType::Null => {
                let widened = series(&df, name)?.cast(&DataType::String)?;
                df.replace(name, widened)?;
            }
            other => {
                return Err(CleaningError::UnexpectedType {
                    column: name.to_string(),
                    expected: DataType::String.to_string(),
                    found: other.to_string(),
                });
            }
        }
    }

    if !config.null_markers.is_empty() {
        stats.null_markers_replaced = replace_null_markers(&mut df, &config.null_markers)?;
        if stats.null_markers_replaced > 0 {
            debug!(
                "Replaced {} null marker cells with null",
                stats.null_markers_replaced
            );
        }
    }

    for (name, target) in MEASURE_COLUMNS.iter() {
        let source = series(&df, name)?;
        let coerced = if source.dtype() == &DataType::String {
            let converted = string_to_numeric(source, target)
                .context(format!("Converting '{}' to {}", name, target))?;
            stats.unparseable_measures += converted.unparseable;
            converted.series
        } else if source.dtype() == target {
            continue;
        } else {
            source.cast(target).map_err(|e| CleaningError::UnexpectedType {
                column: name.to_string(),
                expected: target.to_string(),
                found: format!("{} ({})", source.dtype(), e),
            })?
        };
        df.replace(name, coerced)?;
    }

    if stats.unparseable_measures > 0 {
        warn!(
            "{} measure cells were not numeric and became null",
            stats.unparseable_measures
        );
    }

    Ok((df, stats))
}

/// Type a textual event date holding only ISO `YYYY-MM-DD` values as `Date`.
///
/// Cleaned CSV output stores the event date in ISO form. Reading it back
/// with every column as text would otherwise null every date, since ISO text
/// does not match `M/D/YYYY`. The column is left untouched (and `false`
/// returned) unless it is String, has a value, and every value is ISO.
pub fn retype_iso_event_dates(df: &mut DataFrame) -> Result<bool> {
    if series(df, EVENT_DATE)?.dtype() != &DataType::String {
        return Ok(false);
    }

    let typed = {
        let texts = string_column(df, EVENT_DATE)?;
        if texts.len() == texts.null_count() {
            return Ok(false);
        }
        let mut dates = Vec::with_capacity(texts.len());
        for text in texts.into_iter() {
            match text {
                Some(text) => match NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d") {
                    Ok(date) => dates.push(Some(date)),
                    Err(_) => return Ok(false),
                },
                None => dates.push(None),
            }
        }
        dates_to_series(EVENT_DATE.into(), &dates)?
    };

    df.replace(EVENT_DATE, typed)?;
    debug!("Event date column holds ISO dates; typed as Date on import");
    Ok(true)
}

/// Null out cells that spell a missing value, in every String column.
fn replace_null_markers(df: &mut DataFrame, markers: &[String]) -> Result<usize> {
    let mut replaced = 0;
    for name in column_names(df) {
        if series(df, &name)?.dtype() != &DataType::String {
            continue;
        }
        replaced += rewrite_string_column(df, &name, |val| {
            let trimmed = val.trim();
            if markers.iter().any(|m| m == trimmed) {
                CellEdit::Clear
            } else {
                CellEdit::Keep
            }
        })?;
    }
    Ok(replaced)
}
