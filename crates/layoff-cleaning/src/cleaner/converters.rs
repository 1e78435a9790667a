//! Type conversion functions for the measure and event-date columns.

use crate::utils::parse_numeric_string;
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

/// Days from 0001-01-01 (CE) to 1970-01-01, the Polars `Date` epoch.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

// Month/day with one or two digits, year with exactly four
static EVENT_DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("Invalid regex: M/D/YYYY")
});

/// Parse event-date text in `M/D/YYYY` form.
///
/// Returns `None` when the text does not match the format or names a day that
/// does not exist (e.g. `2/30/2023`).
pub fn parse_event_date(text: &str) -> Option<NaiveDate> {
    let caps = EVENT_DATE_PATTERN.captures(text.trim())?;
    let month = caps[1].parse::<u32>().ok()?;
    let day = caps[2].parse::<u32>().ok()?;
    let year = caps[3].parse::<i32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Polars physical representation of a date (days since the Unix epoch).
pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

/// Inverse of [`date_to_days`].
pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)
}

/// Build a `Date` series from optional calendar dates.
pub(crate) fn dates_to_series(name: PlSmallStr, dates: &[Option<NaiveDate>]) -> PolarsResult<Series> {
    let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(date_to_days)).collect();
    Series::new(name, days).cast(&DataType::Date)
}

/// Outcome of converting a string column to a numeric dtype.
#[derive(Debug)]
pub(crate) struct NumericConversion {
    pub series: Series,
    /// Non-null inputs that could not be parsed and became null.
    pub unparseable: usize,
}

/// Convert a string series to Int64 or Float64.
///
/// Integers parsed from a decimal are truncated. Any other target dtype is
/// handled by a plain cast.
pub(crate) fn string_to_numeric(series: &Series, target: &DataType) -> PolarsResult<NumericConversion> {
    let values = series.str()?;
    let mut unparseable = 0usize;

    let mut parse = |opt_val: Option<&str>| -> Option<f64> {
        let val = opt_val?;
        let parsed = parse_numeric_string(val);
        if parsed.is_none() {
            unparseable += 1;
        }
        parsed
    };

    let series = match target {
        DataType::Int64 => {
            let parsed: Vec<Option<i64>> = values
                .into_iter()
                .map(|v| parse(v).map(|f| f as i64))
                .collect();
            Series::new(series.name().clone(), parsed)
        }
        DataType::Float64 => {
            let parsed: Vec<Option<f64>> = values.into_iter().map(&mut parse).collect();
            Series::new(series.name().clone(), parsed)
        }
        other => series.cast(other)?,
    };

    Ok(NumericConversion {
        series,
        unparseable,
    })
}
