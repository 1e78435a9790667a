//! Text standardization and event-date typing.

use super::converters::{dates_to_series, parse_event_date};
use crate::config::CleaningConfig;
use crate::error::{CleaningError, Result};
use crate::schema::{COMPANY, COUNTRY, EVENT_DATE, INDUSTRY};
use crate::utils::{CellEdit, rewrite_string_column, series};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How many unparseable date texts are kept as examples.
const MAX_DATE_SAMPLES: usize = 5;

/// Strip leading and trailing whitespace from company names.
pub fn trim_company(df: &mut DataFrame) -> Result<usize> {
    let trimmed = rewrite_string_column(df, COMPANY, |val| {
        let t = val.trim();
        if t.len() == val.len() {
            CellEdit::Keep
        } else {
            CellEdit::Set(t.to_string())
        }
    })?;
    debug!("Trimmed {} company names", trimmed);
    Ok(trimmed)
}

/// Collapse industry variants onto their canonical label.
pub fn canonicalize_industry(df: &mut DataFrame, config: &CleaningConfig) -> Result<usize> {
    if config.industry_rules.is_empty() {
        return Ok(0);
    }
    let changed = rewrite_string_column(df, INDUSTRY, |val| {
        match config.canonical_industry(val) {
            Some(canonical) if canonical != val => CellEdit::Set(canonical.to_string()),
            _ => CellEdit::Keep,
        }
    })?;
    debug!("Canonicalized {} industry values", changed);
    Ok(changed)
}

/// Strip trailing periods from values that start with a listed country.
pub fn strip_country_periods(df: &mut DataFrame, config: &CleaningConfig) -> Result<usize> {
    let changed = rewrite_string_column(df, COUNTRY, |val| {
        if config.is_listed_country(val) && val.ends_with('.') {
            CellEdit::Set(val.trim_end_matches('.').to_string())
        } else {
            CellEdit::Keep
        }
    })?;
    debug!("Stripped trailing periods from {} country values", changed);
    Ok(changed)
}

/// Result of typing the event-date column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateConversion {
    /// Texts that parsed to a calendar date.
    pub parsed: usize,
    /// Non-null texts that did not match `M/D/YYYY` and became null.
    pub unparseable: usize,
    /// A few of the texts that failed, for the run report.
    pub samples: Vec<String>,
    /// True when the column was already a `Date` and was left alone.
    pub already_typed: bool,
}

/// Parse the textual event date and change the column's dtype to `Date`.
///
/// Text that does not match `M/D/YYYY` becomes null. That loss is counted in
/// the returned [`DateConversion`] and logged, never raised as an error.
pub fn parse_event_dates(df: &mut DataFrame) -> Result<DateConversion> {
    let source = series(df, EVENT_DATE)?;

    match source.dtype() {
        DataType::Date => {
            debug!("Event date column is already typed");
            return Ok(DateConversion {
                parsed: source.len() - source.null_count(),
                already_typed: true,
                ..Default::default()
            });
        }
        DataType::String => {}
        other => {
            return Err(CleaningError::UnexpectedType {
                column: EVENT_DATE.to_string(),
                expected: "str or date".to_string(),
                found: other.to_string(),
            });
        }
    }

    let mut outcome = DateConversion::default();
    let dates: Vec<Option<NaiveDate>> = source
        .str()?
        .into_iter()
        .map(|opt_text| {
            let text = opt_text?;
            let parsed = parse_event_date(text);
            match parsed {
                Some(_) => outcome.parsed += 1,
                None => {
                    outcome.unparseable += 1;
                    if outcome.samples.len() < MAX_DATE_SAMPLES {
                        outcome.samples.push(text.to_string());
                    }
                }
            }
            parsed
        })
        .collect();

    let typed = dates_to_series(source.name().clone(), &dates)?;
    df.replace(EVENT_DATE, typed)?;

    if outcome.unparseable > 0 {
        warn!(
            "{} event dates did not match M/D/YYYY and were set to null (e.g. {:?})",
            outcome.unparseable, outcome.samples
        );
    }
    debug!("Parsed {} event dates", outcome.parsed);

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::converters::days_to_date;
    use crate::config::PrefixRule;

    #[test]
    fn test_trim_company() {
        let mut df = df!(COMPANY => &[Some(" Included Health"), Some("Acme"), None]).unwrap();
        assert_eq!(trim_company(&mut df).unwrap(), 1);

        let col = df.column(COMPANY).unwrap().str().unwrap();
        assert_eq!(col.get(0), Some("Included Health"));
        assert_eq!(col.get(1), Some("Acme"));
        assert_eq!(col.get(2), None);
    }

    #[test]
    fn test_canonicalize_industry_default_rule() {
        let mut df = df!(
            INDUSTRY => &[Some("Crypto Currency"), Some("CryptoCurrency"), Some("Crypto"), Some("Retail"), None]
        )
        .unwrap();
        let changed = canonicalize_industry(&mut df, &CleaningConfig::default()).unwrap();

        // "Crypto" itself is already canonical
        assert_eq!(changed, 2);
        let col = df.column(INDUSTRY).unwrap().str().unwrap();
        let values: Vec<Option<&str>> = col.into_iter().collect();
        assert_eq!(
            values,
            vec![Some("Crypto"), Some("Crypto"), Some("Crypto"), Some("Retail"), None]
        );
    }

    #[test]
    fn test_canonicalize_industry_custom_rules() {
        let config = CleaningConfig::builder()
            .industry_rules(vec![PrefixRule::new("Fin", "Finance")])
            .build()
            .unwrap();
        let mut df = df!(INDUSTRY => &["Fintech", "Crypto Currency"]).unwrap();

        assert_eq!(canonicalize_industry(&mut df, &config).unwrap(), 1);
        let col = df.column(INDUSTRY).unwrap().str().unwrap();
        assert_eq!(col.get(0), Some("Finance"));
        assert_eq!(col.get(1), Some("Crypto Currency"));
    }

    #[test]
    fn test_strip_country_periods() {
        let mut df =
            df!(COUNTRY => &["United States.", "United States..", "United States", "Canada."])
                .unwrap();
        let changed = strip_country_periods(&mut df, &CleaningConfig::default()).unwrap();

        assert_eq!(changed, 2);
        let col = df.column(COUNTRY).unwrap().str().unwrap();
        assert_eq!(col.get(0), Some("United States"));
        assert_eq!(col.get(1), Some("United States"));
        assert_eq!(col.get(2), Some("United States"));
        // Countries outside the list are untouched
        assert_eq!(col.get(3), Some("Canada."));
    }

    #[test]
    fn test_parse_event_dates_types_column() {
        let mut df = df!(EVENT_DATE => &[Some("3/5/2023"), Some("12/16/2022"), None]).unwrap();
        let outcome = parse_event_dates(&mut df).unwrap();

        assert_eq!(outcome.parsed, 2);
        assert_eq!(outcome.unparseable, 0);
        let col = df.column(EVENT_DATE).unwrap().as_materialized_series();
        assert_eq!(col.dtype(), &DataType::Date);
        match col.get(0).unwrap() {
            AnyValue::Date(days) => {
                assert_eq!(days_to_date(days), NaiveDate::from_ymd_opt(2023, 3, 5))
            }
            other => panic!("expected a date, got {other:?}"),
        }
        assert_eq!(col.null_count(), 1);
    }

    #[test]
    fn test_parse_event_dates_flags_unparseable_text() {
        let mut df = df!(EVENT_DATE => &["3/5/2023", "2023-03-05", "soon", "2/30/2023"]).unwrap();
        let outcome = parse_event_dates(&mut df).unwrap();

        assert_eq!(outcome.parsed, 1);
        assert_eq!(outcome.unparseable, 3);
        assert_eq!(outcome.samples, vec!["2023-03-05", "soon", "2/30/2023"]);
        assert_eq!(df.column(EVENT_DATE).unwrap().null_count(), 3);
    }

    #[test]
    fn test_parse_event_dates_skips_typed_column() {
        let mut df = df!(EVENT_DATE => &["3/5/2023"]).unwrap();
        parse_event_dates(&mut df).unwrap();
        let again = parse_event_dates(&mut df).unwrap();

        assert!(again.already_typed);
        assert_eq!(again.parsed, 1);
        assert_eq!(df.column(EVENT_DATE).unwrap().dtype(), &DataType::Date);
    }

    #[test]
    fn test_parse_event_dates_rejects_numbers() {
        let mut df = df!(EVENT_DATE => &[20230305i64]).unwrap();
        let err = parse_event_dates(&mut df).unwrap_err();
        assert_eq!(err.error_code(), "UNEXPECTED_TYPE");
    }
}
