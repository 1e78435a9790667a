//! Blank normalization, industry backfill and removal of uninformative rows.

use crate::error::Result;
use crate::schema::{COMPANY, INDUSTRY, LOCATION, PERCENTAGE_LAID_OFF, TOTAL_LAID_OFF};
use crate::utils::{CellEdit, rewrite_string_column, series, string_column};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Set empty or whitespace-only industries to null so backfill sees them.
pub fn blank_industries_to_null(df: &mut DataFrame) -> Result<usize> {
    let cleared = rewrite_string_column(df, INDUSTRY, |val| {
        if val.trim().is_empty() {
            CellEdit::Clear
        } else {
            CellEdit::Keep
        }
    })?;
    debug!("Set {} blank industries to null", cleared);
    Ok(cleared)
}

/// A (company, location) key whose rows disagree on industry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguousBackfill {
    pub company: String,
    pub location: String,
    /// All distinct non-null industries for the key, sorted.
    pub candidates: Vec<String>,
    /// The industry that was copied into the null rows.
    pub chosen: String,
}

/// Result of the industry backfill.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillOutcome {
    /// Null industries that received a sibling's value.
    pub filled: usize,
    /// Null industries left null because no sibling had a value.
    pub unresolved: usize,
    /// Keys with more than one candidate industry that were used for filling.
    pub ambiguous: Vec<AmbiguousBackfill>,
}

/// Fill null industries from rows sharing the same (company, location).
///
/// When siblings disagree, the lexicographically smallest industry is used
/// and the key is reported in [`BackfillOutcome::ambiguous`]. Rows with a
/// null company or location have no key and are never filled.
pub fn backfill_industry(df: &mut DataFrame) -> Result<BackfillOutcome> {
    let (filled, outcome) = {
        let companies = string_column(df, COMPANY)?;
        let locations = string_column(df, LOCATION)?;
        let industries = string_column(df, INDUSTRY)?;

        let mut candidates: HashMap<(&str, &str), BTreeSet<&str>> = HashMap::new();
        for ((company, location), industry) in companies
            .into_iter()
            .zip(locations.into_iter())
            .zip(industries.into_iter())
        {
            if let (Some(company), Some(location), Some(industry)) = (company, location, industry) {
                candidates
                    .entry((company, location))
                    .or_default()
                    .insert(industry);
            }
        }

        let mut outcome = BackfillOutcome::default();
        let mut ambiguous_used: BTreeSet<(&str, &str)> = BTreeSet::new();

        let filled: Vec<Option<String>> = companies
            .into_iter()
            .zip(locations.into_iter())
            .zip(industries.into_iter())
            .map(|((company, location), industry)| {
                if let Some(industry) = industry {
                    return Some(industry.to_string());
                }
                let choice = company
                    .zip(location)
                    .and_then(|key| candidates.get(&key).map(|set| (key, set)));

                match choice.and_then(|(key, set)| set.first().map(|first| (key, set.len(), *first))) {
                    Some((key, n_candidates, first)) => {
                        outcome.filled += 1;
                        if n_candidates > 1 {
                            ambiguous_used.insert(key);
                        }
                        Some(first.to_string())
                    }
                    None => {
                        outcome.unresolved += 1;
                        None
                    }
                }
            })
            .collect();

        outcome.ambiguous = ambiguous_used
            .into_iter()
            .filter_map(|key| {
                let sorted: Vec<String> = candidates.get(&key)?.iter().map(|s| s.to_string()).collect();
                Some(AmbiguousBackfill {
                    company: key.0.to_string(),
                    location: key.1.to_string(),
                    chosen: sorted.first()?.clone(),
                    candidates: sorted,
                })
            })
            .collect();

        (filled, outcome)
    };

    if outcome.filled > 0 {
        df.replace(INDUSTRY, Series::new(INDUSTRY.into(), filled))?;
    }

    for key in &outcome.ambiguous {
        warn!(
            "Industry backfill for ({}, {}) had {} candidates {:?}; used '{}'",
            key.company,
            key.location,
            key.candidates.len(),
            key.candidates,
            key.chosen
        );
    }
    debug!(
        "Backfilled {} industries, {} left null",
        outcome.filled, outcome.unresolved
    );

    Ok(outcome)
}

/// Per-row flag: true when both layoff measures are null.
pub fn uninformative_rows(df: &DataFrame) -> Result<Vec<bool>> {
    let total = series(df, TOTAL_LAID_OFF)?.is_null();
    let percentage = series(df, PERCENTAGE_LAID_OFF)?.is_null();

    Ok(total
        .into_iter()
        .zip(percentage.into_iter())
        .map(|(t, p)| t.unwrap_or(false) && p.unwrap_or(false))
        .collect())
}

/// Delete rows lacking both layoff measures and return how many were removed.
pub fn remove_uninformative(df: DataFrame) -> Result<(DataFrame, usize)> {
    let flags = uninformative_rows(&df)?;
    let removed = flags.iter().filter(|f| **f).count();
    if removed == 0 {
        return Ok((df, 0));
    }

    let keep: Vec<bool> = flags.into_iter().map(|f| !f).collect();
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let df = df.filter(&mask)?;
    debug!("Removed {} rows without layoff measures", removed);

    Ok((df, removed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn industries(df: &DataFrame) -> Vec<Option<String>> {
        df.column(INDUSTRY)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn test_blank_industries_to_null() {
        let mut df = df!(INDUSTRY => &[Some(""), Some("  "), Some("Retail"), None]).unwrap();
        assert_eq!(blank_industries_to_null(&mut df).unwrap(), 2);
        assert_eq!(df.column(INDUSTRY).unwrap().null_count(), 3);
    }

    #[test]
    fn test_backfill_from_sibling() {
        let mut df = df!(
            COMPANY => &["Acme", "Acme", "Globex"],
            LOCATION => &["SF", "SF", "NYC"],
            INDUSTRY => &[None, Some("Crypto"), None]
        )
        .unwrap();

        let outcome = backfill_industry(&mut df).unwrap();
        assert_eq!(outcome.filled, 1);
        assert_eq!(outcome.unresolved, 1);
        assert!(outcome.ambiguous.is_empty());
        assert_eq!(
            industries(&df),
            vec![Some("Crypto".to_string()), Some("Crypto".to_string()), None]
        );
    }

    #[test]
    fn test_backfill_requires_same_location() {
        let mut df = df!(
            COMPANY => &["Acme", "Acme"],
            LOCATION => &["SF", "Austin"],
            INDUSTRY => &[None, Some("Crypto")]
        )
        .unwrap();

        let outcome = backfill_industry(&mut df).unwrap();
        assert_eq!(outcome.filled, 0);
        assert_eq!(industries(&df)[0], None);
    }

    #[test]
    fn test_backfill_ambiguous_picks_smallest() {
        let mut df = df!(
            COMPANY => &["Acme", "Acme", "Acme"],
            LOCATION => &["SF", "SF", "SF"],
            INDUSTRY => &[Some("Retail"), None, Some("Crypto")]
        )
        .unwrap();

        let outcome = backfill_industry(&mut df).unwrap();
        assert_eq!(outcome.filled, 1);
        assert_eq!(industries(&df)[1], Some("Crypto".to_string()));
        assert_eq!(
            outcome.ambiguous,
            vec![AmbiguousBackfill {
                company: "Acme".to_string(),
                location: "SF".to_string(),
                candidates: vec!["Crypto".to_string(), "Retail".to_string()],
                chosen: "Crypto".to_string(),
            }]
        );
    }

    #[test]
    fn test_backfill_ignores_null_keys() {
        let mut df = df!(
            COMPANY => &[Some("Acme"), Some("Acme")],
            LOCATION => &[None::<&str>, None],
            INDUSTRY => &[None, Some("Crypto")]
        )
        .unwrap();

        let outcome = backfill_industry(&mut df).unwrap();
        assert_eq!(outcome.filled, 0);
        assert_eq!(outcome.unresolved, 1);
    }

    #[test]
    fn test_remove_uninformative() {
        let df = df!(
            COMPANY => &["A", "B", "C", "D"],
            TOTAL_LAID_OFF => &[Some(10i64), None, None, Some(3)],
            PERCENTAGE_LAID_OFF => &[None, Some(0.5), None, Some(0.1)]
        )
        .unwrap();

        assert_eq!(
            uninformative_rows(&df).unwrap(),
            vec![false, false, true, false]
        );

        let (df, removed) = remove_uninformative(df).unwrap();
        assert_eq!(removed, 1);
        let companies: Vec<Option<&str>> =
            df.column(COMPANY).unwrap().str().unwrap().into_iter().collect();
        assert_eq!(companies, vec![Some("A"), Some("B"), Some("D")]);
    }
}
