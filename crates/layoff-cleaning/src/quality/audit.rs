use crate::cleaner::converters::parse_event_date;
use crate::cleaner::dedup::count_duplicates;
use crate::cleaner::nulls::uninformative_rows;
use crate::config::CleaningConfig;
use crate::error::Result;
use crate::schema::{
    COMPANY, COUNTRY, EVENT_DATE, INDUSTRY, LOCATION, RANK_COLUMN, check_columns,
};
use crate::utils::{column_names, series, string_column};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Distinct example values kept per issue.
const MAX_SAMPLES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityIssueKind {
    /// Rows identical to an earlier row over all business columns.
    DuplicateRows,
    /// Rows with both layoff measures null.
    UninformativeRows,
    /// Company names with surrounding whitespace.
    UntrimmedCompany,
    /// Industries covered by a rule but not equal to its canonical label.
    NonCanonicalIndustry,
    /// Empty or whitespace-only industries.
    BlankIndustry,
    /// Listed countries ending in a period.
    CountryTrailingPeriod,
    /// The event date is not stored with dtype `Date`.
    EventDateNotTyped,
    /// Event-date text that does not parse as `M/D/YYYY`.
    UnparseableDate,
    /// Missing industries that a (company, location) sibling could fill.
    BackfillableIndustry,
    /// The transient rank column is still attached.
    RankColumnPresent,
}

impl QualityIssueKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DuplicateRows => "Duplicate rows",
            Self::UninformativeRows => "Rows without layoff measures",
            Self::UntrimmedCompany => "Untrimmed company names",
            Self::NonCanonicalIndustry => "Non-canonical industries",
            Self::BlankIndustry => "Blank industries",
            Self::CountryTrailingPeriod => "Countries with trailing periods",
            Self::EventDateNotTyped => "Event date stored as text",
            Self::UnparseableDate => "Unparseable event dates",
            Self::BackfillableIndustry => "Backfillable industries",
            Self::RankColumnPresent => "Rank column present",
        }
    }
}

/// One violated invariant, with how many rows or cells it touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub kind: QualityIssueKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub count: usize,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<String>,
}

impl QualityIssue {
    fn new(kind: QualityIssueKind, column: Option<&str>, count: usize) -> Self {
        Self {
            kind,
            column: column.map(str::to_string),
            count,
            description: format!("{}: {}", kind.display_name(), count),
            samples: Vec::new(),
        }
    }

    fn with_samples(mut self, samples: Vec<String>) -> Self {
        self.samples = samples;
        self
    }
}

/// Checks a relation against the cleaned-relation invariants.
pub struct QualityAuditor;

impl QualityAuditor {
    /// Audit `df` and return every issue found, in a fixed order.
    ///
    /// The frame must carry the business columns with String text columns;
    /// run it on a conformed frame.
    pub fn audit(df: &DataFrame, config: &CleaningConfig) -> Result<Vec<QualityIssue>> {
        check_columns(df)?;
        let mut issues = Vec::new();

        if column_names(df).iter().any(|name| name == RANK_COLUMN) {
            issues.push(QualityIssue::new(
                QualityIssueKind::RankColumnPresent,
                Some(RANK_COLUMN),
                df.height(),
            ));
        }

        let duplicates = count_duplicates(df)?;
        if duplicates > 0 {
            issues.push(QualityIssue::new(QualityIssueKind::DuplicateRows, None, duplicates));
        }

        let (untrimmed, samples) = scan_text(df, COMPANY, |val| val.trim() != val)?;
        if untrimmed > 0 {
            issues.push(
                QualityIssue::new(QualityIssueKind::UntrimmedCompany, Some(COMPANY), untrimmed)
                    .with_samples(samples),
            );
        }

        let (non_canonical, samples) = scan_text(df, INDUSTRY, |val| {
            config
                .canonical_industry(val)
                .is_some_and(|canonical| canonical != val)
        })?;
        if non_canonical > 0 {
            issues.push(
                QualityIssue::new(
                    QualityIssueKind::NonCanonicalIndustry,
                    Some(INDUSTRY),
                    non_canonical,
                )
                .with_samples(samples),
            );
        }

        let (blank, _) = scan_text(df, INDUSTRY, |val| val.trim().is_empty())?;
        if blank > 0 {
            issues.push(QualityIssue::new(QualityIssueKind::BlankIndustry, Some(INDUSTRY), blank));
        }

        let (trailing, samples) = scan_text(df, COUNTRY, |val| {
            config.is_listed_country(val) && val.ends_with('.')
        })?;
        if trailing > 0 {
            issues.push(
                QualityIssue::new(QualityIssueKind::CountryTrailingPeriod, Some(COUNTRY), trailing)
                    .with_samples(samples),
            );
        }

        issues.extend(Self::check_event_date(df)?);

        let (backfillable, samples) = Self::backfillable_industries(df)?;
        if backfillable > 0 {
            issues.push(
                QualityIssue::new(
                    QualityIssueKind::BackfillableIndustry,
                    Some(INDUSTRY),
                    backfillable,
                )
                .with_samples(samples),
            );
        }

        let uninformative = uninformative_rows(df)?.into_iter().filter(|f| *f).count();
        if uninformative > 0 {
            issues.push(QualityIssue::new(
                QualityIssueKind::UninformativeRows,
                None,
                uninformative,
            ));
        }

        Ok(issues)
    }

    /// Count for `kind` in an audit result, zero when absent.
    pub fn count(issues: &[QualityIssue], kind: QualityIssueKind) -> usize {
        issues
            .iter()
            .filter(|issue| issue.kind == kind)
            .map(|issue| issue.count)
            .sum()
    }

    fn check_event_date(df: &DataFrame) -> Result<Vec<QualityIssue>> {
        let dates = series(df, EVENT_DATE)?;
        let present = dates.len() - dates.null_count();

        match dates.dtype() {
            DataType::Date => Ok(Vec::new()),
            DataType::String => {
                let mut issues = Vec::new();
                if present > 0 {
                    issues.push(QualityIssue::new(
                        QualityIssueKind::EventDateNotTyped,
                        Some(EVENT_DATE),
                        present,
                    ));
                }
                let (bad, samples) =
                    scan_text(df, EVENT_DATE, |val| parse_event_date(val).is_none())?;
                if bad > 0 {
                    issues.push(
                        QualityIssue::new(QualityIssueKind::UnparseableDate, Some(EVENT_DATE), bad)
                            .with_samples(samples),
                    );
                }
                Ok(issues)
            }
            _ => Ok(vec![QualityIssue::new(
                QualityIssueKind::EventDateNotTyped,
                Some(EVENT_DATE),
                present,
            )]),
        }
    }

    /// Rows whose industry is missing or blank while a sibling with the same
    /// (company, location) has one.
    fn backfillable_industries(df: &DataFrame) -> Result<(usize, Vec<String>)> {
        let companies = string_column(df, COMPANY)?;
        let locations = string_column(df, LOCATION)?;
        let industries = string_column(df, INDUSTRY)?;

        let rows = || {
            companies
                .into_iter()
                .zip(locations.into_iter())
                .zip(industries.into_iter())
        };

        let known: HashSet<(&str, &str)> = rows()
            .filter(|(_, industry)| industry.is_some_and(|i| !i.trim().is_empty()))
            .filter_map(|((company, location), _)| Some((company?, location?)))
            .collect();

        let mut count = 0;
        let mut samples = Vec::new();
        for ((company, location), industry) in rows() {
            if industry.is_some_and(|i| !i.trim().is_empty()) {
                continue;
            }
            if let (Some(company), Some(location)) = (company, location) {
                if known.contains(&(company, location)) {
                    count += 1;
                    push_sample(&mut samples, &format!("{company} / {location}"));
                }
            }
        }

        Ok((count, samples))
    }
}

/// Count the non-null cells of a String column matching `flag`.
fn scan_text<F>(df: &DataFrame, column: &str, mut flag: F) -> Result<(usize, Vec<String>)>
where
    F: FnMut(&str) -> bool,
{
    let values = string_column(df, column)?;
    let mut count = 0;
    let mut samples = Vec::new();
    for val in values.into_iter().flatten() {
        if flag(val) {
            count += 1;
            push_sample(&mut samples, val);
        }
    }
    Ok((count, samples))
}

fn push_sample(samples: &mut Vec<String>, value: &str) {
    if samples.len() < MAX_SAMPLES && !samples.iter().any(|s| s == value) {
        samples.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::*;
    use pretty_assertions::assert_eq;

    fn dirty() -> DataFrame {
        df!(
            COMPANY => &[" Acme", "Acme", "Acme", "Globex"],
            LOCATION => &["SF", "SF", "SF", "NYC"],
            INDUSTRY => &[Some("Crypto Currency"), None, Some("Crypto"), Some("")],
            TOTAL_LAID_OFF => &[Some(10i64), None, Some(10), None],
            PERCENTAGE_LAID_OFF => &[None, None, None, None::<f64>],
            EVENT_DATE => &["3/5/2023", "soon", "3/5/2023", "1/2/2022"],
            STAGE => &["Seed", "Seed", "Seed", "Seed"],
            COUNTRY => &["United States.", "United States", "United States", "Canada."],
            FUNDS_RAISED_MILLIONS => &[Some(5i64), Some(5), Some(5), None]
        )
        .unwrap()
    }

    #[test]
    fn test_audit_finds_every_kind() {
        let issues = QualityAuditor::audit(&dirty(), &CleaningConfig::default()).unwrap();
        let count = |kind| QualityAuditor::count(&issues, kind);

        assert_eq!(count(QualityIssueKind::DuplicateRows), 0);
        assert_eq!(count(QualityIssueKind::UntrimmedCompany), 1);
        assert_eq!(count(QualityIssueKind::NonCanonicalIndustry), 1);
        assert_eq!(count(QualityIssueKind::BlankIndustry), 1);
        assert_eq!(count(QualityIssueKind::CountryTrailingPeriod), 1);
        assert_eq!(count(QualityIssueKind::EventDateNotTyped), 4);
        assert_eq!(count(QualityIssueKind::UnparseableDate), 1);
        // Acme/SF row 2 can take "Crypto"; Globex has no sibling
        assert_eq!(count(QualityIssueKind::BackfillableIndustry), 1);
        assert_eq!(count(QualityIssueKind::UninformativeRows), 2);
        assert_eq!(count(QualityIssueKind::RankColumnPresent), 0);
    }

    #[test]
    fn test_audit_samples() {
        let issues = QualityAuditor::audit(&dirty(), &CleaningConfig::default()).unwrap();
        let dates = issues
            .iter()
            .find(|i| i.kind == QualityIssueKind::UnparseableDate)
            .unwrap();
        assert_eq!(dates.samples, vec!["soon".to_string()]);
        assert_eq!(dates.column.as_deref(), Some(EVENT_DATE));
    }

    #[test]
    fn test_audit_flags_duplicates_and_rank_column() {
        let mut df = dirty().slice(2, 1);
        df.vstack_mut(&dirty().slice(2, 1)).unwrap();
        df.with_column(Series::new(RANK_COLUMN.into(), &[1u32, 2])).unwrap();

        let issues = QualityAuditor::audit(&df, &CleaningConfig::default()).unwrap();
        assert_eq!(QualityAuditor::count(&issues, QualityIssueKind::DuplicateRows), 1);
        assert_eq!(
            QualityAuditor::count(&issues, QualityIssueKind::RankColumnPresent),
            2
        );
    }

    #[test]
    fn test_audit_requires_business_columns() {
        let df = df!(COMPANY => &["Acme"]).unwrap();
        let err = QualityAuditor::audit(&df, &CleaningConfig::default()).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_COLUMNS");
    }

    #[test]
    fn test_issue_kind_serializes_snake_case() {
        let json = serde_json::to_string(&QualityIssueKind::CountryTrailingPeriod).unwrap();
        assert_eq!(json, "\"country_trailing_period\"");
    }
}
