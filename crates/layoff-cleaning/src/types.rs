use crate::cleaner::{AmbiguousBackfill, NullStats, StandardizeStats};
use crate::quality::{QualityAuditor, QualityIssue, QualityIssueKind};
use crate::schema::ConformStats;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a cleaning run did to the relation.
///
/// Every count is a number of cells or rows. The summary is serialized into
/// the run report and printed by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    /// Rows in the source relation.
    pub rows_before: usize,
    /// Rows in the cleaned relation.
    pub rows_after: usize,

    /// Source columns outside the business schema.
    pub dropped_columns: Vec<String>,
    /// Cells equal to an import null marker.
    pub null_markers_replaced: usize,
    /// Measure cells that were not numeric.
    pub unparseable_measures: usize,

    /// Rows with rank above 1.
    pub duplicates_removed: usize,

    pub companies_trimmed: usize,
    pub industries_canonicalized: usize,
    pub countries_trimmed: usize,

    /// Event dates that parsed.
    pub dates_parsed: usize,
    /// Event-date texts that became null.
    pub dates_unparseable: usize,
    /// A few of those texts.
    pub date_samples: Vec<String>,

    pub blank_industries_nulled: usize,
    pub industries_backfilled: usize,
    /// Null industries with no sibling to copy from.
    pub industries_unresolved: usize,
    pub ambiguous_backfills: Vec<AmbiguousBackfill>,

    pub uninformative_removed: usize,

    /// Data-quality notes gathered during the run.
    pub warnings: Vec<String>,
}

impl CleaningSummary {
    /// Create a new empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning to the summary.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Rows removed across all stages.
    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }

    /// Percentage of source rows that were removed.
    pub fn rows_removed_percentage(&self) -> f32 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.rows_removed() as f32 / self.rows_before as f32) * 100.0
        }
    }

    pub(crate) fn record_conform(&mut self, stats: ConformStats) {
        self.dropped_columns = stats.dropped_columns;
        self.null_markers_replaced = stats.null_markers_replaced;
        self.unparseable_measures = stats.unparseable_measures;
        if self.unparseable_measures > 0 {
            self.add_warning(format!(
                "{} measure values were not numeric and were set to null",
                self.unparseable_measures
            ));
        }
    }

    pub(crate) fn record_standardize(&mut self, stats: StandardizeStats) {
        self.companies_trimmed = stats.companies_trimmed;
        self.industries_canonicalized = stats.industries_canonicalized;
        self.countries_trimmed = stats.countries_trimmed;
        self.dates_parsed = stats.dates.parsed;
        self.dates_unparseable = stats.dates.unparseable;
        self.date_samples = stats.dates.samples;
        if self.dates_unparseable > 0 {
            self.add_warning(format!(
                "{} event dates did not match M/D/YYYY and were set to null",
                self.dates_unparseable
            ));
        }
    }

    pub(crate) fn record_nulls(&mut self, stats: NullStats) {
        self.blank_industries_nulled = stats.blank_industries_nulled;
        self.uninformative_removed = stats.uninformative_removed;
        if let Some(backfill) = stats.backfill {
            self.industries_backfilled = backfill.filled;
            self.industries_unresolved = backfill.unresolved;
            for key in &backfill.ambiguous {
                self.warnings.push(format!(
                    "Industry for ({}, {}) was ambiguous among {:?}; used '{}'",
                    key.company, key.location, key.candidates, key.chosen
                ));
            }
            self.ambiguous_backfills = backfill.ambiguous;
        }
    }
}

/// Output of a pipeline run.
#[derive(Debug, Clone)]
pub struct CleaningResult {
    /// The cleaned relation: nine business columns, canonical order.
    pub data: DataFrame,
    pub summary: CleaningSummary,
    /// One line per stage describing what it did.
    pub steps: Vec<String>,
    /// Where the relation was written, when saving is enabled.
    pub output_path: Option<PathBuf>,
}

/// What a run would change, computed without cleaning anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningPreview {
    /// Rows in the source relation.
    pub rows: usize,
    pub dropped_columns: Vec<String>,
    pub null_markers_replaced: usize,
    pub unparseable_measures: usize,
    /// Audit of the conformed source.
    pub issues: Vec<QualityIssue>,
}

impl CleaningPreview {
    /// Count for `kind` in the audit, zero when absent.
    pub fn count(&self, kind: QualityIssueKind) -> usize {
        QualityAuditor::count(&self.issues, kind)
    }
}
