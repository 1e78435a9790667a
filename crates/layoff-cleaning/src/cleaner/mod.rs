//! Cleaning stages for the layoff relation.
//!
//! This module provides:
//! - Duplicate ranking and removal ([`dedup`])
//! - Text standardization and event-date typing ([`standardize`])
//! - Blank normalization, industry backfill and removal of rows without
//!   measures ([`nulls`])
//! - Schema finalization
//!
//! Every stage takes the working copy by value (or `&mut` for in-place column
//! rewrites) and hands back the next snapshot together with what it changed.

pub mod converters;
pub mod dedup;
pub mod nulls;
pub mod standardize;

pub use nulls::{AmbiguousBackfill, BackfillOutcome};
pub use standardize::DateConversion;

use crate::config::CleaningConfig;
use crate::error::{Result, ResultExt};
use crate::schema::{BUSINESS_COLUMNS, RANK_COLUMN};
use crate::utils::column_names;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What the standardization stage changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardizeStats {
    pub companies_trimmed: usize,
    pub industries_canonicalized: usize,
    pub countries_trimmed: usize,
    pub dates: DateConversion,
}

/// What the null-handling stage changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullStats {
    pub blank_industries_nulled: usize,
    /// `None` when backfill is disabled.
    pub backfill: Option<BackfillOutcome>,
    /// Rows lacking both measures after backfill.
    pub uninformative_found: usize,
    pub uninformative_removed: usize,
}

/// Runs the cleaning stages over a working copy.
pub struct DataCleaner;

impl DataCleaner {
    /// Rank rows within their duplicate groups and keep only rank 1.
    ///
    /// The `row_num` column stays on the frame until [`finalize`](Self::finalize).
    pub fn deduplicate(&self, df: DataFrame) -> Result<(DataFrame, usize)> {
        info!("Ranking rows by duplicate group...");
        let ranked = dedup::assign_ranks(df).context("Ranking duplicates")?;
        dedup::remove_ranked_duplicates(ranked).context("Removing duplicates")
    }

    /// Trim company names, canonicalize industries, strip country periods and
    /// type the event date.
    pub fn standardize(
        &self,
        mut df: DataFrame,
        config: &CleaningConfig,
    ) -> Result<(DataFrame, StandardizeStats)> {
        info!("Standardizing text and dates...");
        let stats = StandardizeStats {
            companies_trimmed: standardize::trim_company(&mut df)?,
            industries_canonicalized: standardize::canonicalize_industry(&mut df, config)?,
            countries_trimmed: standardize::strip_country_periods(&mut df, config)?,
            dates: standardize::parse_event_dates(&mut df).context("Typing event dates")?,
        };
        Ok((df, stats))
    }

    /// Null blank industries, backfill them from siblings, then drop rows
    /// without either layoff measure.
    ///
    /// Backfill always runs before deletion.
    pub fn handle_nulls(
        &self,
        mut df: DataFrame,
        config: &CleaningConfig,
    ) -> Result<(DataFrame, NullStats)> {
        info!("Handling missing values...");
        let mut stats = NullStats {
            blank_industries_nulled: nulls::blank_industries_to_null(&mut df)?,
            ..Default::default()
        };

        if config.backfill_industry {
            stats.backfill = Some(nulls::backfill_industry(&mut df).context("Backfilling industry")?);
        } else {
            debug!("Industry backfill disabled");
        }

        stats.uninformative_found = nulls::uninformative_rows(&df)?
            .into_iter()
            .filter(|flag| *flag)
            .count();

        let df = if config.remove_uninformative {
            let (df, removed) = nulls::remove_uninformative(df)?;
            stats.uninformative_removed = removed;
            df
        } else {
            debug!(
                "Keeping {} rows without layoff measures",
                stats.uninformative_found
            );
            df
        };

        Ok((df, stats))
    }

    /// Drop the rank column and return the business columns in canonical order.
    pub fn finalize(&self, df: DataFrame) -> Result<DataFrame> {
        let df = if column_names(&df).iter().any(|name| name == RANK_COLUMN) {
            df.drop(RANK_COLUMN)?
        } else {
            df
        };
        df.select(BUSINESS_COLUMNS)
            .context("Selecting final business columns")
    }
}
