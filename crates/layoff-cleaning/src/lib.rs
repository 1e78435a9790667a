//! Layoff Records Cleaning Library
//!
//! A batch cleaning job for a tabular extract of company layoff records,
//! built on Polars.
//!
//! # Overview
//!
//! One run takes the source relation through a fixed sequence of stages:
//!
//! - **Snapshot**: copy and conform the source so it is never altered
//! - **Deduplication**: rank rows within exact-match groups, keep rank 1
//! - **Standardization**: trim companies, canonicalize industries, strip
//!   trailing periods from countries, type the `M/D/YYYY` event date
//! - **Null handling**: backfill industry from (company, location) siblings,
//!   then drop rows without either layoff measure
//! - **Finalization**: drop the rank column, keep the nine business columns
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use layoff_cleaning::{CleaningConfig, Pipeline};
//! use polars::prelude::*;
//!
//! let layoffs = CsvReadOptions::default()
//!     .with_has_header(true)
//!     .with_infer_schema_length(Some(0))
//!     .try_into_reader_with_file_path(Some("layoffs.csv".into()))?
//!     .finish()?;
//!
//! let config = CleaningConfig::builder()
//!     .output_dir("outputs")
//!     .build()?;
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(&layoffs)?;
//!
//! println!(
//!     "{} -> {} rows, {} duplicates removed",
//!     result.summary.rows_before, result.summary.rows_after, result.summary.duplicates_removed
//! );
//! ```
//!
//! # Data Quality
//!
//! Malformed event dates are not errors: they become null, are counted in
//! [`CleaningSummary`], and are logged as warnings. Structural problems such
//! as a missing column abort the run with a [`CleaningError`].

pub mod cleaner;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod quality;
pub mod reporting;
pub mod schema;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{AmbiguousBackfill, BackfillOutcome, DataCleaner, DateConversion};
pub use config::{
    CleaningConfig, CleaningConfigBuilder, ConfigValidationError, OutputFormat, PrefixRule,
};
pub use error::{CleaningError, ResultExt};
pub use pipeline::{
    CleaningStage, ClosureProgressReporter, Pipeline, PipelineBuilder, ProgressReporter,
    ProgressUpdate,
};
pub use quality::{QualityAuditor, QualityIssue, QualityIssueKind};
pub use reporting::{CleaningReport, ReportGenerator};
pub use schema::{BUSINESS_COLUMNS, RANK_COLUMN};
pub use types::{CleaningPreview, CleaningResult, CleaningSummary};
