//! The cleaning pipeline and its builder.

use crate::cleaner::DataCleaner;
use crate::config::{CleaningConfig, ConfigValidationError};
use crate::error::{Result, ResultExt};
use crate::pipeline::progress::{
    ClosureProgressReporter, CleaningStage, ProgressReporter, ProgressUpdate,
};
use crate::quality::{QualityAuditor, QualityIssueKind};
use crate::reporting::ReportGenerator;
use crate::schema;
use crate::types::{CleaningPreview, CleaningResult, CleaningSummary};
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The layoff cleaning pipeline.
///
/// Use [`Pipeline::builder()`] to create a pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use layoff_cleaning::{CleaningConfig, Pipeline};
///
/// let result = Pipeline::builder()
///     .config(CleaningConfig::builder().save_to_disk(false).build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .process(&layoffs)?;
/// ```
pub struct Pipeline {
    config: CleaningConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cleaner: DataCleaner,
    reporter: ReportGenerator,
}

// Pipeline can be moved to a background thread
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Clean `source` and return the cleaned relation with its summary.
    ///
    /// `source` is never modified; every stage works on a snapshot. When
    /// `save_to_disk` is set the result is also written to the output
    /// directory.
    pub fn process(&self, source: &DataFrame) -> Result<CleaningResult> {
        match self.process_internal(source) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Cleaning completed successfully"));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Audit `source` for what a run would change, without cleaning it.
    pub fn preview(&self, source: &DataFrame) -> Result<CleaningPreview> {
        let (working, stats) = schema::conform(source.clone(), &self.config)
            .context("Conforming source relation")?;
        let issues = QualityAuditor::audit(&working, &self.config)?;

        Ok(CleaningPreview {
            rows: working.height(),
            dropped_columns: stats.dropped_columns,
            null_markers_replaced: stats.null_markers_replaced,
            unparseable_measures: stats.unparseable_measures,
            issues,
        })
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn stage_started(&self, stage: CleaningStage, rows: usize) {
        self.report_progress(
            ProgressUpdate::new(stage, 0.0, format!("{}...", stage.display_name())).with_rows(rows),
        );
    }

    fn stage_finished(&self, stage: CleaningStage, message: &str, rows: usize) {
        self.report_progress(ProgressUpdate::new(stage, 1.0, message).with_rows(rows));
    }

    fn process_internal(&self, source: &DataFrame) -> Result<CleaningResult> {
        let start_time = Instant::now();
        info!("Starting cleaning pipeline on {} rows...", source.height());

        let mut summary = CleaningSummary::new();
        summary.rows_before = source.height();
        let mut steps: Vec<String> = Vec::new();

        // Step 1: Snapshot
        self.stage_started(CleaningStage::Snapshot, source.height());
        info!("Step 1: Taking snapshot of the source relation...");
        let (working, conform_stats) = schema::conform(source.clone(), &self.config)
            .context("Conforming source relation")?;
        if !conform_stats.dropped_columns.is_empty() {
            steps.push(format!(
                "Dropped non-business columns: {}",
                conform_stats.dropped_columns.join(", ")
            ));
        }
        if conform_stats.null_markers_replaced > 0 {
            steps.push(format!(
                "Replaced {} null marker cells with null",
                conform_stats.null_markers_replaced
            ));
        }
        summary.record_conform(conform_stats);
        steps.push(format!("Snapshot of {} rows taken", working.height()));
        let message = steps.last().cloned().unwrap_or_default();
        self.stage_finished(CleaningStage::Snapshot, &message, working.height());

        // Step 2: Rank and remove duplicates
        self.stage_started(CleaningStage::Deduplication, working.height());
        info!("Step 2: Removing duplicate rows...");
        let (working, duplicates) = self.cleaner.deduplicate(working)?;
        summary.duplicates_removed = duplicates;
        steps.push(format!("Removed {} duplicate rows", duplicates));
        self.stage_finished(
            CleaningStage::Deduplication,
            &format!("Removed {} duplicate rows", duplicates),
            working.height(),
        );

        // Step 3: Standardize
        self.stage_started(CleaningStage::Standardization, working.height());
        info!("Step 3: Standardizing text and dates...");
        let (working, stats) = self.cleaner.standardize(working, &self.config)?;
        steps.push(format!(
            "Trimmed {} company names, canonicalized {} industries, stripped {} country periods",
            stats.companies_trimmed, stats.industries_canonicalized, stats.countries_trimmed
        ));
        if stats.dates.already_typed {
            steps.push("Event date already typed as Date".to_string());
        } else {
            steps.push(format!(
                "Typed event date as Date: {} parsed, {} set to null",
                stats.dates.parsed, stats.dates.unparseable
            ));
        }
        summary.record_standardize(stats);
        self.stage_finished(
            CleaningStage::Standardization,
            "Standardization complete",
            working.height(),
        );

        // Step 4: Nulls and blanks
        self.stage_started(CleaningStage::NullHandling, working.height());
        info!("Step 4: Handling missing values...");
        let (working, stats) = self.cleaner.handle_nulls(working, &self.config)?;
        if let Some(backfill) = &stats.backfill {
            steps.push(format!(
                "Backfilled {} industries from (company, location) siblings, {} left null",
                backfill.filled, backfill.unresolved
            ));
        }
        if self.config.remove_uninformative {
            steps.push(format!(
                "Removed {} rows without layoff measures",
                stats.uninformative_removed
            ));
        }
        summary.record_nulls(stats);
        self.stage_finished(
            CleaningStage::NullHandling,
            "Missing values handled",
            working.height(),
        );

        // Step 5: Finalize and audit
        self.stage_started(CleaningStage::Finalization, working.height());
        info!("Step 5: Finalizing schema...");
        // Trimming, blank nulling and backfill can make distinct rows identical
        let (working, converged) = self
            .cleaner
            .deduplicate(working)
            .context("Removing rows made identical by cleaning")?;
        if converged > 0 {
            info!("{} rows became duplicates during cleaning", converged);
            summary.duplicates_removed += converged;
            steps.push(format!(
                "Removed {} rows that became duplicates during cleaning",
                converged
            ));
        }
        let mut data = self.cleaner.finalize(working)?;
        steps.push("Dropped rank column".to_string());

        for issue in QualityAuditor::audit(&data, &self.config)? {
            if self.is_expected(issue.kind) {
                debug!("Expected residual: {}", issue.description);
                continue;
            }
            warn!("Cleaned relation still has {}", issue.description);
            summary.add_warning(issue.description);
        }
        self.stage_finished(CleaningStage::Finalization, "Schema finalized", data.height());

        // Step 6: Output
        let output_path = if self.config.save_to_disk {
            self.stage_started(CleaningStage::Output, data.height());
            info!("Step 6: Writing cleaned relation...");
            let path = self.reporter.write_cleaned(&mut data)?;
            steps.push(format!("Wrote {}", path.display()));
            self.stage_finished(CleaningStage::Output, "Output written", data.height());
            Some(path)
        } else {
            debug!("Skipping output (save_to_disk disabled)");
            None
        };

        summary.rows_after = data.height();
        summary.duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Cleaning complete: {} -> {} rows in {}ms",
            summary.rows_before, summary.rows_after, summary.duration_ms
        );

        Ok(CleaningResult {
            data,
            summary,
            steps,
            output_path,
        })
    }

    /// Audit findings that follow from a disabled stage.
    fn is_expected(&self, kind: QualityIssueKind) -> bool {
        match kind {
            QualityIssueKind::UninformativeRows => !self.config.remove_uninformative,
            QualityIssueKind::BackfillableIndustry => !self.config.backfill_industry,
            _ => false,
        }
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<CleaningConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: CleaningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// For a reusable reporter, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let reporter = ReportGenerator::from_config(&config);

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
            cleaner: DataCleaner,
            reporter,
        })
    }
}
