use crate::config::{CleaningConfig, OutputFormat};
use crate::error::{Result, ResultExt};
use crate::types::{CleaningResult, CleaningSummary};
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Run report for the CLI's `--json` and `--emit-report` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Path to the input file
    pub input_file: String,
    /// Path to the cleaned relation, if it was written
    pub output_file: Option<String>,
    /// Percentage of source rows removed
    pub rows_removed_percent: f32,
    pub summary: CleaningSummary,
    /// One line per stage
    pub steps: Vec<String>,
    /// Final columns and their dtypes, in order
    pub column_types: Vec<ColumnType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType {
    pub name: String,
    pub dtype: String,
}

/// Writes the cleaned relation and run reports to an output directory.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    output_dir: PathBuf,
    output_name: Option<String>,
    format: OutputFormat,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            output_name: None,
            format: OutputFormat::Csv,
        }
    }
}

impl ReportGenerator {
    pub fn new(output_dir: PathBuf, output_name: Option<String>, format: OutputFormat) -> Self {
        Self {
            output_dir,
            output_name,
            format,
        }
    }

    /// Generator using the config's output settings.
    pub fn from_config(config: &CleaningConfig) -> Self {
        Self::new(
            config.output_dir.clone(),
            config.output_name.clone(),
            config.output_format,
        )
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where [`write_cleaned`](Self::write_cleaned) puts the relation.
    pub fn output_path(&self) -> PathBuf {
        let stem = self.output_name.as_deref().unwrap_or("layoffs_cleaned");
        self.output_dir
            .join(format!("{}.{}", stem, self.format.extension()))
    }

    /// Write the cleaned relation and return its path.
    ///
    /// CSV output writes the event date as ISO `YYYY-MM-DD`.
    pub fn write_cleaned(&self, df: &mut DataFrame) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let output_path = self.output_path();
        let mut file = File::create(&output_path)?;

        match self.format {
            OutputFormat::Csv => {
                CsvWriter::new(&mut file)
                    .include_header(true)
                    .with_separator(b',')
                    .with_quote_char(b'"')
                    .finish(df)
                    .context(format!("Writing {}", output_path.display()))?;
            }
            OutputFormat::Parquet => {
                ParquetWriter::new(file)
                    .finish(df)
                    .context(format!("Writing {}", output_path.display()))?;
            }
        }

        info!("Dataset saved: {}", output_path.display());
        Ok(output_path)
    }

    /// Build the run report for a finished pipeline run.
    pub fn build_report(input_file: &str, result: &CleaningResult) -> CleaningReport {
        let column_types = result
            .data
            .get_columns()
            .iter()
            .map(|col| ColumnType {
                name: col.name().to_string(),
                dtype: col.dtype().to_string(),
            })
            .collect();

        CleaningReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.to_string(),
            output_file: result
                .output_path
                .as_ref()
                .map(|p| p.display().to_string()),
            rows_removed_percent: result.summary.rows_removed_percentage(),
            summary: result.summary.clone(),
            steps: result.steps.clone(),
            column_types,
        }
    }

    /// Write a report to `<output_dir>/<base_name>_report.json`.
    pub fn write_report_to_file(&self, report: &CleaningReport, base_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self.output_dir.join(format!("{}_report.json", base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());
        debug!("Report covers {} steps", report.steps.len());

        Ok(report_path)
    }
}
