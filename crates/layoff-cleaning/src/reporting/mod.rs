//! Output and run-report generation.
//!
//! Use [`CleaningReport`] for both the CLI's `--json` output and the
//! `--emit-report` file.
//!
//! # Example
//!
//! ```rust,ignore
//! use layoff_cleaning::reporting::ReportGenerator;
//!
//! let report = ReportGenerator::build_report("layoffs.csv", &result);
//! println!("{}", serde_json::to_string_pretty(&report)?);
//!
//! let generator = ReportGenerator::from_config(&config);
//! generator.write_report_to_file(&report, "layoffs")?;
//! ```

mod generator;

pub use generator::{CleaningReport, ColumnType, ReportGenerator};
