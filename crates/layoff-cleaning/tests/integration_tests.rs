//! Integration tests for the layoff cleaning pipeline.
//!
//! These tests run the whole pipeline over the sample extract in
//! `tests/fixtures` and check the cleaned relation end to end.

use layoff_cleaning::cleaner::converters::days_to_date;
use layoff_cleaning::cleaner::dedup::duplicate_ranks;
use layoff_cleaning::schema::*;
use layoff_cleaning::{
    CleaningConfig, CleaningError, CleaningResult, OutputFormat, Pipeline, QualityAuditor,
    QualityIssueKind, ReportGenerator,
};
use chrono::NaiveDate;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Read a CSV the way the CLI does: every column as text.
fn read_text_csv(path: &Path) -> DataFrame {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read CSV file");
    retype_iso_event_dates(&mut df).expect("Failed to inspect event dates");
    df
}

fn load_sample() -> DataFrame {
    read_text_csv(&fixtures_path().join("layoffs_sample.csv"))
}

fn in_memory() -> CleaningConfig {
    CleaningConfig::builder().save_to_disk(false).build().unwrap()
}

fn clean(df: &DataFrame, config: CleaningConfig) -> CleaningResult {
    Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .process(df)
        .expect("Pipeline should complete successfully")
}

fn text(df: &DataFrame, column: &str) -> Vec<Option<String>> {
    df.column(column)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

fn row_of(df: &DataFrame, company: &str) -> usize {
    text(df, COMPANY)
        .iter()
        .position(|c| c.as_deref() == Some(company))
        .unwrap_or_else(|| panic!("{company} not in relation"))
}

fn event_date(df: &DataFrame, row: usize) -> Option<NaiveDate> {
    match df.column(EVENT_DATE).unwrap().get(row).unwrap() {
        AnyValue::Date(days) => days_to_date(days),
        AnyValue::Null => None,
        other => panic!("expected a date, got {other:?}"),
    }
}

// ============================================================================
// Full Pipeline Tests
// ============================================================================

#[test]
fn test_sample_extract_summary() {
    let result = clean(&load_sample(), in_memory());
    let summary = &result.summary;

    assert_eq!(summary.rows_before, 23);
    assert_eq!(summary.null_markers_replaced, 15);
    assert_eq!(summary.duplicates_removed, 1);
    assert_eq!(summary.companies_trimmed, 1);
    assert_eq!(summary.industries_canonicalized, 2);
    assert_eq!(summary.countries_trimmed, 1);
    assert_eq!(summary.dates_parsed, 21);
    assert_eq!(summary.dates_unparseable, 1);
    assert_eq!(summary.date_samples, vec!["soon".to_string()]);
    assert_eq!(summary.industries_backfilled, 2);
    assert_eq!(summary.industries_unresolved, 1);
    assert!(summary.ambiguous_backfills.is_empty());
    assert_eq!(summary.uninformative_removed, 2);
    assert_eq!(summary.rows_after, 20);
    assert_eq!(result.data.height(), 20);
    assert!(result.output_path.is_none());
}

#[test]
fn test_output_schema_is_canonical() {
    let result = clean(&load_sample(), in_memory());

    let names: Vec<String> = result
        .data
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(names, BUSINESS_COLUMNS.to_vec());
    assert!(result.data.column(RANK_COLUMN).is_err());

    let dtypes: Vec<DataType> = result.data.dtypes();
    assert_eq!(
        dtypes,
        vec![
            DataType::String,
            DataType::String,
            DataType::String,
            DataType::Int64,
            DataType::Float64,
            DataType::Date,
            DataType::String,
            DataType::String,
            DataType::Int64,
        ]
    );
}

#[test]
fn test_output_invariants() {
    let result = clean(&load_sample(), in_memory());
    let data = &result.data;

    // Re-ranking the cleaned relation yields rank 1 everywhere
    let ranks = duplicate_ranks(data, &BUSINESS_COLUMNS).unwrap();
    assert!(ranks.iter().all(|r| *r == 1));

    // No row lacks both measures
    let total = data.column(TOTAL_LAID_OFF).unwrap().is_null();
    let pct = data.column(PERCENTAGE_LAID_OFF).unwrap().is_null();
    assert!(
        total
            .into_iter()
            .zip(pct.into_iter())
            .all(|(t, p)| !(t.unwrap_or(false) && p.unwrap_or(false)))
    );

    // Crypto variants collapsed
    for industry in text(data, INDUSTRY).into_iter().flatten() {
        assert!(!industry.starts_with("Crypto") || industry == "Crypto", "{industry}");
    }

    // United States values carry no trailing period
    for country in text(data, COUNTRY).into_iter().flatten() {
        if country.starts_with("United States") {
            assert!(!country.ends_with('.'), "{country}");
        }
    }

    // A remaining null industry has no sibling to copy from
    let companies = text(data, COMPANY);
    let locations = text(data, LOCATION);
    let industries = text(data, INDUSTRY);
    let known: HashSet<(String, String)> = (0..data.height())
        .filter(|i| industries[*i].is_some())
        .filter_map(|i| Some((companies[i].clone()?, locations[i].clone()?)))
        .collect();
    for i in 0..data.height() {
        if industries[i].is_none() {
            if let (Some(c), Some(l)) = (companies[i].clone(), locations[i].clone()) {
                assert!(!known.contains(&(c, l)), "row {i} could have been backfilled");
            }
        }
    }

    let issues = QualityAuditor::audit(data, &CleaningConfig::default()).unwrap();
    assert!(issues.is_empty(), "{issues:?}");
}

#[test]
fn test_scenarios() {
    let result = clean(&load_sample(), in_memory());
    let data = &result.data;
    let industries = text(data, INDUSTRY);

    // Identical Oda rows collapse to one
    let oda = text(data, COMPANY)
        .into_iter()
        .filter(|c| c.as_deref() == Some("Oda"))
        .count();
    assert_eq!(oda, 1);

    // Null and blank industries filled from same (company, location)
    assert_eq!(industries[row_of(data, "Airbnb")].as_deref(), Some("Travel"));
    let carvana: Vec<_> = text(data, COMPANY)
        .iter()
        .enumerate()
        .filter(|(_, c)| c.as_deref() == Some("Carvana"))
        .map(|(i, _)| industries[i].clone())
        .collect();
    assert_eq!(
        carvana,
        vec![
            Some("Transportation".to_string()),
            Some("Transportation".to_string())
        ]
    );
    assert_eq!(industries[row_of(data, "Bally's Interactive")], None);

    // Rows lacking both measures are gone
    let companies: HashSet<String> = text(data, COMPANY).into_iter().flatten().collect();
    assert!(!companies.contains("Blockchain.com"));
    assert!(!companies.contains("Kitty Hawk"));
    assert!(companies.contains("Included Health"));

    // Dates parse M/D/YYYY; anything else becomes null
    assert_eq!(
        event_date(data, row_of(data, "Coinbase")),
        NaiveDate::from_ymd_opt(2023, 1, 10)
    );
    assert_eq!(
        event_date(data, row_of(data, "Atlassian")),
        NaiveDate::from_ymd_opt(2023, 3, 6)
    );
    assert_eq!(event_date(data, row_of(data, "Quidax")), None);

    assert_eq!(
        text(data, COUNTRY)[row_of(data, "Coinbase")].as_deref(),
        Some("United States")
    );
    assert_eq!(
        industries[row_of(data, "BitMEX")].as_deref(),
        Some("Crypto")
    );
}

#[test]
fn test_source_relation_is_untouched() {
    let source = load_sample();
    let before = source.clone();
    clean(&source, in_memory());

    assert!(source.equals_missing(&before));
    assert_eq!(source.column(EVENT_DATE).unwrap().dtype(), &DataType::String);
}

#[test]
fn test_rerun_on_cleaned_relation_is_noop() {
    let first = clean(&load_sample(), in_memory());
    let second = clean(&first.data, in_memory());

    assert!(second.data.equals_missing(&first.data));
    assert_eq!(second.summary.duplicates_removed, 0);
    assert_eq!(second.summary.dates_unparseable, 0);
    assert_eq!(second.summary.industries_backfilled, 0);
    assert_eq!(second.summary.uninformative_removed, 0);
    assert!(second.summary.warnings.is_empty());
}

#[test]
fn test_disabled_stages() {
    let config = CleaningConfig::builder()
        .save_to_disk(false)
        .backfill_industry(false)
        .remove_uninformative(false)
        .build()
        .unwrap();
    let result = clean(&load_sample(), config);

    assert_eq!(result.data.height(), 22);
    assert_eq!(result.summary.industries_backfilled, 0);
    assert_eq!(
        text(&result.data, INDUSTRY)[row_of(&result.data, "Airbnb")],
        None
    );
}

// ============================================================================
// Error Handling
// ============================================================================

#[test]
fn test_missing_columns_abort_the_run() {
    let df = load_sample().drop(INDUSTRY).unwrap();
    let err = Pipeline::builder()
        .config(in_memory())
        .build()
        .unwrap()
        .process(&df)
        .unwrap_err();

    assert!(err.is_schema_error());
    assert_eq!(err.error_code(), "MISSING_COLUMNS");
    assert!(err.to_string().contains(INDUSTRY));
}

#[test]
fn test_invalid_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rules.json");
    std::fs::write(&path, r#"{"country_prefixes": [""]}"#).unwrap();

    let err = CleaningConfig::from_json_file(&path).unwrap_err();
    assert!(matches!(err, CleaningError::InvalidConfig(_)));
}

// ============================================================================
// Output Files
// ============================================================================

#[test]
fn test_csv_output_round_trip_is_stable() {
    let dir = tempdir().unwrap();
    let config = CleaningConfig::builder()
        .output_dir(dir.path())
        .build()
        .unwrap();
    let first = clean(&load_sample(), config);

    let path = first.output_path.clone().expect("output should be written");
    assert_eq!(path, dir.path().join("layoffs_cleaned.csv"));

    let reloaded = read_text_csv(&path);
    assert_eq!(reloaded.column(EVENT_DATE).unwrap().dtype(), &DataType::Date);

    let second = clean(&reloaded, in_memory());
    assert!(second.data.equals_missing(&first.data));
    assert_eq!(second.summary.dates_unparseable, 0);
}

#[test]
fn test_parquet_output() {
    let dir = tempdir().unwrap();
    let config = CleaningConfig::builder()
        .output_dir(dir.path())
        .output_name("layoffs")
        .output_format(OutputFormat::Parquet)
        .build()
        .unwrap();
    let result = clean(&load_sample(), config);

    let path = result.output_path.clone().unwrap();
    assert!(path.ends_with("layoffs.parquet"));
    let file = std::fs::File::open(path).unwrap();
    let written = ParquetReader::new(file).finish().unwrap();
    assert!(written.equals_missing(&result.data));
}

#[test]
fn test_emit_report() {
    let dir = tempdir().unwrap();
    let config = CleaningConfig::builder()
        .output_dir(dir.path())
        .build()
        .unwrap();
    let generator = ReportGenerator::from_config(&config);
    let result = clean(&load_sample(), config);

    let report = ReportGenerator::build_report("layoffs_sample.csv", &result);
    let path = generator.write_report_to_file(&report, "layoffs_sample").unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["summary"]["duplicates_removed"], 1);
    assert_eq!(json["summary"]["rows_after"], 20);
    assert_eq!(json["column_types"].as_array().unwrap().len(), 9);
    assert!(json["output_file"].as_str().unwrap().ends_with("layoffs_cleaned.csv"));
}

// ============================================================================
// Configuration and Preview
// ============================================================================

#[test]
fn test_rules_from_json_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rules.json");
    std::fs::write(
        &path,
        r#"{
            "industry_rules": [
                {"prefix": "Crypto", "canonical": "Crypto"},
                {"prefix": "Real", "canonical": "Property"}
            ],
            "save_to_disk": false
        }"#,
    )
    .unwrap();

    let config = CleaningConfig::from_json_file(&path).unwrap();
    assert!(config.backfill_industry);
    let result = clean(&load_sample(), config);

    assert_eq!(result.summary.industries_canonicalized, 4);
    let industries = text(&result.data, INDUSTRY);
    assert_eq!(industries[row_of(&result.data, "Loft")].as_deref(), Some("Property"));
    assert_eq!(industries[row_of(&result.data, "Lendi")].as_deref(), Some("Property"));
}

#[test]
fn test_preview_matches_run() {
    let source = load_sample();
    let pipeline = Pipeline::builder().config(in_memory()).build().unwrap();

    let preview = pipeline.preview(&source).unwrap();
    let result = pipeline.process(&source).unwrap();

    assert_eq!(preview.rows, 23);
    assert_eq!(
        preview.count(QualityIssueKind::DuplicateRows),
        result.summary.duplicates_removed
    );
    assert_eq!(
        preview.count(QualityIssueKind::UnparseableDate),
        result.summary.dates_unparseable
    );
    assert_eq!(
        preview.count(QualityIssueKind::CountryTrailingPeriod),
        result.summary.countries_trimmed
    );
    assert_eq!(
        preview.count(QualityIssueKind::UninformativeRows),
        result.summary.uninformative_removed
    );
}

#[test]
fn test_pipeline_runs_on_background_thread() {
    let pipeline = Pipeline::builder().config(in_memory()).build().unwrap();
    let source = load_sample();

    let handle = std::thread::spawn(move || pipeline.process(&source).map(|r| r.data.height()));
    let rows = handle.join().expect("Thread should not panic").unwrap();
    assert_eq!(rows, 20);
}
