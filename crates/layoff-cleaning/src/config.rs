//! Configuration types for the cleaning pipeline.
//!
//! The defaults reproduce the cleaning rules of the public layoffs extract.
//! Use [`CleaningConfig::builder()`] to override them, or load a JSON file
//! with [`CleaningConfig::from_json_file`].

use crate::error::{CleaningError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Output format for the cleaned relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    /// File extension used when writing this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }
}

/// Collapses every value starting with `prefix` to `canonical`.
///
/// `"Crypto Currency"` and `"CryptoCurrency"` both become `"Crypto"` under
/// the default rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixRule {
    pub prefix: String,
    pub canonical: String,
}

impl PrefixRule {
    pub fn new(prefix: impl Into<String>, canonical: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            canonical: canonical.into(),
        }
    }

    /// Returns the canonical label if `value` is covered by this rule.
    pub fn apply<'a>(&'a self, value: &str) -> Option<&'a str> {
        value
            .starts_with(self.prefix.as_str())
            .then_some(self.canonical.as_str())
    }
}

fn default_industry_rules() -> Vec<PrefixRule> {
    vec![PrefixRule::new("Crypto", "Crypto")]
}

fn default_country_prefixes() -> Vec<String> {
    vec!["United States".to_string()]
}

fn default_null_markers() -> Vec<String> {
    vec!["NULL".to_string()]
}

/// Configuration for the cleaning pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Ordered industry canonicalization rules; the first matching rule wins.
    pub industry_rules: Vec<PrefixRule>,

    /// Country names whose values get trailing periods stripped.
    pub country_prefixes: Vec<String>,

    /// Cell values treated as missing on import (matched after trimming).
    pub null_markers: Vec<String>,

    /// Whether to backfill null industries from (company, location) siblings.
    /// Default: true
    pub backfill_industry: bool,

    /// Whether to drop rows lacking both layoff measures.
    /// Default: true
    pub remove_uninformative: bool,

    /// Output directory for the cleaned relation and reports.
    /// Default: "outputs"
    pub output_dir: PathBuf,

    /// Custom output file name (without extension).
    /// Default: None, which writes "layoffs_cleaned".
    pub output_name: Option<String>,

    /// Format of the cleaned relation on disk.
    pub output_format: OutputFormat,

    /// Whether to write the cleaned relation to disk.
    /// When false, results are kept in memory only.
    /// Default: true
    pub save_to_disk: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            industry_rules: default_industry_rules(),
            country_prefixes: default_country_prefixes(),
            null_markers: default_null_markers(),
            backfill_industry: true,
            remove_uninformative: true,
            output_dir: PathBuf::from("outputs"),
            output_name: None,
            output_format: OutputFormat::default(),
            save_to_disk: true,
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Load and validate a configuration from a JSON file.
    ///
    /// Fields missing from the file take their default values.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: CleaningConfig = serde_json::from_str(&raw)?;
        config
            .validate()
            .map_err(|e| CleaningError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Output file stem for the cleaned relation.
    pub fn output_stem(&self) -> &str {
        self.output_name.as_deref().unwrap_or("layoffs_cleaned")
    }

    /// Canonical industry label for `value`, if any rule covers it.
    pub fn canonical_industry(&self, value: &str) -> Option<&str> {
        self.industry_rules.iter().find_map(|rule| rule.apply(value))
    }

    /// Whether `value` begins with one of the configured country names.
    pub fn is_listed_country(&self, value: &str) -> bool {
        self.country_prefixes
            .iter()
            .any(|prefix| value.starts_with(prefix.as_str()))
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        for rule in &self.industry_rules {
            if rule.prefix.is_empty() {
                return Err(ConfigValidationError::EmptyPrefix(rule.canonical.clone()));
            }
            if rule.canonical.trim().is_empty() {
                return Err(ConfigValidationError::EmptyCanonical(rule.prefix.clone()));
            }
        }

        if self.country_prefixes.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigValidationError::EmptyCountry);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Industry rule for '{0}' has an empty prefix")]
    EmptyPrefix(String),

    #[error("Industry rule with prefix '{0}' has an empty canonical label")]
    EmptyCanonical(String),

    #[error("Country prefix list contains an empty entry")]
    EmptyCountry,
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    industry_rules: Option<Vec<PrefixRule>>,
    country_prefixes: Option<Vec<String>>,
    null_markers: Option<Vec<String>>,
    backfill_industry: Option<bool>,
    remove_uninformative: Option<bool>,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
    output_format: Option<OutputFormat>,
    save_to_disk: Option<bool>,
}

impl CleaningConfigBuilder {
    /// Replace the industry canonicalization rules.
    pub fn industry_rules(mut self, rules: Vec<PrefixRule>) -> Self {
        self.industry_rules = Some(rules);
        self
    }

    /// Append one industry rule to the defaults (or to rules set earlier).
    pub fn industry_rule(mut self, prefix: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.industry_rules
            .get_or_insert_with(default_industry_rules)
            .push(PrefixRule::new(prefix, canonical));
        self
    }

    /// Replace the list of countries whose trailing periods are stripped.
    pub fn country_prefixes<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.country_prefixes = Some(countries.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the import null markers.
    pub fn null_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_markers = Some(markers.into_iter().map(Into::into).collect());
        self
    }

    /// Enable or disable industry backfill.
    pub fn backfill_industry(mut self, enable: bool) -> Self {
        self.backfill_industry = Some(enable);
        self
    }

    /// Enable or disable removal of uninformative rows.
    pub fn remove_uninformative(mut self, remove: bool) -> Self {
        self.remove_uninformative = Some(remove);
        self
    }

    /// Set the output directory.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set a custom output file name (without extension).
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Set the on-disk format of the cleaned relation.
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    /// Enable or disable saving the cleaned relation to disk.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<CleaningConfig, ConfigValidationError> {
        let config = CleaningConfig {
            industry_rules: self.industry_rules.unwrap_or_else(default_industry_rules),
            country_prefixes: self.country_prefixes.unwrap_or_else(default_country_prefixes),
            null_markers: self.null_markers.unwrap_or_else(default_null_markers),
            backfill_industry: self.backfill_industry.unwrap_or(true),
            remove_uninformative: self.remove_uninformative.unwrap_or(true),
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from("outputs")),
            output_name: self.output_name,
            output_format: self.output_format.unwrap_or_default(),
            save_to_disk: self.save_to_disk.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}
