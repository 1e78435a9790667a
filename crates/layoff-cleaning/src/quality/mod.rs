//! Data quality audit.
//!
//! This module checks a relation against the invariants of a cleaned layoff
//! relation. The pipeline audits its own output, and the CLI audits the raw
//! extract for `--dry-run` previews.

mod audit;

pub use audit::{QualityAuditor, QualityIssue, QualityIssueKind};
