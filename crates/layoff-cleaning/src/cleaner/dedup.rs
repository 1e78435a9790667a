//! Duplicate detection and removal.
//!
//! Rows are grouped by equality over all nine business columns, with nulls
//! equal to nulls. Within a group ranks run `1..k` in input order, so the
//! first occurrence is the one kept.

use crate::error::{CleaningError, Result};
use crate::schema::{BUSINESS_COLUMNS, RANK_COLUMN};
use crate::utils::{series, string_views};
use polars::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// Rank of each row within its equality group over `columns`.
pub fn duplicate_ranks(df: &DataFrame, columns: &[&str]) -> Result<Vec<u32>> {
    let views = string_views(df, columns)?;
    let mut seen: HashMap<Vec<Option<&str>>, u32> = HashMap::with_capacity(df.height());

    let ranks = (0..df.height())
        .map(|row| {
            let key: Vec<Option<&str>> = views.iter().map(|col| col[row].as_deref()).collect();
            let rank = seen.entry(key).or_insert(0);
            *rank += 1;
            *rank
        })
        .collect();

    Ok(ranks)
}

/// Add the `row_num` rank column over the business columns.
///
/// An existing rank column is overwritten.
pub fn assign_ranks(mut df: DataFrame) -> Result<DataFrame> {
    let ranks = duplicate_ranks(&df, &BUSINESS_COLUMNS)?;
    df.with_column(Series::new(RANK_COLUMN.into(), ranks))?;
    Ok(df)
}

/// Drop every row whose rank is above 1 and return the number removed.
pub fn remove_ranked_duplicates(df: DataFrame) -> Result<(DataFrame, usize)> {
    let ranks = series(&df, RANK_COLUMN)?
        .u32()
        .map_err(|e| CleaningError::StageFailed {
            stage: "deduplication".to_string(),
            reason: format!("rank column is not UInt32: {}", e),
        })?;

    let keep: Vec<bool> = ranks.into_iter().map(|rank| rank == Some(1)).collect();
    let removed = keep.iter().filter(|k| !**k).count();

    if removed == 0 {
        debug!("No duplicate rows found");
        return Ok((df, 0));
    }

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let deduplicated = df.filter(&mask)?;
    debug!("Removed {} duplicate rows", removed);

    Ok((deduplicated, removed))
}

/// Number of rows that duplicate an earlier row over the business columns.
pub fn count_duplicates(df: &DataFrame) -> Result<usize> {
    Ok(duplicate_ranks(df, &BUSINESS_COLUMNS)?
        .into_iter()
        .filter(|rank| *rank > 1)
        .count())
}
