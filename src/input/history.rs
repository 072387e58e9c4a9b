//! Code for reading the annual historical dataset.
use crate::history::{AnnualRecord, check_history};
use crate::input::{input_err_msg, read_csv};
use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;
use std::path::Path;

/// Read the annual dataset from a CSV file.
///
/// Records are sorted by year and those outside the `include_year` filter are dropped. The
/// remaining years must be contiguous.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
/// * `include_year` - Predicate deciding whether a year is kept
pub fn read_history<F>(file_path: &Path, include_year: F) -> Result<Vec<AnnualRecord>>
where
    F: Fn(u32) -> bool,
{
    let records = read_csv(file_path)?;
    filter_history(records, include_year).with_context(|| input_err_msg(file_path))
}

fn filter_history<F>(records: Vec<AnnualRecord>, include_year: F) -> Result<Vec<AnnualRecord>>
where
    F: Fn(u32) -> bool,
{
    let history = records
        .into_iter()
        .filter(|record| include_year(record.year))
        .sorted_by_key(|record| record.year)
        .collect_vec();
    check_history(&history)?;

    if let (Some(first), Some(last)) = (history.first(), history.last()) {
        info!(
            "Read {} years of history ({}-{})",
            history.len(),
            first.year,
            last.year
        );
    }

    Ok(history)
}
