//! Observed annual data for the state, as supplied by the dataset.
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Deserialize;

/// One historical year of observed data
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnnualRecord {
    /// The calendar year
    pub year: u32,
    /// Home value index (e.g. ZHVI)
    pub price_index: f64,
    /// Rent index (e.g. ZORI)
    pub rent_index: f64,
    /// Total housing stock
    pub housing_units: f64,
    /// New units completed during the year
    pub completions: Option<f64>,
    /// Building permits issued during the year
    pub permits: Option<f64>,
    /// Resident population
    pub population: f64,
    /// Rental vacancy rate
    #[serde(deserialize_with = "crate::input::deserialise_proportion")]
    pub vacancy_rate: f64,
    /// Share of households that rent
    #[serde(default, deserialize_with = "crate::input::deserialise_optional_proportion")]
    pub renter_share: Option<f64>,
}

impl AnnualRecord {
    /// Get the value of a required field, checking that it is strictly positive
    pub fn positive(&self, field: &str, value: f64) -> Result<f64> {
        ensure!(
            value.is_finite() && value > 0.0,
            "{field} for year {} must be positive, got {value}",
            self.year
        );

        Ok(value)
    }

    /// Get the completions for this year, checking that they are present and non-negative
    pub fn completions(&self) -> Result<f64> {
        let completions = self
            .completions
            .with_context(|| format!("Missing completions for year {}", self.year))?;
        ensure!(
            completions.is_finite() && completions >= 0.0,
            "completions for year {} must be non-negative, got {completions}",
            self.year
        );

        Ok(completions)
    }

    /// Get the permits for this year, falling back on zero if not recorded
    pub fn permits_or_zero(&self) -> f64 {
        self.permits.unwrap_or(0.0)
    }
}

/// Check that historical records form a non-empty, contiguous, ascending run of years
pub fn check_history(history: &[AnnualRecord]) -> Result<()> {
    ensure!(!history.is_empty(), "History contains no years");

    for (prev, cur) in history.iter().tuple_windows() {
        ensure!(
            cur.year > prev.year,
            "Years in history must be strictly increasing, but {} follows {}",
            cur.year,
            prev.year
        );
        ensure!(
            cur.year == prev.year + 1,
            "History is missing year {} (years must be contiguous)",
            prev.year + 1
        );
    }

    Ok(())
}
