//! Runs the projection for every point in the policy grid and compares against the baseline.
use super::projection::{ProjectionAssumptions, Trajectory, simulate};
use crate::coefficients::CoefficientSet;
use crate::history::AnnualRecord;
use crate::policy::{PolicyGrid, PolicyScenario};
use anyhow::{Context, Result};
use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// One row of the scenario results table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRow {
    /// Incremental tax rate for the scenario
    pub tax_delta: f64,
    /// Upzoning uplift for the scenario
    pub upzone_pct: f64,
    /// Projected year
    pub year: u32,
    /// Projected rent index
    pub rent_index: f64,
    /// Projected price index
    pub price_index: f64,
    /// Tax pass-through rate
    pub pass_through_rate: f64,
    /// Relative change in rent against the baseline
    pub pct_delta_rent: f64,
    /// Relative change in price against the baseline
    pub pct_delta_price: f64,
}

/// Trajectories for every scenario in a grid, along with the baseline
#[derive(Debug, Clone, PartialEq)]
pub struct GridResults {
    /// The zero-policy trajectory
    pub baseline: Trajectory,
    /// One trajectory per grid point, in grid order
    pub scenarios: Vec<Trajectory>,
}

/// Relative difference between a value and its baseline.
///
/// Gives NaN if the baseline is zero.
pub fn pct_delta(value: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        return f64::NAN;
    }

    (value - baseline) / baseline
}

impl GridResults {
    /// Compare a single trajectory against the baseline, year by year
    fn compare_to_baseline(&self, trajectory: &Trajectory) -> Vec<ScenarioRow> {
        let policy = &trajectory.policy;
        trajectory
            .states
            .iter()
            .zip_eq(&self.baseline.states)
            .map(|(state, base)| {
                let row = ScenarioRow {
                    tax_delta: policy.tax_delta,
                    upzone_pct: policy.upzone_pct,
                    year: state.year,
                    rent_index: state.rent_index,
                    price_index: state.price_index,
                    pass_through_rate: state.pass_through_rate,
                    pct_delta_rent: pct_delta(state.rent_index, base.rent_index),
                    pct_delta_price: pct_delta(state.price_index, base.price_index),
                };
                if row.pct_delta_rent.is_nan() || row.pct_delta_price.is_nan() {
                    warn!(
                        "Baseline is zero in {}; deltas for scenario ({policy}) are undefined",
                        state.year
                    );
                }
                row
            })
            .collect()
    }

    /// Get the results table: one row per scenario and year, in grid order
    pub fn rows(&self) -> Vec<ScenarioRow> {
        self.scenarios
            .iter()
            .flat_map(|trajectory| self.compare_to_baseline(trajectory))
            .collect()
    }

    /// Get the final-year row for each scenario along with its 1-based position in the grid.
    ///
    /// Scenarios with no projected years are skipped.
    pub fn final_rows(&self) -> Vec<(usize, ScenarioRow)> {
        self.scenarios
            .iter()
            .enumerate()
            .filter_map(|(idx, trajectory)| {
                let last = self.compare_to_baseline(trajectory).pop()?;
                Some((idx + 1, last))
            })
            .collect()
    }
}

/// Simulate every scenario in the policy grid.
///
/// The baseline scenario is simulated exactly once. Grid points equal to the baseline reuse its
/// trajectory.
///
/// # Arguments
///
/// * `history` - Contiguous historical records, sorted by year
/// * `coefficients` - Coefficients shared by all scenarios
/// * `grid` - The policy grid
/// * `horizon_years` - Number of years to project
/// * `assumptions` - How exogenous series are extrapolated
pub fn run_grid(
    history: &[AnnualRecord],
    coefficients: &CoefficientSet,
    grid: &PolicyGrid,
    horizon_years: u32,
    assumptions: &ProjectionAssumptions,
) -> Result<GridResults> {
    let baseline = simulate(
        history,
        coefficients,
        &PolicyScenario::BASELINE,
        horizon_years,
        assumptions,
    )
    .context("Failed to simulate baseline scenario")?;

    let scenarios = grid
        .iter_scenarios()
        .map(|policy| {
            if policy.is_baseline() {
                debug!("Reusing baseline for scenario ({policy})");
                return Ok(baseline.clone());
            }

            debug!("Simulating scenario ({policy})");
            simulate(history, coefficients, &policy, horizon_years, assumptions)
        })
        .try_collect()?;

    Ok(GridResults {
        baseline,
        scenarios,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, coefficients, history};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    /// Run a grid with default assumptions
    fn run(
        history: &[AnnualRecord],
        coefficients: &CoefficientSet,
        tax_deltas: Vec<f64>,
        upzone_pcts: Vec<f64>,
        horizon_years: u32,
    ) -> Result<GridResults> {
        let grid = PolicyGrid::new(tax_deltas, upzone_pcts).unwrap();
        run_grid(
            history,
            coefficients,
            &grid,
            horizon_years,
            &ProjectionAssumptions::default(),
        )
    }

    #[rstest]
    #[case(1.0, 1.0, 0.0)]
    #[case(1.1, 1.0, 0.1)]
    #[case(0.5, 2.0, -0.75)]
    fn test_pct_delta(#[case] value: f64, #[case] baseline: f64, #[case] expected: f64) {
        assert_approx_eq!(f64, pct_delta(value, baseline), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_pct_delta_zero_baseline() {
        assert!(pct_delta(1.0, 0.0).is_nan());
    }

    #[rstest]
    fn test_run_grid_order(history: Vec<AnnualRecord>, coefficients: CoefficientSet) {
        let results = run(&history, &coefficients, vec![0.0, 0.002], vec![0.0, 0.1], 2).unwrap();
        assert_eq!(
            results
                .scenarios
                .iter()
                .map(|t| (t.policy.tax_delta, t.policy.upzone_pct))
                .collect_vec(),
            [(0.0, 0.0), (0.0, 0.1), (0.002, 0.0), (0.002, 0.1)]
        );

        let rows = results.rows();
        assert_eq!(rows.len(), 8);
        assert_eq!(
            rows.iter()
                .map(|r| (r.tax_delta, r.upzone_pct, r.year))
                .collect_vec(),
            [
                (0.0, 0.0, 2020),
                (0.0, 0.0, 2021),
                (0.0, 0.1, 2020),
                (0.0, 0.1, 2021),
                (0.002, 0.0, 2020),
                (0.002, 0.0, 2021),
                (0.002, 0.1, 2020),
                (0.002, 0.1, 2021),
            ]
        );
    }

    #[rstest]
    fn test_run_grid_baseline_deltas_zero(
        history: Vec<AnnualRecord>,
        coefficients: CoefficientSet,
    ) {
        let results = run(&history, &coefficients, vec![0.0], vec![0.0], 3).unwrap();
        assert_eq!(results.scenarios, [results.baseline.clone()]);
        for row in results.rows() {
            assert_eq!(row.pct_delta_rent, 0.0);
            assert_eq!(row.pct_delta_price, 0.0);
        }
    }

    #[rstest]
    fn test_run_grid_empty_lists(history: Vec<AnnualRecord>, coefficients: CoefficientSet) {
        let results = run(&history, &coefficients, vec![], vec![], 1).unwrap();
        assert_eq!(results.scenarios.len(), 1);
        assert!(results.scenarios[0].policy.is_baseline());
    }

    #[rstest]
    fn test_run_grid_deltas(history: Vec<AnnualRecord>, coefficients: CoefficientSet) {
        let results = run(&history, &coefficients, vec![0.004], vec![0.2], 2).unwrap();
        let rows = results.rows();
        for (row, base) in rows.iter().zip_eq(&results.baseline.states) {
            assert_eq!(row.year, base.year);
            assert_approx_eq!(
                f64,
                row.pct_delta_rent,
                row.rent_index / base.rent_index - 1.0,
                epsilon = 1e-12
            );
            assert_approx_eq!(
                f64,
                row.pct_delta_price,
                row.price_index / base.price_index - 1.0,
                epsilon = 1e-12
            );

            // More supply outweighs the small tax here, so rents fall
            assert!(row.pct_delta_rent < 0.0);
        }
    }

    #[rstest]
    fn test_run_grid_tax_raises_rent(history: Vec<AnnualRecord>, coefficients: CoefficientSet) {
        // a3 > 0 and pass-through > 0, so a tax increment with no upzoning raises rents
        let results = run(&history, &coefficients, vec![0.01], vec![0.0], 2).unwrap();
        assert!(results.rows().iter().all(|r| r.pct_delta_rent > 0.0));
    }

    #[rstest]
    fn test_final_rows(history: Vec<AnnualRecord>, coefficients: CoefficientSet) {
        let results = run(&history, &coefficients, vec![0.0, 0.002], vec![0.1], 3).unwrap();
        let final_rows = results.final_rows();
        assert_eq!(
            final_rows
                .iter()
                .map(|(id, row)| (*id, row.tax_delta, row.year))
                .collect_vec(),
            [(1, 0.0, 2022), (2, 0.002, 2022)]
        );

        // Nothing to summarise with a zero horizon
        let results = run(&history, &coefficients, vec![0.0], vec![0.1], 0).unwrap();
        assert!(results.rows().is_empty());
        assert!(results.final_rows().is_empty());
    }

    #[rstest]
    fn test_run_grid_bad_history(mut history: Vec<AnnualRecord>, coefficients: CoefficientSet) {
        history[1].housing_units = 0.0;
        assert_error!(
            run(&history, &coefficients, vec![0.002], vec![0.1], 1),
            "Failed to simulate baseline scenario"
        );
    }
}
