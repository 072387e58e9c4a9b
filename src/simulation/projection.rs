//! The year-by-year recurrence projecting rent and price indices under a policy scenario.
use super::pass_through::compute_pass_through;
use crate::coefficients::CoefficientSet;
use crate::history::{AnnualRecord, check_history};
use crate::model::PopulationProjection;
use crate::policy::PolicyScenario;
use anyhow::{Context, Result, bail, ensure};
use log::debug;

/// Assumptions about how exogenous series evolve beyond the historical data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionAssumptions {
    /// How population is extrapolated
    pub population_projection: PopulationProjection,
    /// Units removed from the housing stock each year
    pub demolitions: f64,
}

impl Default for ProjectionAssumptions {
    fn default() -> Self {
        Self {
            population_projection: PopulationProjection::LastGrowthRate,
            demolitions: 0.0,
        }
    }
}

/// The resolved values for one simulated year
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationYearState {
    /// The simulated year
    pub year: u32,
    /// Projected rent index
    pub rent_index: f64,
    /// Projected price index
    pub price_index: f64,
    /// Share of the tax increment passed through to rents (φ_t)
    pub pass_through_rate: f64,
    /// Housing stock at the end of the year
    pub housing_units: f64,
    /// Population in the year
    pub population: f64,
    /// Completions after the upzoning uplift
    pub completions: f64,
    /// Permits after the upzoning uplift
    pub permits: f64,
}

/// The projected path for a single policy scenario
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// The policy that produced this trajectory
    pub policy: PolicyScenario,
    /// One state per projected year, in order
    pub states: Vec<SimulationYearState>,
}

impl Trajectory {
    /// The state for the final projected year, if any
    pub fn last(&self) -> Option<&SimulationYearState> {
        self.states.last()
    }
}

/// Quantities that stay fixed for every year of a projection
struct ProjectionInputs {
    /// Lagged vacancy rate (held at its last observed value)
    vacancy_rate: f64,
    /// Pass-through rate implied by the held vacancy rate
    pass_through_rate: f64,
    /// Annual population growth factor
    population_growth: f64,
    /// Completions per year including the upzoning uplift
    completions: f64,
    /// Permits per year including the upzoning uplift
    permits: f64,
    /// Units demolished per year
    demolitions: f64,
}

/// The levels carried from one year to the next
#[derive(Debug, Clone, Copy)]
struct Levels {
    year: u32,
    rent_index: f64,
    price_index: f64,
    housing_units: f64,
    population: f64,
}

impl Levels {
    /// Take starting levels from the last historical record, checking they are usable in logs
    fn from_record(record: &AnnualRecord) -> Result<Self> {
        Ok(Self {
            year: record.year,
            rent_index: record.positive("rent_index", record.rent_index)?,
            price_index: record.positive("price_index", record.price_index)?,
            housing_units: record.positive("housing_units", record.housing_units)?,
            population: record.positive("population", record.population)?,
        })
    }

    fn from_state(state: &SimulationYearState) -> Self {
        Self {
            year: state.year,
            rent_index: state.rent_index,
            price_index: state.price_index,
            housing_units: state.housing_units,
            population: state.population,
        }
    }
}

/// Get the annual population growth factor to use for projected years
fn population_growth(
    history: &[AnnualRecord],
    projection: PopulationProjection,
) -> Result<f64> {
    match projection {
        PopulationProjection::Frozen => Ok(1.0),
        PopulationProjection::LastGrowthRate => {
            let [.., prev, last] = history else {
                bail!(
                    "At least two years of history are needed to extrapolate population growth"
                );
            };
            let prev_pop = prev.positive("population", prev.population)?;
            let last_pop = last.positive("population", last.population)?;

            Ok(last_pop / prev_pop)
        }
    }
}

/// Advance the recurrence by one year
fn project_year(
    prev: &Levels,
    inputs: &ProjectionInputs,
    coefficients: &CoefficientSet,
    policy: &PolicyScenario,
) -> Result<SimulationYearState> {
    let year = prev.year + 1;
    let housing_units = prev.housing_units + inputs.completions - inputs.demolitions;
    ensure!(
        housing_units.is_finite() && housing_units > 0.0,
        "housing_units for year {year} must be positive, got {housing_units}"
    );
    let population = prev.population * inputs.population_growth;

    let g_housing = (housing_units / prev.housing_units).ln();
    let g_population = (population / prev.population).ln();

    let c = coefficients;
    let g_rent = c.a0
        + c.a1 * g_housing
        + c.a2 * g_population
        + c.a3 * (inputs.pass_through_rate * policy.tax_delta)
        + c.a4 * inputs.vacancy_rate;
    let g_price = c.b0 + c.b1 * g_housing + c.b2 * g_population + c.b3 * g_rent;

    Ok(SimulationYearState {
        year,
        rent_index: prev.rent_index * g_rent.exp(),
        price_index: prev.price_index * g_price.exp(),
        pass_through_rate: inputs.pass_through_rate,
        housing_units,
        population,
        completions: inputs.completions,
        permits: inputs.permits,
    })
}

/// Project rent and price indices beyond the end of the history under a single policy.
///
/// Vacancy is held at its last observed value. Completions and permits are held at their last
/// observed values, uplifted by the policy's upzoning percentage, and completions feed the housing
/// stock. A `horizon_years` of zero gives an empty trajectory.
///
/// # Arguments
///
/// * `history` - Contiguous historical records, sorted by year
/// * `coefficients` - Rent, price and pass-through coefficients
/// * `policy` - The policy scenario to apply
/// * `horizon_years` - Number of years to project
/// * `assumptions` - How exogenous series are extrapolated
pub fn simulate(
    history: &[AnnualRecord],
    coefficients: &CoefficientSet,
    policy: &PolicyScenario,
    horizon_years: u32,
    assumptions: &ProjectionAssumptions,
) -> Result<Trajectory> {
    check_history(history)?;
    let mut states = Vec::with_capacity(horizon_years as usize);
    if horizon_years == 0 {
        return Ok(Trajectory {
            policy: *policy,
            states,
        });
    }

    let last = history.last().context("History contains no years")?;
    let uplift = 1.0 + policy.upzone_pct;
    let vacancy_rate = last.vacancy_rate;
    let inputs = ProjectionInputs {
        vacancy_rate,
        pass_through_rate: compute_pass_through(vacancy_rate, &coefficients.pass_through),
        population_growth: population_growth(history, assumptions.population_projection)?,
        completions: last.completions()? * uplift,
        permits: last.permits_or_zero() * uplift,
        demolitions: assumptions.demolitions,
    };

    let mut prev = Levels::from_record(last)?;
    for _ in 0..horizon_years {
        let state = project_year(&prev, &inputs, coefficients, policy)
            .with_context(|| format!("Failed to simulate scenario ({policy})"))?;
        debug!(
            "{}: rent={:.4}, price={:.4}, pass-through={:.4}",
            state.year, state.rent_index, state.price_index, state.pass_through_rate
        );
        prev = Levels::from_state(&state);
        states.push(state);
    }

    Ok(Trajectory {
        policy: *policy,
        states,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, coefficients, history, policy};
    use float_cmp::assert_approx_eq;
    use itertools::Itertools;
    use rstest::rstest;

    /// Project with default assumptions
    fn run(
        history: &[AnnualRecord],
        coefficients: &CoefficientSet,
        policy: &PolicyScenario,
        horizon_years: u32,
    ) -> Result<Trajectory> {
        simulate(
            history,
            coefficients,
            policy,
            horizon_years,
            &ProjectionAssumptions::default(),
        )
    }

    #[rstest]
    fn test_simulate_one_year(
        history: Vec<AnnualRecord>,
        coefficients: CoefficientSet,
        policy: PolicyScenario,
    ) {
        let trajectory = run(&history, &coefficients, &policy, 1).unwrap();
        assert_eq!(trajectory.policy, policy);
        assert_eq!(trajectory.states.len(), 1);
        let state = &trajectory.states[0];
        assert_eq!(state.year, 2020);

        // Worked by hand from the rent and price equations
        let pt = 0.4 + 0.1 * (0.05 - 0.048) - 0.05 * 0.8;
        let housing_units = 1010.0 + 20.0 * 1.1;
        let g_h = (housing_units / 1010.0_f64).ln();
        let g_pop = (10100.0_f64 / 10000.0).ln();
        let g_rent = -0.5 * g_h + 0.8 * g_pop + 0.5 * (pt * 0.002) - 0.2 * 0.048;
        let g_price = -0.3 * g_h + 0.6 * g_pop + 0.4 * g_rent;

        assert_approx_eq!(f64, state.pass_through_rate, 0.3602, epsilon = 1e-12);
        assert_approx_eq!(f64, state.housing_units, 1032.0, epsilon = 1e-9);
        assert_approx_eq!(f64, state.population, 10201.0, epsilon = 1e-9);
        assert_approx_eq!(f64, state.completions, 22.0, epsilon = 1e-12);
        assert_approx_eq!(f64, state.permits, 27.5, epsilon = 1e-12);
        assert_approx_eq!(f64, state.rent_index, 103.0 * g_rent.exp(), epsilon = 1e-9);
        assert_approx_eq!(f64, state.price_index, 520.0 * g_price.exp(), epsilon = 1e-9);
    }

    #[rstest]
    fn test_simulate_deterministic(
        history: Vec<AnnualRecord>,
        coefficients: CoefficientSet,
        policy: PolicyScenario,
    ) {
        let first = run(&history, &coefficients, &policy, 5).unwrap();
        let second = run(&history, &coefficients, &policy, 5).unwrap();
        for (a, b) in first.states.iter().zip_eq(&second.states) {
            assert_eq!(a.rent_index.to_bits(), b.rent_index.to_bits());
            assert_eq!(a.price_index.to_bits(), b.price_index.to_bits());
        }
    }

    #[rstest]
    fn test_simulate_baseline_reproducible(
        history: Vec<AnnualRecord>,
        coefficients: CoefficientSet,
    ) {
        let explicit = PolicyScenario {
            tax_delta: 0.0,
            upzone_pct: 0.0,
        };
        assert_eq!(
            run(&history, &coefficients, &PolicyScenario::BASELINE, 3).unwrap(),
            run(&history, &coefficients, &explicit, 3).unwrap()
        );
    }

    #[rstest]
    fn test_simulate_zero_horizon(
        history: Vec<AnnualRecord>,
        coefficients: CoefficientSet,
        policy: PolicyScenario,
    ) {
        let trajectory = run(&history, &coefficients, &policy, 0).unwrap();
        assert!(trajectory.states.is_empty());
        assert!(trajectory.last().is_none());
    }

    #[rstest]
    fn test_simulate_years_contiguous(
        history: Vec<AnnualRecord>,
        coefficients: CoefficientSet,
        policy: PolicyScenario,
    ) {
        let trajectory = run(&history, &coefficients, &policy, 4).unwrap();
        assert_eq!(
            trajectory.states.iter().map(|s| s.year).collect_vec(),
            [2020, 2021, 2022, 2023]
        );
        assert_eq!(trajectory.last().unwrap().year, 2023);

        // Vacancy is held constant, so pass-through is too
        assert!(
            trajectory
                .states
                .iter()
                .map(|s| s.pass_through_rate)
                .all_equal()
        );
    }

    #[rstest]
    fn test_simulate_zero_housing_units(
        mut history: Vec<AnnualRecord>,
        coefficients: CoefficientSet,
        policy: PolicyScenario,
    ) {
        history[1].housing_units = 0.0;
        assert_error!(
            run(&history, &coefficients, &policy, 1),
            "housing_units for year 2019 must be positive, got 0"
        );
    }

    #[rstest]
    #[case::zero_rent(|r: &mut AnnualRecord| r.rent_index = 0.0, "rent_index for year 2019 must be positive, got 0")]
    #[case::negative_price(|r: &mut AnnualRecord| r.price_index = -1.0, "price_index for year 2019 must be positive, got -1")]
    #[case::zero_population(|r: &mut AnnualRecord| r.population = 0.0, "population for year 2019 must be positive, got 0")]
    #[case::missing_completions(|r: &mut AnnualRecord| r.completions = None, "Missing completions for year 2019")]
    fn test_simulate_bad_last_record(
        mut history: Vec<AnnualRecord>,
        coefficients: CoefficientSet,
        policy: PolicyScenario,
        #[case] modify: fn(&mut AnnualRecord),
        #[case] msg: &str,
    ) {
        modify(&mut history[1]);
        assert_error!(run(&history, &coefficients, &policy, 1), msg);
    }

    #[rstest]
    fn test_simulate_zero_population_previous_year(
        mut history: Vec<AnnualRecord>,
        coefficients: CoefficientSet,
        policy: PolicyScenario,
    ) {
        history[0].population = 0.0;
        assert_error!(
            run(&history, &coefficients, &policy, 1),
            "population for year 2018 must be positive, got 0"
        );

        // Not needed if population is frozen
        let assumptions = ProjectionAssumptions {
            population_projection: PopulationProjection::Frozen,
            ..ProjectionAssumptions::default()
        };
        assert!(simulate(&history, &coefficients, &policy, 1, &assumptions).is_ok());
    }

    #[rstest]
    fn test_simulate_gap_in_history(
        mut history: Vec<AnnualRecord>,
        coefficients: CoefficientSet,
        policy: PolicyScenario,
    ) {
        history[0].year = 2017;
        assert_error!(
            run(&history, &coefficients, &policy, 1),
            "History is missing year 2018 (years must be contiguous)"
        );
    }

    #[rstest]
    fn test_simulate_single_year_history(
        history: Vec<AnnualRecord>,
        coefficients: CoefficientSet,
        policy: PolicyScenario,
    ) {
        let history = &history[1..];
        assert_error!(
            run(history, &coefficients, &policy, 1),
            "At least two years of history are needed to extrapolate population growth"
        );

        let assumptions = ProjectionAssumptions {
            population_projection: PopulationProjection::Frozen,
            ..ProjectionAssumptions::default()
        };
        let trajectory = simulate(history, &coefficients, &policy, 2, &assumptions).unwrap();
        assert!(trajectory.states.iter().all(|s| s.population == 10100.0));
    }

    #[rstest]
    fn test_simulate_demolitions(
        history: Vec<AnnualRecord>,
        coefficients: CoefficientSet,
        policy: PolicyScenario,
    ) {
        let assumptions = ProjectionAssumptions {
            demolitions: 2.0,
            ..ProjectionAssumptions::default()
        };
        let trajectory = simulate(&history, &coefficients, &policy, 2, &assumptions).unwrap();
        assert_approx_eq!(f64, trajectory.states[0].housing_units, 1030.0, epsilon = 1e-9);
        assert_approx_eq!(f64, trajectory.states[1].housing_units, 1050.0, epsilon = 1e-9);

        // Stock that would fall to zero is an error rather than -inf
        let assumptions = ProjectionAssumptions {
            demolitions: 1032.0,
            ..ProjectionAssumptions::default()
        };
        assert_error!(
            simulate(&history, &coefficients, &policy, 1, &assumptions),
            "Failed to simulate scenario (tax_delta=0.002, upzone_pct=0.1)"
        );
    }

    #[rstest]
    fn test_simulate_upzoning_lowers_rent(
        history: Vec<AnnualRecord>,
        coefficients: CoefficientSet,
    ) {
        // a1 < 0, so more supply means lower rents
        let base = run(&history, &coefficients, &PolicyScenario::BASELINE, 3).unwrap();
        let upzoned = PolicyScenario {
            tax_delta: 0.0,
            upzone_pct: 0.5,
        };
        let upzoned = run(&history, &coefficients, &upzoned, 3).unwrap();
        for (b, u) in base.states.iter().zip_eq(&upzoned.states) {
            assert!(u.rent_index < b.rent_index);
            assert!(u.housing_units > b.housing_units);
        }
    }

    #[rstest]
    fn test_simulate_does_not_mutate_inputs(
        history: Vec<AnnualRecord>,
        coefficients: CoefficientSet,
        policy: PolicyScenario,
    ) {
        let history_before = history.clone();
        let coefficients_before = coefficients.clone();
        run(&history, &coefficients, &policy, 3).unwrap();
        assert_eq!(history, history_before);
        assert_eq!(coefficients, coefficients_before);
    }
}
