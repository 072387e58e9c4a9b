//! Fixtures for tests
use crate::coefficients::{CoefficientSet, PassThroughParams};
use crate::history::AnnualRecord;
use crate::policy::PolicyScenario;
use rstest::fixture;
use std::fs;
use std::path::Path;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A record with plausible values for the given year
pub fn record(year: u32) -> AnnualRecord {
    AnnualRecord {
        year,
        price_index: 500.0,
        rent_index: 100.0,
        housing_units: 1000.0,
        completions: Some(10.0),
        permits: Some(12.0),
        population: 10000.0,
        vacancy_rate: 0.05,
        renter_share: Some(0.45),
    }
}

/// A two-year history
#[fixture]
pub fn history() -> Vec<AnnualRecord> {
    vec![
        AnnualRecord {
            year: 2018,
            price_index: 500.0,
            rent_index: 100.0,
            housing_units: 1000.0,
            completions: None,
            permits: None,
            population: 10000.0,
            vacancy_rate: 0.05,
            renter_share: None,
        },
        AnnualRecord {
            year: 2019,
            price_index: 520.0,
            rent_index: 103.0,
            housing_units: 1010.0,
            completions: Some(20.0),
            permits: Some(25.0),
            population: 10100.0,
            vacancy_rate: 0.048,
            renter_share: Some(0.45),
        },
    ]
}

#[fixture]
pub fn pass_through_params() -> PassThroughParams {
    PassThroughParams {
        base: 0.4,
        vacancy_slope: 0.1,
        elasticity_slope: 0.05,
        vacancy_target: 0.05,
        demand_elasticity: 0.8,
    }
}

#[fixture]
pub fn coefficients(pass_through_params: PassThroughParams) -> CoefficientSet {
    CoefficientSet {
        a0: 0.0,
        a1: -0.5,
        a2: 0.8,
        a3: 0.5,
        a4: -0.2,
        b0: 0.0,
        b1: -0.3,
        b2: 0.6,
        b3: 0.4,
        pass_through: pass_through_params,
    }
}

#[fixture]
pub fn policy() -> PolicyScenario {
    PolicyScenario {
        tax_delta: 0.002,
        upzone_pct: 0.10,
    }
}

/// Write a small but complete model to the given directory
pub fn write_model_dir(dir: &Path) {
    fs::write(
        dir.join("model.toml"),
        "horizon_years = 1

[policy_grid]
tax_delta = { min = 0.0, max = 0.002, step = 0.002 }
upzone_pct = [0.0, 0.1]
",
    )
    .unwrap();

    fs::write(
        dir.join("coefficients.toml"),
        "a0 = 0.0
a1 = -0.5
a2 = 0.8
a3 = 0.5
a4 = -0.2
b0 = 0.0
b1 = -0.3
b2 = 0.6
b3 = 0.4

[pass_through]
base = 0.4
vacancy_target = 0.05
vacancy_slope = 0.1
elasticity_slope = 0.05
demand_elasticity = 0.8
",
    )
    .unwrap();

    fs::write(
        dir.join("annual_data.csv"),
        "year,price_index,rent_index,housing_units,completions,permits,population,vacancy_rate,renter_share
2018,500,100,1000,,,10000,0.05,
2019,520,103,1010,20,25,10100,0.048,0.45
",
    )
    .unwrap();
}
