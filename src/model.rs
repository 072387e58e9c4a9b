//! The model represents the static input data provided by the user.
use crate::coefficients::CoefficientSet;
use crate::history::AnnualRecord;
use crate::input::coefficients::read_coefficients;
use crate::input::history::read_history;
use crate::input::input_err_msg;
use crate::policy::PolicyGrid;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

pub mod parameters;
pub use parameters::{ModelParameters, PopulationProjection};

/// Model definition
#[derive(Debug)]
pub struct Model {
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Historical annual data, sorted by year
    pub history: Vec<AnnualRecord>,
    /// Coefficients with any sensitivity multipliers already applied
    pub coefficients: CoefficientSet,
    /// The resolved grid of policy scenarios
    pub policy_grid: PolicyGrid,
}

impl Model {
    /// Read a model from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
        let model_dir = model_dir.as_ref();
        let parameters = ModelParameters::from_path(model_dir)?;

        // Resolve the grid before touching any data, so bad ranges are reported first
        let policy_grid = PolicyGrid::from_config(&parameters.policy_grid)
            .context("Invalid policy_grid")
            .with_context(|| input_err_msg(model_dir.join("model.toml")))?;

        let coefficients =
            read_coefficients(model_dir)?.with_sensitivity(&parameters.sensitivity);
        coefficients
            .validate()
            .context("Invalid coefficients after applying sensitivity multipliers")?;

        let history = read_history(&model_dir.join(&parameters.data_file), |year| {
            parameters.includes_year(year)
        })?;

        info!(
            "Policy grid: {} tax delta(s) x {} upzoning value(s)",
            policy_grid.tax_deltas.len(),
            policy_grid.upzone_pcts.len()
        );

        Ok(Model {
            parameters,
            history,
            coefficients,
            policy_grid,
        })
    }

    /// The last year of historical data
    pub fn last_historical_year(&self) -> u32 {
        self.history.last().map_or(0, |record| record.year)
    }
}
