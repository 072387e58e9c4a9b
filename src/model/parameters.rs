//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::coefficients::Sensitivity;
use crate::input::{input_err_msg, read_toml};
use crate::policy::PolicyGridConfig;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::path::{Path, PathBuf};

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_data_file, PathBuf, PathBuf::from("annual_data.csv"));
define_param_default!(default_demolitions, f64, 0.0);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// Number of years to project beyond the last historical year
    pub horizon_years: u32,
    /// Path to the annual dataset, relative to the model directory
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    /// First historical year to use (inclusive)
    pub start_year: Option<u32>,
    /// Last historical year to use (inclusive)
    pub end_year: Option<u32>,
    /// How population is extrapolated beyond the historical data
    #[serde(default)]
    pub population_projection: PopulationProjection,
    /// Units removed from the housing stock in each projected year
    #[serde(default = "default_demolitions")]
    pub demolitions: f64,
    /// Multipliers applied to the coefficients
    #[serde(default)]
    pub sensitivity: Sensitivity,
    /// The policy levers to simulate
    #[serde(default)]
    pub policy_grid: PolicyGridConfig,
}

/// How population evolves in projected years
#[derive(DeserializeLabeledStringEnum, Debug, Clone, Copy, PartialEq, Default)]
pub enum PopulationProjection {
    /// Keep growing at the rate observed between the last two historical years
    #[default]
    #[string = "last_growth_rate"]
    LastGrowthRate,
    /// Hold population at its last observed value
    #[string = "frozen"]
    Frozen,
}

/// Check that the `start_year` and `end_year` parameters are consistent
fn check_year_window(start_year: Option<u32>, end_year: Option<u32>) -> Result<()> {
    if let (Some(start), Some(end)) = (start_year, end_year) {
        ensure!(
            start <= end,
            "start_year ({start}) cannot be after end_year ({end})"
        );
    }

    Ok(())
}

/// Check that the `demolitions` parameter is valid
fn check_demolitions(value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "demolitions must be a finite number greater than or equal to zero"
    );

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_year_window(self.start_year, self.end_year)?;
        check_demolitions(self.demolitions)?;
        self.sensitivity.validate()?;

        Ok(())
    }

    /// Whether the given year lies within the configured window
    pub fn includes_year(&self, year: u32) -> bool {
        self.start_year.is_none_or(|start| year >= start)
            && self.end_year.is_none_or(|end| year <= end)
    }
}
