//! Code for reading the coefficient set from `coefficients.toml`.
use crate::coefficients::CoefficientSet;
use crate::input::{input_err_msg, read_toml};
use anyhow::{Context, Result};
use std::path::Path;

const COEFFICIENTS_FILE_NAME: &str = "coefficients.toml";

/// Read the coefficient set from the specified model directory.
///
/// All coefficients are required. Unrecognised keys are ignored.
pub fn read_coefficients(model_dir: &Path) -> Result<CoefficientSet> {
    let file_path = model_dir.join(COEFFICIENTS_FILE_NAME);
    let coefficients: CoefficientSet = read_toml(&file_path)?;
    coefficients
        .validate()
        .with_context(|| input_err_msg(&file_path))?;

    Ok(coefficients)
}
