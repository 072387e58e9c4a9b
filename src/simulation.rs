//! Functionality for running the simulation.
use crate::model::Model;
use crate::output::DataWriter;
use anyhow::Result;
use log::info;
use std::path::Path;

pub mod grid;
pub mod pass_through;
pub mod projection;
pub use grid::{GridResults, ScenarioRow, run_grid};
pub use projection::{ProjectionAssumptions, SimulationYearState, Trajectory, simulate};

/// Run the simulation.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
/// * `debug_model` - Whether to write additional information (e.g. resolved stock) to file
pub fn run(model: &Model, output_path: &Path, debug_model: bool) -> Result<GridResults> {
    let params = &model.parameters;
    let assumptions = ProjectionAssumptions {
        population_projection: params.population_projection,
        demolitions: params.demolitions,
    };

    let first_year = model.last_historical_year() + 1;
    info!(
        "Projecting {} year(s) from {first_year} for {} scenario(s)",
        params.horizon_years,
        model.policy_grid.len()
    );

    let results = run_grid(
        &model.history,
        &model.coefficients,
        &model.policy_grid,
        params.horizon_years,
        &assumptions,
    )?;

    let mut writer = DataWriter::create(output_path, debug_model)?;
    writer.write_scenarios(&results)?;
    writer.write_summary(&results)?;
    writer.write_debug_info(&results)?;
    writer.flush()?;

    Ok(results)
}
