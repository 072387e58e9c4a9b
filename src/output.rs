//! The module responsible for writing output data to disk.
use crate::simulation::{GridResults, ScenarioRow};
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "calhousing_results";

/// The output file name for the per-year scenario table
const SCENARIOS_FILE_NAME: &str = "scenarios.csv";

/// The output file name for the final-year summary
const SUMMARY_FILE_NAME: &str = "scenario_summary.csv";

/// The output file name for resolved stock and flows
const PROJECTION_STATES_FILE_NAME: &str = "debug_projection_states.csv";

/// Columns of the per-year scenario table
const SCENARIOS_COLUMNS: [&str; 8] = [
    "tax_delta",
    "upzone_pct",
    "year",
    "rent_index",
    "price_index",
    "pass_through_rate",
    "pct_delta_rent",
    "pct_delta_price",
];

/// Columns of the final-year summary
const SUMMARY_COLUMNS: [&str; 8] = [
    "scenario_id",
    "tax_delta",
    "upzone_pct",
    "final_year",
    "rent_index",
    "price_index",
    "pct_delta_rent",
    "pct_delta_price",
];

/// Columns of the resolved stock and flows table
const PROJECTION_STATES_COLUMNS: [&str; 7] = [
    "tax_delta",
    "upzone_pct",
    "year",
    "housing_units",
    "population",
    "completions",
    "permits",
];

/// Open a CSV file for writing and write its header row.
///
/// The header is written up front so that tables with no rows are still well formed.
fn create_csv_writer(file_path: &Path, columns: &[&str]) -> Result<csv::Writer<File>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(file_path)?;
    writer.write_record(columns)?;

    Ok(writer)
}

/// Get the default output directory for the model specified at `model_dir`
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory, with parents if needed.
///
/// If the directory already exists and is non-empty, it will only be reused if `allow_overwrite`
/// is set.
///
/// # Returns
///
/// Whether existing output files will be overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    if output_dir.is_dir() {
        let is_empty = fs::read_dir(output_dir)?.next().is_none();
        if is_empty {
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Use --overwrite to replace its contents."
        );

        return Ok(true);
    }

    fs::create_dir_all(output_dir)?;

    Ok(false)
}

/// Represents a row in the scenario summary CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SummaryRow {
    scenario_id: usize,
    tax_delta: f64,
    upzone_pct: f64,
    final_year: u32,
    rent_index: f64,
    price_index: f64,
    pct_delta_rent: f64,
    pct_delta_price: f64,
}

impl SummaryRow {
    fn new(scenario_id: usize, row: ScenarioRow) -> Self {
        Self {
            scenario_id,
            tax_delta: row.tax_delta,
            upzone_pct: row.upzone_pct,
            final_year: row.year,
            rent_index: row.rent_index,
            price_index: row.price_index,
            pct_delta_rent: row.pct_delta_rent,
            pct_delta_price: row.pct_delta_price,
        }
    }
}

/// Represents the resolved stock and flows for a scenario in a given year
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ProjectionStateRow {
    tax_delta: f64,
    upzone_pct: f64,
    year: u32,
    housing_units: f64,
    population: f64,
    completions: f64,
    permits: f64,
}

/// For writing extra debug information about the model
struct DebugDataWriter {
    projection_states_writer: csv::Writer<File>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    fn create(output_path: &Path) -> Result<Self> {
        let file_path = output_path.join(PROJECTION_STATES_FILE_NAME);
        Ok(Self {
            projection_states_writer: create_csv_writer(&file_path, &PROJECTION_STATES_COLUMNS)?,
        })
    }

    /// Write the resolved stock and flows for every scenario to file
    fn write_projection_states(&mut self, results: &GridResults) -> Result<()> {
        for trajectory in &results.scenarios {
            for state in &trajectory.states {
                let row = ProjectionStateRow {
                    tax_delta: trajectory.policy.tax_delta,
                    upzone_pct: trajectory.policy.upzone_pct,
                    year: state.year,
                    housing_units: state.housing_units,
                    population: state.population,
                    completions: state.completions,
                    permits: state.permits,
                };
                self.projection_states_writer.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    fn flush(&mut self) -> Result<()> {
        self.projection_states_writer.flush()?;

        Ok(())
    }
}

/// An object for writing simulation results to file
pub struct DataWriter {
    scenarios_writer: csv::Writer<File>,
    summary_writer: csv::Writer<File>,
    debug_writer: Option<DebugDataWriter>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let debug_writer = if save_debug_info {
            // Create debug CSV files
            Some(DebugDataWriter::create(output_path)?)
        } else {
            None
        };

        Ok(Self {
            scenarios_writer: create_csv_writer(
                &output_path.join(SCENARIOS_FILE_NAME),
                &SCENARIOS_COLUMNS,
            )?,
            summary_writer: create_csv_writer(
                &output_path.join(SUMMARY_FILE_NAME),
                &SUMMARY_COLUMNS,
            )?,
            debug_writer,
        })
    }

    /// Write one row per scenario and projected year
    pub fn write_scenarios(&mut self, results: &GridResults) -> Result<()> {
        for row in results.rows() {
            self.scenarios_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write the final projected year of each scenario
    pub fn write_summary(&mut self, results: &GridResults) -> Result<()> {
        for (scenario_id, row) in results.final_rows() {
            self.summary_writer
                .serialize(SummaryRow::new(scenario_id, row))?;
        }

        Ok(())
    }

    /// Write debug information to CSV files
    pub fn write_debug_info(&mut self, results: &GridResults) -> Result<()> {
        if let Some(wtr) = &mut self.debug_writer {
            wtr.write_projection_states(results)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.scenarios_writer.flush()?;
        self.summary_writer.flush()?;
        if let Some(wtr) = &mut self.debug_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}
