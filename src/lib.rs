//! Common functionality for the California housing policy simulator.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod coefficients;
pub mod history;
pub mod input;
pub mod log;
pub mod model;
pub mod output;
pub mod policy;
pub mod settings;
pub mod simulation;

#[cfg(test)]
mod fixture;

/// Get the config folder for the program.
///
/// Falls back to the current directory if the platform has no config directory.
pub fn get_calhousing_config_dir() -> PathBuf {
    let Some(mut dir) = dirs::config_dir() else {
        return PathBuf::from(".");
    };
    dir.push("calhousing");
    dir
}
