//! Policy levers and the grid of scenarios built from them.
use anyhow::{Result, ensure};
use float_cmp::approx_eq;
use itertools::Itertools;
use serde::Deserialize;

/// Tolerance used when deciding whether the upper bound of a range has been reached
const RANGE_TOLERANCE: f64 = 1e-9;

/// Number of decimal places generated range values are rounded to
const RANGE_DECIMAL_PLACES: i32 = 10;

/// Maximum number of values a single range may generate
const MAX_RANGE_VALUES: u32 = 10_000;

/// One point in the policy grid
#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display)]
#[display("tax_delta={tax_delta}, upzone_pct={upzone_pct}")]
pub struct PolicyScenario {
    /// Incremental effective tax rate (e.g. 0.002 = 0.20%)
    pub tax_delta: f64,
    /// Fractional uplift applied to completions and permits (e.g. 0.10 = +10%)
    pub upzone_pct: f64,
}

impl PolicyScenario {
    /// The zero-policy scenario used as the reference for deltas
    pub const BASELINE: PolicyScenario = PolicyScenario {
        tax_delta: 0.0,
        upzone_pct: 0.0,
    };

    /// Whether this scenario applies no policy at all
    pub fn is_baseline(&self) -> bool {
        self.tax_delta == 0.0 && self.upzone_pct == 0.0
    }
}

/// The values a policy lever takes, as written in `model.toml`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PolicyValues {
    /// An explicit ordered list of values
    List(Vec<f64>),
    /// An inclusive range of evenly spaced values
    Range {
        /// First value
        min: f64,
        /// Last value (inclusive, within tolerance)
        max: f64,
        /// Spacing between values
        step: f64,
    },
}

impl Default for PolicyValues {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl PolicyValues {
    /// Resolve into a plain list of values.
    ///
    /// Duplicates are removed (keeping the first occurrence) and an empty list becomes `[0.0]`.
    pub fn resolve(&self) -> Result<Vec<f64>> {
        let values = match self {
            Self::List(values) => {
                for value in values {
                    ensure!(value.is_finite(), "Policy values must be finite, got {value}");
                }
                values.clone()
            }
            Self::Range { min, max, step } => expand_range(*min, *max, *step)?,
        };

        if values.is_empty() {
            return Ok(vec![0.0]);
        }

        // Adding zero normalises -0.0 so that it is treated as a duplicate of 0.0
        Ok(values
            .into_iter()
            .map(|value| value + 0.0)
            .unique_by(|value| value.to_bits())
            .collect())
    }
}

/// Round a generated range value to remove accumulated floating-point error.
///
/// Values too large to scale have no fractional digits left to round and are returned as is.
fn round_range_value(value: f64) -> f64 {
    let scaled = value * 10f64.powi(RANGE_DECIMAL_PLACES);
    if !scaled.is_finite() {
        return value;
    }

    scaled.round() / 10f64.powi(RANGE_DECIMAL_PLACES)
}

/// Expand `{min, max, step}` into the inclusive sequence `min, min + step, ...`.
///
/// The upper bound is included if the sequence reaches it to within [`RANGE_TOLERANCE`]. Bounds
/// closer together than [`RANGE_TOLERANCE`] are treated as the same value, so such a range
/// always gives the single value `[min]`. At most [`MAX_RANGE_VALUES`] values may be generated.
pub fn expand_range(min: f64, max: f64, step: f64) -> Result<Vec<f64>> {
    ensure!(
        min.is_finite() && max.is_finite() && step.is_finite(),
        "Range values must be finite"
    );

    if approx_eq!(f64, min, max, epsilon = RANGE_TOLERANCE) {
        return Ok(vec![round_range_value(min)]);
    }

    ensure!(
        step > 0.0,
        "Range step must be positive when min != max, got {step}"
    );
    ensure!(
        min < max,
        "Range min ({min}) must not be greater than max ({max})"
    );

    let num_steps = ((max - min) / step + RANGE_TOLERANCE).floor();
    ensure!(
        num_steps < f64::from(MAX_RANGE_VALUES),
        "Range with step {step} would generate more than {MAX_RANGE_VALUES} values"
    );

    // Multiply rather than accumulate so that rounding error doesn't build up
    let values = (0u32..)
        .map(|i| min + f64::from(i) * step)
        .take_while(|value| *value <= max + RANGE_TOLERANCE)
        .map(round_range_value)
        .collect();

    Ok(values)
}

/// Options for the policy grid
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PolicyGridConfig {
    /// Incremental tax rates to simulate
    #[serde(default)]
    pub tax_delta: PolicyValues,
    /// Completions/permits uplifts to simulate
    #[serde(default)]
    pub upzone_pct: PolicyValues,
}

/// The resolved policy grid
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyGrid {
    /// Incremental tax rates, de-duplicated and in order
    pub tax_deltas: Vec<f64>,
    /// Upzoning uplifts, de-duplicated and in order
    pub upzone_pcts: Vec<f64>,
}

impl PolicyGrid {
    /// Create a grid from explicit lists of values.
    ///
    /// Each list is de-duplicated and an empty list is treated as `[0.0]`.
    pub fn new(tax_deltas: Vec<f64>, upzone_pcts: Vec<f64>) -> Result<Self> {
        Ok(Self {
            tax_deltas: PolicyValues::List(tax_deltas).resolve()?,
            upzone_pcts: PolicyValues::List(upzone_pcts).resolve()?,
        })
    }

    /// Resolve the grid from configuration
    pub fn from_config(config: &PolicyGridConfig) -> Result<Self> {
        Ok(Self {
            tax_deltas: config.tax_delta.resolve()?,
            upzone_pcts: config.upzone_pct.resolve()?,
        })
    }

    /// Iterate over every scenario in the grid.
    ///
    /// The outer loop is over tax deltas and the inner loop over upzoning percentages.
    pub fn iter_scenarios(&self) -> impl Iterator<Item = PolicyScenario> + '_ {
        self.tax_deltas
            .iter()
            .cartesian_product(self.upzone_pcts.iter())
            .map(|(&tax_delta, &upzone_pct)| PolicyScenario {
                tax_delta,
                upzone_pct,
            })
    }

    /// The number of scenarios in the grid
    pub fn len(&self) -> usize {
        self.tax_deltas.len() * self.upzone_pcts.len()
    }

    /// Whether the grid contains no scenarios
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
