//! Regression coefficients and pass-through parameters for the rent and price equations.
use anyhow::{Result, ensure};
use serde::Deserialize;

/// Parameters controlling how much of a tax increment is passed through to rents
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PassThroughParams {
    /// Pass-through when the market is at its target vacancy and demand is inelastic (φ0)
    pub base: f64,
    /// Change in pass-through per unit of vacancy below target (φ1)
    pub vacancy_slope: f64,
    /// Change in pass-through per unit of demand elasticity (φ2)
    pub elasticity_slope: f64,
    /// Vacancy rate representing a neutral market
    pub vacancy_target: f64,
    /// Price elasticity of rental demand
    pub demand_elasticity: f64,
}

/// The full set of coefficients used by the simulation.
///
/// Rent equation:
/// `log(R_t/R_{t-1}) = a0 + a1*g_H + a2*g_Pop + a3*(φ_t*tax) + a4*Vac_{t-1}`
///
/// Price equation:
/// `log(P_t/P_{t-1}) = b0 + b1*g_H + b2*g_Pop + b3*g_R`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoefficientSet {
    /// Rent equation intercept
    pub a0: f64,
    /// Rent response to housing stock growth
    pub a1: f64,
    /// Rent response to population growth
    pub a2: f64,
    /// Rent response to the passed-through tax increment
    pub a3: f64,
    /// Rent response to lagged vacancy
    pub a4: f64,
    /// Price equation intercept
    pub b0: f64,
    /// Price response to housing stock growth
    pub b1: f64,
    /// Price response to population growth
    pub b2: f64,
    /// Price response to rent growth
    pub b3: f64,
    /// Endogenous pass-through parameters
    pub pass_through: PassThroughParams,
}

/// Multipliers applied to coefficients for sensitivity analysis
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Sensitivity {
    /// Scales the tax coefficient `a3`
    #[serde(default = "default_multiplier")]
    pub pass_through_rate: f64,
    /// Scales the housing stock coefficients `a1` and `b1`
    #[serde(default = "default_multiplier")]
    pub supply_elasticity: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self {
            pass_through_rate: default_multiplier(),
            supply_elasticity: default_multiplier(),
        }
    }
}

impl Sensitivity {
    /// Check that the multipliers are finite
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.pass_through_rate.is_finite() && self.supply_elasticity.is_finite(),
            "Sensitivity multipliers must be finite"
        );

        Ok(())
    }
}

impl CoefficientSet {
    /// Iterate over the names and values of all coefficients
    fn iter_named(&self) -> impl Iterator<Item = (&'static str, f64)> {
        let pt = &self.pass_through;
        [
            ("a0", self.a0),
            ("a1", self.a1),
            ("a2", self.a2),
            ("a3", self.a3),
            ("a4", self.a4),
            ("b0", self.b0),
            ("b1", self.b1),
            ("b2", self.b2),
            ("b3", self.b3),
            ("pass_through.base", pt.base),
            ("pass_through.vacancy_slope", pt.vacancy_slope),
            ("pass_through.elasticity_slope", pt.elasticity_slope),
            ("pass_through.vacancy_target", pt.vacancy_target),
            ("pass_through.demand_elasticity", pt.demand_elasticity),
        ]
        .into_iter()
    }

    /// Check that all coefficients are finite.
    ///
    /// No assumptions are made about the sign of any coefficient.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.iter_named() {
            ensure!(value.is_finite(), "Coefficient {name} must be finite, got {value}");
        }

        Ok(())
    }

    /// Return a copy of these coefficients with sensitivity multipliers applied
    pub fn with_sensitivity(&self, sensitivity: &Sensitivity) -> CoefficientSet {
        CoefficientSet {
            a1: self.a1 * sensitivity.supply_elasticity,
            a3: self.a3 * sensitivity.pass_through_rate,
            b1: self.b1 * sensitivity.supply_elasticity,
            ..self.clone()
        }
    }
}
