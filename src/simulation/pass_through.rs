//! The endogenous tax pass-through model.
use crate::coefficients::PassThroughParams;

/// Calculate the share of a tax increment passed through to rents in a given year.
///
/// Pass-through rises as the market tightens (vacancy below target) and falls as renters become
/// more price-sensitive:
///
/// `φ_t = clamp(φ0 + φ1 * (vacancy_target - vacancy_prev) - φ2 * demand_elasticity, 0, 1)`
///
/// # Arguments
///
/// * `vacancy_rate_prev` - The vacancy rate in the previous year
/// * `params` - Pass-through parameters
pub fn compute_pass_through(vacancy_rate_prev: f64, params: &PassThroughParams) -> f64 {
    let raw = params.base + params.vacancy_slope * (params.vacancy_target - vacancy_rate_prev)
        - params.elasticity_slope * params.demand_elasticity;

    raw.clamp(0.0, 1.0)
}
