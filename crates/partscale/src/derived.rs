//! Mass, cost and volume modifiers as functions of the scale ratio.

use tracing::{error, warn};

use crate::config::ScaleConfig;
use crate::part::PartPrefab;

/// Volume always scales with the cube of the linear ratio.
pub const VOLUME_EXPONENT: f64 = 3.0;

/// Dry costs below this are reported as errors before clamping to zero.
const NEGATIVE_COST_LIMIT: f64 = -0.5;

/// `ratio ^ exponent` for mass.
pub fn mass_factor(ratio: f64, exponent: f64) -> f64 {
    ratio.powf(exponent)
}

/// `ratio ^ exponent` for dry cost.
pub fn dry_cost_factor(ratio: f64, exponent: f64) -> f64 {
    ratio.powf(exponent)
}

/// `ratio ^ 3`.
pub fn volume_factor(ratio: f64) -> f64 {
    ratio.powf(VOLUME_EXPONENT)
}

/// Cost of a template without its resources, never negative.
pub fn dry_cost(prefab: &PartPrefab) -> f64 {
    let resources: f64 = prefab
        .resources
        .iter()
        .map(|r| r.max_amount * r.unit_cost)
        .sum();
    let cost = prefab.cost - resources;
    if cost < 0.0 {
        if cost < NEGATIVE_COST_LIMIT {
            error!("Negative dry cost {:.2} for part {}", cost, prefab.name);
        } else {
            warn!("Dry cost of part {} rounds below zero", prefab.name);
        }
        return 0.0;
    }
    cost
}

/// Differences to the template's mass and cost at some scale.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Modifiers {
    /// Added mass.
    pub mass: f64,
    /// Added cost.
    pub cost: f64,
}

impl Modifiers {
    /// Modifiers of a part of `prefab_mass` and `dry_cost` at `scale`.
    pub fn at_scale(config: &ScaleConfig, scale: f64, prefab_mass: f64, dry_cost: f64) -> Self {
        Self {
            mass: prefab_mass * (mass_factor(scale, config.mass_exponent) - 1.0),
            cost: dry_cost * (dry_cost_factor(scale, config.cost_exponent) - 1.0),
        }
    }
}
