//! Effect accumulator: folds every active instance into one multiplier set.
//!
//! Always recomputed from scratch, so identical inputs give bit-identical
//! output and nothing drifts between ticks.

use crate::catalog::EffectTemplate;
use crate::instance::DisasterInstance;
use crate::protection::{mitigate, ItemId, ProtectionTable};

/// Visibility reduction never exceeds this, however many disasters stack.
pub const MAX_VISIBILITY_REDUCTION: f32 = 0.8;
/// Movement multiplier floor; stacked penalties can slow but never freeze.
pub const MIN_MOVEMENT_MULTIPLIER: f32 = 0.05;
/// Energy multiplier ceiling.
pub const MAX_ENERGY_MULTIPLIER: f32 = 4.0;

/// Composite gameplay multipliers read by movement, energy and vision systems.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectSet {
    pub movement: f32,
    pub energy: f32,
    pub food_rate: f32,
    pub visibility_reduction: f32,
}

impl EffectSet {
    pub const NEUTRAL: EffectSet =
        EffectSet { movement: 1.0, energy: 1.0, food_rate: 1.0, visibility_reduction: 0.0 };

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }
}

impl Default for EffectSet {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// One instance's contribution given its intensity and protection factor.
pub fn contribution(effects: &EffectTemplate, intensity: f32, protection: f32) -> EffectSet {
    if !(intensity.is_finite() && protection.is_finite()) {
        return EffectSet::NEUTRAL;
    }
    let scaled = |m: f32| mitigate(1.0 + (m - 1.0) * intensity, protection);
    EffectSet {
        movement: scaled(effects.movement).clamp(MIN_MOVEMENT_MULTIPLIER, 1.0e3),
        energy: scaled(effects.energy).clamp(0.0, MAX_ENERGY_MULTIPLIER),
        food_rate: scaled(effects.food_rate).clamp(0.0, 1.0e3),
        visibility_reduction: (effects.visibility * intensity * protection).clamp(0.0, MAX_VISIBILITY_REDUCTION),
    }
}

/// Combine instances: multipliers multiply, visibility reduction sums (capped).
pub fn combine<'a>(
    instances: impl IntoIterator<Item = &'a DisasterInstance>,
    protection: &ProtectionTable,
    has_item: impl Fn(&ItemId) -> bool,
) -> EffectSet {
    let combined = instances.into_iter().fold(EffectSet::NEUTRAL, |acc, inst| {
        let factor = protection.damping_factor(inst.kind(), &has_item);
        let c = contribution(&inst.effects, inst.intensity(), factor);
        EffectSet {
            movement: acc.movement * c.movement,
            energy: acc.energy * c.energy,
            food_rate: acc.food_rate * c.food_rate,
            visibility_reduction: (acc.visibility_reduction + c.visibility_reduction).min(MAX_VISIBILITY_REDUCTION),
        }
    });
    EffectSet {
        movement: combined.movement.max(MIN_MOVEMENT_MULTIPLIER),
        energy: combined.energy.min(MAX_ENERGY_MULTIPLIER),
        ..combined
    }
}
