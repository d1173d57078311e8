//! Common ECS components shared between the simulation and its driver.

use glam::Vec2;

use crate::bounds::Aabb;

/// Tag component for the player-controlled combatant.
#[derive(Debug, Clone, Copy, Default)]
pub struct Player;

/// Movement and stamina state of a combatant.
///
/// Disaster effects scale `speed` transiently and drain `energy`; the
/// movement system owns everything else.
#[derive(Debug, Clone, Copy)]
pub struct Combatant {
    pub position: Vec2,
    /// Current movement speed in units per second.
    pub speed: f32,
    pub energy: f32,
    pub max_energy: f32,
}

impl Combatant {
    pub fn new(position: Vec2, speed: f32, max_energy: f32) -> Self {
        Self { position, speed, energy: max_energy, max_energy }
    }

    pub fn drain_energy(&mut self, amount: f32) {
        if amount.is_finite() {
            self.energy = (self.energy - amount).clamp(0.0, self.max_energy);
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.energy <= 0.0
    }

    pub fn energy_fraction(&self) -> f32 {
        if self.max_energy > 0.0 {
            self.energy / self.max_energy
        } else {
            0.0
        }
    }
}

impl Default for Combatant {
    fn default() -> Self {
        Self::new(Vec2::ZERO, 120.0, 100.0)
    }
}

/// Solid game object that weather particles collide with.
#[derive(Debug, Clone, Copy)]
pub struct Obstacle {
    pub bounds: Aabb,
}

impl Obstacle {
    pub fn new(bounds: Aabb) -> Self {
        Self { bounds }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_energy_clamps_at_zero() {
        let mut c = Combatant::new(Vec2::ZERO, 100.0, 50.0);
        c.drain_energy(80.0);
        assert_eq!(c.energy, 0.0);
        assert!(c.is_exhausted());
    }

    #[test]
    fn drain_energy_ignores_nan() {
        let mut c = Combatant::default();
        c.drain_energy(f32::NAN);
        assert_eq!(c.energy, c.max_energy);
    }
}
