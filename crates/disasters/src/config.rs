//! Tunable parameters for the weather engine.
//!
//! Every struct deserializes with defaults for missing fields, so a config
//! file only needs to mention what it changes.

use engine_core::PlayBounds;
use serde::{Deserialize, Serialize};

use crate::catalog::DisasterKind;
use crate::error::{DisasterError, Result};
use crate::protection::ProtectionRule;

/// Top-level weather engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed RNG seed for reproducible sessions. `None` seeds from entropy.
    pub seed: Option<u64>,
    pub scheduler: SchedulerConfig,
    pub warning: WarningConfig,
    pub performance: PerformanceConfig,
    pub particles: ParticleConfig,
    /// Archetypes removed from the catalog entirely.
    pub disabled_kinds: Vec<DisasterKind>,
    pub archetype_overrides: Vec<ArchetypeOverride>,
    /// Replaces the built-in protection table when present.
    pub protection: Option<Vec<ProtectionRule>>,
}

impl EngineConfig {
    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.scheduler;
        let [lo, hi] = s.initial_interval;
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && hi >= lo) {
            return Err(invalid(format!("scheduler.initial_interval {:?}", s.initial_interval)));
        }
        if !(s.interval_floor > 0.0) {
            return Err(invalid(format!("scheduler.interval_floor {}", s.interval_floor)));
        }
        if s.max_concurrent == 0 {
            return Err(invalid("scheduler.max_concurrent must be at least 1".into()));
        }
        for (name, v) in [
            ("weight_normalization", s.weight_normalization),
            ("progress_period", s.progress_period),
            ("curve_period", s.curve_period),
            ("interval_shrink_period", s.interval_shrink_period),
            ("ramp_interval", s.ramp_interval),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(invalid(format!("scheduler.{} {}", name, v)));
            }
        }
        if !(s.curve_exponent > 1.0) {
            return Err(invalid(format!("scheduler.curve_exponent {} must be > 1", s.curve_exponent)));
        }
        if !(self.warning.lead_time >= 0.0) {
            return Err(invalid(format!("warning.lead_time {}", self.warning.lead_time)));
        }
        let p = &self.performance;
        if !(0.0..1.0).contains(&p.smoothing) {
            return Err(invalid(format!("performance.smoothing {} not in [0, 1)", p.smoothing)));
        }
        if !(p.low_fps > 0.0 && p.medium_fps > p.low_fps) {
            return Err(invalid(format!("performance thresholds {} / {}", p.low_fps, p.medium_fps)));
        }
        if !(p.check_interval > 0.0) {
            return Err(invalid(format!("performance.check_interval {}", p.check_interval)));
        }
        if !(self.particles.cap_scale >= 0.0 && self.particles.max_spawn_per_tick >= 0.0) {
            return Err(invalid("particle caps must be non-negative".into()));
        }
        let b = &self.particles.bounds;
        if !(b.width.is_finite() && b.height.is_finite() && b.width > 0.0 && b.height > 0.0) {
            return Err(invalid(format!("particles.bounds size {} x {}", b.width, b.height)));
        }
        // Air emitters spawn up to MIN_GROUND_Y above the ground line.
        if !(b.ground_y >= MIN_GROUND_Y && b.ground_y <= b.height) {
            return Err(invalid(format!(
                "particles.bounds.ground_y {} not in [{}, {}]",
                b.ground_y, MIN_GROUND_Y, b.height
            )));
        }
        if !(b.margin.is_finite() && b.margin >= 0.0) {
            return Err(invalid(format!("particles.bounds.margin {}", b.margin)));
        }
        Ok(())
    }
}

/// Lowest ground line the emitters can spawn above.
const MIN_GROUND_Y: f32 = 4.0;

fn invalid(msg: String) -> DisasterError {
    DisasterError::InvalidConfig(msg)
}

/// Spawn timing and the session-long difficulty curve. The constants are
/// tuning knobs; only the shape of each curve matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Bounds of the first spawn interval (seconds).
    pub initial_interval: [f32; 2],
    /// Interval bounds never shrink below this.
    pub interval_floor: f32,
    /// Game time over which intervals halve.
    pub interval_shrink_period: f32,
    pub max_concurrent: usize,
    /// Game seconds per +1.0 added to every selection weight.
    pub weight_normalization: f32,
    /// Linear progress term: reaches `1 + progress_ratio` after `progress_period`.
    pub progress_period: f32,
    pub progress_ratio: f32,
    /// Super-linear term: `1 + curve_scale * (difficulty / 2) * (t / curve_period)^curve_exponent`.
    pub curve_period: f32,
    pub curve_exponent: f32,
    pub curve_scale: f32,
    /// Seconds between difficulty ramp steps.
    pub ramp_interval: f32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_interval: [25.0, 50.0],
            interval_floor: 6.0,
            interval_shrink_period: 480.0,
            max_concurrent: 2,
            weight_normalization: 300.0,
            progress_period: 600.0,
            progress_ratio: 0.5,
            curve_period: 900.0,
            curve_exponent: 1.6,
            curve_scale: 0.35,
            ramp_interval: 60.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningConfig {
    pub enabled: bool,
    /// Seconds between the forecast and the scheduled spawn.
    pub lead_time: f32,
}

impl Default for WarningConfig {
    fn default() -> Self {
        Self { enabled: true, lead_time: 8.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Seconds between quality-tier re-evaluations.
    pub check_interval: f32,
    /// Weight of the old average in the frame-time EMA.
    pub smoothing: f32,
    /// Below this FPS the tier is `Low`.
    pub low_fps: f32,
    /// Below this FPS (and at or above `low_fps`) the tier is `Medium`.
    pub medium_fps: f32,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self { check_interval: 1.0, smoothing: 0.9, low_fps: 30.0, medium_fps: 45.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub bounds: PlayBounds,
    /// Hard ceiling on particles spawned per pool per tick (before quality scaling).
    pub max_spawn_per_tick: f32,
    /// Multiplier on every archetype's pool cap.
    pub cap_scale: f32,
    /// Maximum splash / accumulation marks alive at once.
    pub impact_mark_cap: usize,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            bounds: PlayBounds::default(),
            max_spawn_per_tick: 24.0,
            cap_scale: 1.0,
            impact_mark_cap: 256,
        }
    }
}

/// Per-archetype tuning override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchetypeOverride {
    pub kind: DisasterKind,
    pub weight: Option<f32>,
    pub difficulty: Option<f32>,
    pub intensity: Option<[f32; 2]>,
    pub duration: Option<[f32; 2]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut config = EngineConfig::default();
        config.performance.low_fps = 50.0;
        assert!(matches!(config.validate(), Err(DisasterError::InvalidConfig(_))));
    }

    #[test]
    fn linear_curve_exponent_is_rejected() {
        let mut config = EngineConfig::default();
        config.scheduler.curve_exponent = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn degenerate_bounds_are_rejected() {
        let mut config = EngineConfig::default();
        config.particles.bounds = PlayBounds { width: 320.0, height: 3.0, ground_y: 2.0, margin: 8.0 };
        assert!(matches!(config.validate(), Err(DisasterError::InvalidConfig(_))));

        config.particles.bounds = PlayBounds { width: -10.0, height: 720.0, ground_y: 660.0, margin: 8.0 };
        assert!(config.validate().is_err());

        config.particles.bounds = PlayBounds { width: 1280.0, height: 720.0, ground_y: 800.0, margin: 8.0 };
        assert!(config.validate().is_err());

        config.particles.bounds = PlayBounds { width: 1280.0, height: 720.0, ground_y: 660.0, margin: -1.0 };
        assert!(config.validate().is_err());

        config.particles.bounds = PlayBounds { width: 320.0, height: 240.0, ground_y: 4.0, margin: 0.0 };
        assert!(config.validate().is_ok());
    }
}
