//! Disaster catalog: the immutable table of archetypes.
//!
//! Every other component reads from here. Tuning that changes during a
//! session (the difficulty ramp) is layered on top by the scheduler; the
//! catalog itself never mutates after startup.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{DisasterError, Result};
use crate::services::SoundKind;

/// Smallest intensity / duration an archetype may resolve to.
pub const MIN_POSITIVE: f32 = 0.01;

/// Every kind of disaster the simulation knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum DisasterKind {
    #[default]
    Rainstorm,
    Thunderstorm,
    Blizzard,
    Sandstorm,
    Tornado,
    Heatwave,
    Eruption,
}

impl DisasterKind {
    pub const ALL: [DisasterKind; 7] = [
        DisasterKind::Rainstorm,
        DisasterKind::Thunderstorm,
        DisasterKind::Blizzard,
        DisasterKind::Sandstorm,
        DisasterKind::Tornado,
        DisasterKind::Heatwave,
        DisasterKind::Eruption,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DisasterKind::Rainstorm => "Rainstorm",
            DisasterKind::Thunderstorm => "Thunderstorm",
            DisasterKind::Blizzard => "Blizzard",
            DisasterKind::Sandstorm => "Sandstorm",
            DisasterKind::Tornado => "Tornado",
            DisasterKind::Heatwave => "Heatwave",
            DisasterKind::Eruption => "Volcanic Eruption",
        }
    }

    /// Ambience loop played while an instance of this kind is alive.
    pub fn ambience(&self) -> SoundKind {
        match self {
            DisasterKind::Rainstorm => SoundKind::RainLoop,
            DisasterKind::Thunderstorm => SoundKind::StormLoop,
            DisasterKind::Blizzard | DisasterKind::Tornado => SoundKind::WindLoop,
            DisasterKind::Sandstorm => SoundKind::SandLoop,
            DisasterKind::Heatwave => SoundKind::HeatLoop,
            DisasterKind::Eruption => SoundKind::RumbleLoop,
        }
    }

    /// Announcement colour (RGBA).
    pub fn color(&self) -> [f32; 4] {
        match self {
            DisasterKind::Rainstorm => [0.45, 0.6, 1.0, 1.0],
            DisasterKind::Thunderstorm => [0.7, 0.6, 1.0, 1.0],
            DisasterKind::Blizzard => [0.85, 0.95, 1.0, 1.0],
            DisasterKind::Sandstorm => [0.95, 0.8, 0.45, 1.0],
            DisasterKind::Tornado => [0.6, 0.65, 0.6, 1.0],
            DisasterKind::Heatwave => [1.0, 0.55, 0.2, 1.0],
            DisasterKind::Eruption => [1.0, 0.25, 0.1, 1.0],
        }
    }
}

/// Closed float interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    pub min: f32,
    pub max: f32,
}

impl FloatRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Repair a range so that `floor <= min <= max` and both are finite.
    pub fn sanitized(self, floor: f32) -> Self {
        let fix = |v: f32| if v.is_finite() { v.max(floor) } else { floor };
        let (a, b) = (fix(self.min), fix(self.max));
        Self { min: a.min(b), max: a.max(b) }
    }

    pub fn width(&self) -> f32 {
        self.max - self.min
    }

    /// Uniform sample. A zero-width range always yields `min`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.width() > f32::EPSILON {
            rng.gen_range(self.min..=self.max)
        } else {
            self.min
        }
    }
}

impl From<[f32; 2]> for FloatRange {
    fn from(v: [f32; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

/// Archetype-specific gameplay payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArchetypeExtra {
    None,
    /// Periodic telegraphed strikes near the combatant.
    Lightning { interval: f32, radius: f32, damage: f32 },
    /// Wandering funnel that drags the combatant toward its centre.
    Vortex { suction_radius: f32, suction_strength: f32, wander_speed: f32 },
    /// Constant energy drain while exposed.
    Exposure { damage_per_second: f32 },
    /// Energy drain only inside generated hazard sub-areas (lava).
    Vent { damage_per_second: f32 },
}

/// Gameplay multipliers of one archetype at intensity 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectTemplate {
    pub movement: f32,
    pub energy: f32,
    pub food_rate: f32,
    /// Fraction of the view obscured, `0.0..=0.8`.
    pub visibility: f32,
    pub extra: ArchetypeExtra,
}

/// Non-gameplay presentation hints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualHints {
    /// Full-screen veil tint; alpha is driven by visibility reduction.
    pub veil: [f32; 3],
    /// Master-volume scale held while the instance is alive.
    pub volume_scale: Option<f32>,
}

/// Immutable template describing one kind of disaster.
#[derive(Debug, Clone, PartialEq)]
pub struct Archetype {
    pub kind: DisasterKind,
    /// Seconds.
    pub duration: FloatRange,
    pub intensity: FloatRange,
    pub effects: EffectTemplate,
    /// Relative selection weight.
    pub weight: f32,
    /// Used for selection weighting, the intensity curve and warning severity.
    pub difficulty: f32,
    pub visuals: VisualHints,
}

impl Archetype {
    /// Whether the scheduler may pick this entry at all.
    pub fn is_selectable(&self) -> bool {
        self.weight.is_finite() && self.weight > 0.0 && self.difficulty.is_finite()
    }

    /// Built-in tuning for each kind.
    pub fn standard(kind: DisasterKind) -> Self {
        let (duration, intensity, effects, weight, difficulty, visuals) = match kind {
            DisasterKind::Rainstorm => (
                FloatRange::new(25.0, 45.0),
                FloatRange::new(0.6, 1.2),
                EffectTemplate {
                    movement: 0.9,
                    energy: 1.1,
                    food_rate: 1.25,
                    visibility: 0.15,
                    extra: ArchetypeExtra::None,
                },
                1.0,
                1.0,
                VisualHints { veil: [0.35, 0.4, 0.5], volume_scale: None },
            ),
            DisasterKind::Thunderstorm => (
                FloatRange::new(20.0, 35.0),
                FloatRange::new(0.8, 1.4),
                EffectTemplate {
                    movement: 0.85,
                    energy: 1.2,
                    food_rate: 1.1,
                    visibility: 0.25,
                    extra: ArchetypeExtra::Lightning { interval: 4.0, radius: 60.0, damage: 15.0 },
                },
                0.8,
                2.0,
                VisualHints { veil: [0.2, 0.22, 0.3], volume_scale: Some(1.25) },
            ),
            DisasterKind::Blizzard => (
                FloatRange::new(30.0, 50.0),
                FloatRange::new(0.7, 1.3),
                EffectTemplate {
                    movement: 0.7,
                    energy: 1.3,
                    food_rate: 0.6,
                    visibility: 0.35,
                    extra: ArchetypeExtra::Exposure { damage_per_second: 0.2 },
                },
                0.9,
                2.5,
                VisualHints { veil: [0.85, 0.9, 0.95], volume_scale: None },
            ),
            DisasterKind::Sandstorm => (
                FloatRange::new(20.0, 40.0),
                FloatRange::new(0.6, 1.2),
                EffectTemplate {
                    movement: 0.8,
                    energy: 1.15,
                    food_rate: 0.8,
                    visibility: 0.45,
                    extra: ArchetypeExtra::Exposure { damage_per_second: 0.5 },
                },
                0.9,
                2.0,
                VisualHints { veil: [0.8, 0.65, 0.4], volume_scale: None },
            ),
            DisasterKind::Tornado => (
                FloatRange::new(15.0, 25.0),
                FloatRange::new(0.9, 1.5),
                EffectTemplate {
                    movement: 0.75,
                    energy: 1.25,
                    food_rate: 0.9,
                    visibility: 0.2,
                    extra: ArchetypeExtra::Vortex {
                        suction_radius: 180.0,
                        suction_strength: 60.0,
                        wander_speed: 40.0,
                    },
                },
                0.5,
                3.5,
                VisualHints { veil: [0.4, 0.45, 0.4], volume_scale: Some(0.8) },
            ),
            DisasterKind::Heatwave => (
                FloatRange::new(35.0, 60.0),
                FloatRange::new(0.5, 1.0),
                EffectTemplate {
                    movement: 0.9,
                    energy: 1.4,
                    food_rate: 0.7,
                    visibility: 0.05,
                    extra: ArchetypeExtra::Exposure { damage_per_second: 0.3 },
                },
                0.8,
                1.5,
                VisualHints { veil: [1.0, 0.7, 0.4], volume_scale: None },
            ),
            DisasterKind::Eruption => (
                FloatRange::new(20.0, 30.0),
                FloatRange::new(0.8, 1.6),
                EffectTemplate {
                    movement: 0.85,
                    energy: 1.3,
                    food_rate: 0.5,
                    visibility: 0.3,
                    extra: ArchetypeExtra::Vent { damage_per_second: 4.0 },
                },
                0.4,
                4.0,
                VisualHints { veil: [0.45, 0.2, 0.1], volume_scale: Some(1.2) },
            ),
        };
        Self { kind, duration, intensity, effects, weight, difficulty, visuals }
    }
}

/// The full archetype table.
#[derive(Debug, Clone)]
pub struct Catalog {
    archetypes: Vec<Archetype>,
}

impl Catalog {
    /// Every kind with built-in tuning.
    pub fn standard() -> Self {
        Self { archetypes: DisasterKind::ALL.iter().map(|&k| Archetype::standard(k)).collect() }
    }

    /// Build from an explicit list (tests, custom game modes). Ranges are
    /// sanitized; entries with a bad weight are kept but never selected.
    pub fn from_archetypes(archetypes: Vec<Archetype>) -> Result<Self> {
        let mut catalog = Self { archetypes: Vec::with_capacity(archetypes.len()) };
        for mut a in archetypes {
            if catalog.contains(a.kind) {
                return Err(DisasterError::InvalidConfig(format!("duplicate archetype {:?}", a.kind)));
            }
            a.duration = a.duration.sanitized(MIN_POSITIVE);
            a.intensity = a.intensity.sanitized(MIN_POSITIVE);
            if !a.is_selectable() {
                log::warn!(
                    "{} has weight {} / difficulty {}; excluded from selection",
                    a.kind.name(),
                    a.weight,
                    a.difficulty
                );
            }
            catalog.archetypes.push(a);
        }
        if !catalog.archetypes.iter().any(Archetype::is_selectable) {
            return Err(DisasterError::NoSelectableArchetypes);
        }
        Ok(catalog)
    }

    /// Standard table minus disabled kinds, with overrides applied.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let mut archetypes: Vec<Archetype> = DisasterKind::ALL
            .iter()
            .filter(|k| !config.disabled_kinds.contains(k))
            .map(|&k| Archetype::standard(k))
            .collect();

        for o in &config.archetype_overrides {
            let a = archetypes
                .iter_mut()
                .find(|a| a.kind == o.kind)
                .ok_or(DisasterError::MissingArchetype(o.kind))?;
            if let Some(w) = o.weight {
                a.weight = w;
            }
            if let Some(d) = o.difficulty {
                a.difficulty = d;
            }
            if let Some(r) = o.intensity {
                a.intensity = r.into();
            }
            if let Some(r) = o.duration {
                a.duration = r.into();
            }
        }
        Self::from_archetypes(archetypes)
    }

    pub fn get(&self, kind: DisasterKind) -> Option<&Archetype> {
        self.archetypes.iter().find(|a| a.kind == kind)
    }

    /// Like [`Catalog::get`] but as a startup error.
    pub fn require(&self, kind: DisasterKind) -> Result<&Archetype> {
        self.get(kind).ok_or(DisasterError::MissingArchetype(kind))
    }

    pub fn contains(&self, kind: DisasterKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    pub fn selectable(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter().filter(|a| a.is_selectable())
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}
