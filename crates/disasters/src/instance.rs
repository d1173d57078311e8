//! Live disaster instances and their archetype-specific state.

use glam::Vec2;

use crate::catalog::{ArchetypeExtra, DisasterKind, EffectTemplate, VisualHints};

/// Stable handle for one instance, unique for the engine's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

/// Circular hazard or decoration zone generated during an instance's life.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubArea {
    pub center: Vec2,
    pub radius: f32,
    /// Drains energy while the combatant stands inside.
    pub hazardous: bool,
}

impl SubArea {
    pub fn contains(&self, p: Vec2) -> bool {
        self.center.distance_squared(p) <= self.radius * self.radius
    }
}

/// A telegraphed lightning strike waiting for its fuse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingStrike {
    pub target: Vec2,
    pub fuse: f32,
}

/// Visual afterglow of a resolved strike.
#[derive(Debug, Clone, PartialEq)]
pub struct Bolt {
    pub points: Vec<Vec2>,
    pub age: f32,
}

/// How long a bolt stays on screen.
pub const BOLT_LIFETIME: f32 = 0.3;

/// Per-archetype mutable payload.
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceState {
    Calm,
    Lightning { strike_timer: f32, pending: Option<PendingStrike>, bolt: Option<Bolt> },
    Vortex { velocity: Vec2 },
    Vent,
}

impl InstanceState {
    pub fn for_extra(extra: &ArchetypeExtra) -> Self {
        match *extra {
            ArchetypeExtra::Lightning { interval, .. } => {
                InstanceState::Lightning { strike_timer: interval, pending: None, bolt: None }
            }
            ArchetypeExtra::Vortex { .. } => InstanceState::Vortex { velocity: Vec2::ZERO },
            ArchetypeExtra::Vent { .. } => InstanceState::Vent,
            ArchetypeExtra::None | ArchetypeExtra::Exposure { .. } => InstanceState::Calm,
        }
    }
}

/// Guards for messages that must appear at most once per instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OneShotFlags {
    pub start_announced: bool,
    pub waning_announced: bool,
    pub end_announced: bool,
    pub special_rolled: bool,
}

/// One running disaster.
#[derive(Debug, Clone)]
pub struct DisasterInstance {
    id: InstanceId,
    kind: DisasterKind,
    intensity: f32,
    duration: f32,
    elapsed: f32,
    /// Template resolved at spawn, including the difficulty ramp. Special
    /// events may adjust it before the start-of-life effects are installed.
    pub effects: EffectTemplate,
    pub visuals: VisualHints,
    /// Chance that the archetype's special event fires at start-of-life.
    pub special_chance: f32,
    pub epicenter: Vec2,
    pub sub_areas: Vec<SubArea>,
    pub state: InstanceState,
    pub flags: OneShotFlags,
    effects_applied: bool,
}

impl DisasterInstance {
    pub fn new(
        id: InstanceId,
        kind: DisasterKind,
        intensity: f32,
        duration: f32,
        effects: EffectTemplate,
        visuals: VisualHints,
        epicenter: Vec2,
    ) -> Self {
        Self {
            id,
            kind,
            intensity,
            duration,
            elapsed: 0.0,
            state: InstanceState::for_extra(&effects.extra),
            effects,
            visuals,
            special_chance: 0.0,
            epicenter,
            sub_areas: Vec::new(),
            flags: OneShotFlags::default(),
            effects_applied: false,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn kind(&self) -> DisasterKind {
        self.kind
    }

    /// Resolved once at spawn; never changes.
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn remaining(&self) -> f32 {
        (self.duration - self.elapsed).max(0.0)
    }

    /// `0.0` at spawn, `1.0` at expiry.
    pub fn progress(&self) -> f32 {
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt.max(0.0);
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn effects_applied(&self) -> bool {
        self.effects_applied
    }

    pub(crate) fn set_effects_applied(&mut self, applied: bool) {
        self.effects_applied = applied;
    }
}
