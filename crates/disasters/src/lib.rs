//! Weather disasters: scheduling, stacking gameplay effects, forecasts and
//! adaptive particle visuals.
//!
//! The [`WeatherEngine`] facade owns every component and is driven once per
//! frame by the game loop:
//! - [`catalog`]: immutable archetype table
//! - [`scheduler`]: when, which and how strong
//! - [`registry`]: live instances and their start/stop effects
//! - [`effects`]: composite multiplier set
//! - [`warning`]: forecasts ahead of spawns
//! - [`particles`]: pooled particles, collisions, rendering
//! - [`performance`]: frame-rate driven quality tier
//! - [`protection`]: equipment damping

pub mod catalog;
pub mod config;
pub mod effects;
pub mod engine;
pub mod error;
pub mod instance;
pub mod particles;
pub mod performance;
pub mod protection;
pub mod registry;
pub mod scheduler;
pub mod scoped;
pub mod services;
pub mod warning;

pub use catalog::{Archetype, Catalog, DisasterKind, FloatRange};
pub use config::{ArchetypeOverride, EngineConfig, ParticleConfig, PerformanceConfig, SchedulerConfig, WarningConfig};
pub use effects::EffectSet;
pub use engine::WeatherEngine;
pub use error::{DisasterError, Result};
pub use instance::{DisasterInstance, InstanceId};
pub use performance::QualityTier;
pub use protection::{ItemId, ProtectionRule, ProtectionTable};
pub use scheduler::SchedulerSnapshot;
pub use services::{
    AudioService, EquipmentStore, NoticeCategory, NoticePriority, Notifier, RenderSurface, Services, SoundKind,
};
pub use warning::Severity;
