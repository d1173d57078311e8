//! `WeatherEngine`: the facade the game loop talks to.
//!
//! One call to [`WeatherEngine::tick`] drives every component in a fixed
//! order: performance monitor, registry (expiry first), warnings,
//! scheduler, particles.

use engine_core::Obstacle;
use hecs::World;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::catalog::{Catalog, DisasterKind};
use crate::config::EngineConfig;
use crate::effects::EffectSet;
use crate::error::Result;
use crate::instance::{InstanceId, InstanceState};
use crate::particles::{render, ParticleEngine};
use crate::performance::{PerformanceMonitor, QualityTier};
use crate::protection::ProtectionTable;
use crate::registry::{ActiveRegistry, SpecialEventHook};
use crate::scheduler::{DisasterScheduler, SchedulerSnapshot};
use crate::services::{NoticeCategory, NoticePriority, RenderSurface, Services, SoundKind};
use crate::warning::{Severity, WarningService};

/// How strongly the veil tints the screen at full visibility reduction.
const VEIL_STRENGTH: f32 = 0.85;
const BANNER_HEIGHT: f32 = 28.0;

pub struct WeatherEngine {
    config: EngineConfig,
    catalog: Catalog,
    scheduler: DisasterScheduler,
    registry: ActiveRegistry,
    warnings: WarningService,
    particles: ParticleEngine,
    performance: PerformanceMonitor,
    services: Services,
}

impl WeatherEngine {
    /// Build everything from `config`, failing fast on bad catalog or
    /// protection references.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let catalog = Catalog::from_config(&config)?;
        let rules = config.protection.clone().unwrap_or_else(ProtectionTable::standard_rules);
        let protection = ProtectionTable::from_rules(rules, &catalog)?;

        let mut root = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let scheduler = DisasterScheduler::new(config.scheduler.clone(), StdRng::seed_from_u64(root.gen()));
        let registry =
            ActiveRegistry::new(protection, config.particles.bounds, StdRng::seed_from_u64(root.gen()));
        let particles = ParticleEngine::new(config.particles.clone(), StdRng::seed_from_u64(root.gen()));
        let performance = PerformanceMonitor::new(config.performance.clone());

        log::info!(
            "Weather engine ready: {} archetypes, first disaster in {:.0}s",
            catalog.len(),
            scheduler.time_until_next()
        );
        Ok(Self {
            config,
            catalog,
            scheduler,
            registry,
            warnings: WarningService::new(),
            particles,
            performance,
            services: Services::default(),
        })
    }

    pub fn with_services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    /// Advance the whole subsystem by one frame.
    pub fn tick(&mut self, dt: f32, world: &mut World) {
        if let Some(tier) = self.performance.observe(dt) {
            log::info!("Visual quality -> {} ({:.0} fps)", tier.name(), self.performance.fps());
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        for id in self.registry.tick(dt, world, &mut self.services) {
            self.particles.drop_pool(id);
        }

        if let Some(fired) = self.warnings.tick(dt) {
            log::debug!("forecast for {:?} ({}) elapsed", fired.predicted, fired.severity.name());
        }
        self.maybe_forecast();

        if let Some(plan) = self.scheduler.tick(dt, self.registry.len(), &self.catalog) {
            self.registry.spawn(plan, world, &mut self.services);
        }

        let obstacles: Vec<_> = world.query::<&Obstacle>().iter().map(|(_, o)| o.bounds).collect();
        self.particles.tick(dt, self.registry.iter(), &obstacles, self.performance.tier());
    }

    /// Issue a forecast once the next spawn is within the lead time.
    fn maybe_forecast(&mut self) {
        let lead = self.config.warning.lead_time;
        if !self.config.warning.enabled
            || self.warnings.is_counting_down()
            || self.scheduler.time_until_next() > lead
            || self.registry.len() >= self.scheduler.config().max_concurrent
        {
            return;
        }
        if !self.scheduler.take_forecast_slot() {
            return;
        }
        let Some(predicted) = self.scheduler.forecast(&self.catalog) else {
            return;
        };
        let difficulty = self.catalog.get(predicted).map_or(1.0, |a| a.difficulty);
        let severity = Severity::from_difficulty(difficulty);
        let eta = self.scheduler.time_until_next();
        if self.warnings.try_issue(predicted, eta, severity, None) {
            let priority = if severity >= Severity::Severe { NoticePriority::High } else { NoticePriority::Normal };
            self.services.notify(
                &format!("{} WARNING: {} expected in {:.0}s", severity.name(), predicted.name(), eta),
                severity.color(),
                NoticeCategory::Warning,
                priority,
            );
            self.services.play_one_shot(SoundKind::WarningChime);
        }
    }

    /// Composite gameplay multipliers, recomputed from the active set.
    pub fn combined_effects(&self) -> EffectSet {
        self.registry.combined_effects(&self.services)
    }

    pub fn has_active_disaster(&self) -> bool {
        self.registry.has_active()
    }

    /// End every instance (reverting its effects), drop all particles and
    /// warnings, and start a fresh scheduler session.
    pub fn reset(&mut self, world: &mut World) {
        let ended = self.registry.end_all(world, &mut self.services);
        self.particles.clear();
        self.warnings.clear();
        self.scheduler.reset();
        log::info!("Weather reset ({} disasters ended)", ended.len());
    }

    /// Start a disaster now, bypassing the timer and concurrency cap.
    pub fn force_spawn(&mut self, kind: DisasterKind, world: &mut World) -> Result<InstanceId> {
        let archetype = self.catalog.require(kind)?;
        let plan = self.scheduler.plan(archetype);
        Ok(self.registry.spawn(plan, world, &mut self.services))
    }

    /// End one instance mid-life and drop its particles in the same call.
    pub fn end_instance(&mut self, id: InstanceId, world: &mut World) -> bool {
        let ended = self.registry.end(id, world, &mut self.services);
        self.particles.drop_pool(id);
        ended
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        self.scheduler.snapshot()
    }

    pub fn restore(&mut self, snapshot: &SchedulerSnapshot) {
        self.scheduler.restore(snapshot);
    }

    /// Draw the current frame: veil, hazard zones, particles, marks,
    /// lightning and the warning banner.
    pub fn render(&self, surface: &mut dyn RenderSurface) {
        let bounds = self.config.particles.bounds;
        let area = bounds.area();
        let tier = self.performance.tier();
        let effects = self.combined_effects();

        if effects.visibility_reduction > 0.0 {
            let tint = self.veil_tint();
            let alpha = effects.visibility_reduction * VEIL_STRENGTH;
            surface.linear_gradient(
                area.min,
                area.size(),
                [tint[0], tint[1], tint[2], alpha],
                [tint[0], tint[1], tint[2], alpha * 0.6],
            );
        }

        for instance in self.registry.iter() {
            for zone in &instance.sub_areas {
                let (inner, outer) = if zone.hazardous {
                    ([1.0, 0.35, 0.05, 0.7], [0.6, 0.1, 0.0, 0.0])
                } else {
                    ([0.3, 0.45, 0.8, 0.5], [0.3, 0.45, 0.8, 0.0])
                };
                surface.radial_gradient(zone.center, zone.radius, inner, outer);
            }
        }

        render::draw_marks(&self.particles, tier, surface);
        render::draw_particles(&self.particles, tier, surface);

        for instance in self.registry.iter() {
            if let InstanceState::Lightning { pending, bolt, .. } = &instance.state {
                if let Some(strike) = pending {
                    let pulse = 0.25 + 0.25 * (strike.fuse * 12.0).sin().abs();
                    surface.fill_circle(strike.target, 24.0, [1.0, 1.0, 0.4, pulse]);
                }
                if let Some(bolt) = bolt {
                    let alpha = (1.0 - bolt.age / crate::instance::BOLT_LIFETIME).clamp(0.0, 1.0);
                    if tier != QualityTier::Low {
                        surface.stroke_path(&bolt.points, 7.0, [0.7, 0.7, 1.0, alpha * 0.4]);
                    }
                    surface.stroke_path(&bolt.points, 2.5, [1.0, 1.0, 1.0, alpha]);
                }
            }
        }

        if let Some(warning) = self.warnings.active() {
            let color = warning.severity.color();
            surface.fill_rect(area.min, glam::Vec2::new(area.size().x, BANNER_HEIGHT), [color[0], color[1], color[2], 0.3]);
            let width = area.size().x * warning.progress();
            surface.fill_rect(
                glam::Vec2::new(area.min.x, area.min.y + BANNER_HEIGHT - 4.0),
                glam::Vec2::new(width, 4.0),
                color,
            );
        }
    }

    /// Veil colour: active instances' tints weighted by how much each hides.
    fn veil_tint(&self) -> [f32; 3] {
        let mut sum = [0.0_f32; 3];
        let mut weight = 0.0;
        for instance in self.registry.iter() {
            let w = instance.effects.visibility * instance.intensity();
            for (acc, c) in sum.iter_mut().zip(instance.visuals.veil) {
                *acc += c * w;
            }
            weight += w;
        }
        if weight > 0.0 {
            sum.map(|c| c / weight)
        } else {
            [0.5, 0.5, 0.5]
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn scheduler(&self) -> &DisasterScheduler {
        &self.scheduler
    }

    pub fn registry(&self) -> &ActiveRegistry {
        &self.registry
    }

    /// Install or replace the start-of-life hook for `kind`.
    pub fn register_special_event(&mut self, kind: DisasterKind, hook: SpecialEventHook) {
        self.registry.register_special_event(kind, hook);
    }

    pub fn remove_special_event(&mut self, kind: DisasterKind) {
        self.registry.remove_special_event(kind);
    }

    pub fn particles(&self) -> &ParticleEngine {
        &self.particles
    }

    pub fn performance(&self) -> &PerformanceMonitor {
        &self.performance
    }

    pub fn quality_tier(&self) -> QualityTier {
        self.performance.tier()
    }

    pub fn warnings(&self) -> &WarningService {
        &self.warnings
    }

    /// For callers that issue their own warnings (with callbacks).
    pub fn warnings_mut(&mut self) -> &mut WarningService {
        &mut self.warnings
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut Services {
        &mut self.services
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArchetypeOverride;
    use crate::error::DisasterError;
    use crate::protection::ProtectionRule;
    use engine_core::{Aabb, Combatant, Player, Vec2};

    fn seeded() -> EngineConfig {
        EngineConfig { seed: Some(7), ..Default::default() }
    }

    fn world() -> World {
        let mut world = World::new();
        world.spawn((Combatant::new(Vec2::new(640.0, 660.0), 150.0, 100.0), Player));
        world.spawn((Obstacle::new(Aabb::new(Vec2::new(300.0, 560.0), Vec2::new(380.0, 660.0))),));
        world
    }

    fn player_speed(world: &World) -> f32 {
        world.query::<(&Combatant, &Player)>().iter().next().map(|(_, (c, _))| c.speed).unwrap()
    }

    #[test]
    fn reset_clears_everything() {
        let mut engine = WeatherEngine::new(seeded()).unwrap();
        let mut world = world();
        engine.force_spawn(DisasterKind::Rainstorm, &mut world).unwrap();
        engine.force_spawn(DisasterKind::Tornado, &mut world).unwrap();
        for _ in 0..60 {
            engine.tick(1.0 / 60.0, &mut world);
        }
        assert!(engine.particles().live_count() > 0);
        engine.reset(&mut world);
        assert!(!engine.has_active_disaster());
        assert_eq!(engine.registry().len(), 0);
        assert_eq!(engine.particles().live_count(), 0);
        assert!(!engine.warnings().is_counting_down());
        assert_eq!(engine.combined_effects(), EffectSet::NEUTRAL);
        assert!((player_speed(&world) - 150.0).abs() < 1e-4);
    }

    #[test]
    fn long_session_spawns_and_restores_speed() {
        let mut engine = WeatherEngine::new(seeded()).unwrap();
        let mut world = world();
        let mut saw_active = false;
        for _ in 0..(60 * 60 * 4) {
            engine.tick(1.0 / 60.0, &mut world);
            saw_active |= engine.has_active_disaster();
            assert!(engine.registry().len() <= engine.config().scheduler.max_concurrent);
            let e = engine.combined_effects();
            assert!(e.movement > 0.0 && e.movement.is_finite());
            assert!(e.visibility_reduction <= 0.8);
        }
        assert!(saw_active);
        assert!(engine.warnings().issued_count() > 0);
        engine.reset(&mut world);
        assert!((player_speed(&world) - 150.0).abs() < 1e-3);
    }

    #[test]
    fn ending_instance_drops_its_particles() {
        let mut engine = WeatherEngine::new(seeded()).unwrap();
        let mut world = world();
        let id = engine.force_spawn(DisasterKind::Blizzard, &mut world).unwrap();
        for _ in 0..30 {
            engine.tick(1.0 / 60.0, &mut world);
        }
        assert!(engine.particles().pool(id).is_some());
        assert!(engine.particles().live_count() > 0);
        assert!(engine.end_instance(id, &mut world));
        assert!(engine.particles().pool(id).is_none());
        assert_eq!(engine.particles().live_count(), 0);
        assert!(!engine.has_active_disaster());
        assert!(!engine.end_instance(id, &mut world));
        assert!((player_speed(&world) - 150.0).abs() < 1e-4);
    }

    #[test]
    fn smallest_accepted_bounds_tick_every_kind() {
        let mut config = seeded();
        config.particles.bounds = engine_core::PlayBounds { width: 32.0, height: 8.0, ground_y: 4.0, margin: 0.0 };
        let mut engine = WeatherEngine::new(config).unwrap();
        let mut world = world();
        for kind in DisasterKind::ALL {
            engine.force_spawn(kind, &mut world).unwrap();
        }
        for _ in 0..120 {
            engine.tick(1.0 / 60.0, &mut world);
        }
        engine.reset(&mut world);
        assert_eq!(engine.particles().live_count(), 0);
    }

    #[test]
    fn override_for_disabled_kind_fails_fast() {
        let config = EngineConfig {
            disabled_kinds: vec![DisasterKind::Tornado],
            archetype_overrides: vec![ArchetypeOverride {
                kind: DisasterKind::Tornado,
                weight: Some(2.0),
                ..Default::default()
            }],
            ..seeded()
        };
        assert_eq!(WeatherEngine::new(config).err(), Some(DisasterError::MissingArchetype(DisasterKind::Tornado)));
    }

    #[test]
    fn protection_rule_for_disabled_kind_fails_fast() {
        let config = EngineConfig {
            disabled_kinds: vec![DisasterKind::Eruption],
            protection: Some(vec![ProtectionRule::new("heat_shield", &[DisasterKind::Eruption], 0.6)]),
            ..seeded()
        };
        assert!(matches!(WeatherEngine::new(config), Err(DisasterError::MissingArchetype(_))));
    }

    #[test]
    fn disabling_everything_is_rejected() {
        let config = EngineConfig { disabled_kinds: DisasterKind::ALL.to_vec(), ..seeded() };
        assert!(WeatherEngine::new(config).is_err());
    }

    #[test]
    fn snapshot_restores_progress() {
        let mut engine = WeatherEngine::new(seeded()).unwrap();
        let mut world = world();
        for _ in 0..600 {
            engine.tick(1.0 / 60.0, &mut world);
        }
        let snap = engine.snapshot();
        let mut fresh = WeatherEngine::new(EngineConfig { seed: Some(99), ..Default::default() }).unwrap();
        fresh.restore(&snap);
        assert!((fresh.scheduler().game_time() - snap.game_time).abs() < 1e-6);
        assert_eq!(fresh.particles().live_count(), 0);
    }

    #[test]
    fn same_seed_same_session() {
        let run = || {
            let mut engine = WeatherEngine::new(seeded()).unwrap();
            let mut world = world();
            let mut kinds = Vec::new();
            for _ in 0..(60 * 300) {
                engine.tick(1.0 / 60.0, &mut world);
                for i in engine.registry().iter() {
                    if !kinds.contains(&(i.id(), i.kind())) {
                        kinds.push((i.id(), i.kind()));
                    }
                }
            }
            kinds
        };
        assert_eq!(run(), run());
    }
}
