//! Active disaster registry.
//!
//! Owns every live [`DisasterInstance`]. Installs and reverts each
//! instance's start/stop-of-life effects, runs the per-archetype ongoing
//! effects (strikes, suction, exposure drain) and finalizes expired
//! instances in the same tick they expire.

use std::collections::HashMap;

use engine_core::{Combatant, PlayBounds, Player, Vec2};
use hecs::World;
use rand::rngs::StdRng;
use rand::Rng;

use crate::catalog::{ArchetypeExtra, DisasterKind};
use crate::effects::{combine, contribution, EffectSet, MAX_VISIBILITY_REDUCTION};
use crate::instance::{Bolt, DisasterInstance, InstanceId, InstanceState, PendingStrike, SubArea, BOLT_LIFETIME};
use crate::protection::ProtectionTable;
use crate::scheduler::SpawnPlan;
use crate::scoped::ScopedOverride;
use crate::services::{NoticeCategory, NoticePriority, Services, SoundKind};

/// Seconds between a strike being telegraphed and landing.
pub const STRIKE_FUSE: f32 = 1.0;
/// Energy per second lost inside a hazardous sub-area without a vent payload.
pub const DEFAULT_HAZARD_DRAIN: f32 = 3.0;
/// Progress at which the "weakening" notice is shown.
const WANING_PROGRESS: f32 = 0.8;

const WARNING_COLOR: [f32; 4] = [1.0, 0.85, 0.3, 1.0];
const FADE_COLOR: [f32; 4] = [0.7, 0.8, 0.7, 1.0];

// ── Special events ──────────────────────────────────────────────────────────

/// Everything a special-event hook may touch.
pub struct SpecialEventContext<'a> {
    pub instance: &'a mut DisasterInstance,
    pub services: &'a mut Services,
    pub bounds: &'a PlayBounds,
    pub rng: &'a mut StdRng,
}

/// Narrative sub-event fired at start-of-life. Runs before the instance's
/// effects are installed, so template changes take effect immediately.
pub type SpecialEventHook = Box<dyn Fn(&mut SpecialEventContext<'_>)>;

fn announce_special(ctx: &mut SpecialEventContext<'_>, text: &str) {
    let kind = ctx.instance.kind();
    ctx.services.notify(text, kind.color(), NoticeCategory::SpecialEvent, NoticePriority::High);
    ctx.services.play_one_shot(SoundKind::SpecialEvent);
    log::info!("{} special event: {}", kind.name(), text);
}

fn ground_point(bounds: &PlayBounds, rng: &mut StdRng) -> Vec2 {
    Vec2::new(rng.gen_range(0.0..=bounds.width), bounds.ground_y)
}

fn flash_flood(ctx: &mut SpecialEventContext<'_>) {
    ctx.instance.effects.movement *= 0.85;
    ctx.instance.effects.food_rate *= 1.2;
    let center = ground_point(ctx.bounds, ctx.rng);
    ctx.instance.sub_areas.push(SubArea { center, radius: 140.0, hazardous: false });
    announce_special(ctx, "Flash flood! The lowlands are under water");
}

fn supercell(ctx: &mut SpecialEventContext<'_>) {
    if let ArchetypeExtra::Lightning { interval, damage, .. } = &mut ctx.instance.effects.extra {
        *interval *= 0.5;
        *damage *= 1.25;
    }
    if let InstanceState::Lightning { strike_timer, .. } = &mut ctx.instance.state {
        *strike_timer *= 0.5;
    }
    announce_special(ctx, "Supercell forming! Lightning is intensifying");
}

fn whiteout(ctx: &mut SpecialEventContext<'_>) {
    let e = &mut ctx.instance.effects;
    e.visibility = (e.visibility + 0.2).min(MAX_VISIBILITY_REDUCTION);
    e.movement *= 0.9;
    announce_special(ctx, "Whiteout! You can barely see your hands");
}

fn dust_devil(ctx: &mut SpecialEventContext<'_>) {
    let center = ground_point(ctx.bounds, ctx.rng);
    ctx.instance.sub_areas.push(SubArea { center, radius: 70.0, hazardous: true });
    ctx.instance.effects.visibility = (ctx.instance.effects.visibility + 0.1).min(MAX_VISIBILITY_REDUCTION);
    announce_special(ctx, "A dust devil is tearing across the dunes");
}

fn debris_field(ctx: &mut SpecialEventContext<'_>) {
    let origin = ctx.instance.epicenter;
    for _ in 0..3 {
        let offset = ctx.rng.gen_range(-220.0..=220.0);
        let x = (origin.x + offset).clamp(0.0, ctx.bounds.width);
        ctx.instance.sub_areas.push(SubArea {
            center: Vec2::new(x, ctx.bounds.ground_y),
            radius: ctx.rng.gen_range(30.0..=55.0),
            hazardous: true,
        });
    }
    announce_special(ctx, "Debris field! Watch for flying wreckage");
}

fn heat_mirage(ctx: &mut SpecialEventContext<'_>) {
    let e = &mut ctx.instance.effects;
    e.visibility = (e.visibility + 0.1).min(MAX_VISIBILITY_REDUCTION);
    e.food_rate *= 0.8;
    announce_special(ctx, "Heat mirage! Nothing out there is what it seems");
}

fn lava_flow(ctx: &mut SpecialEventContext<'_>) {
    for _ in 0..2 {
        let center = ground_point(ctx.bounds, ctx.rng);
        ctx.instance.sub_areas.push(SubArea { center, radius: ctx.rng.gen_range(50.0..=90.0), hazardous: true });
    }
    announce_special(ctx, "Lava flow! Fresh magma is spreading");
}

/// Built-in hook per archetype.
pub fn standard_special_events() -> HashMap<DisasterKind, SpecialEventHook> {
    let mut hooks: HashMap<DisasterKind, SpecialEventHook> = HashMap::new();
    hooks.insert(DisasterKind::Rainstorm, Box::new(flash_flood));
    hooks.insert(DisasterKind::Thunderstorm, Box::new(supercell));
    hooks.insert(DisasterKind::Blizzard, Box::new(whiteout));
    hooks.insert(DisasterKind::Sandstorm, Box::new(dust_devil));
    hooks.insert(DisasterKind::Tornado, Box::new(debris_field));
    hooks.insert(DisasterKind::Heatwave, Box::new(heat_mirage));
    hooks.insert(DisasterKind::Eruption, Box::new(lava_flow));
    hooks
}

// ── Player helpers ──────────────────────────────────────────────────────────

fn player_position(world: &World) -> Option<Vec2> {
    world.query::<(&Combatant, &Player)>().iter().next().map(|(_, (c, _))| c.position)
}

fn player_speed(world: &mut World) -> Option<f32> {
    world.query_mut::<(&mut Combatant, &Player)>().into_iter().next().map(|(_, (c, _))| c.speed)
}

fn set_player_speed(world: &mut World, speed: f32) {
    for (_, (combatant, _)) in world.query_mut::<(&mut Combatant, &Player)>() {
        combatant.speed = speed;
    }
}

/// What the ongoing effects did to the player this tick.
#[derive(Debug, Default)]
struct PlayerImpact {
    drain: f32,
    pull: Vec2,
}

// ── Registry ────────────────────────────────────────────────────────────────

pub struct ActiveRegistry {
    instances: Vec<DisasterInstance>,
    next_id: u64,
    speed: ScopedOverride,
    volume: ScopedOverride,
    special_events: HashMap<DisasterKind, SpecialEventHook>,
    protection: ProtectionTable,
    bounds: PlayBounds,
    rng: StdRng,
}

impl ActiveRegistry {
    pub fn new(protection: ProtectionTable, bounds: PlayBounds, rng: StdRng) -> Self {
        Self {
            instances: Vec::new(),
            next_id: 1,
            speed: ScopedOverride::default(),
            volume: ScopedOverride::default(),
            special_events: standard_special_events(),
            protection,
            bounds,
            rng,
        }
    }

    /// Replace (or add) the special event for `kind`.
    pub fn register_special_event(&mut self, kind: DisasterKind, hook: SpecialEventHook) {
        self.special_events.insert(kind, hook);
    }

    pub fn remove_special_event(&mut self, kind: DisasterKind) {
        self.special_events.remove(&kind);
    }

    /// Create an instance from `plan` and install its effects immediately.
    pub fn spawn(&mut self, plan: SpawnPlan, world: &mut World, services: &mut Services) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;

        let epicenter = self.pick_epicenter(plan.kind, world);
        let mut instance =
            DisasterInstance::new(id, plan.kind, plan.intensity, plan.duration, plan.effects, plan.visuals, epicenter);
        instance.special_chance = plan.special_chance;
        if plan.kind == DisasterKind::Eruption {
            let radius = self.rng.gen_range(60.0..=100.0);
            instance.sub_areas.push(SubArea { center: epicenter, radius, hazardous: true });
        }
        self.instances.push(instance);
        self.apply_effects(id, world, services);
        id
    }

    fn pick_epicenter(&mut self, kind: DisasterKind, world: &World) -> Vec2 {
        let b = self.bounds;
        match kind {
            DisasterKind::Tornado => {
                // Spawn at an edge and let it wander in.
                let x = if self.rng.gen_bool(0.5) { b.width * 0.1 } else { b.width * 0.9 };
                Vec2::new(x, b.ground_y)
            }
            DisasterKind::Eruption => {
                let avoid = player_position(world).map(|p| p.x);
                let mut x = self.rng.gen_range(0.0..=b.width);
                if let Some(px) = avoid {
                    if (x - px).abs() < 150.0 {
                        x = (px + 300.0).rem_euclid(b.width.max(1.0));
                    }
                }
                Vec2::new(x, b.ground_y)
            }
            _ => b.center(),
        }
    }

    /// Install start-of-life effects. Returns `false` (and does nothing) if
    /// they are already installed or `id` is unknown.
    pub fn apply_effects(&mut self, id: InstanceId, world: &mut World, services: &mut Services) -> bool {
        let Self { instances, speed, volume, special_events, protection, bounds, rng, .. } = self;
        let Some(instance) = instances.iter_mut().find(|i| i.id() == id) else {
            return false;
        };
        if instance.effects_applied() {
            return false;
        }

        if !instance.flags.special_rolled {
            instance.flags.special_rolled = true;
            if rng.gen::<f32>() < instance.special_chance {
                if let Some(hook) = special_events.get(&instance.kind()) {
                    let mut ctx = SpecialEventContext { instance: &mut *instance, services: &mut *services, bounds, rng };
                    hook(&mut ctx);
                }
            }
        }

        let factor = protection.damping_factor(instance.kind(), |item| services.has_item(item));
        let movement = contribution(&instance.effects, instance.intensity(), factor).movement;
        if let Some(current) = player_speed(world) {
            if let Some(value) = speed.acquire(id, current, movement) {
                set_player_speed(world, value);
            }
        }
        if let (Some(scale), Some(current)) = (instance.visuals.volume_scale, services.master_volume()) {
            if let Some(value) = volume.acquire(id, current, scale) {
                services.set_master_volume(value);
            }
        }

        services.play_loop(instance.kind().ambience());
        if !instance.flags.start_announced {
            instance.flags.start_announced = true;
            let kind = instance.kind();
            services.notify(
                &format!("{} has begun! (intensity {:.1})", kind.name(), instance.intensity()),
                kind.color(),
                NoticeCategory::DisasterStart,
                NoticePriority::High,
            );
            log::info!(
                "{} started: intensity {:.2}, {:.0}s",
                kind.name(),
                instance.intensity(),
                instance.duration()
            );
        }
        instance.set_effects_applied(true);
        true
    }

    /// Revert stop-of-life effects. Returns `false` (and does nothing) if
    /// they are not installed or `id` is unknown.
    pub fn remove_effects(&mut self, id: InstanceId, world: &mut World, services: &mut Services) -> bool {
        let Some(instance) = self.instances.iter_mut().find(|i| i.id() == id) else {
            return false;
        };
        if !instance.effects_applied() {
            return false;
        }
        if let Some(value) = self.speed.release(id) {
            set_player_speed(world, value);
        }
        if let Some(value) = self.volume.release(id) {
            services.set_master_volume(value);
        }
        if !instance.flags.end_announced {
            instance.flags.end_announced = true;
            let kind = instance.kind();
            services.notify(
                &format!("The {} has passed", kind.name().to_lowercase()),
                FADE_COLOR,
                NoticeCategory::DisasterEnd,
                NoticePriority::Normal,
            );
            log::info!("{} ended after {:.1}s", kind.name(), instance.elapsed());
        }
        instance.set_effects_applied(false);
        true
    }

    /// Advance every instance, run ongoing effects and finalize the ones
    /// that expired. Returns the ids removed this tick.
    pub fn tick(&mut self, dt: f32, world: &mut World, services: &mut Services) -> Vec<InstanceId> {
        let dt = dt.max(0.0);
        let player = player_position(world);
        let mut impact = PlayerImpact::default();

        // Gear can change mid-instance; keep the installed speed in step with it.
        let mut movement = Vec::with_capacity(self.instances.len());
        {
            let Self { instances, protection, bounds, rng, .. } = self;
            for instance in instances.iter_mut() {
                instance.advance(dt);
                let factor = protection.damping_factor(instance.kind(), |item| services.has_item(item));
                if instance.effects_applied() {
                    movement.push((instance.id(), contribution(&instance.effects, instance.intensity(), factor).movement));
                }
                run_ongoing(instance, dt, factor, player, bounds, rng, services, &mut impact);

                if instance.progress() >= WANING_PROGRESS && !instance.flags.waning_announced {
                    instance.flags.waning_announced = true;
                    services.notify(
                        &format!("The {} is weakening", instance.kind().name().to_lowercase()),
                        FADE_COLOR,
                        NoticeCategory::DisasterEnd,
                        NoticePriority::Low,
                    );
                }
            }
        }

        let mut refreshed = None;
        for (id, factor) in movement {
            refreshed = self.speed.refresh(id, factor).or(refreshed);
        }
        if let Some(value) = refreshed {
            set_player_speed(world, value);
        }

        if player.is_some() && (impact.drain > 0.0 || impact.pull != Vec2::ZERO) {
            let area = self.bounds.area();
            for (_, (combatant, _)) in world.query_mut::<(&mut Combatant, &Player)>() {
                combatant.drain_energy(impact.drain);
                combatant.position = (combatant.position + impact.pull).clamp(area.min, area.max);
            }
        }

        let expired: Vec<InstanceId> = self.instances.iter().filter(|i| i.is_expired()).map(|i| i.id()).collect();
        for &id in &expired {
            self.remove_effects(id, world, services);
        }
        if !expired.is_empty() {
            self.instances.retain(|i| !i.is_expired());
            self.restart_ambience(services);
        }
        expired
    }

    /// Stop everything and start one loop per remaining instance.
    fn restart_ambience(&self, services: &mut Services) {
        services.stop_all_audio();
        for instance in self.instances.iter().filter(|i| i.effects_applied()) {
            services.play_loop(instance.kind().ambience());
        }
    }

    /// Terminate one instance mid-life. Returns `false` if `id` is unknown.
    pub fn end(&mut self, id: InstanceId, world: &mut World, services: &mut Services) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.remove_effects(id, world, services);
        self.instances.retain(|i| i.id() != id);
        self.restart_ambience(services);
        true
    }

    /// Terminate every instance synchronously, reverting all effects.
    pub fn end_all(&mut self, world: &mut World, services: &mut Services) -> Vec<InstanceId> {
        let ids: Vec<InstanceId> = self.instances.iter().map(|i| i.id()).collect();
        for &id in &ids {
            self.remove_effects(id, world, services);
        }
        self.instances.clear();
        if let Some(value) = self.speed.release_all() {
            set_player_speed(world, value);
        }
        if let Some(value) = self.volume.release_all() {
            services.set_master_volume(value);
        }
        services.stop_all_audio();
        ids
    }

    /// Composite multipliers over the active set, recomputed every call.
    pub fn combined_effects(&self, services: &Services) -> EffectSet {
        combine(self.instances.iter(), &self.protection, |item| services.has_item(item))
    }

    pub fn has_active(&self) -> bool {
        !self.instances.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DisasterInstance> {
        self.instances.iter()
    }

    pub fn get(&self, id: InstanceId) -> Option<&DisasterInstance> {
        self.instances.iter().find(|i| i.id() == id)
    }

    pub fn protection(&self) -> &ProtectionTable {
        &self.protection
    }
}

/// Per-archetype ongoing effects for one instance.
#[allow(clippy::too_many_arguments)]
fn run_ongoing(
    instance: &mut DisasterInstance,
    dt: f32,
    protection: f32,
    player: Option<Vec2>,
    bounds: &PlayBounds,
    rng: &mut StdRng,
    services: &mut Services,
    impact: &mut PlayerImpact,
) {
    let intensity = instance.intensity();
    let epicenter = instance.epicenter;
    let kind = instance.kind();

    let hazard_drain = match instance.effects.extra {
        ArchetypeExtra::Vent { damage_per_second } => damage_per_second,
        _ => DEFAULT_HAZARD_DRAIN,
    };
    if let Some(p) = player {
        if instance.sub_areas.iter().any(|a| a.hazardous && a.contains(p)) {
            impact.drain += hazard_drain * intensity * protection * dt;
        }
    }

    match (instance.effects.extra, &mut instance.state) {
        (ArchetypeExtra::Exposure { damage_per_second }, _) => {
            if player.is_some() {
                impact.drain += damage_per_second * intensity * protection * dt;
            }
        }
        (ArchetypeExtra::Vortex { suction_radius, suction_strength, wander_speed }, InstanceState::Vortex { velocity }) => {
            let jitter = Vec2::new(rng.gen_range(-1.0..=1.0), 0.0) * wander_speed * 2.0 * dt;
            *velocity = (*velocity + jitter).clamp_length_max(wander_speed);
            if velocity.x == 0.0 {
                velocity.x = if epicenter.x < bounds.width * 0.5 { wander_speed } else { -wander_speed };
            }
            let mut next = epicenter + *velocity * dt;
            if next.x <= 0.0 || next.x >= bounds.width {
                velocity.x = -velocity.x;
                next.x = next.x.clamp(0.0, bounds.width);
            }
            instance.epicenter = next;

            if let Some(p) = player {
                let to_center = next - p;
                let distance = to_center.length();
                if distance < suction_radius && distance > f32::EPSILON {
                    let falloff = 1.0 - distance / suction_radius;
                    let step = (suction_strength * intensity * protection * falloff * dt).min(distance);
                    impact.pull += to_center / distance * step;
                }
            }
        }
        (ArchetypeExtra::Lightning { interval, radius, damage }, InstanceState::Lightning { strike_timer, pending, bolt }) => {
            if let Some(b) = bolt {
                b.age += dt;
                if b.age >= BOLT_LIFETIME {
                    *bolt = None;
                }
            }
            if let Some(strike) = pending {
                strike.fuse -= dt;
                if strike.fuse <= 0.0 {
                    let target = strike.target;
                    *pending = None;
                    *bolt = Some(Bolt { points: bolt_path(target, rng), age: 0.0 });
                    services.play_one_shot(SoundKind::Thunderclap);
                    if let Some(p) = player {
                        if p.distance(target) <= radius {
                            let amount = damage * intensity * protection;
                            impact.drain += amount;
                            services.notify(
                                &format!("Struck by lightning! -{:.0} energy", amount),
                                kind.color(),
                                NoticeCategory::Strike,
                                NoticePriority::High,
                            );
                        }
                    }
                }
            } else {
                *strike_timer -= dt;
                if *strike_timer <= 0.0 {
                    *strike_timer += interval.max(0.1);
                    let anchor = player.unwrap_or(epicenter);
                    let offset = rng.gen_range(-radius * 1.5..=radius * 1.5);
                    let target = Vec2::new((anchor.x + offset).clamp(0.0, bounds.width), bounds.ground_y);
                    *pending = Some(PendingStrike { target, fuse: STRIKE_FUSE });
                    services.notify(
                        "Lightning incoming!",
                        WARNING_COLOR,
                        NoticeCategory::Strike,
                        NoticePriority::Normal,
                    );
                }
            }
        }
        _ => {}
    }
}

/// Jagged polyline from the top of the screen down to `target`.
fn bolt_path(target: Vec2, rng: &mut StdRng) -> Vec<Vec2> {
    const SEGMENTS: usize = 8;
    let mut points = Vec::with_capacity(SEGMENTS + 1);
    let start_x = target.x + rng.gen_range(-40.0..=40.0);
    for i in 0..=SEGMENTS {
        let t = i as f32 / SEGMENTS as f32;
        let x = start_x + (target.x - start_x) * t;
        let jag = if i == 0 || i == SEGMENTS { 0.0 } else { rng.gen_range(-18.0..=18.0) };
        points.push(Vec2::new(x + jag, target.y * t));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Archetype, Catalog};
    use crate::protection::ItemId;
    use crate::services::{AudioService, EquipmentStore, Notifier};
    use rand::SeedableRng;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        notices: Vec<(String, NoticeCategory)>,
        loops: Vec<SoundKind>,
        stops: usize,
        volume: f32,
    }

    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Recorder>>);

    impl Notifier for Shared {
        fn notify(&mut self, message: &str, _: [f32; 4], category: NoticeCategory, _: NoticePriority) -> anyhow::Result<()> {
            self.0.borrow_mut().notices.push((message.to_string(), category));
            Ok(())
        }
    }

    impl AudioService for Shared {
        fn play_loop(&mut self, kind: SoundKind) -> anyhow::Result<()> {
            self.0.borrow_mut().loops.push(kind);
            Ok(())
        }
        fn play_one_shot(&mut self, _: SoundKind) -> anyhow::Result<()> {
            Ok(())
        }
        fn stop_all(&mut self) -> anyhow::Result<()> {
            self.0.borrow_mut().stops += 1;
            Ok(())
        }
        fn master_volume(&self) -> f32 {
            self.0.borrow().volume
        }
        fn set_master_volume(&mut self, volume: f32) -> anyhow::Result<()> {
            self.0.borrow_mut().volume = volume;
            Ok(())
        }
    }

    fn setup() -> (ActiveRegistry, World, Services, Shared) {
        let catalog = Catalog::standard();
        let table = ProtectionTable::from_rules(ProtectionTable::standard_rules(), &catalog).unwrap();
        let registry = ActiveRegistry::new(table, PlayBounds::default(), StdRng::seed_from_u64(11));
        let mut world = World::new();
        world.spawn((Combatant::new(Vec2::new(640.0, 660.0), 137.5, 100.0), Player));
        let shared = Shared::default();
        shared.0.borrow_mut().volume = 0.8;
        let services = Services {
            notifier: Some(Box::new(shared.clone())),
            audio: Some(Box::new(shared.clone())),
            equipment: None,
        };
        (registry, world, services, shared)
    }

    fn plan(kind: DisasterKind, duration: f32) -> SpawnPlan {
        let a = Archetype::standard(kind);
        SpawnPlan {
            kind,
            intensity: 1.0,
            duration,
            effects: a.effects,
            visuals: a.visuals,
            special_chance: 0.0,
        }
    }

    fn speed(world: &World) -> f32 {
        world.query::<(&Combatant, &Player)>().iter().next().map(|(_, (c, _))| c.speed).unwrap()
    }

    #[test]
    fn speed_round_trips_after_expiry() {
        let (mut reg, mut world, mut services, _) = setup();
        reg.spawn(plan(DisasterKind::Blizzard, 2.0), &mut world, &mut services);
        assert!(speed(&world) < 137.5);
        for _ in 0..200 {
            reg.tick(1.0 / 60.0, &mut world, &mut services);
        }
        assert!(!reg.has_active());
        assert!((speed(&world) - 137.5).abs() < 1e-4);
    }

    #[test]
    fn overlapping_instances_restore_speed_in_any_order() {
        let (mut reg, mut world, mut services, _) = setup();
        reg.spawn(plan(DisasterKind::Sandstorm, 1.0), &mut world, &mut services);
        reg.spawn(plan(DisasterKind::Blizzard, 3.0), &mut world, &mut services);
        let both = speed(&world);
        for _ in 0..90 {
            reg.tick(1.0 / 60.0, &mut world, &mut services);
        }
        assert_eq!(reg.len(), 1);
        assert!(speed(&world) > both);
        for _ in 0..200 {
            reg.tick(1.0 / 60.0, &mut world, &mut services);
        }
        assert!((speed(&world) - 137.5).abs() < 1e-4);
    }

    #[test]
    fn speed_follows_gear_changed_mid_instance() {
        let (mut reg, mut world, mut services, _) = setup();
        reg.spawn(plan(DisasterKind::Blizzard, 10.0), &mut world, &mut services);
        let bare = speed(&world);
        assert!(bare < 137.5);

        let mut items = HashSet::new();
        items.insert(ItemId::from("winter_coat"));
        services.equipment = Some(Box::new(items) as Box<dyn EquipmentStore>);
        reg.tick(1.0 / 60.0, &mut world, &mut services);
        let covered = speed(&world);
        assert!(covered > bare);
        let expected = 137.5 * reg.combined_effects(&services).movement;
        assert!((covered - expected).abs() < 1e-3);

        services.equipment = None;
        reg.tick(1.0 / 60.0, &mut world, &mut services);
        assert!((speed(&world) - bare).abs() < 1e-4);

        for _ in 0..700 {
            reg.tick(1.0 / 60.0, &mut world, &mut services);
        }
        assert!(!reg.has_active());
        assert!((speed(&world) - 137.5).abs() < 1e-4);
    }

    #[test]
    fn apply_and_remove_are_idempotent() {
        let (mut reg, mut world, mut services, shared) = setup();
        let id = reg.spawn(plan(DisasterKind::Tornado, 10.0), &mut world, &mut services);
        let once = speed(&world);
        assert!(!reg.apply_effects(id, &mut world, &mut services));
        assert_eq!(speed(&world), once);
        assert!(reg.remove_effects(id, &mut world, &mut services));
        assert!(!reg.remove_effects(id, &mut world, &mut services));
        assert!((speed(&world) - 137.5).abs() < 1e-4);
        assert!((shared.0.borrow().volume - 0.8).abs() < 1e-6);
        assert!(!reg.remove_effects(InstanceId(999), &mut world, &mut services));
    }

    #[test]
    fn volume_is_scoped_and_restored_on_end_all() {
        let (mut reg, mut world, mut services, shared) = setup();
        reg.spawn(plan(DisasterKind::Thunderstorm, 30.0), &mut world, &mut services);
        reg.spawn(plan(DisasterKind::Tornado, 30.0), &mut world, &mut services);
        assert!((shared.0.borrow().volume - 0.8 * 1.25 * 0.8).abs() < 1e-5);
        reg.end_all(&mut world, &mut services);
        assert_eq!(shared.0.borrow().volume, 0.8);
        assert!(!reg.has_active());
        assert!((speed(&world) - 137.5).abs() < 1e-4);
    }

    #[test]
    fn start_and_end_are_announced_once() {
        let (mut reg, mut world, mut services, shared) = setup();
        let id = reg.spawn(plan(DisasterKind::Rainstorm, 0.5), &mut world, &mut services);
        reg.remove_effects(id, &mut world, &mut services);
        reg.apply_effects(id, &mut world, &mut services);
        for _ in 0..60 {
            reg.tick(1.0 / 60.0, &mut world, &mut services);
        }
        let log = shared.0.borrow();
        let starts = log.notices.iter().filter(|(_, c)| *c == NoticeCategory::DisasterStart).count();
        let ends = log.notices.iter().filter(|(m, _)| m.contains("has passed")).count();
        assert_eq!(starts, 1);
        assert_eq!(ends, 1);
        assert!(log.stops >= 1);
    }

    #[test]
    fn exposure_drains_energy_less_with_protection() {
        let (mut reg, mut world, mut services, _) = setup();
        reg.spawn(plan(DisasterKind::Sandstorm, 100.0), &mut world, &mut services);
        for _ in 0..600 {
            reg.tick(1.0 / 60.0, &mut world, &mut services);
        }
        let bare = world.query::<&Combatant>().iter().next().map(|(_, c)| c.energy).unwrap();

        let (mut reg, mut world, mut services, _) = setup();
        let mut items = HashSet::new();
        items.insert(ItemId::from("goggles"));
        services.equipment = Some(Box::new(items) as Box<dyn EquipmentStore>);
        reg.spawn(plan(DisasterKind::Sandstorm, 100.0), &mut world, &mut services);
        for _ in 0..600 {
            reg.tick(1.0 / 60.0, &mut world, &mut services);
        }
        let covered = world.query::<&Combatant>().iter().next().map(|(_, c)| c.energy).unwrap();
        assert!(bare < 100.0);
        assert!(covered > bare);
    }

    #[test]
    fn lightning_telegraphs_then_strikes() {
        let (mut reg, mut world, mut services, shared) = setup();
        reg.spawn(plan(DisasterKind::Thunderstorm, 60.0), &mut world, &mut services);
        let mut saw_bolt = false;
        for _ in 0..(60 * 12) {
            reg.tick(1.0 / 60.0, &mut world, &mut services);
            if let Some(InstanceState::Lightning { bolt: Some(_), .. }) = reg.iter().next().map(|i| &i.state) {
                saw_bolt = true;
            }
        }
        assert!(saw_bolt);
        assert!(shared.0.borrow().notices.iter().any(|(m, _)| m == "Lightning incoming!"));
    }

    #[test]
    fn tornado_pulls_player_toward_funnel() {
        let (mut reg, mut world, mut services, _) = setup();
        let id = reg.spawn(plan(DisasterKind::Tornado, 60.0), &mut world, &mut services);
        let funnel = reg.get(id).unwrap().epicenter;
        let start = Vec2::new((funnel.x + 100.0).min(1200.0), funnel.y);
        for (_, c) in world.query_mut::<&mut Combatant>() {
            c.position = start;
        }
        reg.tick(1.0 / 60.0, &mut world, &mut services);
        let funnel = reg.get(id).unwrap().epicenter;
        let end = world.query::<&Combatant>().iter().next().map(|(_, c)| c.position).unwrap();
        assert!(end.distance(funnel) < start.distance(funnel));
        assert!(funnel.x >= 0.0 && funnel.x <= PlayBounds::default().width);
    }

    #[test]
    fn special_event_hook_runs_once_when_chance_is_certain() {
        let (mut reg, mut world, mut services, _) = setup();
        let hits = Rc::new(RefCell::new(0));
        let seen = hits.clone();
        reg.register_special_event(
            DisasterKind::Heatwave,
            Box::new(move |ctx: &mut SpecialEventContext<'_>| {
                *seen.borrow_mut() += 1;
                ctx.instance.effects.movement = 0.5;
            }),
        );
        let mut p = plan(DisasterKind::Heatwave, 5.0);
        p.special_chance = 1.0;
        let id = reg.spawn(p, &mut world, &mut services);
        reg.remove_effects(id, &mut world, &mut services);
        reg.apply_effects(id, &mut world, &mut services);
        assert_eq!(*hits.borrow(), 1);
        assert_eq!(reg.get(id).unwrap().effects.movement, 0.5);
    }

    #[test]
    fn eruption_has_lava_pool() {
        let (mut reg, mut world, mut services, _) = setup();
        let id = reg.spawn(plan(DisasterKind::Eruption, 5.0), &mut world, &mut services);
        assert!(reg.get(id).unwrap().sub_areas.iter().any(|a| a.hazardous));
    }

    #[test]
    fn works_without_player_or_services() {
        let catalog = Catalog::standard();
        let table = ProtectionTable::from_rules(ProtectionTable::standard_rules(), &catalog).unwrap();
        let mut reg = ActiveRegistry::new(table, PlayBounds::default(), StdRng::seed_from_u64(1));
        let mut world = World::new();
        let mut services = Services::default();
        for kind in DisasterKind::ALL {
            reg.spawn(plan(kind, 1.0), &mut world, &mut services);
        }
        for _ in 0..120 {
            reg.tick(1.0 / 60.0, &mut world, &mut services);
        }
        assert!(reg.is_empty());
        assert_eq!(reg.combined_effects(&services), EffectSet::NEUTRAL);
    }
}
