//! Particle engine: one pool per live disaster instance.
//!
//! Pools are created when an instance appears and torn down the moment it
//! disappears; particles are never drained after their instance ends.
//! Spawn volume follows the quality tier, but particles already alive are
//! never culled for performance.

pub mod pool;
pub mod render;
pub mod rules;

use std::collections::{BTreeMap, VecDeque};

use engine_core::Aabb;
use glam::Vec2;
use noise::{NoiseFn, Perlin};
use rand::rngs::StdRng;
use rand::Rng;

pub use pool::{Particle, ParticlePool};
pub use rules::{Emitter, ImpactMark, MotionRule, ParticleProfile, Terminal};

use crate::catalog::DisasterKind;
use crate::config::ParticleConfig;
use crate::instance::{DisasterInstance, InstanceId};
use crate::performance::QualityTier;

/// Backoff factor when a pool is completely full.
const FULL_POOL_BACKOFF: f32 = 0.5;
/// How fast the gust noise field is sampled.
const WIND_FREQUENCY: f64 = 0.25;

/// Particles belonging to one instance.
#[derive(Debug, Clone)]
pub struct EmitterPool {
    pub kind: DisasterKind,
    pub profile: ParticleProfile,
    pub pool: ParticlePool,
    /// Fractional spawn count carried to the next tick.
    carry: f32,
}

impl EmitterPool {
    fn new(kind: DisasterKind, cap_scale: f32) -> Self {
        let profile = ParticleProfile::for_kind(kind);
        let cap = (profile.cap as f32 * cap_scale).round().max(0.0) as usize;
        Self { kind, profile, pool: ParticlePool::with_capacity(cap), carry: 0.0 }
    }

    /// `1.0` when empty, down to `0.5` when full.
    pub fn backoff(&self) -> f32 {
        1.0 - (1.0 - FULL_POOL_BACKOFF) * self.pool.fill_fraction()
    }
}

/// Per-tick counters, mostly for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParticleStats {
    pub spawned: usize,
    pub collided: usize,
    pub expired: usize,
    pub culled: usize,
}

pub struct ParticleEngine {
    config: ParticleConfig,
    pools: BTreeMap<InstanceId, EmitterPool>,
    marks: VecDeque<ImpactMark>,
    wind_noise: Perlin,
    wind_time: f64,
    wind: f32,
    last_stats: ParticleStats,
    rng: StdRng,
}

impl ParticleEngine {
    pub fn new(config: ParticleConfig, mut rng: StdRng) -> Self {
        let wind_noise = Perlin::new(rng.gen());
        let mark_cap = config.impact_mark_cap;
        Self {
            config,
            pools: BTreeMap::new(),
            marks: VecDeque::with_capacity(mark_cap),
            wind_noise,
            wind_time: 0.0,
            wind: 0.0,
            last_stats: ParticleStats::default(),
            rng,
        }
    }

    /// Create pools for new instances and tear down pools whose instance
    /// is gone.
    pub fn sync<'a>(&mut self, instances: impl IntoIterator<Item = &'a DisasterInstance>) {
        let live: BTreeMap<InstanceId, DisasterKind> = instances.into_iter().map(|i| (i.id(), i.kind())).collect();
        self.pools.retain(|id, _| live.contains_key(id));
        for (id, kind) in live {
            let cap_scale = self.config.cap_scale;
            self.pools.entry(id).or_insert_with(|| EmitterPool::new(kind, cap_scale));
        }
    }

    /// Tear down one instance's pool immediately.
    pub fn drop_pool(&mut self, id: InstanceId) {
        if let Some(pool) = self.pools.remove(&id) {
            log::debug!("dropped {} particles of {:?}", pool.pool.len(), pool.kind);
        }
    }

    /// Advance, collide, expire and spawn every pool.
    pub fn tick<'a>(
        &mut self,
        dt: f32,
        instances: impl IntoIterator<Item = &'a DisasterInstance>,
        obstacles: &[Aabb],
        tier: QualityTier,
    ) -> ParticleStats {
        let instances: Vec<&DisasterInstance> = instances.into_iter().collect();
        self.sync(instances.iter().copied());

        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.wind_time += dt as f64 * WIND_FREQUENCY;
        self.wind = self.wind_noise.get([self.wind_time, 0.5]) as f32 * 1.6;
        let wind = self.wind.clamp(-1.0, 1.0);

        let mut stats = ParticleStats::default();
        let bounds = self.config.bounds;
        let cull = bounds.cull_area();
        let quality = tier.multiplier();
        let per_tick_cap = (self.config.max_spawn_per_tick * quality).floor().max(0.0) as usize;
        let mark_cap = self.config.impact_mark_cap;

        let Self { pools, marks, rng, .. } = self;
        for instance in &instances {
            let Some(emitter) = pools.get_mut(&instance.id()) else {
                continue;
            };
            let center = instance.epicenter;
            let profile = emitter.profile;

            let mut doomed = Vec::new();
            for (idx, p) in emitter.pool.iter_mut() {
                profile.motion.step(p, dt, center, wind);
                if profile.terminal.collides() {
                    let hit_ground = p.position.y >= bounds.ground_y;
                    if hit_ground || obstacles.iter().any(|o| o.contains(p.position)) {
                        let at = if hit_ground { Vec2::new(p.position.x, bounds.ground_y) } else { p.position };
                        if let Some(mark) = profile.terminal.mark(at, p.size, p.color) {
                            marks.push_back(mark);
                        }
                        stats.collided += 1;
                        doomed.push(idx);
                        continue;
                    }
                }
                if p.is_dead() {
                    stats.expired += 1;
                    doomed.push(idx);
                } else if !cull.contains(p.position) {
                    stats.culled += 1;
                    doomed.push(idx);
                }
            }
            for idx in doomed {
                emitter.pool.remove(idx);
            }

            let wanted = profile.spawn_rate * dt * instance.intensity().max(0.0) * quality * emitter.backoff()
                + emitter.carry;
            let whole = wanted.floor().max(0.0);
            let room = emitter.pool.cap() - emitter.pool.len();
            let count = (whole as usize).min(per_tick_cap).min(room);
            emitter.carry = if count as f32 == whole { wanted - whole } else { 0.0 };
            for _ in 0..count {
                let particle = profile.spawn(rng, &bounds, center, wind, quality);
                if emitter.pool.insert(particle).is_none() {
                    break;
                }
                stats.spawned += 1;
            }
        }

        for mark in marks.iter_mut() {
            mark.age += dt;
        }
        marks.retain(|m| !m.is_dead());
        while marks.len() > mark_cap {
            marks.pop_front();
        }

        self.last_stats = stats;
        stats
    }

    /// Drop every pool and mark.
    pub fn clear(&mut self) {
        self.pools.clear();
        self.marks.clear();
    }

    pub fn live_count(&self) -> usize {
        self.pools.values().map(|p| p.pool.len()).sum()
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn pool(&self, id: InstanceId) -> Option<&EmitterPool> {
        self.pools.get(&id)
    }

    pub fn pools(&self) -> impl Iterator<Item = (&InstanceId, &EmitterPool)> {
        self.pools.iter()
    }

    pub fn marks(&self) -> impl Iterator<Item = &ImpactMark> {
        self.marks.iter()
    }

    /// Current gust strength, roughly `-1..=1`.
    pub fn wind(&self) -> f32 {
        self.wind
    }

    pub fn last_stats(&self) -> ParticleStats {
        self.last_stats
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    /// Insert a particle directly into an instance's pool.
    pub fn inject(&mut self, id: InstanceId, particle: Particle) -> Option<usize> {
        self.pools.get_mut(&id)?.pool.insert(particle)
    }
}
