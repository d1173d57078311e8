//! Disaster scheduler: decides when the next disaster starts, which
//! archetype it is and how strong it gets.
//!
//! Difficulty escalates two ways. Per spawn, intensity is scaled by a linear
//! progress term and a super-linear curve of elapsed game time, and spawn
//! intervals shrink toward a floor. Session-wide, a ramp ticks on a fixed
//! cadence and widens intensity ranges, sharpens energy/visibility penalties
//! and makes special events more likely.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{Archetype, Catalog, DisasterKind, EffectTemplate, FloatRange, VisualHints, MIN_POSITIVE};
use crate::config::SchedulerConfig;
use crate::effects::{MAX_ENERGY_MULTIPLIER, MAX_VISIBILITY_REDUCTION};

// ── Ramp steps and caps ─────────────────────────────────────────────────────

const RAMP_WIDEN_STEP: f32 = 0.05;
const RAMP_WIDEN_MAX: f32 = 0.5;
const RAMP_ENERGY_STEP: f32 = 0.04;
const RAMP_ENERGY_MAX: f32 = 0.4;
const RAMP_VISIBILITY_STEP: f32 = 0.02;
const RAMP_VISIBILITY_MAX: f32 = 0.15;
const RAMP_SPECIAL_BASE: f32 = 0.15;
const RAMP_SPECIAL_STEP: f32 = 0.05;
const RAMP_SPECIAL_MAX: f32 = 0.6;

/// Individual caps on the two intensity scaling terms.
const MAX_PROGRESS_MULTIPLIER: f32 = 2.0;
const MAX_CURVE_MULTIPLIER: f32 = 2.0;
/// Archetypes with this rating follow the configured curve unchanged.
pub const REFERENCE_DIFFICULTY: f32 = 2.0;

/// Session-long difficulty ramp state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyRamp {
    pub level: u32,
    /// Fractional widening of every intensity range.
    pub intensity_widen: f32,
    /// Added to every energy multiplier.
    pub energy_sharpen: f32,
    /// Added to every visibility reduction.
    pub visibility_sharpen: f32,
    /// Chance that a starting disaster triggers its special event.
    pub special_event_chance: f32,
}

impl Default for DifficultyRamp {
    fn default() -> Self {
        Self {
            level: 0,
            intensity_widen: 0.0,
            energy_sharpen: 0.0,
            visibility_sharpen: 0.0,
            special_event_chance: RAMP_SPECIAL_BASE,
        }
    }
}

impl DifficultyRamp {
    pub fn step(&mut self) {
        self.level += 1;
        self.intensity_widen = (self.intensity_widen + RAMP_WIDEN_STEP).min(RAMP_WIDEN_MAX);
        self.energy_sharpen = (self.energy_sharpen + RAMP_ENERGY_STEP).min(RAMP_ENERGY_MAX);
        self.visibility_sharpen = (self.visibility_sharpen + RAMP_VISIBILITY_STEP).min(RAMP_VISIBILITY_MAX);
        self.special_event_chance = (self.special_event_chance + RAMP_SPECIAL_STEP).min(RAMP_SPECIAL_MAX);
    }

    /// Intensity range after widening: the top grows, the bottom sinks by
    /// half as much but stays positive.
    pub fn widen(&self, range: FloatRange) -> FloatRange {
        FloatRange::new(range.min * (1.0 - self.intensity_widen * 0.5), range.max * (1.0 + self.intensity_widen))
            .sanitized(MIN_POSITIVE)
    }

    /// Effect template with sharpened penalties.
    pub fn sharpen(&self, effects: &EffectTemplate) -> EffectTemplate {
        EffectTemplate {
            energy: (effects.energy + self.energy_sharpen).min(MAX_ENERGY_MULTIPLIER),
            visibility: (effects.visibility + self.visibility_sharpen).min(MAX_VISIBILITY_REDUCTION),
            ..*effects
        }
    }
}

/// Everything needed to create an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnPlan {
    pub kind: DisasterKind,
    pub intensity: f32,
    pub duration: f32,
    pub effects: EffectTemplate,
    pub visuals: VisualHints,
    pub special_chance: f32,
}

/// Minimal persisted scheduler state. Particles and warnings are not saved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    pub timer: f32,
    pub target_interval: f32,
    pub game_time: f32,
    pub ramp_timer: f32,
    pub ramp: DifficultyRamp,
}

/// Selection weight of `archetype` at `game_time`. Non-positive or
/// non-finite results mean "never pick".
pub fn effective_weight(archetype: &Archetype, game_time: f32, normalization: f32) -> f32 {
    if !archetype.is_selectable() {
        return 0.0;
    }
    let w = archetype.weight * (archetype.difficulty + game_time.max(0.0) / normalization);
    if w.is_finite() && w > 0.0 {
        w
    } else {
        0.0
    }
}

/// Weighted choice over `(kind, weight)` pairs; zero weights are skipped.
pub fn pick_weighted<R: Rng + ?Sized>(entries: &[(DisasterKind, f32)], rng: &mut R) -> Option<DisasterKind> {
    let usable: Vec<_> = entries.iter().filter(|(_, w)| w.is_finite() && *w > 0.0).collect();
    let dist = WeightedIndex::new(usable.iter().map(|(_, w)| *w)).ok()?;
    Some(usable[dist.sample(rng)].0)
}

/// Linear-in-time progress multiplier.
pub fn progress_multiplier(game_time: f32, config: &SchedulerConfig) -> f32 {
    (1.0 + config.progress_ratio * game_time.max(0.0) / config.progress_period).min(MAX_PROGRESS_MULTIPLIER)
}

/// Super-linear difficulty curve. Archetypes rated above
/// [`REFERENCE_DIFFICULTY`] climb it faster, easier ones slower.
pub fn difficulty_curve(game_time: f32, difficulty: f32, config: &SchedulerConfig) -> f32 {
    let t = game_time.max(0.0) / config.curve_period;
    let rating = if difficulty.is_finite() { difficulty.max(0.0) / REFERENCE_DIFFICULTY } else { 1.0 };
    let curve = 1.0 + config.curve_scale * rating * t.powf(config.curve_exponent);
    if curve.is_finite() {
        curve.min(MAX_CURVE_MULTIPLIER)
    } else {
        MAX_CURVE_MULTIPLIER
    }
}

/// `base × progress × curve`, clamped to `(0, 2 × configured_max]`.
pub fn scale_intensity(
    base: f32,
    configured_max: f32,
    difficulty: f32,
    game_time: f32,
    config: &SchedulerConfig,
) -> f32 {
    let ceiling = 2.0 * configured_max.max(MIN_POSITIVE);
    let scaled = base * progress_multiplier(game_time, config) * difficulty_curve(game_time, difficulty, config);
    if scaled.is_finite() {
        scaled.clamp(MIN_POSITIVE, ceiling)
    } else {
        ceiling
    }
}

/// Interval bounds at `game_time`, shrinking toward the floor.
pub fn interval_bounds(game_time: f32, config: &SchedulerConfig) -> FloatRange {
    let shrink = 1.0 / (1.0 + game_time.max(0.0) / config.interval_shrink_period);
    let [lo, hi] = config.initial_interval;
    let lo = (lo * shrink).max(config.interval_floor);
    let hi = (hi * shrink).max(lo);
    FloatRange::new(lo, hi)
}

pub struct DisasterScheduler {
    config: SchedulerConfig,
    timer: f32,
    target_interval: f32,
    game_time: f32,
    ramp_timer: f32,
    ramp: DifficultyRamp,
    /// Set once a forecast has been handed out for the current interval.
    forecast_taken: bool,
    rng: StdRng,
}

impl DisasterScheduler {
    pub fn new(config: SchedulerConfig, rng: StdRng) -> Self {
        let mut s = Self {
            config,
            timer: 0.0,
            target_interval: 0.0,
            game_time: 0.0,
            ramp_timer: 0.0,
            ramp: DifficultyRamp::default(),
            forecast_taken: false,
            rng,
        };
        s.reset();
        s
    }

    /// Fresh session: zero game time, base ramp, newly drawn interval.
    pub fn reset(&mut self) {
        self.game_time = 0.0;
        self.ramp_timer = 0.0;
        self.ramp = DifficultyRamp::default();
        self.restart_timer();
    }

    fn restart_timer(&mut self) {
        self.timer = 0.0;
        self.target_interval = interval_bounds(self.game_time, &self.config).sample(&mut self.rng);
        self.forecast_taken = false;
    }

    /// Advance timers. Returns a plan when a disaster should start now.
    pub fn tick(&mut self, dt: f32, active_count: usize, catalog: &Catalog) -> Option<SpawnPlan> {
        let dt = dt.max(0.0);
        self.game_time += dt;
        self.timer += dt;

        self.ramp_timer += dt;
        if self.ramp_timer >= self.config.ramp_interval {
            self.ramp_timer -= self.config.ramp_interval;
            self.ramp.step();
            log::info!(
                "Weather difficulty ramp -> level {} (special event chance {:.0}%)",
                self.ramp.level,
                self.ramp.special_event_chance * 100.0
            );
        }

        if self.timer < self.target_interval {
            return None;
        }
        self.restart_timer();

        if active_count >= self.config.max_concurrent {
            log::debug!("spawn skipped: {} disasters already active", active_count);
            return None;
        }
        let kind = self.pick(catalog)?;
        let archetype = catalog.get(kind)?;
        Some(self.plan(archetype))
    }

    /// Resolve a full spawn plan for `archetype` at the current game time.
    pub fn plan(&mut self, archetype: &Archetype) -> SpawnPlan {
        let base = self.ramp.widen(archetype.intensity).sample(&mut self.rng);
        SpawnPlan {
            kind: archetype.kind,
            intensity: scale_intensity(base, archetype.intensity.max, archetype.difficulty, self.game_time, &self.config),
            duration: archetype.duration.sample(&mut self.rng).max(MIN_POSITIVE),
            effects: self.ramp.sharpen(&archetype.effects),
            visuals: archetype.visuals,
            special_chance: self.ramp.special_event_chance,
        }
    }

    /// Weighted archetype pick for the next spawn.
    pub fn pick(&mut self, catalog: &Catalog) -> Option<DisasterKind> {
        let entries: Vec<_> = catalog
            .selectable()
            .map(|a| (a.kind, effective_weight(a, self.game_time, self.config.weight_normalization)))
            .collect();
        pick_weighted(&entries, &mut self.rng)
    }

    /// Independent draw for a forecast; may differ from what spawns.
    pub fn forecast(&mut self, catalog: &Catalog) -> Option<DisasterKind> {
        self.pick(catalog)
    }

    /// True the first time it is called in each interval.
    pub fn take_forecast_slot(&mut self) -> bool {
        !std::mem::replace(&mut self.forecast_taken, true)
    }

    pub fn time_until_next(&self) -> f32 {
        (self.target_interval - self.timer).max(0.0)
    }

    pub fn game_time(&self) -> f32 {
        self.game_time
    }

    pub fn target_interval(&self) -> f32 {
        self.target_interval
    }

    pub fn ramp(&self) -> &DifficultyRamp {
        &self.ramp
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            timer: self.timer,
            target_interval: self.target_interval,
            game_time: self.game_time,
            ramp_timer: self.ramp_timer,
            ramp: self.ramp,
        }
    }

    /// Restore persisted timers. Garbage values fall back to a fresh draw.
    pub fn restore(&mut self, snapshot: &SchedulerSnapshot) {
        let finite_pos = |v: f32| v.is_finite() && v >= 0.0;
        self.game_time = if finite_pos(snapshot.game_time) { snapshot.game_time } else { 0.0 };
        self.ramp = snapshot.ramp;
        self.ramp_timer = if finite_pos(snapshot.ramp_timer) { snapshot.ramp_timer } else { 0.0 };
        if finite_pos(snapshot.timer) && snapshot.target_interval.is_finite() && snapshot.target_interval > 0.0 {
            self.timer = snapshot.timer;
            self.target_interval = snapshot.target_interval;
            self.forecast_taken = false;
        } else {
            self.restart_timer();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn scheduler(seed: u64) -> DisasterScheduler {
        DisasterScheduler::new(SchedulerConfig::default(), StdRng::seed_from_u64(seed))
    }

    #[test]
    fn resolved_intensity_is_bounded_for_all_archetypes_and_times() {
        let config = SchedulerConfig::default();
        let catalog = Catalog::standard();
        let mut s = scheduler(3);
        for level in 0..20 {
            s.ramp.level = level;
            for t in [0.0_f32, 1.0, 60.0, 600.0, 3600.0, 36_000.0, 1.0e7] {
                s.game_time = t;
                for a in catalog.iter() {
                    let plan = s.plan(a);
                    assert!(plan.intensity > 0.0, "{:?} at {}", a.kind, t);
                    assert!(plan.intensity <= 2.0 * a.intensity.max + 1e-6, "{:?} at {}", a.kind, t);
                }
            }
            s.ramp.step();
        }
        assert!(scale_intensity(1.0, 1.0, 4.0, f32::INFINITY, &config) <= 2.0);
    }

    #[test]
    fn weighted_selection_matches_weights() {
        let entries = [
            (DisasterKind::Rainstorm, 1.0),
            (DisasterKind::Blizzard, 2.0),
            (DisasterKind::Tornado, 3.0),
            (DisasterKind::Eruption, 4.0),
        ];
        let total: f32 = entries.iter().map(|(_, w)| w).sum();
        let mut rng = StdRng::seed_from_u64(42);
        let runs = 100_000;
        let mut counts = std::collections::HashMap::new();
        for _ in 0..runs {
            *counts.entry(pick_weighted(&entries, &mut rng).unwrap()).or_insert(0u32) += 1;
        }
        for (kind, w) in entries {
            let freq = counts[&kind] as f32 / runs as f32;
            assert!((freq - w / total).abs() < 0.01, "{:?}: {} vs {}", kind, freq, w / total);
        }
    }

    #[test]
    fn zero_and_nan_weights_are_never_picked() {
        let entries = [(DisasterKind::Rainstorm, 0.0), (DisasterKind::Tornado, f32::NAN), (DisasterKind::Heatwave, 1.0)];
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..1000 {
            assert_eq!(pick_weighted(&entries, &mut rng), Some(DisasterKind::Heatwave));
        }
        assert_eq!(pick_weighted(&[(DisasterKind::Rainstorm, -1.0)], &mut rng), None);
    }

    #[test]
    fn effective_weight_grows_with_time() {
        let a = Archetype::standard(DisasterKind::Blizzard);
        let early = effective_weight(&a, 0.0, 300.0);
        let late = effective_weight(&a, 3000.0, 300.0);
        assert!((early - a.weight * a.difficulty).abs() < 1e-6);
        assert!(late > early);
    }

    #[test]
    fn curve_is_super_linear_and_progress_is_linear() {
        let c = SchedulerConfig::default();
        let p1 = progress_multiplier(100.0, &c) - 1.0;
        let p2 = progress_multiplier(200.0, &c) - 1.0;
        assert!((p2 - 2.0 * p1).abs() < 1e-5);
        let c1 = difficulty_curve(100.0, REFERENCE_DIFFICULTY, &c) - 1.0;
        let c2 = difficulty_curve(200.0, REFERENCE_DIFFICULTY, &c) - 1.0;
        assert!(c2 > 2.0 * c1);
    }

    #[test]
    fn harder_archetypes_scale_up_faster() {
        let c = SchedulerConfig::default();
        let t = c.curve_period * 0.5;
        let easy = difficulty_curve(t, 1.0, &c);
        let hard = difficulty_curve(t, 4.0, &c);
        assert!(hard > easy);
        assert_eq!(difficulty_curve(0.0, 4.0, &c), 1.0);
        assert!(scale_intensity(1.0, 2.0, 4.0, t, &c) > scale_intensity(1.0, 2.0, 1.0, t, &c));
    }

    #[test]
    fn intervals_shrink_to_floor() {
        let c = SchedulerConfig::default();
        let early = interval_bounds(0.0, &c);
        let mid = interval_bounds(600.0, &c);
        let late = interval_bounds(1.0e6, &c);
        assert_eq!(early, FloatRange::new(c.initial_interval[0], c.initial_interval[1]));
        assert!(mid.max < early.max);
        assert_eq!(late.min, c.interval_floor);
        assert_eq!(late.max, c.interval_floor);
    }

    #[test]
    fn spawns_when_timer_elapses_and_respects_cap() {
        let catalog = Catalog::standard();
        let mut s = scheduler(5);
        let wait = s.time_until_next();
        assert!(s.tick(wait * 0.5, 0, &catalog).is_none());
        let plan = s.tick(wait, 0, &catalog);
        assert!(plan.is_some());

        let wait = s.time_until_next();
        assert!(s.tick(wait + 0.01, SchedulerConfig::default().max_concurrent, &catalog).is_none());
        assert!(s.time_until_next() > 0.0);
    }

    #[test]
    fn ramp_steps_on_cadence() {
        let catalog = Catalog::standard();
        let mut s = scheduler(1);
        for _ in 0..(60 * 60 * 3 + 10) {
            s.tick(1.0 / 60.0, 99, &catalog);
        }
        assert_eq!(s.ramp().level, 3);
        assert!(s.ramp().special_event_chance > RAMP_SPECIAL_BASE);
    }

    #[test]
    fn ramp_sharpening_is_capped() {
        let mut ramp = DifficultyRamp::default();
        for _ in 0..1000 {
            ramp.step();
        }
        assert_eq!(ramp.intensity_widen, RAMP_WIDEN_MAX);
        assert_eq!(ramp.special_event_chance, RAMP_SPECIAL_MAX);
        let e = ramp.sharpen(&Archetype::standard(DisasterKind::Sandstorm).effects);
        assert!(e.visibility <= MAX_VISIBILITY_REDUCTION);
        assert!(e.energy <= MAX_ENERGY_MULTIPLIER);
    }

    #[test]
    fn forecast_slot_is_single_use_per_interval() {
        let catalog = Catalog::standard();
        let mut s = scheduler(2);
        assert!(s.take_forecast_slot());
        assert!(!s.take_forecast_slot());
        let wait = s.time_until_next();
        s.tick(wait + 0.01, 0, &catalog);
        assert!(s.take_forecast_slot());
    }

    #[test]
    fn snapshot_round_trip_and_garbage_restore() {
        let catalog = Catalog::standard();
        let mut s = scheduler(8);
        s.tick(3.0, 0, &catalog);
        let snap = s.snapshot();
        let mut other = scheduler(99);
        other.restore(&snap);
        assert_eq!(other.snapshot(), snap);

        other.restore(&SchedulerSnapshot { timer: f32::NAN, target_interval: -1.0, ..snap });
        assert!(other.target_interval() > 0.0);
    }
}
