//! Tempest - headless weather disaster simulation driver

mod canvas;
mod config;
mod loadout;
mod messages;
mod sound;

use anyhow::Result;
use disasters::{EffectSet, EngineConfig, SchedulerSnapshot, Services, WeatherEngine};
use engine_core::{Aabb, Combatant, FrameClock, Obstacle, Player};
use glam::Vec2;
use hecs::World;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use canvas::Canvas;
use config::GameConfig;
use loadout::{Loadout, SharedLoadout};
use messages::{GameMessages, MessageLog};
use sound::KiraAudio;

/// Energy per second the combatant burns walking, before weather multipliers.
const BASE_ENERGY_USE: f32 = 0.4;
/// Energy per second regained while no disaster is active.
const CALM_RECOVERY: f32 = 1.5;
const HITCH: Duration = Duration::from_millis(100);

/// Everything the gameplay fixed step needs.
struct Session {
    world: World,
    player: hecs::Entity,
    direction: f32,
}

impl Session {
    fn new(config: &GameConfig, weather: &EngineConfig) -> Self {
        let bounds = weather.particles.bounds;
        let mut world = World::new();
        let player = world.spawn((
            Combatant::new(Vec2::new(bounds.width * 0.5, bounds.ground_y), config.player_speed, config.player_energy),
            Player,
        ));
        for b in &config.obstacles {
            world.spawn((Obstacle::new(Aabb::new(Vec2::new(b[0], b[1]), Vec2::new(b[2], b[3]))),));
        }
        Self { world, player, direction: 1.0 }
    }

    /// Patrol back and forth across the play area.
    fn step(&mut self, dt: f32, width: f32, effects: &EffectSet, calm: bool) {
        let Ok(mut combatant) = self.world.get::<&mut Combatant>(self.player) else {
            return;
        };
        // Weather already scaled `speed`; `effects.movement` is for other readers.
        let step = combatant.speed * dt * self.direction;
        combatant.position.x += step;
        if combatant.position.x <= 0.0 || combatant.position.x >= width {
            combatant.position.x = combatant.position.x.clamp(0.0, width);
            self.direction = -self.direction;
        }
        let use_rate = BASE_ENERGY_USE * effects.energy;
        combatant.drain_energy(use_rate * dt);
        if calm {
            combatant.drain_energy(-CALM_RECOVERY * dt);
        }
    }

    fn combatant(&self) -> Option<Combatant> {
        self.world.get::<&Combatant>(self.player).ok().map(|c| *c)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = GameConfig::load();
    if !config::config_path().exists() {
        config.save();
    }
    log::info!("Starting Tempest - {:.0}s session at {:.0} Hz", config.run_seconds, config.tick_rate);

    let messages = MessageLog(Rc::new(RefCell::new(GameMessages::new())));
    let loadout = SharedLoadout(Rc::new(RefCell::new(Loadout::from_names(&config.equipped))));
    let gear: Vec<String> = loadout.0.borrow().items().map(|i| i.to_string()).collect();
    log::info!("Equipped: {}", if gear.is_empty() { "nothing".to_string() } else { gear.join(", ") });
    let audio = config.sound_dir.as_deref().and_then(|dir| match KiraAudio::open(dir) {
        Ok(a) => Some(a),
        Err(e) => {
            log::warn!("Audio unavailable ({}), running silent", e);
            None
        }
    });

    let services = Services {
        notifier: Some(Box::new(messages.clone())),
        audio: audio.map(|a| Box::new(a) as Box<dyn disasters::AudioService>),
        equipment: Some(Box::new(loadout.clone())),
    };
    let mut weather = WeatherEngine::new(config.weather.clone())?.with_services(services);
    if let Some(path) = &config.state_path {
        if let Some(snapshot) = load_state(path) {
            weather.restore(&snapshot);
            log::info!("Resumed weather at {:.0}s of game time", snapshot.game_time);
        }
    }

    let mut session = Session::new(&config, &config.weather);
    let width = config.weather.particles.bounds.width;
    let mut clock = FrameClock::with_fixed_rate(config.tick_rate);
    let mut jitter = StdRng::seed_from_u64(config.weather.seed.unwrap_or(0) ^ 0x5eed);
    let frame = 1.0 / config.tick_rate.max(1.0);
    let mut next_summary = config.summary_interval;

    while clock.elapsed_seconds() < config.run_seconds {
        let scale = 1.0 + jitter.gen_range(-1.0..=1.0) * config.frame_jitter as f64;
        let mut this_frame = Duration::from_secs_f64((frame * scale).max(0.0));
        if jitter.gen::<f32>() < config.hitch_chance {
            this_frame += HITCH;
        }
        clock.advance(this_frame);
        let dt = clock.delta_seconds();

        weather.tick(dt, &mut session.world);

        let effects = weather.combined_effects();
        let calm = !weather.has_active_disaster();
        while clock.should_fixed_update() {
            session.step(clock.fixed_timestep_seconds(), width, &effects, calm);
        }
        messages.0.borrow_mut().update(dt);

        if clock.elapsed_seconds() >= next_summary {
            next_summary += config.summary_interval;
            summary(&weather, &session, &messages);
        }
        if config.realtime {
            std::thread::sleep(this_frame);
        }
    }

    summary(&weather, &session, &messages);
    if let Some(path) = &config.snapshot_path {
        let bounds = config.weather.particles.bounds;
        let mut canvas = Canvas::new(bounds.width.max(1.0) as u32, bounds.height.max(1.0) as u32);
        canvas.backdrop(bounds.ground_y);
        weather.render(&mut canvas);
        match canvas.save(path) {
            Ok(()) => log::info!("Saved weather snapshot to {}", path.display()),
            Err(e) => log::warn!("Could not save snapshot to {}: {}", path.display(), e),
        }
    }
    if let Some(path) = &config.state_path {
        save_state(path, &weather.snapshot());
    }

    weather.reset(&mut session.world);
    if let Some(c) = session.combatant() {
        log::info!("Session over: speed {:.1}, energy {:.1}/{:.0}", c.speed, c.energy, c.max_energy);
    }
    log::info!("{} notifications shown", messages.0.borrow().total());
    Ok(())
}

fn summary(weather: &WeatherEngine, session: &Session, messages: &MessageLog) {
    let e = weather.combined_effects();
    let active: Vec<String> = weather
        .registry()
        .iter()
        .map(|i| format!("{} x{:.2} ({:.0}s left)", i.kind().name(), i.intensity(), i.remaining()))
        .collect();
    log::info!(
        "t={:.0}s | {} | move x{:.2} energy x{:.2} food x{:.2} vis -{:.0}% | {} fps ({}) | {} particles | ramp {}",
        weather.scheduler().game_time(),
        if active.is_empty() { "clear skies".to_string() } else { active.join(", ") },
        e.movement,
        e.energy,
        e.food_rate,
        e.visibility_reduction * 100.0,
        weather.performance().fps().round(),
        weather.quality_tier().name(),
        weather.particles().live_count(),
        weather.scheduler().ramp().level,
    );
    if let Some(c) = session.combatant() {
        log::info!("   combatant at x={:.0}, speed {:.1}, energy {:.1}", c.position.x, c.speed, c.energy);
    }
    if let Some(w) = weather.warnings().active() {
        log::info!("   forecast: {} {} in {:.0}s", w.severity.name(), w.predicted.name(), w.remaining());
    }
    if let Ok(shown) = messages.0.try_borrow() {
        for m in shown.visible().take(3) {
            log::debug!("   [{:?}] {}", m.category, m.text);
        }
    }
}

fn load_state(path: &Path) -> Option<SchedulerSnapshot> {
    let data = std::fs::read_to_string(path).ok()?;
    match ron::from_str(&data) {
        Ok(s) => Some(s),
        Err(e) => {
            log::warn!("Ignoring unreadable weather state at {:?}: {}", path, e);
            None
        }
    }
}

fn save_state(path: &Path, snapshot: &SchedulerSnapshot) {
    match ron::ser::to_string_pretty(snapshot, ron::ser::PrettyConfig::default()) {
        Ok(s) => {
            if let Err(e) = std::fs::write(path, s) {
                log::warn!("Could not write weather state to {:?}: {}", path, e);
            }
        }
        Err(e) => log::warn!("Could not serialize weather state: {}", e),
    }
}
