//! Game configuration (run length, frame pacing, loadout, weather). Loaded from config.ron at startup.

use disasters::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persistent game settings. Loaded from `config.ron` in the current directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Gameplay fixed-step rate (Hz).
    #[serde(default = "default_tick_rate")]
    pub tick_rate: f64,
    /// Simulated session length in seconds.
    #[serde(default = "default_run_seconds")]
    pub run_seconds: f32,
    /// Random +/- fraction applied to every simulated frame time.
    #[serde(default = "default_frame_jitter")]
    pub frame_jitter: f32,
    /// Chance per frame of a 100ms hitch.
    #[serde(default = "default_hitch_chance")]
    pub hitch_chance: f32,
    /// Sleep between frames so the run plays out in real time.
    #[serde(default)]
    pub realtime: bool,
    /// Seconds of game time between status lines.
    #[serde(default = "default_summary_interval")]
    pub summary_interval: f32,
    /// Combatant base speed (px/s).
    #[serde(default = "default_player_speed")]
    pub player_speed: f32,
    #[serde(default = "default_player_energy")]
    pub player_energy: f32,
    /// Item ids the combatant starts with.
    #[serde(default = "default_equipped")]
    pub equipped: Vec<String>,
    /// Obstacle boxes as `[min_x, min_y, max_x, max_y]`.
    #[serde(default = "default_obstacles")]
    pub obstacles: Vec<[f32; 4]>,
    /// Directory with ambience / one-shot sound files. `None` runs silent.
    #[serde(default = "default_sound_dir")]
    pub sound_dir: Option<PathBuf>,
    /// PNG written at the end of the run.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: Option<PathBuf>,
    /// Scheduler progress carried between runs.
    #[serde(default = "default_state_path")]
    pub state_path: Option<PathBuf>,
    #[serde(default)]
    pub weather: EngineConfig,
}

fn default_tick_rate() -> f64 {
    60.0
}
fn default_run_seconds() -> f32 {
    600.0
}
fn default_frame_jitter() -> f32 {
    0.15
}
fn default_hitch_chance() -> f32 {
    0.002
}
fn default_summary_interval() -> f32 {
    30.0
}
fn default_player_speed() -> f32 {
    140.0
}
fn default_player_energy() -> f32 {
    100.0
}
fn default_equipped() -> Vec<String> {
    vec!["umbrella".to_string()]
}
fn default_obstacles() -> Vec<[f32; 4]> {
    vec![[220.0, 560.0, 300.0, 660.0], [900.0, 600.0, 1040.0, 660.0]]
}
fn default_sound_dir() -> Option<PathBuf> {
    Some(PathBuf::from("assets/sounds"))
}
fn default_snapshot_path() -> Option<PathBuf> {
    Some(PathBuf::from("weather.png"))
}
fn default_state_path() -> Option<PathBuf> {
    Some(PathBuf::from("weather_state.ron"))
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate: default_tick_rate(),
            run_seconds: default_run_seconds(),
            frame_jitter: default_frame_jitter(),
            hitch_chance: default_hitch_chance(),
            realtime: false,
            summary_interval: default_summary_interval(),
            player_speed: default_player_speed(),
            player_energy: default_player_energy(),
            equipped: default_equipped(),
            obstacles: default_obstacles(),
            sound_dir: default_sound_dir(),
            snapshot_path: default_snapshot_path(),
            state_path: default_state_path(),
            weather: EngineConfig::default(),
        }
    }
}

impl GameConfig {
    /// Load config from `config.ron`. If the file is missing or invalid, returns default config.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            match ron::from_str(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }

    /// Save current config to `config.ron`. Logs on error.
    pub fn save(&self) {
        let path = config_path();
        if let Ok(s) = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            if let Err(e) = std::fs::write(&path, s) {
                log::warn!("Could not write config to {:?}: {}", path, e);
            }
        }
    }
}

pub fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("config.ron")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let c: GameConfig = ron::from_str("(run_seconds: 30.0, weather: (seed: Some(3)))").unwrap();
        assert_eq!(c.run_seconds, 30.0);
        assert_eq!(c.tick_rate, 60.0);
        assert_eq!(c.weather.seed, Some(3));
        assert_eq!(c.weather.scheduler.max_concurrent, 2);
    }

    #[test]
    fn default_round_trips_through_ron() {
        let s = ron::ser::to_string_pretty(&GameConfig::default(), ron::ser::PrettyConfig::default()).unwrap();
        let back: GameConfig = ron::from_str(&s).unwrap();
        assert_eq!(back.equipped, GameConfig::default().equipped);
        assert_eq!(back.obstacles.len(), 2);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let c = GameConfig::load_from(Path::new("/nonexistent/tempest/config.ron"));
        assert_eq!(c.summary_interval, 30.0);
    }
}
