//! Audio playback using Kira: looped ambience, one-shots and master volume.

use anyhow::Result;
use kira::{
    manager::{backend::DefaultBackend, AudioManager, AudioManagerSettings},
    sound::static_sound::{StaticSoundData, StaticSoundHandle, StaticSoundSettings},
    sound::PlaybackState,
    tween::Tween,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File extensions tried, in order, when loading a sound by name.
const EXTENSIONS: [&str; 3] = ["ogg", "wav", "mp3"];

/// First existing `dir/name.<ext>`, trying [`EXTENSIONS`] in order.
fn find_sound_file(dir: &Path, name: &str) -> Option<PathBuf> {
    EXTENSIONS.iter().map(|ext| dir.join(format!("{name}.{ext}"))).find(|p| p.exists())
}

/// Main audio system managing loaded sounds and playing handles.
pub struct AudioSystem {
    manager: AudioManager,
    sounds: HashMap<String, StaticSoundData>,
    active_sounds: Vec<StaticSoundHandle>,
    master_volume: f64,
}

impl AudioSystem {
    /// Create a new audio system on the default output device.
    pub fn new() -> Result<Self> {
        let manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())?;
        Ok(Self {
            manager,
            sounds: HashMap::new(),
            active_sounds: Vec::new(),
            master_volume: 1.0,
        })
    }

    /// Load a sound from a file.
    pub fn load_sound(&mut self, name: &str, path: &Path) -> Result<()> {
        let sound_data = StaticSoundData::from_file(path)?;
        self.sounds.insert(name.to_string(), sound_data);
        Ok(())
    }

    /// Load every `name` found in `dir` under any supported extension.
    /// Missing or undecodable files are logged and skipped. Returns how
    /// many sounds were loaded.
    pub fn load_dir(&mut self, dir: &Path, names: &[&str]) -> usize {
        let mut loaded = 0;
        for name in names {
            let Some(path) = find_sound_file(dir, name) else {
                log::warn!("No sound file for '{}' in {}", name, dir.display());
                continue;
            };
            match self.load_sound(name, &path) {
                Ok(()) => loaded += 1,
                Err(e) => log::warn!("Failed to load {}: {}", path.display(), e),
            }
        }
        loaded
    }

    /// Play a sound once. Unknown names are ignored.
    pub fn play(&mut self, name: &str) -> Result<()> {
        if let Some(sound_data) = self.sounds.get(name) {
            let handle = self.manager.play(sound_data.clone())?;
            self.active_sounds.push(handle);
        }
        Ok(())
    }

    /// Play a sound on repeat until [`AudioSystem::stop_all`].
    pub fn play_looped(&mut self, name: &str, volume: f64) -> Result<()> {
        if let Some(sound_data) = self.sounds.get(name) {
            let settings = StaticSoundSettings::new().volume(volume).loop_region(..);
            let modified = sound_data.clone().with_settings(settings);
            let handle = self.manager.play(modified)?;
            self.active_sounds.push(handle);
        }
        Ok(())
    }

    /// Clean up finished sounds.
    pub fn cleanup(&mut self) {
        self.active_sounds.retain(|handle| handle.state() != PlaybackState::Stopped);
    }

    /// Stop all sounds.
    pub fn stop_all(&mut self) {
        for handle in &mut self.active_sounds {
            let _ = handle.stop(Tween::default());
        }
        self.active_sounds.clear();
    }

    /// Set master volume (0.0 to 1.0, values above 1.0 amplify).
    pub fn set_master_volume(&mut self, volume: f64) {
        let volume = volume.max(0.0);
        self.master_volume = volume;
        let _ = self.manager.main_track().set_volume(volume, Tween::default());
    }

    pub fn master_volume(&self) -> f64 {
        self.master_volume
    }
}

// Re-export for convenience
pub use kira;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sound_files_resolve_by_extension_order() {
        let dir = std::env::temp_dir().join(format!("tempest-audio-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("thunderclap.wav"), b"").unwrap();
        std::fs::write(dir.join("thunderclap.mp3"), b"").unwrap();
        std::fs::write(dir.join("rain_loop.mp3"), b"").unwrap();

        assert_eq!(find_sound_file(&dir, "thunderclap"), Some(dir.join("thunderclap.wav")));
        assert_eq!(find_sound_file(&dir, "rain_loop"), Some(dir.join("rain_loop.mp3")));
        assert_eq!(find_sound_file(&dir, "wind_loop"), None);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
