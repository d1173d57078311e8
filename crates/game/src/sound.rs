//! Kira-backed `AudioService`.

use audio::AudioSystem;
use disasters::{AudioService, SoundKind};
use std::path::Path;

const ALL_SOUNDS: [SoundKind; 9] = [
    SoundKind::RainLoop,
    SoundKind::StormLoop,
    SoundKind::WindLoop,
    SoundKind::SandLoop,
    SoundKind::HeatLoop,
    SoundKind::RumbleLoop,
    SoundKind::Thunderclap,
    SoundKind::WarningChime,
    SoundKind::SpecialEvent,
];

/// Ambience loops play quieter than one-shots.
const LOOP_VOLUME: f64 = 0.6;

pub struct KiraAudio {
    system: AudioSystem,
}

impl KiraAudio {
    /// Open the output device and load whatever sound files exist in `dir`.
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        let mut system = AudioSystem::new()?;
        let names: Vec<&str> = ALL_SOUNDS.iter().map(|s| s.file_stem()).collect();
        let loaded = system.load_dir(dir, &names);
        log::info!("Audio ready: {}/{} sounds loaded from {}", loaded, names.len(), dir.display());
        Ok(Self { system })
    }
}

impl AudioService for KiraAudio {
    fn play_loop(&mut self, kind: SoundKind) -> anyhow::Result<()> {
        self.system.play_looped(kind.file_stem(), LOOP_VOLUME)
    }

    fn play_one_shot(&mut self, kind: SoundKind) -> anyhow::Result<()> {
        // One-shots pile up handles; drop the finished ones first.
        self.system.cleanup();
        self.system.play(kind.file_stem())
    }

    fn stop_all(&mut self) -> anyhow::Result<()> {
        self.system.stop_all();
        Ok(())
    }

    fn master_volume(&self) -> f32 {
        self.system.master_volume() as f32
    }

    fn set_master_volume(&mut self, volume: f32) -> anyhow::Result<()> {
        anyhow::ensure!(volume.is_finite(), "master volume {} is not finite", volume);
        self.system.set_master_volume(volume as f64);
        Ok(())
    }
}
