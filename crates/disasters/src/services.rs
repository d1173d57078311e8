//! Collaborator interfaces: notifications, audio, equipment, drawing.
//!
//! All of these are optional. [`Services`] wraps the cosmetic ones so a
//! missing or failing collaborator is a silent no-op; the simulation never
//! depends on them succeeding.

use glam::Vec2;

use crate::protection::ItemId;

/// Sounds the subsystem asks for by name; the audio backend maps them to files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundKind {
    RainLoop,
    StormLoop,
    WindLoop,
    SandLoop,
    HeatLoop,
    RumbleLoop,
    Thunderclap,
    WarningChime,
    SpecialEvent,
}

impl SoundKind {
    /// File stem of the asset backing this sound.
    pub fn file_stem(&self) -> &'static str {
        match self {
            SoundKind::RainLoop => "rain_loop",
            SoundKind::StormLoop => "storm_loop",
            SoundKind::WindLoop => "wind_loop",
            SoundKind::SandLoop => "sand_loop",
            SoundKind::HeatLoop => "heat_loop",
            SoundKind::RumbleLoop => "rumble_loop",
            SoundKind::Thunderclap => "thunderclap",
            SoundKind::WarningChime => "warning_chime",
            SoundKind::SpecialEvent => "special_event",
        }
    }
}

/// What an on-screen message is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeCategory {
    DisasterStart,
    DisasterEnd,
    Warning,
    Strike,
    SpecialEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NoticePriority {
    Low,
    Normal,
    High,
}

/// On-screen notification / event log.
pub trait Notifier {
    fn notify(
        &mut self,
        message: &str,
        color: [f32; 4],
        category: NoticeCategory,
        priority: NoticePriority,
    ) -> anyhow::Result<()>;
}

/// Sound playback.
pub trait AudioService {
    fn play_loop(&mut self, kind: SoundKind) -> anyhow::Result<()>;
    fn play_one_shot(&mut self, kind: SoundKind) -> anyhow::Result<()>;
    fn stop_all(&mut self) -> anyhow::Result<()>;
    fn master_volume(&self) -> f32;
    fn set_master_volume(&mut self, volume: f32) -> anyhow::Result<()>;
}

/// Read-only view of what the combatant has equipped.
pub trait EquipmentStore {
    fn has_item(&self, id: &ItemId) -> bool;
}

impl EquipmentStore for std::collections::HashSet<ItemId> {
    fn has_item(&self, id: &ItemId) -> bool {
        self.contains(id)
    }
}

/// Immediate-mode 2D drawing target. Colours are straight RGBA in `0..=1`.
pub trait RenderSurface {
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: [f32; 4]);
    fn fill_rect(&mut self, min: Vec2, size: Vec2, color: [f32; 4]);
    fn radial_gradient(&mut self, center: Vec2, radius: f32, inner: [f32; 4], outer: [f32; 4]);
    /// Vertical gradient from `top` at `min.y` to `bottom` at `min.y + size.y`.
    fn linear_gradient(&mut self, min: Vec2, size: Vec2, top: [f32; 4], bottom: [f32; 4]);
    fn stroke_path(&mut self, points: &[Vec2], width: f32, color: [f32; 4]);
}

/// Guarded handles to the optional collaborators.
#[derive(Default)]
pub struct Services {
    pub notifier: Option<Box<dyn Notifier>>,
    pub audio: Option<Box<dyn AudioService>>,
    pub equipment: Option<Box<dyn EquipmentStore>>,
}

impl Services {
    pub fn notify(&mut self, message: &str, color: [f32; 4], category: NoticeCategory, priority: NoticePriority) {
        if let Some(n) = self.notifier.as_mut() {
            if let Err(e) = n.notify(message, color, category, priority) {
                log::debug!("notification dropped ({}): {}", message, e);
            }
        }
    }

    pub fn play_loop(&mut self, kind: SoundKind) {
        if let Some(a) = self.audio.as_mut() {
            if let Err(e) = a.play_loop(kind) {
                log::debug!("could not start {:?}: {}", kind, e);
            }
        }
    }

    pub fn play_one_shot(&mut self, kind: SoundKind) {
        if let Some(a) = self.audio.as_mut() {
            if let Err(e) = a.play_one_shot(kind) {
                log::debug!("could not play {:?}: {}", kind, e);
            }
        }
    }

    pub fn stop_all_audio(&mut self) {
        if let Some(a) = self.audio.as_mut() {
            if let Err(e) = a.stop_all() {
                log::debug!("could not stop audio: {}", e);
            }
        }
    }

    /// Current master volume, if an audio backend is present.
    pub fn master_volume(&self) -> Option<f32> {
        self.audio.as_ref().map(|a| a.master_volume())
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        if let Some(a) = self.audio.as_mut() {
            if let Err(e) = a.set_master_volume(volume) {
                log::debug!("could not set master volume: {}", e);
            }
        }
    }

    /// Absent equipment store means nothing is equipped.
    pub fn has_item(&self, id: &ItemId) -> bool {
        self.equipment.as_ref().is_some_and(|e| e.has_item(id))
    }
}
