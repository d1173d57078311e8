//! Frame-rate tracking and quality tier selection.
//!
//! The tier is only re-evaluated on a fixed cadence so a single slow frame
//! (asset hitch, GC in a plugin, window drag) cannot flip the visual quality.

use crate::config::PerformanceConfig;

/// Rendering fidelity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

impl QualityTier {
    /// Scales particle size and per-tick spawn cap.
    pub fn multiplier(&self) -> f32 {
        match self {
            QualityTier::High => 1.0,
            QualityTier::Medium => 0.75,
            QualityTier::Low => 0.5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QualityTier::High => "high",
            QualityTier::Medium => "medium",
            QualityTier::Low => "low",
        }
    }

    pub fn from_fps(fps: f32, config: &PerformanceConfig) -> Self {
        if fps < config.low_fps {
            QualityTier::Low
        } else if fps < config.medium_fps {
            QualityTier::Medium
        } else {
            QualityTier::High
        }
    }
}

/// Smoothed frame timing plus the current tier.
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    config: PerformanceConfig,
    last_frame: f32,
    smoothed_frame: f32,
    fps: f32,
    tier: QualityTier,
    frame_count: u64,
    since_check: f32,
}

impl PerformanceMonitor {
    pub fn new(config: PerformanceConfig) -> Self {
        let target = 1.0 / 60.0;
        Self {
            config,
            last_frame: target,
            smoothed_frame: target,
            fps: 60.0,
            tier: QualityTier::High,
            frame_count: 0,
            since_check: 0.0,
        }
    }

    /// Record one frame. Returns the new tier if this call crossed a check
    /// boundary and the tier changed.
    pub fn observe(&mut self, dt: f32) -> Option<QualityTier> {
        if !(dt.is_finite() && dt > 0.0) {
            return None;
        }
        self.last_frame = dt;
        let w = self.config.smoothing;
        self.smoothed_frame = self.smoothed_frame * w + dt * (1.0 - w);
        self.frame_count += 1;
        self.since_check += dt;

        if self.since_check < self.config.check_interval {
            return None;
        }
        self.since_check = 0.0;
        self.fps = 1.0 / self.smoothed_frame.max(1.0e-4);
        let tier = QualityTier::from_fps(self.fps, &self.config);
        if tier == self.tier {
            return None;
        }
        log::debug!("quality tier {} -> {} ({:.1} fps)", self.tier.name(), tier.name(), self.fps);
        self.tier = tier;
        Some(tier)
    }

    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    /// FPS as of the last periodic check.
    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn smoothed_frame_time(&self) -> f32 {
        self.smoothed_frame
    }

    pub fn last_frame_time(&self) -> f32 {
        self.last_frame
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
