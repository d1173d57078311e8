//! Frame timing for the fixed-step simulation loop.

use std::time::{Duration, Instant};

/// Longest frame the clock will accept before clamping. Anything above this
/// (debugger pause, window drag) would otherwise queue dozens of fixed steps.
const MAX_FRAME: Duration = Duration::from_millis(250);

/// Tracks frame durations and hands out fixed simulation steps.
///
/// Frames can come from the wall clock ([`FrameClock::update`]) or be fed
/// explicitly ([`FrameClock::advance`]) when running headless.
#[derive(Debug)]
pub struct FrameClock {
    /// Wall-clock instant of the previous `update` call.
    last_frame: Instant,
    /// Duration of the last frame (after clamping).
    delta: Duration,
    /// Total simulated time fed into the clock.
    elapsed: Duration,
    /// Frames seen since start.
    frame_count: u64,
    /// Fixed simulation step (default 60 Hz).
    fixed_timestep: Duration,
    /// Time not yet consumed by fixed steps.
    accumulator: Duration,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
            fixed_timestep: Duration::from_secs_f64(1.0 / 60.0),
            accumulator: Duration::ZERO,
        }
    }

    /// Create a clock stepping at `hz` fixed updates per second.
    pub fn with_fixed_rate(hz: f64) -> Self {
        let mut clock = Self::new();
        clock.set_fixed_rate(hz);
        clock
    }

    /// Sample the wall clock and feed the elapsed time as one frame.
    pub fn update(&mut self) {
        let now = Instant::now();
        let frame = now - self.last_frame;
        self.last_frame = now;
        self.advance(frame);
    }

    /// Feed one frame of the given duration.
    pub fn advance(&mut self, frame: Duration) {
        self.delta = frame.min(MAX_FRAME);
        self.elapsed += self.delta;
        self.frame_count += 1;
        self.accumulator += self.delta;
    }

    /// Duration of the last frame in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Total simulated time in seconds.
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn fixed_timestep_seconds(&self) -> f32 {
        self.fixed_timestep.as_secs_f32()
    }

    /// Consume one fixed step if enough time has accumulated.
    pub fn should_fixed_update(&mut self) -> bool {
        if self.accumulator >= self.fixed_timestep {
            self.accumulator -= self.fixed_timestep;
            true
        } else {
            false
        }
    }

    pub fn set_fixed_rate(&mut self, hz: f64) {
        let hz = if hz.is_finite() && hz > 0.0 { hz } else { 60.0 };
        self.fixed_timestep = Duration::from_secs_f64(1.0 / hz);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_accumulates_fixed_steps() {
        let mut clock = FrameClock::with_fixed_rate(10.0);
        clock.advance(Duration::from_millis(250));
        let mut steps = 0;
        while clock.should_fixed_update() {
            steps += 1;
        }
        assert_eq!(steps, 2);
        assert_eq!(clock.frame_count(), 1);
    }

    #[test]
    fn long_frames_are_clamped() {
        let mut clock = FrameClock::new();
        clock.advance(Duration::from_secs(5));
        assert!((clock.delta_seconds() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn invalid_rate_falls_back_to_sixty() {
        let mut clock = FrameClock::new();
        clock.set_fixed_rate(0.0);
        assert!((clock.fixed_timestep_seconds() - 1.0 / 60.0).abs() < 1e-6);
    }
}
