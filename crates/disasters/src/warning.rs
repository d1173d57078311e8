//! Forecast warnings.
//!
//! A warning counts down and then fires once. Only one may be outstanding;
//! its predicted archetype is drawn independently of the scheduler's real
//! pick, so a forecast can be wrong.

use crate::catalog::DisasterKind;

/// How bad the forecast looks, derived from the predicted archetype's difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
    Extreme,
}

impl Severity {
    pub fn from_difficulty(d: f32) -> Self {
        match d {
            d if d < 1.5 => Severity::Minor,
            d if d < 2.5 => Severity::Moderate,
            d if d < 3.5 => Severity::Severe,
            _ => Severity::Extreme,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Severity::Minor => "MINOR",
            Severity::Moderate => "MODERATE",
            Severity::Severe => "SEVERE",
            Severity::Extreme => "EXTREME",
        }
    }

    pub fn color(&self) -> [f32; 4] {
        match self {
            Severity::Minor => [0.6, 0.9, 1.0, 1.0],
            Severity::Moderate => [1.0, 1.0, 0.3, 1.0],
            Severity::Severe => [1.0, 0.6, 0.1, 1.0],
            Severity::Extreme => [1.0, 0.15, 0.1, 1.0],
        }
    }
}

/// Invoked once when a warning's countdown reaches zero.
pub type WarningCallback = Box<dyn FnOnce(&Warning)>;

pub struct Warning {
    pub predicted: DisasterKind,
    pub severity: Severity,
    remaining: f32,
    lead_time: f32,
    callback: Option<WarningCallback>,
}

impl std::fmt::Debug for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Warning")
            .field("predicted", &self.predicted)
            .field("severity", &self.severity)
            .field("remaining", &self.remaining)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl Warning {
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn lead_time(&self) -> f32 {
        self.lead_time
    }

    /// `0.0` when issued, `1.0` when about to fire.
    pub fn progress(&self) -> f32 {
        if self.lead_time > 0.0 {
            1.0 - (self.remaining / self.lead_time).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

/// What fired this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredWarning {
    pub predicted: DisasterKind,
    pub severity: Severity,
}

#[derive(Debug, Default)]
pub struct WarningService {
    active: Option<Warning>,
    issued: u64,
    fired: u64,
}

impl WarningService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a countdown. A no-op returning `false` while another warning
    /// is still counting down.
    pub fn try_issue(
        &mut self,
        predicted: DisasterKind,
        lead_time: f32,
        severity: Severity,
        callback: Option<WarningCallback>,
    ) -> bool {
        if self.is_counting_down() {
            return false;
        }
        let lead_time = if lead_time.is_finite() { lead_time.max(0.0) } else { 0.0 };
        self.active = Some(Warning { predicted, severity, remaining: lead_time, lead_time, callback });
        self.issued += 1;
        log::debug!("forecast issued: {:?} ({}) in {:.1}s", predicted, severity.name(), lead_time);
        true
    }

    /// Count down; fire and remove the warning when it reaches zero.
    pub fn tick(&mut self, dt: f32) -> Option<FiredWarning> {
        let warning = self.active.as_mut()?;
        warning.remaining -= dt.max(0.0);
        if warning.remaining > 0.0 {
            return None;
        }
        let mut warning = self.active.take()?;
        warning.remaining = 0.0;
        self.fired += 1;
        if let Some(cb) = warning.callback.take() {
            cb(&warning);
        }
        Some(FiredWarning { predicted: warning.predicted, severity: warning.severity })
    }

    pub fn active(&self) -> Option<&Warning> {
        self.active.as_ref()
    }

    pub fn is_counting_down(&self) -> bool {
        self.active.is_some()
    }

    /// Drop any outstanding warning without firing it.
    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn issued_count(&self) -> u64 {
        self.issued
    }

    pub fn fired_count(&self) -> u64 {
        self.fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn second_warning_is_rejected_while_counting_down() {
        let mut w = WarningService::new();
        assert!(w.try_issue(DisasterKind::Rainstorm, 5.0, Severity::Minor, None));
        w.tick(1.0);
        assert!(!w.try_issue(DisasterKind::Tornado, 5.0, Severity::Extreme, None));
        assert_eq!(w.active().map(|a| a.predicted), Some(DisasterKind::Rainstorm));
        assert_eq!(w.issued_count(), 1);
    }

    #[test]
    fn fires_once_and_invokes_callback() {
        let hits = Rc::new(Cell::new(0));
        let seen = hits.clone();
        let mut w = WarningService::new();
        w.try_issue(
            DisasterKind::Blizzard,
            2.0,
            Severity::Severe,
            Some(Box::new(move |warning: &Warning| {
                assert_eq!(warning.predicted, DisasterKind::Blizzard);
                seen.set(seen.get() + 1);
            })),
        );
        assert_eq!(w.tick(1.5), None);
        let fired = w.tick(0.5).unwrap();
        assert_eq!(fired.predicted, DisasterKind::Blizzard);
        assert_eq!(hits.get(), 1);
        assert_eq!(w.tick(1.0), None);
        assert_eq!(hits.get(), 1);
        assert!(!w.is_counting_down());
    }

    #[test]
    fn new_warning_allowed_after_fire() {
        let mut w = WarningService::new();
        w.try_issue(DisasterKind::Heatwave, 0.5, Severity::Minor, None);
        w.tick(1.0);
        assert!(w.try_issue(DisasterKind::Sandstorm, 3.0, Severity::Moderate, None));
    }

    #[test]
    fn clear_drops_without_firing() {
        let fired = Rc::new(Cell::new(false));
        let f = fired.clone();
        let mut w = WarningService::new();
        w.try_issue(DisasterKind::Eruption, 1.0, Severity::Extreme, Some(Box::new(move |_: &Warning| f.set(true))));
        w.clear();
        assert_eq!(w.tick(5.0), None);
        assert!(!fired.get());
    }

    #[test]
    fn severity_from_difficulty() {
        assert_eq!(Severity::from_difficulty(1.0), Severity::Minor);
        assert_eq!(Severity::from_difficulty(2.0), Severity::Moderate);
        assert_eq!(Severity::from_difficulty(3.0), Severity::Severe);
        assert_eq!(Severity::from_difficulty(4.0), Severity::Extreme);
    }
}
