//! Scoped overrides of externally owned scalars (combatant speed, master volume).
//!
//! The first holder saves the original value. Every change recomputes the
//! installed value from that original instead of patching the current one,
//! and the last release hands back the original exactly.

use crate::instance::InstanceId;

#[derive(Debug, Clone, Default)]
pub struct ScopedOverride {
    original: Option<f32>,
    holders: Vec<(InstanceId, f32)>,
}

impl ScopedOverride {
    /// Register `id` as scaling the value by `factor`. `current` is only read
    /// when there is no holder yet. Returns the value to install, or `None`
    /// if `id` already holds the override.
    pub fn acquire(&mut self, id: InstanceId, current: f32, factor: f32) -> Option<f32> {
        if self.is_held_by(id) {
            return None;
        }
        if self.original.is_none() {
            self.original = Some(current);
        }
        let factor = if factor.is_finite() { factor } else { 1.0 };
        self.holders.push((id, factor));
        Some(self.value())
    }

    /// Change the factor `id` scales by. Returns the value to install, or
    /// `None` if `id` is not a holder or its factor did not change.
    pub fn refresh(&mut self, id: InstanceId, factor: f32) -> Option<f32> {
        let factor = if factor.is_finite() { factor } else { 1.0 };
        let holder = self.holders.iter_mut().find(|(h, _)| *h == id)?;
        if holder.1 == factor {
            return None;
        }
        holder.1 = factor;
        Some(self.value())
    }

    /// Drop `id`'s contribution. Returns the value to install, or `None`
    /// if `id` was not holding the override.
    pub fn release(&mut self, id: InstanceId) -> Option<f32> {
        let idx = self.holders.iter().position(|(h, _)| *h == id)?;
        self.holders.remove(idx);
        if self.holders.is_empty() {
            self.original.take()
        } else {
            Some(self.value())
        }
    }

    /// Drop every holder. Returns the original if anything was held.
    pub fn release_all(&mut self) -> Option<f32> {
        self.holders.clear();
        self.original.take()
    }

    pub fn is_held_by(&self, id: InstanceId) -> bool {
        self.holders.iter().any(|(h, _)| *h == id)
    }

    pub fn is_active(&self) -> bool {
        !self.holders.is_empty()
    }

    pub fn original(&self) -> Option<f32> {
        self.original
    }

    fn value(&self) -> f32 {
        let base = self.original.unwrap_or(0.0);
        self.holders.iter().fold(base, |v, (_, f)| v * f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_rescales_from_original() {
        let mut o = ScopedOverride::default();
        o.acquire(InstanceId(1), 100.0, 0.5);
        assert_eq!(o.refresh(InstanceId(1), 0.5), None);
        assert_eq!(o.refresh(InstanceId(2), 0.9), None);
        assert!((o.refresh(InstanceId(1), 0.8).unwrap() - 80.0).abs() < 1e-4);
        assert_eq!(o.release(InstanceId(1)), Some(100.0));
    }

    #[test]
    fn single_holder_round_trip_is_exact() {
        let mut o = ScopedOverride::default();
        let speed = 137.3_f32;
        let installed = o.acquire(InstanceId(1), speed, 0.73).unwrap();
        assert!((installed - speed * 0.73).abs() < 1e-4);
        assert_eq!(o.release(InstanceId(1)), Some(speed));
        assert!(!o.is_active());
    }

    #[test]
    fn overlapping_holders_release_in_any_order() {
        let mut o = ScopedOverride::default();
        o.acquire(InstanceId(1), 100.0, 0.5);
        assert_eq!(o.acquire(InstanceId(2), 50.0, 0.8), Some(40.0));
        assert_eq!(o.release(InstanceId(1)), Some(80.0));
        assert_eq!(o.release(InstanceId(2)), Some(100.0));
    }

    #[test]
    fn double_acquire_and_double_release_are_no_ops() {
        let mut o = ScopedOverride::default();
        assert!(o.acquire(InstanceId(7), 10.0, 0.5).is_some());
        assert!(o.acquire(InstanceId(7), 5.0, 0.5).is_none());
        assert_eq!(o.release(InstanceId(7)), Some(10.0));
        assert_eq!(o.release(InstanceId(7)), None);
    }

    #[test]
    fn release_all_restores_original() {
        let mut o = ScopedOverride::default();
        o.acquire(InstanceId(1), 1.0, 1.25);
        o.acquire(InstanceId(2), 1.25, 0.8);
        assert_eq!(o.release_all(), Some(1.0));
        assert_eq!(o.release_all(), None);
    }
}
