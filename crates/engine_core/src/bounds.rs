//! 2D bounds used for play-area limits and obstacle collision.
//!
//! Screen-style coordinates: `x` grows right, `y` grows down, so the ground
//! plane sits at a large `y`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Build a box from any two corners.
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Grow the box by `margin` on every side.
    pub fn expanded(&self, margin: f32) -> Self {
        Self { min: self.min - Vec2::splat(margin), max: self.max + Vec2::splat(margin) }
    }
}

/// The visible play area plus the ground line particles land on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayBounds {
    pub width: f32,
    pub height: f32,
    /// `y` of the ground plane (inside `0..height`).
    pub ground_y: f32,
    /// How far outside the area a particle may travel before it is culled.
    pub margin: f32,
}

impl Default for PlayBounds {
    fn default() -> Self {
        Self { width: 1280.0, height: 720.0, ground_y: 660.0, margin: 64.0 }
    }
}

impl PlayBounds {
    pub fn area(&self) -> Aabb {
        Aabb::new(Vec2::ZERO, Vec2::new(self.width, self.height))
    }

    /// Play area grown by the cull margin.
    pub fn cull_area(&self) -> Aabb {
        self.area().expanded(self.margin)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.ground_y * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_new_orders_corners() {
        let b = Aabb::new(Vec2::new(10.0, 5.0), Vec2::new(0.0, 20.0));
        assert_eq!(b.min, Vec2::new(0.0, 5.0));
        assert_eq!(b.max, Vec2::new(10.0, 20.0));
    }

    #[test]
    fn aabb_contains_edges() {
        let b = Aabb::from_center(Vec2::ZERO, Vec2::splat(1.0));
        assert!(b.contains(Vec2::new(1.0, -1.0)));
        assert!(!b.contains(Vec2::new(1.01, 0.0)));
    }

    #[test]
    fn cull_area_includes_margin() {
        let bounds = PlayBounds::default();
        assert!(bounds.cull_area().contains(Vec2::new(-bounds.margin + 1.0, 0.0)));
        assert!(!bounds.area().contains(Vec2::new(-1.0, 0.0)));
    }
}
