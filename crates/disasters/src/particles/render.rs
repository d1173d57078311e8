//! Drawing particles and impact marks onto a [`RenderSurface`].
//!
//! Detail follows the quality tier: streaks and glows on high, plain
//! circles on medium, squares on low.

use glam::Vec2;

use super::pool::Particle;
use super::rules::{ImpactMark, MotionRule, Terminal};
use super::ParticleEngine;
use crate::performance::QualityTier;
use crate::services::RenderSurface;

/// Falling particles faster than this are drawn as streaks.
const STREAK_SPEED: f32 = 200.0;
const STREAK_SECONDS: f32 = 0.025;

fn with_alpha(color: [f32; 4], alpha: f32) -> [f32; 4] {
    [color[0], color[1], color[2], alpha.clamp(0.0, 1.0)]
}

/// Dull red when cold, yellow-white when hot.
pub fn thermal_color(temperature: f32, alpha: f32) -> [f32; 4] {
    let t = temperature.clamp(0.0, 1.0);
    [0.5 + 0.5 * t, 0.1 + 0.75 * t * t, 0.05 + 0.5 * t * t * t, alpha.clamp(0.0, 1.0)]
}

fn particle_color(p: &Particle, thermal: bool) -> [f32; 4] {
    let alpha = p.color[3] * (0.35 + 0.65 * p.life_fraction());
    if thermal {
        thermal_color(p.temperature, alpha)
    } else {
        with_alpha(p.color, alpha)
    }
}

pub fn draw_particles(engine: &ParticleEngine, tier: QualityTier, surface: &mut dyn RenderSurface) {
    for (_, emitter) in engine.pools() {
        let profile = &emitter.profile;
        let streaks = matches!(profile.motion, MotionRule::FreeFall { .. });
        for (_, p) in emitter.pool.iter() {
            let color = particle_color(p, profile.thermal);
            match tier {
                QualityTier::Low => {
                    let side = p.size.max(1.0);
                    surface.fill_rect(p.position - Vec2::splat(side * 0.5), Vec2::splat(side), color);
                }
                QualityTier::Medium | QualityTier::High if streaks && p.velocity.length() > STREAK_SPEED => {
                    let tail = p.position - p.velocity * STREAK_SECONDS;
                    surface.stroke_path(&[p.position, tail], p.size * 0.6, color);
                }
                QualityTier::High if profile.thermal => {
                    let glow = with_alpha(color, color[3] * 0.35);
                    surface.radial_gradient(p.position, p.size * 3.0, glow, with_alpha(color, 0.0));
                    surface.fill_circle(p.position, p.size, color);
                }
                QualityTier::Medium | QualityTier::High => {
                    surface.fill_circle(p.position, p.size, color);
                }
            }
        }
    }
}

pub fn draw_marks(engine: &ParticleEngine, tier: QualityTier, surface: &mut dyn RenderSurface) {
    for mark in engine.marks() {
        draw_mark(mark, tier, surface);
    }
}

fn draw_mark(mark: &ImpactMark, tier: QualityTier, surface: &mut dyn RenderSurface) {
    let alpha = mark.alpha();
    if alpha <= 0.0 {
        return;
    }
    let color = with_alpha(mark.color, alpha);
    let grow = 1.0 + mark.age / mark.lifetime.max(1.0e-3);
    match (mark.terminal, tier) {
        (_, QualityTier::Low) => {
            let size = Vec2::new(mark.radius * 2.0, mark.radius * 0.5);
            surface.fill_rect(mark.position - Vec2::new(mark.radius, size.y), size, color);
        }
        (Terminal::Splash, _) => {
            // Flattened ring of droplets.
            let r = mark.radius * grow;
            let points: Vec<Vec2> = (0..=6)
                .map(|i| {
                    let a = std::f32::consts::PI * i as f32 / 6.0;
                    mark.position + Vec2::new(-a.cos() * r, -a.sin() * r * 0.4)
                })
                .collect();
            surface.stroke_path(&points, 1.0, color);
        }
        (Terminal::EmberBurst, QualityTier::High) => {
            surface.radial_gradient(mark.position, mark.radius * grow, color, with_alpha(color, 0.0));
        }
        (Terminal::DustPuff, _) => {
            surface.radial_gradient(mark.position, mark.radius * grow, color, with_alpha(color, 0.0));
        }
        _ => surface.fill_circle(mark.position, mark.radius, color),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thermal_color_brightens_with_temperature() {
        let cold = thermal_color(0.0, 1.0);
        let hot = thermal_color(1.0, 1.0);
        assert!(hot[0] > cold[0] && hot[1] > cold[1] && hot[2] > cold[2]);
    }

    #[test]
    fn faded_mark_is_not_drawn() {
        struct Panic;
        impl RenderSurface for Panic {
            fn fill_circle(&mut self, _: Vec2, _: f32, _: [f32; 4]) {
                panic!("drawn")
            }
            fn fill_rect(&mut self, _: Vec2, _: Vec2, _: [f32; 4]) {
                panic!("drawn")
            }
            fn radial_gradient(&mut self, _: Vec2, _: f32, _: [f32; 4], _: [f32; 4]) {
                panic!("drawn")
            }
            fn linear_gradient(&mut self, _: Vec2, _: Vec2, _: [f32; 4], _: [f32; 4]) {
                panic!("drawn")
            }
            fn stroke_path(&mut self, _: &[Vec2], _: f32, _: [f32; 4]) {
                panic!("drawn")
            }
        }
        let mark = ImpactMark {
            position: Vec2::ZERO,
            radius: 3.0,
            age: 1.0,
            lifetime: 1.0,
            color: [1.0; 4],
            terminal: Terminal::Accumulate,
        };
        draw_mark(&mark, QualityTier::High, &mut Panic);
    }
}
