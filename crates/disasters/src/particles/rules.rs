//! Per-archetype particle behaviour: how a particle is born, how it moves
//! and what it leaves behind when it hits something.

use engine_core::PlayBounds;
use glam::Vec2;
use rand::Rng;

use super::pool::Particle;
use crate::catalog::{DisasterKind, FloatRange};

/// How a live particle moves each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionRule {
    /// Falls under gravity while drifting sideways with the wind.
    FreeFall { gravity: f32, drift: f32 },
    /// Orbits the owning instance's epicentre, tightening and rising.
    Spiral { inward_speed: f32, angular_speed: f32 },
    /// Thrown upward, pulled down by gravity; `viscosity` bleeds off
    /// horizontal speed over the particle's life.
    Ballistic { gravity: f32, viscosity: f32 },
    /// Blown horizontally across the screen.
    Gust { speed: f32 },
    /// Slow rising wobble.
    Shimmer { rise: f32, sway: f32 },
}

impl MotionRule {
    /// Advance one particle by `dt`. `wind` is roughly `-1..=1`.
    pub fn step(&self, p: &mut Particle, dt: f32, center: Vec2, wind: f32) {
        match *self {
            MotionRule::FreeFall { gravity, drift } => {
                p.velocity.y += gravity * dt;
                let target = wind * drift;
                p.velocity.x += (target - p.velocity.x) * (2.0 * dt).min(1.0);
                p.position += p.velocity * dt;
            }
            MotionRule::Spiral { inward_speed, angular_speed } => {
                p.orbit = (p.orbit - inward_speed * dt).max(4.0);
                p.phase += angular_speed * dt * (1.0 + 60.0 / p.orbit.max(1.0));
                p.position.x = center.x + p.phase.cos() * p.orbit;
                p.position.y += p.velocity.y * dt;
            }
            MotionRule::Ballistic { gravity, viscosity } => {
                p.velocity.y += gravity * dt;
                p.velocity.x *= (-viscosity * dt).exp();
                p.position += p.velocity * dt;
                p.temperature = p.life_fraction();
            }
            MotionRule::Gust { speed } => {
                let dir = if wind < 0.0 { -1.0 } else { 1.0 };
                p.velocity.x = dir * speed * (0.6 + 0.4 * wind.abs());
                p.velocity.y = (p.phase + p.age * 3.0).sin() * 20.0;
                p.position += p.velocity * dt;
            }
            MotionRule::Shimmer { rise, sway } => {
                p.position.y -= rise * dt;
                p.position.x += (p.phase + p.age * 2.0).sin() * sway * dt;
                p.temperature = p.life_fraction();
            }
        }
        p.age += dt;
    }
}

/// Visual left behind when a particle collides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Splash,
    Accumulate,
    EmberBurst,
    DustPuff,
    /// No collision at all; the particle simply fades.
    Vanish,
}

/// Short-lived decal drawn where a particle landed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactMark {
    pub position: Vec2,
    pub radius: f32,
    pub age: f32,
    pub lifetime: f32,
    pub color: [f32; 4],
    pub terminal: Terminal,
}

impl ImpactMark {
    pub fn is_dead(&self) -> bool {
        self.age >= self.lifetime
    }

    pub fn alpha(&self) -> f32 {
        if self.lifetime > 0.0 {
            self.color[3] * (1.0 - self.age / self.lifetime).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Terminal {
    pub fn collides(&self) -> bool {
        !matches!(self, Terminal::Vanish)
    }

    pub fn mark(&self, position: Vec2, size: f32, color: [f32; 4]) -> Option<ImpactMark> {
        let (radius, lifetime, color) = match self {
            Terminal::Splash => (size * 2.5, 0.25, [color[0], color[1], color[2], 0.6]),
            Terminal::Accumulate => (size * 1.5, 6.0, [0.95, 0.97, 1.0, 0.9]),
            Terminal::EmberBurst => (size * 3.0, 0.6, [1.0, 0.55, 0.15, 0.9]),
            Terminal::DustPuff => (size * 3.5, 0.5, [0.8, 0.68, 0.45, 0.5]),
            Terminal::Vanish => return None,
        };
        Some(ImpactMark { position, radius, age: 0.0, lifetime, color, terminal: *self })
    }
}

/// Where new particles appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emitter {
    /// Just above the top edge.
    Sky,
    /// Upwind screen edge, anywhere above ground.
    Edge,
    /// Around the epicentre.
    Epicenter,
    /// Anywhere in the air band above the ground.
    Air,
}

/// Everything the engine needs to run one archetype's particles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleProfile {
    pub motion: MotionRule,
    pub terminal: Terminal,
    pub emitter: Emitter,
    /// Particles per second at intensity 1 and high quality.
    pub spawn_rate: f32,
    pub cap: usize,
    pub size: FloatRange,
    pub lifetime: FloatRange,
    /// Initial speed along the emitter's main direction.
    pub speed: FloatRange,
    pub color: [f32; 4],
    pub thermal: bool,
}

impl ParticleProfile {
    pub fn for_kind(kind: DisasterKind) -> Self {
        match kind {
            DisasterKind::Rainstorm => Self {
                motion: MotionRule::FreeFall { gravity: 900.0, drift: 60.0 },
                terminal: Terminal::Splash,
                emitter: Emitter::Sky,
                spawn_rate: 220.0,
                cap: 600,
                size: FloatRange::new(1.5, 2.5),
                lifetime: FloatRange::new(1.5, 2.5),
                speed: FloatRange::new(450.0, 600.0),
                color: [0.55, 0.65, 0.95, 0.7],
                thermal: false,
            },
            DisasterKind::Thunderstorm => Self {
                motion: MotionRule::FreeFall { gravity: 1100.0, drift: 120.0 },
                terminal: Terminal::Splash,
                emitter: Emitter::Sky,
                spawn_rate: 260.0,
                cap: 700,
                size: FloatRange::new(1.5, 3.0),
                lifetime: FloatRange::new(1.2, 2.0),
                speed: FloatRange::new(550.0, 700.0),
                color: [0.5, 0.55, 0.8, 0.75],
                thermal: false,
            },
            DisasterKind::Blizzard => Self {
                motion: MotionRule::FreeFall { gravity: 60.0, drift: 80.0 },
                terminal: Terminal::Accumulate,
                emitter: Emitter::Sky,
                spawn_rate: 160.0,
                cap: 500,
                size: FloatRange::new(2.0, 4.0),
                lifetime: FloatRange::new(4.0, 7.0),
                speed: FloatRange::new(40.0, 80.0),
                color: [0.95, 0.97, 1.0, 0.9],
                thermal: false,
            },
            DisasterKind::Sandstorm => Self {
                motion: MotionRule::Gust { speed: 380.0 },
                terminal: Terminal::DustPuff,
                emitter: Emitter::Edge,
                spawn_rate: 200.0,
                cap: 500,
                size: FloatRange::new(1.0, 2.5),
                lifetime: FloatRange::new(2.0, 3.5),
                speed: FloatRange::new(300.0, 420.0),
                color: [0.85, 0.7, 0.45, 0.7],
                thermal: false,
            },
            DisasterKind::Tornado => Self {
                motion: MotionRule::Spiral { inward_speed: 25.0, angular_speed: 3.5 },
                terminal: Terminal::Vanish,
                emitter: Emitter::Epicenter,
                spawn_rate: 120.0,
                cap: 300,
                size: FloatRange::new(2.0, 4.5),
                lifetime: FloatRange::new(2.0, 4.0),
                speed: FloatRange::new(60.0, 140.0),
                color: [0.45, 0.45, 0.42, 0.8],
                thermal: false,
            },
            DisasterKind::Heatwave => Self {
                motion: MotionRule::Shimmer { rise: 30.0, sway: 12.0 },
                terminal: Terminal::Vanish,
                emitter: Emitter::Air,
                spawn_rate: 40.0,
                cap: 120,
                size: FloatRange::new(6.0, 14.0),
                lifetime: FloatRange::new(1.5, 3.0),
                speed: FloatRange::new(20.0, 40.0),
                color: [1.0, 0.6, 0.25, 0.25],
                thermal: true,
            },
            DisasterKind::Eruption => Self {
                motion: MotionRule::Ballistic { gravity: 500.0, viscosity: 1.2 },
                terminal: Terminal::EmberBurst,
                emitter: Emitter::Epicenter,
                spawn_rate: 90.0,
                cap: 300,
                size: FloatRange::new(2.0, 4.0),
                lifetime: FloatRange::new(1.5, 3.0),
                speed: FloatRange::new(350.0, 600.0),
                color: [1.0, 0.45, 0.1, 1.0],
                thermal: true,
            },
        }
    }

    /// A fresh particle. `size_scale` is the quality multiplier.
    pub fn spawn<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        bounds: &PlayBounds,
        center: Vec2,
        wind: f32,
        size_scale: f32,
    ) -> Particle {
        let speed = self.speed.sample(rng);
        let phase = rng.gen_range(0.0..std::f32::consts::TAU);
        let (position, velocity, orbit) = match self.emitter {
            Emitter::Sky => {
                // Spread upwind so drifting particles still cover the screen.
                let slack = bounds.margin * wind.abs();
                let x = rng.gen_range(-slack..=bounds.width + slack) - wind.signum() * slack * 0.5;
                (Vec2::new(x, -bounds.margin * 0.5), Vec2::new(0.0, speed), 0.0)
            }
            Emitter::Edge => {
                let x = if wind < 0.0 { bounds.width + bounds.margin * 0.5 } else { -bounds.margin * 0.5 };
                let y = rng.gen_range(0.0..=bounds.ground_y);
                (Vec2::new(x, y), Vec2::new(speed * wind.signum(), 0.0), 0.0)
            }
            Emitter::Epicenter => match self.motion {
                MotionRule::Spiral { .. } => {
                    let orbit = rng.gen_range(40.0..=160.0);
                    let y = center.y - rng.gen_range(0.0..=40.0);
                    (Vec2::new(center.x + phase.cos() * orbit, y), Vec2::new(0.0, -speed), orbit)
                }
                _ => {
                    let angle = rng.gen_range(-0.6..=0.6_f32);
                    let dir = Vec2::new(angle.sin(), -angle.cos());
                    (center - Vec2::new(0.0, 2.0), dir * speed, 0.0)
                }
            },
            Emitter::Air => {
                let x = rng.gen_range(0.0..=bounds.width);
                let y = rng.gen_range((bounds.ground_y - 220.0).max(0.0)..=bounds.ground_y - 4.0);
                (Vec2::new(x, y), Vec2::new(0.0, -speed), 0.0)
            }
        };
        Particle {
            position,
            velocity,
            size: self.size.sample(rng) * size_scale,
            age: 0.0,
            lifetime: self.lifetime.sample(rng),
            color: self.color,
            temperature: if self.thermal { 1.0 } else { 0.0 },
            phase,
            orbit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn ballistic_viscosity_damps_horizontal_speed() {
        let profile = ParticleProfile::for_kind(DisasterKind::Eruption);
        let mut rng = StdRng::seed_from_u64(4);
        let mut p = profile.spawn(&mut rng, &PlayBounds::default(), Vec2::new(640.0, 660.0), 0.0, 1.0);
        p.velocity = Vec2::new(100.0, -400.0);
        for _ in 0..60 {
            profile.motion.step(&mut p, 1.0 / 60.0, Vec2::ZERO, 0.0);
        }
        assert!(p.velocity.x < 100.0 * 0.35);
        assert!(p.velocity.y > -400.0);
        assert!(p.temperature < 1.0);
    }

    #[test]
    fn free_fall_moves_down() {
        let profile = ParticleProfile::for_kind(DisasterKind::Rainstorm);
        let mut rng = StdRng::seed_from_u64(5);
        let mut p = profile.spawn(&mut rng, &PlayBounds::default(), Vec2::ZERO, 0.5, 1.0);
        let y0 = p.position.y;
        profile.motion.step(&mut p, 0.1, Vec2::ZERO, 0.5);
        assert!(p.position.y > y0);
        assert!(p.velocity.x > 0.0);
    }

    #[test]
    fn spiral_tightens_around_center() {
        let profile = ParticleProfile::for_kind(DisasterKind::Tornado);
        let mut rng = StdRng::seed_from_u64(6);
        let center = Vec2::new(300.0, 660.0);
        let mut p = profile.spawn(&mut rng, &PlayBounds::default(), center, 0.0, 1.0);
        let r0 = p.orbit;
        for _ in 0..30 {
            profile.motion.step(&mut p, 1.0 / 60.0, center, 0.0);
        }
        assert!(p.orbit < r0);
        assert!((p.position.x - center.x).abs() <= p.orbit + 1e-3);
    }

    #[test]
    fn quality_scales_size() {
        let profile = ParticleProfile::for_kind(DisasterKind::Blizzard);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let p = profile.spawn(&mut rng, &PlayBounds::default(), Vec2::ZERO, 0.0, 0.5);
            assert!(p.size <= profile.size.max * 0.5 + 1e-6);
        }
    }

    #[test]
    fn vanish_leaves_no_mark() {
        assert!(Terminal::Vanish.mark(Vec2::ZERO, 1.0, [1.0; 4]).is_none());
        assert!(!Terminal::Vanish.collides());
        let mark = Terminal::Accumulate.mark(Vec2::ZERO, 2.0, [1.0; 4]).unwrap();
        assert!(mark.lifetime > 1.0);
    }
}
