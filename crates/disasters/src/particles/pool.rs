//! Fixed-capacity particle arena with a free list.

use glam::Vec2;

/// One transient point effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: f32,
    pub age: f32,
    pub lifetime: f32,
    pub color: [f32; 4],
    /// `0..=1` for thermal effects (embers, heat shimmer); cools with age.
    pub temperature: f32,
    /// Orbit angle for spirals, sway phase for shimmer.
    pub phase: f32,
    /// Orbit radius for spirals.
    pub orbit: f32,
}

impl Particle {
    pub fn is_dead(&self) -> bool {
        self.age >= self.lifetime
    }

    /// `1.0` when fresh, `0.0` at end of life.
    pub fn life_fraction(&self) -> f32 {
        if self.lifetime > 0.0 {
            (1.0 - self.age / self.lifetime).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Slots are reused through a free list; the backing storage never grows
/// past `cap`.
#[derive(Debug, Clone)]
pub struct ParticlePool {
    slots: Vec<Option<Particle>>,
    free: Vec<usize>,
    live: usize,
    cap: usize,
}

impl ParticlePool {
    pub fn with_capacity(cap: usize) -> Self {
        Self { slots: Vec::with_capacity(cap), free: Vec::new(), live: 0, cap }
    }

    /// Store `particle`. Returns its slot, or `None` if the pool is full.
    pub fn insert(&mut self, particle: Particle) -> Option<usize> {
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = Some(particle);
            self.live += 1;
            return Some(idx);
        }
        if self.slots.len() < self.cap {
            self.slots.push(Some(particle));
            self.live += 1;
            return Some(self.slots.len() - 1);
        }
        None
    }

    pub fn remove(&mut self, idx: usize) -> Option<Particle> {
        let particle = self.slots.get_mut(idx)?.take()?;
        self.free.push(idx);
        self.live -= 1;
        Some(particle)
    }

    pub fn get(&self, idx: usize) -> Option<&Particle> {
        self.slots.get(idx)?.as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Particle)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| s.as_ref().map(|p| (i, p)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Particle)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, s)| s.as_mut().map(|p| (i, p)))
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn is_full(&self) -> bool {
        self.live >= self.cap
    }

    /// Live particles over capacity, `0..=1`.
    pub fn fill_fraction(&self) -> f32 {
        if self.cap == 0 {
            1.0
        } else {
            self.live as f32 / self.cap as f32
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }
}
