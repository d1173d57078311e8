//! Software `RenderSurface` backed by an RGBA image, for PNG snapshots.

use disasters::RenderSurface;
use glam::Vec2;
use image::{Rgba, RgbaImage};
use std::path::Path;

pub struct Canvas {
    image: RgbaImage,
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn lerp_color(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    let t = t.clamp(0.0, 1.0);
    [0, 1, 2, 3].map(|i| a[i] + (b[i] - a[i]) * t)
}

/// Distance from `p` to segment `a..b`.
fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { image: RgbaImage::new(width, height) }
    }

    pub fn clear(&mut self, color: [f32; 4]) {
        let px = Rgba(color.map(to_u8));
        for p in self.image.pixels_mut() {
            *p = px;
        }
    }

    /// Sky above `ground_y`, earth below.
    pub fn backdrop(&mut self, ground_y: f32) {
        let size = Vec2::new(self.image.width() as f32, self.image.height() as f32);
        self.linear_gradient(Vec2::ZERO, Vec2::new(size.x, ground_y), [0.45, 0.62, 0.85, 1.0], [0.78, 0.86, 0.92, 1.0]);
        self.fill_rect(Vec2::new(0.0, ground_y), Vec2::new(size.x, size.y - ground_y), [0.36, 0.3, 0.22, 1.0]);
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        self.image.save(path)?;
        Ok(())
    }

    /// Alpha-blend `color` over the pixel at `(x, y)`; out-of-range is ignored.
    fn blend(&mut self, x: i64, y: i64, color: [f32; 4]) {
        if x < 0 || y < 0 || x >= self.image.width() as i64 || y >= self.image.height() as i64 {
            return;
        }
        let a = color[3].clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let dst = self.image.get_pixel_mut(x as u32, y as u32);
        for i in 0..3 {
            let d = dst.0[i] as f32 / 255.0;
            dst.0[i] = to_u8(color[i] * a + d * (1.0 - a));
        }
        let da = dst.0[3] as f32 / 255.0;
        dst.0[3] = to_u8(a + da * (1.0 - a));
    }

    /// Integer pixel range covering `min..max`, clipped to the image.
    fn span(&self, min: Vec2, max: Vec2) -> (i64, i64, i64, i64) {
        let w = self.image.width() as i64;
        let h = self.image.height() as i64;
        (
            (min.x.floor() as i64).max(0),
            (min.y.floor() as i64).max(0),
            (max.x.ceil() as i64).min(w),
            (max.y.ceil() as i64).min(h),
        )
    }
}

impl RenderSurface for Canvas {
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: [f32; 4]) {
        let r = radius.max(0.5);
        let (x0, y0, x1, y1) = self.span(center - Vec2::splat(r), center + Vec2::splat(r));
        for y in y0..y1 {
            for x in x0..x1 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                if p.distance_squared(center) <= r * r {
                    self.blend(x, y, color);
                }
            }
        }
    }

    fn fill_rect(&mut self, min: Vec2, size: Vec2, color: [f32; 4]) {
        let (x0, y0, x1, y1) = self.span(min, min + size);
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend(x, y, color);
            }
        }
    }

    fn radial_gradient(&mut self, center: Vec2, radius: f32, inner: [f32; 4], outer: [f32; 4]) {
        if radius <= 0.0 {
            return;
        }
        let (x0, y0, x1, y1) = self.span(center - Vec2::splat(radius), center + Vec2::splat(radius));
        for y in y0..y1 {
            for x in x0..x1 {
                let d = Vec2::new(x as f32 + 0.5, y as f32 + 0.5).distance(center);
                if d <= radius {
                    self.blend(x, y, lerp_color(inner, outer, d / radius));
                }
            }
        }
    }

    fn linear_gradient(&mut self, min: Vec2, size: Vec2, top: [f32; 4], bottom: [f32; 4]) {
        let (x0, y0, x1, y1) = self.span(min, min + size);
        for y in y0..y1 {
            let t = if size.y > 0.0 { (y as f32 + 0.5 - min.y) / size.y } else { 0.0 };
            let color = lerp_color(top, bottom, t);
            for x in x0..x1 {
                self.blend(x, y, color);
            }
        }
    }

    fn stroke_path(&mut self, points: &[Vec2], width: f32, color: [f32; 4]) {
        let half = (width * 0.5).max(0.5);
        for seg in points.windows(2) {
            let (a, b) = (seg[0], seg[1]);
            let (x0, y0, x1, y1) = self.span(a.min(b) - Vec2::splat(half), a.max(b) + Vec2::splat(half));
            for y in y0..y1 {
                for x in x0..x1 {
                    let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                    if segment_distance(p, a, b) <= half {
                        self.blend(x, y, color);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_circle_paints_center_only() {
        let mut c = Canvas::new(32, 32);
        c.fill_circle(Vec2::new(16.0, 16.0), 4.0, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(c.image().get_pixel(16, 16).0, [255, 0, 0, 255]);
        assert_eq!(c.image().get_pixel(2, 2).0, [0, 0, 0, 0]);
    }

    #[test]
    fn shapes_outside_are_clipped() {
        let mut c = Canvas::new(8, 8);
        c.fill_rect(Vec2::new(-100.0, -100.0), Vec2::new(50.0, 50.0), [1.0; 4]);
        c.stroke_path(&[Vec2::new(-10.0, -10.0), Vec2::new(20.0, 20.0)], 2.0, [1.0; 4]);
        assert_eq!(c.image().get_pixel(4, 4).0, [255, 255, 255, 255]);
    }

    #[test]
    fn half_alpha_blends() {
        let mut c = Canvas::new(4, 4);
        c.clear([0.0, 0.0, 0.0, 1.0]);
        c.fill_rect(Vec2::ZERO, Vec2::splat(4.0), [1.0, 1.0, 1.0, 0.5]);
        let v = c.image().get_pixel(1, 1).0[0];
        assert!((126..=129).contains(&v));
    }
}
