//! Axis-aligned bounding boxes and ray cast types.

use glam::Vec2;

/// Ray from `p1` toward `p2`, clipped at `p1 + max_fraction * (p2 - p1)`.
#[derive(Debug, Clone, Copy)]
pub struct RayCastInput {
    pub p1: Vec2,
    pub p2: Vec2,
    pub max_fraction: f32,
}

/// Hit reported by a ray cast.
#[derive(Debug, Clone, Copy)]
pub struct RayCastOutput {
    pub normal: Vec2,
    pub fraction: f32,
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub lower: Vec2,
    pub upper: Vec2,
}

impl Aabb {
    pub fn new(lower: Vec2, upper: Vec2) -> Self {
        Self { lower, upper }
    }

    pub fn is_valid(&self) -> bool {
        let d = self.upper - self.lower;
        d.x >= 0.0 && d.y >= 0.0 && self.lower.is_finite() && self.upper.is_finite()
    }

    pub fn center(&self) -> Vec2 {
        0.5 * (self.lower + self.upper)
    }

    pub fn extents(&self) -> Vec2 {
        0.5 * (self.upper - self.lower)
    }

    pub fn perimeter(&self) -> f32 {
        2.0 * ((self.upper.x - self.lower.x) + (self.upper.y - self.lower.y))
    }

    /// Smallest box enclosing both.
    pub fn combine(&self, other: &Aabb) -> Aabb {
        Aabb {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    pub fn contains(&self, other: &Aabb) -> bool {
        self.lower.x <= other.lower.x
            && self.lower.y <= other.lower.y
            && other.upper.x <= self.upper.x
            && other.upper.y <= self.upper.y
    }

    /// Grow by `margin` on every side.
    pub fn fattened(&self, margin: f32) -> Aabb {
        let r = Vec2::splat(margin);
        Aabb {
            lower: self.lower - r,
            upper: self.upper + r,
        }
    }

    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.lower.x <= other.upper.x
            && self.upper.x >= other.lower.x
            && self.lower.y <= other.upper.y
            && self.upper.y >= other.lower.y
    }

    /// Slab test. Returns `None` when the ray misses or starts inside.
    pub fn ray_cast(&self, input: &RayCastInput) -> Option<RayCastOutput> {
        let mut tmin = f32::MIN;
        let mut tmax = f32::MAX;

        let p = input.p1;
        let d = input.p2 - input.p1;
        let abs_d = d.abs();
        let mut normal = Vec2::ZERO;

        for i in 0..2 {
            if abs_d[i] < f32::EPSILON {
                // Parallel.
                if p[i] < self.lower[i] || self.upper[i] < p[i] {
                    return None;
                }
            } else {
                let inv_d = 1.0 / d[i];
                let mut t1 = (self.lower[i] - p[i]) * inv_d;
                let mut t2 = (self.upper[i] - p[i]) * inv_d;
                let mut s = -1.0;
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                    s = 1.0;
                }
                if t1 > tmin {
                    normal = Vec2::ZERO;
                    normal[i] = s;
                    tmin = t1;
                }
                tmax = tmax.min(t2);
                if tmin > tmax {
                    return None;
                }
            }
        }

        if tmin < 0.0 || input.max_fraction < tmin {
            return None;
        }

        Some(RayCastOutput {
            normal,
            fraction: tmin,
        })
    }
}
