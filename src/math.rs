//! 2D math primitives shared by the collision and dynamics modules.
//!
//! Vectors and matrices come from `glam`; this module adds the rigid-motion
//! types the solver works with (`Rot`, `Transform`, `Sweep`) and the guarded
//! small linear solves used by the block solvers.

use glam::{Mat2, Mat3, Vec2, Vec3};

/// Scalar cross product of two vectors.
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.perp_dot(b)
}

/// Cross product of a vector and a scalar: `v x s`.
#[inline]
pub fn cross_vs(v: Vec2, s: f32) -> Vec2 {
    Vec2::new(s * v.y, -s * v.x)
}

/// Cross product of a scalar and a vector: `s x v`.
#[inline]
pub fn cross_sv(s: f32, v: Vec2) -> Vec2 {
    Vec2::new(-s * v.y, s * v.x)
}

/// Normalize `v` in place and return its original length.
///
/// Vectors shorter than `f32::EPSILON` are left untouched and report zero.
#[inline]
pub fn normalize_and_length(v: &mut Vec2) -> f32 {
    let length = v.length();
    if length < f32::EPSILON {
        return 0.0;
    }
    *v *= 1.0 / length;
    length
}

/// Solve `m * x = b` for a 2x2 matrix. Returns zero when `m` is singular.
#[inline]
pub fn solve22(m: &Mat2, b: Vec2) -> Vec2 {
    let (a11, a12) = (m.x_axis.x, m.y_axis.x);
    let (a21, a22) = (m.x_axis.y, m.y_axis.y);
    let mut det = a11 * a22 - a12 * a21;
    if det != 0.0 {
        det = 1.0 / det;
    }
    Vec2::new(det * (a22 * b.x - a12 * b.y), det * (a11 * b.y - a21 * b.x))
}

/// Inverse of a 2x2 matrix, or zero when singular.
#[inline]
pub fn inverse22(m: &Mat2) -> Mat2 {
    let (a, b) = (m.x_axis.x, m.y_axis.x);
    let (c, d) = (m.x_axis.y, m.y_axis.y);
    let mut det = a * d - b * c;
    if det != 0.0 {
        det = 1.0 / det;
    }
    Mat2::from_cols(Vec2::new(det * d, -det * c), Vec2::new(-det * b, det * a))
}

/// Solve `m * x = b` for a 3x3 matrix. Returns zero when `m` is singular.
#[inline]
pub fn solve33(m: &Mat3, b: Vec3) -> Vec3 {
    let (ex, ey, ez) = (m.x_axis, m.y_axis, m.z_axis);
    let mut det = ex.dot(ey.cross(ez));
    if det != 0.0 {
        det = 1.0 / det;
    }
    Vec3::new(
        det * b.dot(ey.cross(ez)),
        det * ex.dot(b.cross(ez)),
        det * ex.dot(ey.cross(b)),
    )
}

/// Solve the upper-left 2x2 block of a 3x3 matrix.
#[inline]
pub fn solve33_as22(m: &Mat3, b: Vec2) -> Vec2 {
    let block = Mat2::from_cols(m.x_axis.truncate(), m.y_axis.truncate());
    solve22(&block, b)
}

/// Rotation stored as sine/cosine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rot {
    pub s: f32,
    pub c: f32,
}

impl Default for Rot {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Rot {
    pub const IDENTITY: Self = Self { s: 0.0, c: 1.0 };

    #[inline]
    pub fn new(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self { s, c }
    }

    #[inline]
    pub fn angle(&self) -> f32 {
        self.s.atan2(self.c)
    }

    /// Rotated x-axis.
    #[inline]
    pub fn x_axis(&self) -> Vec2 {
        Vec2::new(self.c, self.s)
    }

    /// Rotated y-axis.
    #[inline]
    pub fn y_axis(&self) -> Vec2 {
        Vec2::new(-self.s, self.c)
    }

    /// Rotate a vector.
    #[inline]
    pub fn apply(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x - self.s * v.y, self.s * v.x + self.c * v.y)
    }

    /// Inverse rotate a vector.
    #[inline]
    pub fn apply_inv(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x + self.s * v.y, -self.s * v.x + self.c * v.y)
    }

    /// `transpose(self) * other`
    #[inline]
    pub fn mul_t(&self, other: &Rot) -> Rot {
        Rot {
            s: self.c * other.s - self.s * other.c,
            c: self.c * other.c + self.s * other.s,
        }
    }
}

/// Rigid transform: translation plus rotation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub p: Vec2,
    pub q: Rot,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        p: Vec2::ZERO,
        q: Rot::IDENTITY,
    };

    #[inline]
    pub fn new(position: Vec2, angle: f32) -> Self {
        Self {
            p: position,
            q: Rot::new(angle),
        }
    }

    /// Transform a local point into world space.
    #[inline]
    pub fn apply(&self, v: Vec2) -> Vec2 {
        self.q.apply(v) + self.p
    }

    /// Transform a world point into local space.
    #[inline]
    pub fn apply_inv(&self, v: Vec2) -> Vec2 {
        self.q.apply_inv(v - self.p)
    }

    /// `inverse(self) * other`
    #[inline]
    pub fn mul_t(&self, other: &Transform) -> Transform {
        Transform {
            q: self.q.mul_t(&other.q),
            p: self.q.apply_inv(other.p - self.p),
        }
    }
}

/// Motion of a body's center of mass over one time step.
///
/// `c0`/`a0` hold the pose at the start of the step, `c`/`a` the current pose.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sweep {
    /// Center of mass in body-local coordinates.
    pub local_center: Vec2,
    pub c0: Vec2,
    pub c: Vec2,
    pub a0: f32,
    pub a: f32,
}

impl Sweep {
    /// Interpolated transform at `beta` in `[0, 1]`.
    pub fn transform_at(&self, beta: f32) -> Transform {
        let c = (1.0 - beta) * self.c0 + beta * self.c;
        let angle = (1.0 - beta) * self.a0 + beta * self.a;
        let q = Rot::new(angle);
        Transform {
            p: c - q.apply(self.local_center),
            q,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_cross_helpers() {
        let v = Vec2::new(1.0, 2.0);
        assert!((cross(Vec2::X, Vec2::Y) - 1.0).abs() < EPS);
        assert!((cross_vs(v, 2.0) - Vec2::new(4.0, -2.0)).length() < EPS);
        assert!((cross_sv(2.0, v) - Vec2::new(-4.0, 2.0)).length() < EPS);
    }

    #[test]
    fn test_rot_roundtrip() {
        let q = Rot::new(0.7);
        let v = Vec2::new(3.0, -1.5);
        let back = q.apply_inv(q.apply(v));
        assert!((back - v).length() < EPS);
        assert!((q.angle() - 0.7).abs() < EPS);
    }

    #[test]
    fn test_transform_mul_t_is_relative() {
        let a = Transform::new(Vec2::new(1.0, 2.0), 0.3);
        let b = Transform::new(Vec2::new(-2.0, 0.5), -1.1);
        let rel = a.mul_t(&b);
        let p = Vec2::new(0.25, 0.75);
        let world = b.apply(p);
        assert!((a.apply(rel.apply(p)) - world).length() < EPS);
    }

    #[test]
    fn test_solve22_singular_returns_zero() {
        let m = Mat2::from_cols(Vec2::new(1.0, 2.0), Vec2::new(2.0, 4.0));
        assert_eq!(solve22(&m, Vec2::new(1.0, 1.0)), Vec2::ZERO);
    }

    #[test]
    fn test_solve33_matches_product() {
        let m = Mat3::from_cols(
            Vec3::new(4.0, 1.0, 0.5),
            Vec3::new(1.0, 3.0, 0.2),
            Vec3::new(0.5, 0.2, 2.0),
        );
        let x = Vec3::new(0.3, -1.2, 2.5);
        let b = m * x;
        assert!((solve33(&m, b) - x).length() < 1e-4);
        let x2 = solve33_as22(&m, Vec2::new(1.0, 2.0));
        let check = Vec2::new(4.0 * x2.x + 1.0 * x2.y, 1.0 * x2.x + 3.0 * x2.y);
        assert!((check - Vec2::new(1.0, 2.0)).length() < 1e-4);
    }

    #[test]
    fn test_sweep_transform_endpoints() {
        let sweep = Sweep {
            local_center: Vec2::new(0.5, 0.0),
            c0: Vec2::ZERO,
            c: Vec2::new(2.0, 0.0),
            a0: 0.0,
            a: 0.0,
        };
        let start = sweep.transform_at(0.0);
        let end = sweep.transform_at(1.0);
        assert!((start.p - Vec2::new(-0.5, 0.0)).length() < EPS);
        assert!((end.p - Vec2::new(1.5, 0.0)).length() < EPS);
    }
}
