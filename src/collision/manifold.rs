//! Contact manifolds produced by the narrow phase and consumed by the contact solver.

use glam::Vec2;

use crate::math::Transform;
use crate::settings::MAX_MANIFOLD_POINTS;

/// Feature kind that produced one side of a contact point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FeatureType {
    #[default]
    Vertex = 0,
    Face = 1,
}

/// Identifies the pair of features that produced a contact point so impulses
/// can be matched between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContactId {
    pub index_a: u8,
    pub index_b: u8,
    pub type_a: FeatureType,
    pub type_b: FeatureType,
}

impl ContactId {
    /// Packed key used for warm-start matching.
    #[inline]
    pub fn key(&self) -> u32 {
        u32::from(self.index_a)
            | u32::from(self.index_b) << 8
            | (self.type_a as u32) << 16
            | (self.type_b as u32) << 24
    }

    /// Same features seen from the other shape.
    #[inline]
    pub fn swapped(&self) -> Self {
        Self {
            index_a: self.index_b,
            index_b: self.index_a,
            type_a: self.type_b,
            type_b: self.type_a,
        }
    }
}

/// A manifold point. Its meaning depends on the manifold type:
/// - `Circles`: local center of circle B
/// - `FaceA`: local center of circle B or clip point of polygon B
/// - `FaceB`: clip point of polygon A
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ManifoldPoint {
    pub local_point: Vec2,
    /// Non-penetration impulse, carried across steps for warm starting.
    pub normal_impulse: f32,
    /// Friction impulse, carried across steps for warm starting.
    pub tangent_impulse: f32,
    pub id: ContactId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifoldType {
    #[default]
    Circles,
    FaceA,
    FaceB,
}

/// Contact points between two touching convex shapes, in local coordinates
/// so they stay valid while the bodies move within a step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Manifold {
    pub points: [ManifoldPoint; MAX_MANIFOLD_POINTS],
    /// Unused for `Circles`.
    pub local_normal: Vec2,
    /// `Circles`: center of circle A. `FaceA`/`FaceB`: point on the reference face.
    pub local_point: Vec2,
    pub manifold_type: ManifoldType,
    pub point_count: usize,
}

impl Manifold {
    #[inline]
    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points[..self.point_count]
    }

    #[inline]
    pub fn points_mut(&mut self) -> &mut [ManifoldPoint] {
        &mut self.points[..self.point_count]
    }
}

/// Manifold expressed in world coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldManifold {
    /// From shape A to shape B.
    pub normal: Vec2,
    /// Midpoints between the two surfaces.
    pub points: [Vec2; MAX_MANIFOLD_POINTS],
    /// Negative when overlapping.
    pub separations: [f32; MAX_MANIFOLD_POINTS],
}

impl WorldManifold {
    pub fn new(
        manifold: &Manifold,
        xf_a: &Transform,
        radius_a: f32,
        xf_b: &Transform,
        radius_b: f32,
    ) -> Self {
        let mut wm = Self::default();
        if manifold.point_count == 0 {
            return wm;
        }

        match manifold.manifold_type {
            ManifoldType::Circles => {
                wm.normal = Vec2::X;
                let point_a = xf_a.apply(manifold.local_point);
                let point_b = xf_b.apply(manifold.points[0].local_point);
                if point_a.distance_squared(point_b) > f32::EPSILON * f32::EPSILON {
                    wm.normal = (point_b - point_a).normalize();
                }
                let c_a = point_a + radius_a * wm.normal;
                let c_b = point_b - radius_b * wm.normal;
                wm.points[0] = 0.5 * (c_a + c_b);
                wm.separations[0] = (c_b - c_a).dot(wm.normal);
            }
            ManifoldType::FaceA => {
                wm.normal = xf_a.q.apply(manifold.local_normal);
                let plane_point = xf_a.apply(manifold.local_point);
                for (i, mp) in manifold.points().iter().enumerate() {
                    let clip_point = xf_b.apply(mp.local_point);
                    let c_a = clip_point
                        + (radius_a - (clip_point - plane_point).dot(wm.normal)) * wm.normal;
                    let c_b = clip_point - radius_b * wm.normal;
                    wm.points[i] = 0.5 * (c_a + c_b);
                    wm.separations[i] = (c_b - c_a).dot(wm.normal);
                }
            }
            ManifoldType::FaceB => {
                wm.normal = xf_b.q.apply(manifold.local_normal);
                let plane_point = xf_b.apply(manifold.local_point);
                for (i, mp) in manifold.points().iter().enumerate() {
                    let clip_point = xf_a.apply(mp.local_point);
                    let c_b = clip_point
                        + (radius_b - (clip_point - plane_point).dot(wm.normal)) * wm.normal;
                    let c_a = clip_point - radius_a * wm.normal;
                    wm.points[i] = 0.5 * (c_a + c_b);
                    wm.separations[i] = (c_a - c_b).dot(wm.normal);
                }
                // Always point from A to B.
                wm.normal = -wm.normal;
            }
        }
        wm
    }
}

/// Vertex used by segment clipping.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ClipVertex {
    pub v: Vec2,
    pub id: ContactId,
}

/// Clip a segment to the half-space `dot(normal, v) <= offset`.
///
/// Returns the number of output points (0, 1 or 2).
pub(crate) fn clip_segment_to_line(
    v_out: &mut [ClipVertex; 2],
    v_in: &[ClipVertex; 2],
    normal: Vec2,
    offset: f32,
    vertex_index_a: usize,
) -> usize {
    let mut count = 0;

    let distance0 = normal.dot(v_in[0].v) - offset;
    let distance1 = normal.dot(v_in[1].v) - offset;

    if distance0 <= 0.0 {
        v_out[count] = v_in[0];
        count += 1;
    }
    if distance1 <= 0.0 {
        v_out[count] = v_in[1];
        count += 1;
    }

    // The points straddle the plane.
    if distance0 * distance1 < 0.0 {
        let interp = distance0 / (distance0 - distance1);
        v_out[count].v = v_in[0].v + interp * (v_in[1].v - v_in[0].v);
        // Vertex A is hitting edge B.
        v_out[count].id = ContactId {
            index_a: vertex_index_a as u8,
            index_b: v_in[0].id.index_b,
            type_a: FeatureType::Vertex,
            type_b: FeatureType::Face,
        };
        count += 1;
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_id_key_distinguishes_features() {
        let a = ContactId {
            index_a: 1,
            index_b: 2,
            type_a: FeatureType::Vertex,
            type_b: FeatureType::Face,
        };
        assert_ne!(a.key(), a.swapped().key());
        assert_eq!(a.swapped().swapped(), a);
    }

    #[test]
    fn test_clip_segment_keeps_inside_half() {
        let v_in = [
            ClipVertex {
                v: Vec2::new(-1.0, 0.0),
                id: ContactId::default(),
            },
            ClipVertex {
                v: Vec2::new(1.0, 0.0),
                id: ContactId::default(),
            },
        ];
        let mut v_out = [ClipVertex::default(); 2];
        let count = clip_segment_to_line(&mut v_out, &v_in, Vec2::X, 0.5, 3);
        assert_eq!(count, 2);
        assert!((v_out[0].v - Vec2::new(-1.0, 0.0)).length() < 1e-6);
        assert!((v_out[1].v - Vec2::new(0.5, 0.0)).length() < 1e-6);
        assert_eq!(v_out[1].id.index_a, 3);
    }

    #[test]
    fn test_world_manifold_circles() {
        let mut manifold = Manifold {
            manifold_type: ManifoldType::Circles,
            point_count: 1,
            ..Default::default()
        };
        manifold.points[0].local_point = Vec2::ZERO;
        let xf_a = Transform::new(Vec2::ZERO, 0.0);
        let xf_b = Transform::new(Vec2::new(1.5, 0.0), 0.0);
        let wm = WorldManifold::new(&manifold, &xf_a, 1.0, &xf_b, 1.0);
        assert!((wm.normal - Vec2::X).length() < 1e-6);
        assert!((wm.separations[0] + 0.5).abs() < 1e-6);
        assert!((wm.points[0] - Vec2::new(0.75, 0.0)).length() < 1e-6);
    }
}
