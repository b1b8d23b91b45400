//! Collision shapes: circles, edges, convex polygons and chains.
//!
//! Shapes live in body-local coordinates. Chains are the only multi-child
//! shape; each child is the edge between two consecutive chain vertices.

use glam::Vec2;

use crate::error::{PhysicsError, Result};
use crate::math::{cross, cross_vs, Transform};
use crate::settings::{LINEAR_SLOP, MAX_POLYGON_VERTICES, POLYGON_RADIUS};

use super::aabb::{Aabb, RayCastInput, RayCastOutput};

/// Mass properties of a shape, with inertia about the shape's local origin.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MassData {
    pub mass: f32,
    pub center: Vec2,
    pub inertia: f32,
}

/// Shape discriminant, ordered the way contacts pick their reference shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShapeType {
    Circle,
    Edge,
    Polygon,
    Chain,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleShape {
    pub position: Vec2,
    pub radius: f32,
}

impl CircleShape {
    pub fn new(radius: f32) -> Self {
        Self {
            position: Vec2::ZERO,
            radius,
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    fn compute_mass(&self, density: f32) -> MassData {
        let mass = density * std::f32::consts::PI * self.radius * self.radius;
        MassData {
            mass,
            center: self.position,
            inertia: mass * (0.5 * self.radius * self.radius + self.position.length_squared()),
        }
    }

    fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let position = xf.apply(self.position);
        let s = input.p1 - position;
        let b = s.length_squared() - self.radius * self.radius;

        let r = input.p2 - input.p1;
        let c = s.dot(r);
        let rr = r.length_squared();
        let sigma = c * c - rr * b;

        if sigma < 0.0 || rr < f32::EPSILON {
            return None;
        }

        let a = -(c + sigma.sqrt());
        if 0.0 <= a && a <= input.max_fraction * rr {
            let fraction = a / rr;
            return Some(RayCastOutput {
                normal: (s + fraction * r).normalize_or_zero(),
                fraction,
            });
        }
        None
    }
}

/// Line segment with a skin radius. Edges have no volume and no mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeShape {
    pub v1: Vec2,
    pub v2: Vec2,
    pub radius: f32,
}

impl EdgeShape {
    pub fn new(v1: Vec2, v2: Vec2) -> Self {
        Self {
            v1,
            v2,
            radius: POLYGON_RADIUS,
        }
    }

    fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let v1 = xf.apply(self.v1);
        let v2 = xf.apply(self.v2);
        Aabb::new(v1.min(v2), v1.max(v2)).fattened(self.radius)
    }

    fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let p1 = xf.apply_inv(input.p1);
        let p2 = xf.apply_inv(input.p2);
        let d = p2 - p1;

        let e = self.v2 - self.v1;
        let normal = Vec2::new(e.y, -e.x).normalize_or_zero();

        // q = p1 + t * d, dot(normal, q - v1) = 0
        let numerator = normal.dot(self.v1 - p1);
        let denominator = normal.dot(d);
        if denominator == 0.0 {
            return None;
        }

        let t = numerator / denominator;
        if t < 0.0 || input.max_fraction < t {
            return None;
        }

        let q = p1 + t * d;
        let rr = e.length_squared();
        if rr == 0.0 {
            return None;
        }

        let s = (q - self.v1).dot(e) / rr;
        if !(0.0..=1.0).contains(&s) {
            return None;
        }

        let local_normal = if numerator > 0.0 { -normal } else { normal };
        Some(RayCastOutput {
            normal: xf.q.apply(local_normal),
            fraction: t,
        })
    }
}

/// Convex polygon with counter-clockwise winding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonShape {
    pub centroid: Vec2,
    vertices: [Vec2; MAX_POLYGON_VERTICES],
    normals: [Vec2; MAX_POLYGON_VERTICES],
    count: usize,
    pub radius: f32,
}

impl PolygonShape {
    /// Build the convex hull of `points`.
    ///
    /// Points closer than half the linear slop are welded. Fails when fewer
    /// than three distinct points remain or the hull is collinear.
    pub fn new(points: &[Vec2]) -> Result<Self> {
        let n = points.len();
        if !(3..=MAX_POLYGON_VERTICES).contains(&n) {
            return Err(PhysicsError::PolygonVertexCount {
                count: n,
                max: MAX_POLYGON_VERTICES,
            });
        }

        let weld = 0.5 * LINEAR_SLOP;
        let mut ps = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let mut unique = 0;
        for &v in points {
            if !v.is_finite() {
                return Err(PhysicsError::DegeneratePolygon("non-finite vertex"));
            }
            if ps[..unique].iter().all(|p| v.distance(*p) >= weld) {
                ps[unique] = v;
                unique += 1;
            }
        }
        if unique < 3 {
            return Err(PhysicsError::DegeneratePolygon("fewer than 3 distinct vertices"));
        }

        // Gift wrapping, starting from the right-most (then lowest) point.
        let mut i0 = 0;
        for i in 1..unique {
            let (x, x0) = (ps[i].x, ps[i0].x);
            if x > x0 || (x == x0 && ps[i].y < ps[i0].y) {
                i0 = i;
            }
        }

        let mut hull = [0usize; MAX_POLYGON_VERTICES];
        let mut m = 0;
        let mut ih = i0;
        loop {
            if m >= unique {
                return Err(PhysicsError::DegeneratePolygon("hull did not close"));
            }
            hull[m] = ih;

            let mut ie = 0;
            for j in 1..unique {
                if ie == ih {
                    ie = j;
                    continue;
                }
                let r = ps[ie] - ps[hull[m]];
                let v = ps[j] - ps[hull[m]];
                let c = cross(r, v);
                if c < 0.0 {
                    ie = j;
                }
                // Collinear: keep the farthest point.
                if c == 0.0 && v.length_squared() > r.length_squared() {
                    ie = j;
                }
            }

            m += 1;
            ih = ie;
            if ie == i0 {
                break;
            }
        }

        if m < 3 {
            return Err(PhysicsError::DegeneratePolygon("hull is collinear"));
        }

        let mut vertices = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        for i in 0..m {
            vertices[i] = ps[hull[i]];
        }

        let mut normals = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        for i in 0..m {
            let edge = vertices[(i + 1) % m] - vertices[i];
            if edge.length_squared() <= f32::EPSILON * f32::EPSILON {
                return Err(PhysicsError::DegeneratePolygon("zero-length edge"));
            }
            normals[i] = cross_vs(edge, 1.0).normalize();
        }

        let centroid = compute_centroid(&vertices[..m])?;

        Ok(Self {
            centroid,
            vertices,
            normals,
            count: m,
            radius: POLYGON_RADIUS,
        })
    }

    /// Axis-aligned box with half-widths `hx`, `hy` centered on the origin.
    pub fn new_box(hx: f32, hy: f32) -> Self {
        let mut vertices = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let mut normals = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        vertices[..4].copy_from_slice(&[
            Vec2::new(-hx, -hy),
            Vec2::new(hx, -hy),
            Vec2::new(hx, hy),
            Vec2::new(-hx, hy),
        ]);
        normals[..4].copy_from_slice(&[
            Vec2::new(0.0, -1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(-1.0, 0.0),
        ]);
        Self {
            centroid: Vec2::ZERO,
            vertices,
            normals,
            count: 4,
            radius: POLYGON_RADIUS,
        }
    }

    /// Box centered on `center` in body space, rotated by `angle`.
    pub fn new_oriented_box(hx: f32, hy: f32, center: Vec2, angle: f32) -> Self {
        let mut shape = Self::new_box(hx, hy);
        let xf = Transform::new(center, angle);
        for i in 0..shape.count {
            shape.vertices[i] = xf.apply(shape.vertices[i]);
            shape.normals[i] = xf.q.apply(shape.normals[i]);
        }
        shape.centroid = center;
        shape
    }

    /// Two-sided polygon view of an edge, used by the polygon clipper.
    pub(crate) fn from_edge(edge: &EdgeShape) -> Self {
        let mut vertices = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let mut normals = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let normal = cross_vs(edge.v2 - edge.v1, 1.0).normalize_or_zero();
        vertices[0] = edge.v1;
        vertices[1] = edge.v2;
        normals[0] = normal;
        normals[1] = -normal;
        Self {
            centroid: 0.5 * (edge.v1 + edge.v2),
            vertices,
            normals,
            count: 2,
            radius: edge.radius,
        }
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices[..self.count]
    }

    #[inline]
    pub fn normals(&self) -> &[Vec2] {
        &self.normals[..self.count]
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let first = xf.apply(self.vertices[0]);
        let (lower, upper) = self.vertices()[1..]
            .iter()
            .map(|v| xf.apply(*v))
            .fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Aabb::new(lower, upper).fattened(self.radius)
    }

    fn compute_mass(&self, density: f32) -> MassData {
        // Triangle fan from the first vertex keeps round-off small.
        let s = self.vertices[0];
        let inv3 = 1.0 / 3.0;

        let mut center = Vec2::ZERO;
        let mut area = 0.0;
        let mut inertia = 0.0;

        for i in 0..self.count {
            let e1 = self.vertices[i] - s;
            let e2 = self.vertices[(i + 1) % self.count] - s;

            let d = cross(e1, e2);
            let triangle_area = 0.5 * d;
            area += triangle_area;
            center += triangle_area * inv3 * (e1 + e2);

            let intx2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
            let inty2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
            inertia += (0.25 * inv3 * d) * (intx2 + inty2);
        }

        let mass = density * area;
        if area > f32::EPSILON {
            center *= 1.0 / area;
        }
        let mass_center = center + s;

        MassData {
            mass,
            center: mass_center,
            // Shift from the fan origin to the centroid, then to the body origin.
            inertia: density * inertia
                + mass * (mass_center.length_squared() - center.length_squared()),
        }
    }

    fn test_point(&self, xf: &Transform, p: Vec2) -> bool {
        let local = xf.apply_inv(p);
        self.vertices()
            .iter()
            .zip(self.normals())
            .all(|(v, n)| n.dot(local - *v) <= 0.0)
    }

    fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let p1 = xf.apply_inv(input.p1);
        let p2 = xf.apply_inv(input.p2);
        let d = p2 - p1;

        let mut lower = 0.0;
        let mut upper = input.max_fraction;
        let mut index = None;

        for i in 0..self.count {
            // p = p1 + a * d, dot(normal, p - v) = 0
            let numerator = self.normals[i].dot(self.vertices[i] - p1);
            let denominator = self.normals[i].dot(d);

            if denominator == 0.0 {
                if numerator < 0.0 {
                    return None;
                }
            } else if denominator < 0.0 && numerator < lower * denominator {
                lower = numerator / denominator;
                index = Some(i);
            } else if denominator > 0.0 && numerator < upper * denominator {
                upper = numerator / denominator;
            }

            if upper < lower {
                return None;
            }
        }

        index.map(|i| RayCastOutput {
            normal: xf.q.apply(self.normals[i]),
            fraction: lower,
        })
    }
}

fn compute_centroid(vs: &[Vec2]) -> Result<Vec2> {
    let s = vs[0];
    let inv3 = 1.0 / 3.0;
    let mut c = Vec2::ZERO;
    let mut area = 0.0;

    for i in 0..vs.len() {
        let e1 = vs[i] - s;
        let e2 = vs[(i + 1) % vs.len()] - s;
        let triangle_area = 0.5 * cross(e1, e2);
        area += triangle_area;
        c += triangle_area * inv3 * (e1 + e2);
    }

    if area <= f32::EPSILON {
        return Err(PhysicsError::DegeneratePolygon("zero area"));
    }
    Ok(c / area + s)
}

/// Free-form polyline of edges. A loop repeats its first vertex at the end.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainShape {
    vertices: Vec<Vec2>,
    pub radius: f32,
}

impl ChainShape {
    /// Open chain through `points`.
    pub fn new_chain(points: &[Vec2]) -> Result<Self> {
        if points.len() < 2 {
            return Err(PhysicsError::ChainVertexCount {
                count: points.len(),
                min: 2,
            });
        }
        validate_spacing(points)?;
        Ok(Self {
            vertices: points.to_vec(),
            radius: POLYGON_RADIUS,
        })
    }

    /// Closed loop through `points`.
    pub fn new_loop(points: &[Vec2]) -> Result<Self> {
        if points.len() < 3 {
            return Err(PhysicsError::ChainVertexCount {
                count: points.len(),
                min: 3,
            });
        }
        validate_spacing(points)?;
        let mut vertices = points.to_vec();
        vertices.push(points[0]);
        Ok(Self {
            vertices,
            radius: POLYGON_RADIUS,
        })
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn child_count(&self) -> usize {
        self.vertices.len() - 1
    }

    /// Edge for child `index`.
    ///
    /// # Panics
    /// If `index` is not a valid child index.
    pub fn child_edge(&self, index: usize) -> EdgeShape {
        assert!(
            index < self.child_count(),
            "chain child {index} out of range ({} children)",
            self.child_count()
        );
        EdgeShape {
            v1: self.vertices[index],
            v2: self.vertices[index + 1],
            radius: self.radius,
        }
    }
}

fn validate_spacing(points: &[Vec2]) -> Result<()> {
    let min = LINEAR_SLOP * LINEAR_SLOP;
    for (i, pair) in points.windows(2).enumerate() {
        if pair[0].distance_squared(pair[1]) <= min {
            return Err(PhysicsError::ChainVerticesTooClose(i, i + 1));
        }
    }
    Ok(())
}

/// A collision shape attached to a fixture.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle(CircleShape),
    Edge(EdgeShape),
    Polygon(PolygonShape),
    Chain(ChainShape),
}

impl Shape {
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Shape::Circle(_) => ShapeType::Circle,
            Shape::Edge(_) => ShapeType::Edge,
            Shape::Polygon(_) => ShapeType::Polygon,
            Shape::Chain(_) => ShapeType::Chain,
        }
    }

    /// Skin radius (the full radius for circles).
    pub fn radius(&self) -> f32 {
        match self {
            Shape::Circle(c) => c.radius,
            Shape::Edge(e) => e.radius,
            Shape::Polygon(p) => p.radius,
            Shape::Chain(c) => c.radius,
        }
    }

    /// Number of broad-phase children.
    pub fn child_count(&self) -> usize {
        match self {
            Shape::Chain(c) => c.child_count(),
            _ => 1,
        }
    }

    /// Whether the world point `p` is inside. Edges and chains contain nothing.
    pub fn test_point(&self, xf: &Transform, p: Vec2) -> bool {
        match self {
            Shape::Circle(c) => {
                let center = xf.apply(c.position);
                (p - center).length_squared() <= c.radius * c.radius
            }
            Shape::Polygon(poly) => poly.test_point(xf, p),
            Shape::Edge(_) | Shape::Chain(_) => false,
        }
    }

    pub fn ray_cast(
        &self,
        input: &RayCastInput,
        xf: &Transform,
        child_index: usize,
    ) -> Option<RayCastOutput> {
        match self {
            Shape::Circle(c) => c.ray_cast(input, xf),
            Shape::Edge(e) => e.ray_cast(input, xf),
            Shape::Polygon(p) => p.ray_cast(input, xf),
            Shape::Chain(c) => c.child_edge(child_index).ray_cast(input, xf),
        }
    }

    pub fn compute_aabb(&self, xf: &Transform, child_index: usize) -> Aabb {
        match self {
            Shape::Circle(c) => {
                let p = xf.apply(c.position);
                Aabb::new(p, p).fattened(c.radius)
            }
            Shape::Edge(e) => e.compute_aabb(xf),
            Shape::Polygon(p) => p.compute_aabb(xf),
            Shape::Chain(c) => c.child_edge(child_index).compute_aabb(xf),
        }
    }

    pub fn compute_mass(&self, density: f32) -> MassData {
        match self {
            Shape::Circle(c) => c.compute_mass(density),
            Shape::Polygon(p) => p.compute_mass(density),
            Shape::Edge(e) => MassData {
                center: 0.5 * (e.v1 + e.v2),
                ..Default::default()
            },
            Shape::Chain(_) => MassData::default(),
        }
    }
}

impl From<CircleShape> for Shape {
    fn from(shape: CircleShape) -> Self {
        Shape::Circle(shape)
    }
}

impl From<EdgeShape> for Shape {
    fn from(shape: EdgeShape) -> Self {
        Shape::Edge(shape)
    }
}

impl From<PolygonShape> for Shape {
    fn from(shape: PolygonShape) -> Self {
        Shape::Polygon(shape)
    }
}

impl From<ChainShape> for Shape {
    fn from(shape: ChainShape) -> Self {
        Shape::Chain(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn test_polygon_hull_drops_interior_point() {
        let poly = PolygonShape::new(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(1.0, 0.5),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ])
        .unwrap();
        assert_eq!(poly.count(), 4);
        assert!((poly.centroid - Vec2::new(1.0, 1.0)).length() < EPS);
        // Counter-clockwise: every normal points away from the centroid.
        for (v, n) in poly.vertices().iter().zip(poly.normals()) {
            assert!(n.dot(*v - poly.centroid) > 0.0);
        }
    }

    #[test]
    fn test_polygon_rejects_collinear() {
        let result = PolygonShape::new(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
        ]);
        assert!(matches!(result, Err(PhysicsError::DegeneratePolygon(_))));
    }

    #[test]
    fn test_polygon_rejects_vertex_count() {
        let result = PolygonShape::new(&[Vec2::ZERO, Vec2::X]);
        assert!(matches!(
            result,
            Err(PhysicsError::PolygonVertexCount { count: 2, .. })
        ));
    }

    #[test]
    fn test_box_mass_matches_closed_form() {
        let shape = Shape::Polygon(PolygonShape::new_box(1.0, 0.5));
        let mass = shape.compute_mass(2.0);
        // 2 x 1 box, density 2
        assert!((mass.mass - 4.0).abs() < EPS);
        assert!(mass.center.length() < EPS);
        let expected = mass.mass * (2.0 * 2.0 + 1.0 * 1.0) / 12.0;
        assert!(
            (mass.inertia - expected).abs() < EPS,
            "inertia = {}, expected = {}",
            mass.inertia, expected
        );
    }

    #[test]
    fn test_offset_circle_mass_uses_parallel_axis() {
        let shape = Shape::Circle(CircleShape::new(1.0).with_position(Vec2::new(2.0, 0.0)));
        let mass = shape.compute_mass(1.0);
        let m = std::f32::consts::PI;
        assert!((mass.mass - m).abs() < EPS);
        assert!((mass.inertia - m * (0.5 + 4.0)).abs() < EPS);
    }

    #[test]
    fn test_oriented_box_aabb() {
        let shape = Shape::Polygon(PolygonShape::new_oriented_box(
            1.0,
            1.0,
            Vec2::new(3.0, 0.0),
            std::f32::consts::FRAC_PI_4,
        ));
        let aabb = shape.compute_aabb(&Transform::IDENTITY, 0);
        let half = std::f32::consts::SQRT_2 + POLYGON_RADIUS;
        assert!((aabb.lower - Vec2::new(3.0 - half, -half)).length() < EPS);
        assert!((aabb.upper - Vec2::new(3.0 + half, half)).length() < EPS);
    }

    #[test]
    fn test_polygon_test_point() {
        let shape = Shape::Polygon(PolygonShape::new_box(1.0, 1.0));
        let xf = Transform::new(Vec2::new(5.0, 0.0), 0.3);
        assert!(shape.test_point(&xf, Vec2::new(5.2, 0.1)));
        assert!(!shape.test_point(&xf, Vec2::new(7.0, 0.0)));
    }

    #[test]
    fn test_ray_cast_circle_and_polygon() {
        let input = RayCastInput {
            p1: Vec2::new(-5.0, 0.0),
            p2: Vec2::new(5.0, 0.0),
            max_fraction: 1.0,
        };
        let circle = Shape::Circle(CircleShape::new(1.0));
        let hit = circle.ray_cast(&input, &Transform::IDENTITY, 0).unwrap();
        assert!((hit.fraction - 0.4).abs() < EPS);
        assert!((hit.normal - Vec2::new(-1.0, 0.0)).length() < EPS);

        let poly = Shape::Polygon(PolygonShape::new_box(2.0, 2.0));
        let hit = poly.ray_cast(&input, &Transform::IDENTITY, 0).unwrap();
        assert!((hit.fraction - 0.3).abs() < EPS);
        assert!((hit.normal - Vec2::new(-1.0, 0.0)).length() < EPS);
    }

    #[test]
    fn test_ray_cast_edge_from_below() {
        let edge = Shape::Edge(EdgeShape::new(Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0)));
        let input = RayCastInput {
            p1: Vec2::new(0.0, -2.0),
            p2: Vec2::new(0.0, 2.0),
            max_fraction: 1.0,
        };
        let hit = edge.ray_cast(&input, &Transform::IDENTITY, 0).unwrap();
        assert!((hit.fraction - 0.5).abs() < EPS);
        assert!((hit.normal - Vec2::new(0.0, -1.0)).length() < EPS);
    }

    #[test]
    fn test_chain_loop_children() {
        let chain = ChainShape::new_loop(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
        ])
        .unwrap();
        assert_eq!(chain.child_count(), 3);
        let last = chain.child_edge(2);
        assert_eq!(last.v1, Vec2::new(1.0, 1.0));
        assert_eq!(last.v2, Vec2::new(0.0, 0.0));
    }

    #[test]
    #[should_panic]
    fn test_chain_child_out_of_range_panics() {
        let chain = ChainShape::new_chain(&[Vec2::ZERO, Vec2::X]).unwrap();
        let _ = chain.child_edge(1);
    }

    #[test]
    fn test_chain_rejects_duplicate_vertices() {
        let result = ChainShape::new_chain(&[Vec2::ZERO, Vec2::ZERO, Vec2::X]);
        assert_eq!(result, Err(PhysicsError::ChainVerticesTooClose(0, 1)));
    }
}
