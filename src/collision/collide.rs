//! Narrow-phase manifold generation.
//!
//! Each function expects its shapes in a fixed order: the shape with the
//! reference face comes first and circles always come last. [`collide`]
//! dispatches on an already ordered pair and returns an empty manifold for
//! combinations that never touch (edge against edge, for example).

use glam::Vec2;

use crate::math::{cross_vs, Transform};
use crate::settings::LINEAR_SLOP;

use super::manifold::{
    clip_segment_to_line, ClipVertex, ContactId, FeatureType, Manifold, ManifoldType,
};
use super::shapes::{CircleShape, EdgeShape, PolygonShape, Shape};

/// Manifold for one child pair. Shapes must already be ordered.
pub fn collide(
    shape_a: &Shape,
    child_a: usize,
    xf_a: &Transform,
    shape_b: &Shape,
    _child_b: usize,
    xf_b: &Transform,
) -> Manifold {
    match (shape_a, shape_b) {
        (Shape::Circle(a), Shape::Circle(b)) => collide_circles(a, xf_a, b, xf_b),
        (Shape::Polygon(a), Shape::Circle(b)) => collide_polygon_and_circle(a, xf_a, b, xf_b),
        (Shape::Polygon(a), Shape::Polygon(b)) => collide_polygons(a, xf_a, b, xf_b),
        (Shape::Edge(a), Shape::Circle(b)) => collide_edge_and_circle(a, xf_a, b, xf_b),
        (Shape::Edge(a), Shape::Polygon(b)) => collide_edge_and_polygon(a, xf_a, b, xf_b),
        (Shape::Chain(a), Shape::Circle(b)) => {
            collide_edge_and_circle(&a.child_edge(child_a), xf_a, b, xf_b)
        }
        (Shape::Chain(a), Shape::Polygon(b)) => {
            collide_edge_and_polygon(&a.child_edge(child_a), xf_a, b, xf_b)
        }
        _ => Manifold::default(),
    }
}

pub fn collide_circles(
    circle_a: &CircleShape,
    xf_a: &Transform,
    circle_b: &CircleShape,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    let p_a = xf_a.apply(circle_a.position);
    let p_b = xf_b.apply(circle_b.position);
    let radius = circle_a.radius + circle_b.radius;
    if p_a.distance_squared(p_b) > radius * radius {
        return manifold;
    }

    manifold.manifold_type = ManifoldType::Circles;
    manifold.local_point = circle_a.position;
    manifold.local_normal = Vec2::ZERO;
    manifold.point_count = 1;
    manifold.points[0].local_point = circle_b.position;
    manifold.points[0].id = ContactId::default();
    manifold
}

pub fn collide_polygon_and_circle(
    polygon_a: &PolygonShape,
    xf_a: &Transform,
    circle_b: &CircleShape,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    // Circle center in the polygon frame.
    let c = xf_b.apply(circle_b.position);
    let c_local = xf_a.apply_inv(c);

    let radius = polygon_a.radius + circle_b.radius;
    let vertices = polygon_a.vertices();
    let normals = polygon_a.normals();
    let count = polygon_a.count();

    // Face of minimum penetration.
    let mut normal_index = 0;
    let mut separation = f32::MIN;
    for i in 0..count {
        let s = normals[i].dot(c_local - vertices[i]);
        if s > radius {
            return manifold;
        }
        if s > separation {
            separation = s;
            normal_index = i;
        }
    }

    let v1 = vertices[normal_index];
    let v2 = vertices[(normal_index + 1) % count];

    manifold.point_count = 1;
    manifold.manifold_type = ManifoldType::FaceA;
    manifold.points[0].local_point = circle_b.position;
    manifold.points[0].id = ContactId::default();

    // Center inside the polygon.
    if separation < f32::EPSILON {
        manifold.local_normal = normals[normal_index];
        manifold.local_point = 0.5 * (v1 + v2);
        return manifold;
    }

    // Voronoi region of the face or one of its vertices.
    let u1 = (c_local - v1).dot(v2 - v1);
    let u2 = (c_local - v2).dot(v1 - v2);
    if u1 <= 0.0 {
        if c_local.distance_squared(v1) > radius * radius {
            return Manifold::default();
        }
        manifold.local_normal = (c_local - v1).normalize();
        manifold.local_point = v1;
    } else if u2 <= 0.0 {
        if c_local.distance_squared(v2) > radius * radius {
            return Manifold::default();
        }
        manifold.local_normal = (c_local - v2).normalize();
        manifold.local_point = v2;
    } else {
        let face_center = 0.5 * (v1 + v2);
        let s = (c_local - face_center).dot(normals[normal_index]);
        if s > radius {
            return Manifold::default();
        }
        manifold.local_normal = normals[normal_index];
        manifold.local_point = face_center;
    }

    manifold
}

/// Reference edge of `poly1` with the largest separation from `poly2`.
fn find_max_separation(
    poly1: &PolygonShape,
    xf1: &Transform,
    poly2: &PolygonShape,
    xf2: &Transform,
) -> (usize, f32) {
    // Work in the frame of poly2.
    let xf = xf2.mul_t(xf1);

    let mut best_index = 0;
    let mut max_separation = f32::MIN;
    for (i, (n1, v1)) in poly1.normals().iter().zip(poly1.vertices()).enumerate() {
        let n = xf.q.apply(*n1);
        let v1 = xf.apply(*v1);

        let si = poly2
            .vertices()
            .iter()
            .map(|v2| n.dot(*v2 - v1))
            .fold(f32::MAX, f32::min);

        if si > max_separation {
            max_separation = si;
            best_index = i;
        }
    }
    (best_index, max_separation)
}

/// Edge of `poly2` most anti-parallel to reference edge `edge1` of `poly1`.
fn find_incident_edge(
    poly1: &PolygonShape,
    xf1: &Transform,
    edge1: usize,
    poly2: &PolygonShape,
    xf2: &Transform,
) -> [ClipVertex; 2] {
    let normal1 = xf2.q.apply_inv(xf1.q.apply(poly1.normals()[edge1]));

    let mut index = 0;
    let mut min_dot = f32::MAX;
    for (i, n2) in poly2.normals().iter().enumerate() {
        let dot = normal1.dot(*n2);
        if dot < min_dot {
            min_dot = dot;
            index = i;
        }
    }

    let i1 = index;
    let i2 = (index + 1) % poly2.count();
    let vertex = |i: usize| ClipVertex {
        v: xf2.apply(poly2.vertices()[i]),
        id: ContactId {
            index_a: edge1 as u8,
            index_b: i as u8,
            type_a: FeatureType::Face,
            type_b: FeatureType::Vertex,
        },
    };
    [vertex(i1), vertex(i2)]
}

/// Separating axis test, then clip the incident edge against the side
/// planes of the reference face.
pub fn collide_polygons(
    poly_a: &PolygonShape,
    xf_a: &Transform,
    poly_b: &PolygonShape,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();
    let total_radius = poly_a.radius + poly_b.radius;

    let (edge_a, separation_a) = find_max_separation(poly_a, xf_a, poly_b, xf_b);
    if separation_a > total_radius {
        return manifold;
    }

    let (edge_b, separation_b) = find_max_separation(poly_b, xf_b, poly_a, xf_a);
    if separation_b > total_radius {
        return manifold;
    }

    // Prefer A as reference so the choice does not flip-flop between steps.
    let tolerance = 0.1 * LINEAR_SLOP;
    let (poly1, xf1, poly2, xf2, edge1, flip) = if separation_b > separation_a + tolerance {
        manifold.manifold_type = ManifoldType::FaceB;
        (poly_b, xf_b, poly_a, xf_a, edge_b, true)
    } else {
        manifold.manifold_type = ManifoldType::FaceA;
        (poly_a, xf_a, poly_b, xf_b, edge_a, false)
    };

    let incident = find_incident_edge(poly1, xf1, edge1, poly2, xf2);

    let count1 = poly1.count();
    let iv1 = edge1;
    let iv2 = (edge1 + 1) % count1;

    let mut v11 = poly1.vertices()[iv1];
    let mut v12 = poly1.vertices()[iv2];

    let local_tangent = (v12 - v11).normalize();
    let local_normal = cross_vs(local_tangent, 1.0);
    let plane_point = 0.5 * (v11 + v12);

    let tangent = xf1.q.apply(local_tangent);
    let normal = cross_vs(tangent, 1.0);

    v11 = xf1.apply(v11);
    v12 = xf1.apply(v12);

    let front_offset = normal.dot(v11);

    // Side planes, pushed out by the skin radius.
    let side_offset1 = -tangent.dot(v11) + total_radius;
    let side_offset2 = tangent.dot(v12) + total_radius;

    let mut clip_points1 = [ClipVertex::default(); 2];
    if clip_segment_to_line(&mut clip_points1, &incident, -tangent, side_offset1, iv1) < 2 {
        return Manifold::default();
    }

    let mut clip_points2 = [ClipVertex::default(); 2];
    if clip_segment_to_line(&mut clip_points2, &clip_points1, tangent, side_offset2, iv2) < 2 {
        return Manifold::default();
    }

    manifold.local_normal = local_normal;
    manifold.local_point = plane_point;

    let mut point_count = 0;
    for cp in &clip_points2 {
        let separation = normal.dot(cp.v) - front_offset;
        if separation <= total_radius {
            let mp = &mut manifold.points[point_count];
            mp.local_point = xf2.apply_inv(cp.v);
            mp.id = if flip { cp.id.swapped() } else { cp.id };
            mp.normal_impulse = 0.0;
            mp.tangent_impulse = 0.0;
            point_count += 1;
        }
    }
    manifold.point_count = point_count;
    manifold
}

/// Edge against circle. Vertex regions produce a `Circles` manifold, the
/// interior region a `FaceA` manifold with the edge normal facing the circle.
pub fn collide_edge_and_circle(
    edge_a: &EdgeShape,
    xf_a: &Transform,
    circle_b: &CircleShape,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    // Circle in the edge frame.
    let q = xf_a.apply_inv(xf_b.apply(circle_b.position));

    let a = edge_a.v1;
    let b = edge_a.v2;
    let e = b - a;

    // Barycentric coordinates
    let u = e.dot(b - q);
    let v = e.dot(q - a);

    let radius = edge_a.radius + circle_b.radius;

    let vertex_manifold = |p: Vec2, index: u8| {
        let mut m = Manifold {
            manifold_type: ManifoldType::Circles,
            local_point: p,
            local_normal: Vec2::ZERO,
            point_count: 1,
            ..Default::default()
        };
        m.points[0].local_point = circle_b.position;
        m.points[0].id = ContactId {
            index_a: index,
            index_b: 0,
            type_a: FeatureType::Vertex,
            type_b: FeatureType::Vertex,
        };
        m
    };

    // Region A
    if v <= 0.0 {
        if q.distance_squared(a) > radius * radius {
            return manifold;
        }
        return vertex_manifold(a, 0);
    }

    // Region B
    if u <= 0.0 {
        if q.distance_squared(b) > radius * radius {
            return manifold;
        }
        return vertex_manifold(b, 1);
    }

    // Region AB
    let den = e.length_squared();
    let p = (1.0 / den) * (u * a + v * b);
    if q.distance_squared(p) > radius * radius {
        return manifold;
    }

    let mut n = Vec2::new(-e.y, e.x);
    if n.dot(q - a) < 0.0 {
        n = -n;
    }

    manifold.manifold_type = ManifoldType::FaceA;
    manifold.local_normal = n.normalize();
    manifold.local_point = a;
    manifold.point_count = 1;
    manifold.points[0].local_point = circle_b.position;
    manifold.points[0].id = ContactId {
        index_a: 0,
        index_b: 0,
        type_a: FeatureType::Face,
        type_b: FeatureType::Vertex,
    };
    manifold
}

/// Edge against polygon, treating the edge as a two-sided, two-vertex polygon.
pub fn collide_edge_and_polygon(
    edge_a: &EdgeShape,
    xf_a: &Transform,
    polygon_b: &PolygonShape,
    xf_b: &Transform,
) -> Manifold {
    collide_polygons(&PolygonShape::from_edge(edge_a), xf_a, polygon_b, xf_b)
}
