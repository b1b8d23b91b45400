//! GJK distance between convex proxies.
//!
//! Computes the closest points between two convex shapes. A [`SimplexCache`]
//! carried between calls for the same shape pair seeds the next query with the
//! previous simplex, which usually converges in one or two iterations when the
//! shapes moved only a little.

use glam::Vec2;

use crate::math::{cross, cross_sv, cross_vs, Transform};
use crate::settings::{MAX_DISTANCE_ITERATIONS, MAX_POLYGON_VERTICES};

use super::shapes::Shape;

/// Support points of a convex shape plus its skin radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceProxy {
    vertices: [Vec2; MAX_POLYGON_VERTICES],
    count: usize,
    pub radius: f32,
}

impl DistanceProxy {
    /// Proxy for one child of `shape`. Chains expose the edge for `child_index`.
    ///
    /// # Panics
    /// If `child_index` is out of range for a chain.
    pub fn new(shape: &Shape, child_index: usize) -> Self {
        match shape {
            Shape::Circle(c) => Self::from_vertices(&[c.position], c.radius),
            Shape::Polygon(p) => Self::from_vertices(p.vertices(), p.radius),
            Shape::Edge(e) => Self::from_vertices(&[e.v1, e.v2], e.radius),
            Shape::Chain(c) => {
                let edge = c.child_edge(child_index);
                Self::from_vertices(&[edge.v1, edge.v2], edge.radius)
            }
        }
    }

    /// # Panics
    /// If `vertices` is empty or longer than `MAX_POLYGON_VERTICES`.
    pub fn from_vertices(vertices: &[Vec2], radius: f32) -> Self {
        assert!(
            !vertices.is_empty() && vertices.len() <= MAX_POLYGON_VERTICES,
            "distance proxy needs 1..={} vertices, got {}",
            MAX_POLYGON_VERTICES,
            vertices.len()
        );
        let mut buf = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        buf[..vertices.len()].copy_from_slice(vertices);
        Self {
            vertices: buf,
            count: vertices.len(),
            radius,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn vertex(&self, index: usize) -> Vec2 {
        assert!(index < self.count, "proxy vertex {index} out of range");
        self.vertices[index]
    }

    /// Index of the vertex farthest along `d`.
    pub fn support(&self, d: Vec2) -> usize {
        let mut best_index = 0;
        let mut best_value = self.vertices[0].dot(d);
        for i in 1..self.count {
            let value = self.vertices[i].dot(d);
            if value > best_value {
                best_index = i;
                best_value = value;
            }
        }
        best_index
    }
}

/// Warm-start state for repeated distance queries on the same pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimplexCache {
    /// Length or area of the cached simplex.
    pub metric: f32,
    pub count: u16,
    pub index_a: [u8; 3],
    pub index_b: [u8; 3],
}

/// Input for [`distance`].
#[derive(Debug, Clone, Copy)]
pub struct DistanceInput {
    pub proxy_a: DistanceProxy,
    pub proxy_b: DistanceProxy,
    pub transform_a: Transform,
    pub transform_b: Transform,
    pub use_radii: bool,
}

/// Result of [`distance`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DistanceOutput {
    /// Closest point on shape A.
    pub point_a: Vec2,
    /// Closest point on shape B.
    pub point_b: Vec2,
    pub distance: f32,
    /// Number of GJK iterations used.
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct SimplexVertex {
    /// Support point in proxy A.
    w_a: Vec2,
    /// Support point in proxy B.
    w_b: Vec2,
    /// `w_b - w_a`
    w: Vec2,
    /// Barycentric coordinate for the closest point.
    a: f32,
    index_a: usize,
    index_b: usize,
}

#[derive(Debug, Clone, Copy)]
struct Simplex {
    v: [SimplexVertex; 3],
    count: usize,
}

impl Simplex {
    fn from_cache(
        cache: &SimplexCache,
        proxy_a: &DistanceProxy,
        xf_a: &Transform,
        proxy_b: &DistanceProxy,
        xf_b: &Transform,
    ) -> Self {
        debug_assert!(cache.count <= 3);
        let mut simplex = Simplex {
            v: [SimplexVertex::default(); 3],
            count: usize::from(cache.count),
        };

        for i in 0..simplex.count {
            simplex.v[i] = support_pair(
                usize::from(cache.index_a[i]),
                proxy_a,
                xf_a,
                usize::from(cache.index_b[i]),
                proxy_b,
                xf_b,
            );
        }

        // Flush the cache if the metric changed a lot, the old simplex is
        // probably no longer a good seed.
        if simplex.count > 1 {
            let metric1 = cache.metric;
            let metric2 = simplex.metric();
            if metric2 < 0.5 * metric1 || 2.0 * metric1 < metric2 || metric2 < f32::EPSILON {
                simplex.count = 0;
            }
        }

        if simplex.count == 0 {
            simplex.v[0] = support_pair(0, proxy_a, xf_a, 0, proxy_b, xf_b);
            simplex.v[0].a = 1.0;
            simplex.count = 1;
        }

        simplex
    }

    fn write_cache(&self, cache: &mut SimplexCache) {
        cache.metric = self.metric();
        cache.count = self.count as u16;
        for i in 0..self.count {
            cache.index_a[i] = self.v[i].index_a as u8;
            cache.index_b[i] = self.v[i].index_b as u8;
        }
    }

    fn search_direction(&self) -> Vec2 {
        match self.count {
            1 => -self.v[0].w,
            2 => {
                let e12 = self.v[1].w - self.v[0].w;
                let sgn = cross(e12, -self.v[0].w);
                if sgn > 0.0 {
                    // Origin is left of e12.
                    cross_sv(1.0, e12)
                } else {
                    cross_vs(e12, 1.0)
                }
            }
            _ => {
                debug_assert!(false, "no search direction for {} vertices", self.count);
                Vec2::ZERO
            }
        }
    }

    fn witness_points(&self) -> (Vec2, Vec2) {
        let v = &self.v;
        match self.count {
            1 => (v[0].w_a, v[0].w_b),
            2 => (
                v[0].a * v[0].w_a + v[1].a * v[1].w_a,
                v[0].a * v[0].w_b + v[1].a * v[1].w_b,
            ),
            3 => {
                let p = v[0].a * v[0].w_a + v[1].a * v[1].w_a + v[2].a * v[2].w_a;
                (p, p)
            }
            _ => {
                debug_assert!(false, "invalid simplex count {}", self.count);
                (Vec2::ZERO, Vec2::ZERO)
            }
        }
    }

    fn metric(&self) -> f32 {
        let v = &self.v;
        match self.count {
            2 => v[0].w.distance(v[1].w),
            3 => cross(v[1].w - v[0].w, v[2].w - v[0].w),
            _ => 0.0,
        }
    }

    /// Closest point on the segment `w1 w2` to the origin.
    ///
    /// Regions: before `w1` (`d12_2 <= 0`), after `w2` (`d12_1 <= 0`), or on
    /// the segment with barycentric weights `d12_1`, `d12_2`.
    fn solve2(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let e12 = w2 - w1;

        // w1 region
        let d12_2 = -w1.dot(e12);
        if d12_2 <= 0.0 {
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // w2 region
        let d12_1 = w2.dot(e12);
        if d12_1 <= 0.0 {
            self.v[1].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[1];
            return;
        }

        // Must be in e12 region.
        let inv_d12 = 1.0 / (d12_1 + d12_2);
        self.v[0].a = d12_1 * inv_d12;
        self.v[1].a = d12_2 * inv_d12;
        self.count = 2;
    }

    /// Closest feature of the triangle `w1 w2 w3` to the origin.
    ///
    /// Vertex regions are tested with edge barycentrics, edge regions also
    /// need the sign of the triangle barycentric opposite that edge.
    fn solve3(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let w3 = self.v[2].w;

        let e12 = w2 - w1;
        let d12_1 = w2.dot(e12);
        let d12_2 = -w1.dot(e12);

        let e13 = w3 - w1;
        let d13_1 = w3.dot(e13);
        let d13_2 = -w1.dot(e13);

        let e23 = w3 - w2;
        let d23_1 = w3.dot(e23);
        let d23_2 = -w2.dot(e23);

        // Triangle123
        let n123 = cross(e12, e13);
        let d123_1 = n123 * cross(w2, w3);
        let d123_2 = n123 * cross(w3, w1);
        let d123_3 = n123 * cross(w1, w2);

        // w1 region
        if d12_2 <= 0.0 && d13_2 <= 0.0 {
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // e12
        if d12_1 > 0.0 && d12_2 > 0.0 && d123_3 <= 0.0 {
            let inv = 1.0 / (d12_1 + d12_2);
            self.v[0].a = d12_1 * inv;
            self.v[1].a = d12_2 * inv;
            self.count = 2;
            return;
        }

        // e13
        if d13_1 > 0.0 && d13_2 > 0.0 && d123_2 <= 0.0 {
            let inv = 1.0 / (d13_1 + d13_2);
            self.v[0].a = d13_1 * inv;
            self.v[2].a = d13_2 * inv;
            self.count = 2;
            self.v[1] = self.v[2];
            return;
        }

        // w2 region
        if d12_1 <= 0.0 && d23_2 <= 0.0 {
            self.v[1].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[1];
            return;
        }

        // w3 region
        if d13_1 <= 0.0 && d23_1 <= 0.0 {
            self.v[2].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[2];
            return;
        }

        // e23
        if d23_1 > 0.0 && d23_2 > 0.0 && d123_1 <= 0.0 {
            let inv = 1.0 / (d23_1 + d23_2);
            self.v[1].a = d23_1 * inv;
            self.v[2].a = d23_2 * inv;
            self.count = 2;
            self.v[0] = self.v[2];
            return;
        }

        // Must be in triangle123
        let inv = 1.0 / (d123_1 + d123_2 + d123_3);
        self.v[0].a = d123_1 * inv;
        self.v[1].a = d123_2 * inv;
        self.v[2].a = d123_3 * inv;
        self.count = 3;
    }
}

#[inline]
fn support_pair(
    index_a: usize,
    proxy_a: &DistanceProxy,
    xf_a: &Transform,
    index_b: usize,
    proxy_b: &DistanceProxy,
    xf_b: &Transform,
) -> SimplexVertex {
    let w_a = xf_a.apply(proxy_a.vertex(index_a));
    let w_b = xf_b.apply(proxy_b.vertex(index_b));
    SimplexVertex {
        w_a,
        w_b,
        w: w_b - w_a,
        a: 0.0,
        index_a,
        index_b,
    }
}

/// Closest points between two convex proxies.
///
/// `cache` seeds the simplex and is updated with the final one. Pass a
/// default cache on the first call for a pair.
pub fn distance(cache: &mut SimplexCache, input: &DistanceInput) -> DistanceOutput {
    let proxy_a = &input.proxy_a;
    let proxy_b = &input.proxy_b;
    let xf_a = &input.transform_a;
    let xf_b = &input.transform_b;

    let mut simplex = Simplex::from_cache(cache, proxy_a, xf_a, proxy_b, xf_b);

    // Support indices of the previous simplex, for duplicate detection.
    let mut save_a = [0usize; 3];
    let mut save_b = [0usize; 3];

    let mut iter = 0;
    while iter < MAX_DISTANCE_ITERATIONS {
        let save_count = simplex.count;
        for i in 0..save_count {
            save_a[i] = simplex.v[i].index_a;
            save_b[i] = simplex.v[i].index_b;
        }

        match simplex.count {
            1 => {}
            2 => simplex.solve2(),
            3 => simplex.solve3(),
            n => debug_assert!(false, "invalid simplex count {n}"),
        }

        // Origin is inside the triangle: overlap.
        if simplex.count == 3 {
            break;
        }

        let d = simplex.search_direction();

        // The origin is probably on a segment or vertex of the simplex; no
        // search direction can be trusted.
        if d.length_squared() < f32::EPSILON * f32::EPSILON {
            break;
        }

        let index_a = proxy_a.support(xf_a.q.apply_inv(-d));
        let index_b = proxy_b.support(xf_b.q.apply_inv(d));
        simplex.v[simplex.count] = support_pair(index_a, proxy_a, xf_a, index_b, proxy_b, xf_b);

        iter += 1;

        // A repeated support point means no further progress is possible.
        let duplicate = (0..save_count).any(|i| index_a == save_a[i] && index_b == save_b[i]);
        if duplicate {
            break;
        }

        simplex.count += 1;
    }

    if iter == MAX_DISTANCE_ITERATIONS {
        tracing::debug!(iterations = iter, "GJK hit the iteration limit");
    }

    let (mut point_a, mut point_b) = simplex.witness_points();
    let mut dist = point_a.distance(point_b);

    simplex.write_cache(cache);

    if input.use_radii {
        let r_a = proxy_a.radius;
        let r_b = proxy_b.radius;

        if dist > r_a + r_b && dist > f32::EPSILON {
            // Shapes are still separated: move the witness points onto the surfaces.
            dist -= r_a + r_b;
            let normal = (point_b - point_a).normalize();
            point_a += r_a * normal;
            point_b -= r_b * normal;
        } else {
            // Shapes overlap once radii are included.
            let p = 0.5 * (point_a + point_b);
            point_a = p;
            point_b = p;
            dist = 0.0;
        }
    }

    DistanceOutput {
        point_a,
        point_b,
        distance: dist,
        iterations: iter,
    }
}

/// Whether two shape children overlap, including their skin radii.
pub fn test_overlap(
    shape_a: &Shape,
    child_a: usize,
    shape_b: &Shape,
    child_b: usize,
    xf_a: &Transform,
    xf_b: &Transform,
) -> bool {
    let input = DistanceInput {
        proxy_a: DistanceProxy::new(shape_a, child_a),
        proxy_b: DistanceProxy::new(shape_b, child_b),
        transform_a: *xf_a,
        transform_b: *xf_b,
        use_radii: true,
    };
    let mut cache = SimplexCache::default();
    let output = distance(&mut cache, &input);
    output.distance < 10.0 * f32::EPSILON
}
