//! Sequential impulse contact solver.
//!
//! Velocity constraints remove approaching normal velocity and apply box
//! friction; a separate position pass pushes overlapping shapes apart with
//! Baumgarte-style split impulses. Two-point manifolds are solved as a
//! block (a 2x2 mixed LCP) when the pair is well conditioned.

use glam::{Mat2, Vec2};

use crate::collision::{ManifoldType, WorldManifold};
use crate::math::{cross, cross_sv, cross_vs, inverse22, Rot, Transform};
use crate::settings::{
    BAUMGARTE, LINEAR_SLOP, MAX_CONDITION_NUMBER, MAX_LINEAR_CORRECTION, MAX_MANIFOLD_POINTS,
};

use super::body::Body;
use super::contact::Contact;
use super::fixture::Fixture;
use super::{body_pair, TimeStep};

#[derive(Debug, Clone, Copy, Default)]
struct VelocityConstraintPoint {
    r_a: Vec2,
    r_b: Vec2,
    normal_impulse: f32,
    tangent_impulse: f32,
    normal_mass: f32,
    tangent_mass: f32,
    velocity_bias: f32,
}

#[derive(Debug, Clone)]
struct ContactVelocityConstraint {
    points: [VelocityConstraintPoint; MAX_MANIFOLD_POINTS],
    normal: Vec2,
    /// Inverse of `k`, valid for the block solver.
    normal_mass: Mat2,
    k: Mat2,
    index_a: usize,
    index_b: usize,
    inv_mass_a: f32,
    inv_mass_b: f32,
    inv_i_a: f32,
    inv_i_b: f32,
    friction: f32,
    restitution: f32,
    threshold: f32,
    point_count: usize,
    contact_index: usize,
}

#[derive(Debug, Clone)]
struct ContactPositionConstraint {
    local_points: [Vec2; MAX_MANIFOLD_POINTS],
    local_normal: Vec2,
    local_point: Vec2,
    index_a: usize,
    index_b: usize,
    inv_mass_a: f32,
    inv_mass_b: f32,
    local_center_a: Vec2,
    local_center_b: Vec2,
    inv_i_a: f32,
    inv_i_b: f32,
    manifold_type: ManifoldType,
    radius_a: f32,
    radius_b: f32,
    point_count: usize,
}

/// Solver for the contacts of one island.
pub(crate) struct ContactSolver {
    velocity_constraints: Vec<ContactVelocityConstraint>,
    position_constraints: Vec<ContactPositionConstraint>,
}

#[inline]
fn transform_from(c: Vec2, a: f32, local_center: Vec2) -> Transform {
    let q = Rot::new(a);
    Transform {
        p: c - q.apply(local_center),
        q,
    }
}

impl ContactSolver {
    /// One constraint per contact in `contact_indices`. Warm-start impulses
    /// are copied from the manifolds and scaled by `dt_ratio`.
    pub(crate) fn new(
        step: &TimeStep,
        contact_indices: &[usize],
        contacts: &[Contact],
        fixtures: &[Fixture],
        bodies: &[Body],
    ) -> Self {
        let mut velocity_constraints = Vec::with_capacity(contact_indices.len());
        let mut position_constraints = Vec::with_capacity(contact_indices.len());

        for &contact_index in contact_indices {
            let contact = &contacts[contact_index];
            let fixture_a = &fixtures[contact.fixture_a.0];
            let fixture_b = &fixtures[contact.fixture_b.0];
            let index_a = fixture_a.body.0;
            let index_b = fixture_b.body.0;
            let body_a = &bodies[index_a];
            let body_b = &bodies[index_b];
            let manifold = &contact.manifold;

            let point_count = manifold.point_count;
            debug_assert!(point_count > 0);

            let mut vc = ContactVelocityConstraint {
                points: [VelocityConstraintPoint::default(); MAX_MANIFOLD_POINTS],
                normal: Vec2::ZERO,
                normal_mass: Mat2::ZERO,
                k: Mat2::ZERO,
                index_a,
                index_b,
                inv_mass_a: body_a.inv_mass,
                inv_mass_b: body_b.inv_mass,
                inv_i_a: body_a.inv_i,
                inv_i_b: body_b.inv_i,
                friction: contact.friction,
                restitution: contact.restitution,
                threshold: contact.restitution_threshold,
                point_count,
                contact_index,
            };

            let mut pc = ContactPositionConstraint {
                local_points: [Vec2::ZERO; MAX_MANIFOLD_POINTS],
                local_normal: manifold.local_normal,
                local_point: manifold.local_point,
                index_a,
                index_b,
                inv_mass_a: body_a.inv_mass,
                inv_mass_b: body_b.inv_mass,
                local_center_a: body_a.sweep.local_center,
                local_center_b: body_b.sweep.local_center,
                inv_i_a: body_a.inv_i,
                inv_i_b: body_b.inv_i,
                manifold_type: manifold.manifold_type,
                radius_a: fixture_a.shape.radius(),
                radius_b: fixture_b.shape.radius(),
                point_count,
            };

            for (j, mp) in manifold.points().iter().enumerate() {
                let vcp = &mut vc.points[j];
                if step.warm_starting {
                    vcp.normal_impulse = step.dt_ratio * mp.normal_impulse;
                    vcp.tangent_impulse = step.dt_ratio * mp.tangent_impulse;
                }
                pc.local_points[j] = mp.local_point;
            }

            velocity_constraints.push(vc);
            position_constraints.push(pc);
        }

        Self {
            velocity_constraints,
            position_constraints,
        }
    }

    /// Arms, effective masses, restitution bias and the block matrix from
    /// the current body positions.
    pub(crate) fn initialize_velocity_constraints(
        &mut self,
        contacts: &[Contact],
        bodies: &[Body],
    ) {
        for (vc, pc) in self
            .velocity_constraints
            .iter_mut()
            .zip(&self.position_constraints)
        {
            let manifold = &contacts[vc.contact_index].manifold;
            let body_a = &bodies[vc.index_a];
            let body_b = &bodies[vc.index_b];

            let (m_a, m_b) = (vc.inv_mass_a, vc.inv_mass_b);
            let (i_a, i_b) = (vc.inv_i_a, vc.inv_i_b);

            let c_a = body_a.sweep.c;
            let c_b = body_b.sweep.c;
            let v_a = body_a.linear_velocity;
            let w_a = body_a.angular_velocity;
            let v_b = body_b.linear_velocity;
            let w_b = body_b.angular_velocity;

            let xf_a = transform_from(c_a, body_a.sweep.a, pc.local_center_a);
            let xf_b = transform_from(c_b, body_b.sweep.a, pc.local_center_b);

            let world_manifold =
                WorldManifold::new(manifold, &xf_a, pc.radius_a, &xf_b, pc.radius_b);
            vc.normal = world_manifold.normal;
            let tangent = cross_vs(vc.normal, 1.0);

            for j in 0..vc.point_count {
                let vcp = &mut vc.points[j];
                vcp.r_a = world_manifold.points[j] - c_a;
                vcp.r_b = world_manifold.points[j] - c_b;

                let rn_a = cross(vcp.r_a, vc.normal);
                let rn_b = cross(vcp.r_b, vc.normal);
                let k_normal = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;
                vcp.normal_mass = if k_normal > 0.0 { 1.0 / k_normal } else { 0.0 };

                let rt_a = cross(vcp.r_a, tangent);
                let rt_b = cross(vcp.r_b, tangent);
                let k_tangent = m_a + m_b + i_a * rt_a * rt_a + i_b * rt_b * rt_b;
                vcp.tangent_mass = if k_tangent > 0.0 {
                    1.0 / k_tangent
                } else {
                    0.0
                };

                // Restitution only above the threshold approach speed.
                vcp.velocity_bias = 0.0;
                let v_rel = vc.normal.dot(
                    v_b + cross_sv(w_b, vcp.r_b) - v_a - cross_sv(w_a, vcp.r_a),
                );
                if v_rel < -vc.threshold {
                    vcp.velocity_bias = -vc.restitution * v_rel;
                }
            }

            if vc.point_count == 2 {
                let p1 = vc.points[0];
                let p2 = vc.points[1];

                let rn1_a = cross(p1.r_a, vc.normal);
                let rn1_b = cross(p1.r_b, vc.normal);
                let rn2_a = cross(p2.r_a, vc.normal);
                let rn2_b = cross(p2.r_b, vc.normal);

                let k11 = m_a + m_b + i_a * rn1_a * rn1_a + i_b * rn1_b * rn1_b;
                let k22 = m_a + m_b + i_a * rn2_a * rn2_a + i_b * rn2_b * rn2_b;
                let k12 = m_a + m_b + i_a * rn1_a * rn2_a + i_b * rn1_b * rn2_b;

                if k11 * k11 < MAX_CONDITION_NUMBER * (k11 * k22 - k12 * k12) {
                    vc.k = Mat2::from_cols(Vec2::new(k11, k12), Vec2::new(k12, k22));
                    vc.normal_mass = inverse22(&vc.k);
                } else {
                    // Nearly redundant points: solve only the first.
                    tracing::trace!(k11, k22, k12, "ill-conditioned block, dropping point");
                    vc.point_count = 1;
                }
            }
        }
    }

    /// Apply the accumulated impulses from the previous step.
    pub(crate) fn warm_start(&self, bodies: &mut [Body]) {
        for vc in &self.velocity_constraints {
            let (body_a, body_b) = body_pair(bodies, vc.index_a, vc.index_b);
            let tangent = cross_vs(vc.normal, 1.0);

            for vcp in &vc.points[..vc.point_count] {
                let p = vcp.normal_impulse * vc.normal + vcp.tangent_impulse * tangent;
                body_a.angular_velocity -= vc.inv_i_a * cross(vcp.r_a, p);
                body_a.linear_velocity -= vc.inv_mass_a * p;
                body_b.angular_velocity += vc.inv_i_b * cross(vcp.r_b, p);
                body_b.linear_velocity += vc.inv_mass_b * p;
            }
        }
    }

    /// One Gauss-Seidel pass over all contacts.
    pub(crate) fn solve_velocity_constraints(&mut self, bodies: &mut [Body]) {
        for vc in &mut self.velocity_constraints {
            let (body_a, body_b) = body_pair(bodies, vc.index_a, vc.index_b);
            let (m_a, m_b) = (vc.inv_mass_a, vc.inv_mass_b);
            let (i_a, i_b) = (vc.inv_i_a, vc.inv_i_b);

            let mut v_a = body_a.linear_velocity;
            let mut w_a = body_a.angular_velocity;
            let mut v_b = body_b.linear_velocity;
            let mut w_b = body_b.angular_velocity;

            let normal = vc.normal;
            let tangent = cross_vs(normal, 1.0);
            let friction = vc.friction;

            debug_assert!(vc.point_count == 1 || vc.point_count == 2);

            // Tangent first: friction depends on the normal impulse, and
            // non-penetration matters more than friction.
            for vcp in &mut vc.points[..vc.point_count] {
                let dv = v_b + cross_sv(w_b, vcp.r_b) - v_a - cross_sv(w_a, vcp.r_a);
                let vt = dv.dot(tangent);
                let lambda = vcp.tangent_mass * -vt;

                let max_friction = friction * vcp.normal_impulse;
                let new_impulse = (vcp.tangent_impulse + lambda).clamp(-max_friction, max_friction);
                let lambda = new_impulse - vcp.tangent_impulse;
                vcp.tangent_impulse = new_impulse;

                let p = lambda * tangent;
                v_a -= m_a * p;
                w_a -= i_a * cross(vcp.r_a, p);
                v_b += m_b * p;
                w_b += i_b * cross(vcp.r_b, p);
            }

            if vc.point_count == 1 {
                let vcp = &mut vc.points[0];
                let dv = v_b + cross_sv(w_b, vcp.r_b) - v_a - cross_sv(w_a, vcp.r_a);
                let vn = dv.dot(normal);
                let lambda = -vcp.normal_mass * (vn - vcp.velocity_bias);

                let new_impulse = (vcp.normal_impulse + lambda).max(0.0);
                let lambda = new_impulse - vcp.normal_impulse;
                vcp.normal_impulse = new_impulse;

                let p = lambda * normal;
                v_a -= m_a * p;
                w_a -= i_a * cross(vcp.r_a, p);
                v_b += m_b * p;
                w_b += i_b * cross(vcp.r_b, p);
            } else {
                solve_block(vc, &mut v_a, &mut w_a, &mut v_b, &mut w_b);
            }

            body_a.linear_velocity = v_a;
            body_a.angular_velocity = w_a;
            body_b.linear_velocity = v_b;
            body_b.angular_velocity = w_b;
        }
    }

    /// Copy accumulated impulses back into the manifolds for warm starting.
    pub(crate) fn store_impulses(&self, contacts: &mut [Contact]) {
        for vc in &self.velocity_constraints {
            let manifold = &mut contacts[vc.contact_index].manifold;
            for (mp, vcp) in manifold.points_mut().iter_mut().zip(&vc.points) {
                mp.normal_impulse = vcp.normal_impulse;
                mp.tangent_impulse = vcp.tangent_impulse;
            }
        }
    }

    /// One pass of position correction. Returns `true` when the deepest
    /// remaining overlap is within `3 * LINEAR_SLOP`.
    pub(crate) fn solve_position_constraints(&self, bodies: &mut [Body]) -> bool {
        let mut min_separation = 0.0_f32;

        for pc in &self.position_constraints {
            let (body_a, body_b) = body_pair(bodies, pc.index_a, pc.index_b);
            let (m_a, m_b) = (pc.inv_mass_a, pc.inv_mass_b);
            let (i_a, i_b) = (pc.inv_i_a, pc.inv_i_b);

            let mut c_a = body_a.sweep.c;
            let mut a_a = body_a.sweep.a;
            let mut c_b = body_b.sweep.c;
            let mut a_b = body_b.sweep.a;

            for j in 0..pc.point_count {
                let xf_a = transform_from(c_a, a_a, pc.local_center_a);
                let xf_b = transform_from(c_b, a_b, pc.local_center_b);

                let (normal, point, separation) = position_solver_manifold(pc, &xf_a, &xf_b, j);

                let r_a = point - c_a;
                let r_b = point - c_b;

                min_separation = min_separation.min(separation);

                // Prevent large corrections and allow slop.
                let c = (BAUMGARTE * (separation + LINEAR_SLOP)).clamp(-MAX_LINEAR_CORRECTION, 0.0);

                let rn_a = cross(r_a, normal);
                let rn_b = cross(r_b, normal);
                let k = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;
                let impulse = if k > 0.0 { -c / k } else { 0.0 };

                let p = impulse * normal;
                c_a -= m_a * p;
                a_a -= i_a * cross(r_a, p);
                c_b += m_b * p;
                a_b += i_b * cross(r_b, p);
            }

            body_a.set_sweep_position(c_a, a_a);
            body_b.set_sweep_position(c_b, a_b);
        }

        min_separation >= -3.0 * LINEAR_SLOP
    }
}

/// Two-point normal solve as a mixed LCP.
///
/// `vn = A * x + b` with `vn >= 0`, `x >= 0` and `vn_i * x_i = 0`. The four
/// cases are tried in order and the first admissible one is applied; if none
/// is, the accumulated impulses stay as they are.
fn solve_block(
    vc: &mut ContactVelocityConstraint,
    v_a: &mut Vec2,
    w_a: &mut f32,
    v_b: &mut Vec2,
    w_b: &mut f32,
) {
    let normal = vc.normal;
    let (m_a, m_b) = (vc.inv_mass_a, vc.inv_mass_b);
    let (i_a, i_b) = (vc.inv_i_a, vc.inv_i_b);

    let cp1 = vc.points[0];
    let cp2 = vc.points[1];

    let a = Vec2::new(cp1.normal_impulse, cp2.normal_impulse);
    debug_assert!(a.x >= 0.0 && a.y >= 0.0);

    let dv1 = *v_b + cross_sv(*w_b, cp1.r_b) - *v_a - cross_sv(*w_a, cp1.r_a);
    let dv2 = *v_b + cross_sv(*w_b, cp2.r_b) - *v_a - cross_sv(*w_a, cp2.r_a);

    let vn1 = dv1.dot(normal);
    let vn2 = dv2.dot(normal);

    // b' = b - A * a, the velocity without the current accumulated impulse.
    let b = Vec2::new(vn1 - cp1.velocity_bias, vn2 - cp2.velocity_bias) - vc.k * a;

    let mut apply = |x: Vec2, vc: &mut ContactVelocityConstraint| {
        let d = x - a;
        let p1 = d.x * normal;
        let p2 = d.y * normal;
        *v_a -= m_a * (p1 + p2);
        *w_a -= i_a * (cross(cp1.r_a, p1) + cross(cp2.r_a, p2));
        *v_b += m_b * (p1 + p2);
        *w_b += i_b * (cross(cp1.r_b, p1) + cross(cp2.r_b, p2));
        vc.points[0].normal_impulse = x.x;
        vc.points[1].normal_impulse = x.y;
    };

    // Case 1: both points active, vn = 0.
    let x = -(vc.normal_mass * b);
    if x.x >= 0.0 && x.y >= 0.0 {
        apply(x, vc);
        return;
    }

    // Case 2: only point 1 active, vn1 = 0, x2 = 0.
    let x = Vec2::new(-cp1.normal_mass * b.x, 0.0);
    let vn2 = vc.k.x_axis.y * x.x + b.y;
    if x.x >= 0.0 && vn2 >= 0.0 {
        apply(x, vc);
        return;
    }

    // Case 3: only point 2 active, x1 = 0, vn2 = 0.
    let x = Vec2::new(0.0, -cp2.normal_mass * b.y);
    let vn1 = vc.k.y_axis.x * x.y + b.x;
    if x.y >= 0.0 && vn1 >= 0.0 {
        apply(x, vc);
        return;
    }

    // Case 4: both separating, x = 0.
    let x = Vec2::ZERO;
    if b.x >= 0.0 && b.y >= 0.0 {
        apply(x, vc);
    }
}

/// Normal, contact point and separation for point `index` at the current
/// solver positions.
fn position_solver_manifold(
    pc: &ContactPositionConstraint,
    xf_a: &Transform,
    xf_b: &Transform,
    index: usize,
) -> (Vec2, Vec2, f32) {
    match pc.manifold_type {
        ManifoldType::Circles => {
            let point_a = xf_a.apply(pc.local_point);
            let point_b = xf_b.apply(pc.local_points[0]);
            let normal = (point_b - point_a).try_normalize().unwrap_or(Vec2::X);
            let point = 0.5 * (point_a + point_b);
            let separation = (point_b - point_a).dot(normal) - pc.radius_a - pc.radius_b;
            (normal, point, separation)
        }
        ManifoldType::FaceA => {
            let normal = xf_a.q.apply(pc.local_normal);
            let plane_point = xf_a.apply(pc.local_point);
            let clip_point = xf_b.apply(pc.local_points[index]);
            let separation = (clip_point - plane_point).dot(normal) - pc.radius_a - pc.radius_b;
            (normal, clip_point, separation)
        }
        ManifoldType::FaceB => {
            let normal = xf_b.q.apply(pc.local_normal);
            let plane_point = xf_b.apply(pc.local_point);
            let clip_point = xf_a.apply(pc.local_points[index]);
            let separation = (clip_point - plane_point).dot(normal) - pc.radius_a - pc.radius_b;
            // Point from A to B.
            (-normal, clip_point, separation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{CircleShape, PolygonShape};
    use crate::config::PhysicsConfig;
    use crate::dynamics::{BodyDef, FixtureDef, World};

    /// Box resting on a static ground box, overlapping slightly, with the
    /// contact already found.
    fn box_on_ground(velocity: Vec2, restitution: f32) -> World {
        let mut world = World::new(PhysicsConfig::default());
        let ground = world.create_body(&BodyDef::default());
        world
            .create_fixture(ground, &FixtureDef::new(PolygonShape::new_box(5.0, 0.5)))
            .unwrap();

        let mut def = BodyDef::dynamic().with_position(Vec2::new(0.0, 0.99));
        def.linear_velocity = velocity;
        let block = world.create_body(&def);
        world
            .create_fixture(
                block,
                &FixtureDef::new(PolygonShape::new_box(0.5, 0.5))
                    .with_density(1.0)
                    .with_restitution(restitution),
            )
            .unwrap();

        world.update_contacts();
        assert_eq!(world.contact_count(), 1);
        world
    }

    fn build_solver(world: &World, warm_starting: bool) -> ContactSolver {
        let mut step = TimeStep::new(1.0 / 60.0, 60.0, 8, 3);
        step.warm_starting = warm_starting;
        let indices: Vec<usize> = (0..world.contact_manager.contacts.len()).collect();
        let mut solver = ContactSolver::new(
            &step,
            &indices,
            &world.contact_manager.contacts,
            &world.fixtures,
            &world.bodies,
        );
        solver.initialize_velocity_constraints(&world.contact_manager.contacts, &world.bodies);
        solver
    }

    fn normal_velocities(solver: &ContactSolver, bodies: &[Body]) -> Vec<f32> {
        let mut out = Vec::new();
        for vc in &solver.velocity_constraints {
            let a = &bodies[vc.index_a];
            let b = &bodies[vc.index_b];
            for vcp in &vc.points[..vc.point_count] {
                let dv = b.linear_velocity + cross_sv(b.angular_velocity, vcp.r_b)
                    - a.linear_velocity
                    - cross_sv(a.angular_velocity, vcp.r_a);
                out.push(dv.dot(vc.normal));
            }
        }
        out
    }

    #[test]
    fn test_solver_removes_approach_velocity() {
        let mut world = box_on_ground(Vec2::new(0.3, -2.0), 0.0);
        let mut solver = build_solver(&world, false);
        for _ in 0..9 {
            solver.solve_velocity_constraints(&mut world.bodies);
        }
        // Friction is clamped against the normal impulse from before the
        // normal solve of the same iteration.
        let friction = solver.velocity_constraints[0].friction;
        let bounds: Vec<f32> = solver.velocity_constraints[0].points[..2]
            .iter()
            .map(|vcp| friction * vcp.normal_impulse)
            .collect();
        solver.solve_velocity_constraints(&mut world.bodies);

        for vn in normal_velocities(&solver, &world.bodies) {
            assert!(vn >= -1e-3, "normal velocity after solve = {}", vn);
        }
        let points = &solver.velocity_constraints[0].points[..2];
        for (vcp, bound) in points.iter().zip(bounds) {
            assert!(
                vcp.normal_impulse >= 0.0,
                "normal impulse = {}",
                vcp.normal_impulse
            );
            assert!(
                vcp.tangent_impulse.abs() <= bound + 1e-6,
                "tangent impulse = {}, bound = {}",
                vcp.tangent_impulse, bound
            );
        }
    }

    #[test]
    fn test_restitution_threshold() {
        // Slow approach: below the threshold no bounce bias.
        let world = box_on_ground(Vec2::new(0.0, -0.5), 1.0);
        let solver = build_solver(&world, false);
        for vcp in &solver.velocity_constraints[0].points[..2] {
            assert_eq!(vcp.velocity_bias, 0.0);
        }

        // Fast approach: bias equals restitution times approach speed.
        let world = box_on_ground(Vec2::new(0.0, -3.0), 0.5);
        let solver = build_solver(&world, false);
        for vcp in &solver.velocity_constraints[0].points[..2] {
            assert!(
                (vcp.velocity_bias - 1.5).abs() < 1e-4,
                "velocity bias = {}",
                vcp.velocity_bias
            );
        }
    }

    #[test]
    fn test_block_solver_matches_iterated_points() {
        // Tilted box so the two points carry different loads.
        let mut world = box_on_ground(Vec2::new(0.0, -2.0), 0.0);
        world.bodies[1].angular_velocity = 1.5;

        let mut block = build_solver(&world, false);

        // Reference: solve each point as an independent 1-point constraint
        // until convergence.
        let mut single = build_solver(&world, false);
        let vc = single.velocity_constraints[0].clone();
        single.velocity_constraints = vec![vc.clone(), vc];
        single.velocity_constraints[0].point_count = 1;
        single.velocity_constraints[1].points.swap(0, 1);
        single.velocity_constraints[1].point_count = 1;
        for vc in &mut single.velocity_constraints {
            vc.friction = 0.0;
        }
        block.velocity_constraints[0].friction = 0.0;

        let mut block_bodies = world.bodies.clone();
        block.solve_velocity_constraints(&mut block_bodies);

        let mut single_bodies = world.bodies.clone();
        for _ in 0..500 {
            single.solve_velocity_constraints(&mut single_bodies);
        }

        let block_impulses = [
            block.velocity_constraints[0].points[0].normal_impulse,
            block.velocity_constraints[0].points[1].normal_impulse,
        ];
        let single_impulses = [
            single.velocity_constraints[0].points[0].normal_impulse,
            single.velocity_constraints[1].points[0].normal_impulse,
        ];
        for i in 0..2 {
            assert!(
                (block_impulses[i] - single_impulses[i]).abs() < 1e-3,
                "point {}: block = {}, iterated = {}",
                i, block_impulses[i], single_impulses[i]
            );
        }
        let vb = block_bodies[1].linear_velocity;
        let vs = single_bodies[1].linear_velocity;
        assert!(
            (vb - vs).length() < 1e-3,
            "block {:?} vs iterated {:?}",
            vb, vs
        );
    }

    #[test]
    fn test_warm_start_scales_by_dt_ratio() {
        let mut world = box_on_ground(Vec2::ZERO, 0.0);
        for mp in world.contact_manager.contacts[0].manifold.points_mut() {
            mp.normal_impulse = 2.0;
        }
        let mut step = TimeStep::new(1.0 / 60.0, 30.0, 8, 3);
        step.warm_starting = true;
        let solver = ContactSolver::new(
            &step,
            &[0],
            &world.contact_manager.contacts,
            &world.fixtures,
            &world.bodies,
        );
        assert!((step.dt_ratio - 0.5).abs() < 1e-6);
        for vcp in &solver.velocity_constraints[0].points[..2] {
            assert!((vcp.normal_impulse - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_position_solver_reduces_overlap() {
        let mut world = World::new(PhysicsConfig::default());
        let disc = FixtureDef::new(CircleShape::new(1.0)).with_density(1.0);
        let a = world.create_body(&BodyDef::dynamic());
        world.create_fixture(a, &disc).unwrap();
        let b = world.create_body(&BodyDef::dynamic().with_position(Vec2::new(1.5, 0.0)));
        world.create_fixture(b, &disc).unwrap();
        world.update_contacts();

        let solver = build_solver(&world, false);
        let mut solved = false;
        for _ in 0..50 {
            if solver.solve_position_constraints(&mut world.bodies) {
                solved = true;
                break;
            }
        }
        assert!(solved);
        let (p_a, p_b) = (world.bodies[0].position(), world.bodies[1].position());
        let gap = p_b.distance(p_a) - 2.0;
        assert!(gap >= -3.0 * LINEAR_SLOP, "gap = {}", gap);
        // Transforms follow the sweeps.
        assert!((world.bodies[1].transform().p - world.bodies[1].sweep.c).length() < 1e-6);
    }
}
