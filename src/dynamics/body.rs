//! Rigid bodies.

use glam::Vec2;

use crate::collision::MassData;
use crate::math::{cross, cross_sv, Rot, Sweep, Transform};

use super::{FixtureHandle, JointHandle};

/// How a body responds to forces and contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyType {
    /// Zero mass, zero velocity, moved only by the user.
    #[default]
    Static,
    /// Zero mass, velocity set by the user, moved by the solver.
    Kinematic,
    /// Positive mass, velocity determined by forces and constraints.
    Dynamic,
}

/// Parameters used to create a body.
#[derive(Debug, Clone)]
pub struct BodyDef {
    pub body_type: BodyType,
    /// World position of the body origin.
    pub position: Vec2,
    /// World angle in radians.
    pub angle: f32,
    /// Velocity of the body origin.
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Default: true.
    pub allow_sleep: bool,
    /// Default: true.
    pub awake: bool,
    /// Prevent rotation (zero inverse inertia).
    pub fixed_rotation: bool,
    /// Default: 1.0.
    pub gravity_scale: f32,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            body_type: BodyType::Static,
            position: Vec2::ZERO,
            angle: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            allow_sleep: true,
            awake: true,
            fixed_rotation: false,
            gravity_scale: 1.0,
        }
    }
}

impl BodyDef {
    pub fn dynamic() -> Self {
        Self {
            body_type: BodyType::Dynamic,
            ..Default::default()
        }
    }

    pub fn kinematic() -> Self {
        Self {
            body_type: BodyType::Kinematic,
            ..Default::default()
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }
}

/// A rigid body. Created and owned by the world.
#[derive(Debug, Clone)]
pub struct Body {
    pub(crate) body_type: BodyType,
    /// Body origin transform.
    pub(crate) xf: Transform,
    /// Center of mass motion over the current step.
    pub(crate) sweep: Sweep,

    pub(crate) linear_velocity: Vec2,
    pub(crate) angular_velocity: f32,

    pub(crate) force: Vec2,
    pub(crate) torque: f32,

    pub(crate) mass: f32,
    pub(crate) inv_mass: f32,
    /// Rotational inertia about the center of mass.
    pub(crate) inertia: f32,
    pub(crate) inv_i: f32,

    pub(crate) linear_damping: f32,
    pub(crate) angular_damping: f32,
    pub(crate) gravity_scale: f32,

    pub(crate) sleep_time: f32,
    pub(crate) awake: bool,
    pub(crate) allow_sleep: bool,
    pub(crate) fixed_rotation: bool,

    pub(crate) fixtures: Vec<FixtureHandle>,
    pub(crate) joints: Vec<JointHandle>,
    pub(crate) island_flag: bool,
}

impl Body {
    pub(crate) fn new(def: &BodyDef) -> Self {
        let xf = Transform::new(def.position, def.angle);
        let sweep = Sweep {
            local_center: Vec2::ZERO,
            c0: xf.p,
            c: xf.p,
            a0: def.angle,
            a: def.angle,
        };

        let (mass, inv_mass) = if def.body_type == BodyType::Dynamic {
            (1.0, 1.0)
        } else {
            (0.0, 0.0)
        };

        let (linear_velocity, angular_velocity) = if def.body_type != BodyType::Static {
            (def.linear_velocity, def.angular_velocity)
        } else {
            (Vec2::ZERO, 0.0)
        };
        Self {
            body_type: def.body_type,
            xf,
            sweep,
            linear_velocity,
            angular_velocity,
            force: Vec2::ZERO,
            torque: 0.0,
            mass,
            inv_mass,
            inertia: 0.0,
            inv_i: 0.0,
            linear_damping: def.linear_damping,
            angular_damping: def.angular_damping,
            gravity_scale: def.gravity_scale,
            sleep_time: 0.0,
            awake: def.awake,
            allow_sleep: def.allow_sleep,
            fixed_rotation: def.fixed_rotation,
            fixtures: Vec::new(),
            joints: Vec::new(),
            island_flag: false,
        }
    }

    #[inline]
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    #[inline]
    pub fn transform(&self) -> &Transform {
        &self.xf
    }

    /// World position of the body origin.
    #[inline]
    pub fn position(&self) -> Vec2 {
        self.xf.p
    }

    #[inline]
    pub fn angle(&self) -> f32 {
        self.sweep.a
    }

    #[inline]
    pub fn world_center(&self) -> Vec2 {
        self.sweep.c
    }

    #[inline]
    pub fn local_center(&self) -> Vec2 {
        self.sweep.local_center
    }

    #[inline]
    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    /// Ignored for static bodies. A non-zero velocity wakes the body.
    pub fn set_linear_velocity(&mut self, v: Vec2) {
        if self.body_type == BodyType::Static {
            return;
        }
        if v.dot(v) > 0.0 {
            self.set_awake(true);
        }
        self.linear_velocity = v;
    }

    #[inline]
    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    /// Ignored for static bodies. A non-zero velocity wakes the body.
    pub fn set_angular_velocity(&mut self, w: f32) {
        if self.body_type == BodyType::Static {
            return;
        }
        if w * w > 0.0 {
            self.set_awake(true);
        }
        self.angular_velocity = w;
    }

    /// Apply a force at a world point. Only affects dynamic bodies.
    pub fn apply_force(&mut self, force: Vec2, point: Vec2, wake: bool) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake && !self.awake {
            self.set_awake(true);
        }
        if self.awake {
            self.force += force;
            self.torque += cross(point - self.sweep.c, force);
        }
    }

    pub fn apply_force_to_center(&mut self, force: Vec2, wake: bool) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake && !self.awake {
            self.set_awake(true);
        }
        if self.awake {
            self.force += force;
        }
    }

    pub fn apply_torque(&mut self, torque: f32, wake: bool) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake && !self.awake {
            self.set_awake(true);
        }
        if self.awake {
            self.torque += torque;
        }
    }

    /// Apply an impulse at a world point, changing velocity immediately.
    pub fn apply_linear_impulse(&mut self, impulse: Vec2, point: Vec2, wake: bool) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake && !self.awake {
            self.set_awake(true);
        }
        if self.awake {
            self.linear_velocity += self.inv_mass * impulse;
            self.angular_velocity += self.inv_i * cross(point - self.sweep.c, impulse);
        }
    }

    pub fn apply_angular_impulse(&mut self, impulse: f32, wake: bool) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        if wake && !self.awake {
            self.set_awake(true);
        }
        if self.awake {
            self.angular_velocity += self.inv_i * impulse;
        }
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Rotational inertia about the body origin.
    #[inline]
    pub fn inertia(&self) -> f32 {
        self.inertia + self.mass * self.sweep.local_center.length_squared()
    }

    pub fn mass_data(&self) -> MassData {
        MassData {
            mass: self.mass,
            center: self.sweep.local_center,
            inertia: self.inertia(),
        }
    }

    #[inline]
    pub fn world_point(&self, local_point: Vec2) -> Vec2 {
        self.xf.apply(local_point)
    }

    #[inline]
    pub fn world_vector(&self, local_vector: Vec2) -> Vec2 {
        self.xf.q.apply(local_vector)
    }

    #[inline]
    pub fn local_point(&self, world_point: Vec2) -> Vec2 {
        self.xf.apply_inv(world_point)
    }

    #[inline]
    pub fn local_vector(&self, world_vector: Vec2) -> Vec2 {
        self.xf.q.apply_inv(world_vector)
    }

    pub fn linear_velocity_from_world_point(&self, world_point: Vec2) -> Vec2 {
        self.linear_velocity + cross_sv(self.angular_velocity, world_point - self.sweep.c)
    }

    pub fn linear_velocity_from_local_point(&self, local_point: Vec2) -> Vec2 {
        self.linear_velocity_from_world_point(self.world_point(local_point))
    }

    pub fn linear_damping(&self) -> f32 {
        self.linear_damping
    }

    pub fn set_linear_damping(&mut self, damping: f32) {
        self.linear_damping = damping;
    }

    pub fn angular_damping(&self) -> f32 {
        self.angular_damping
    }

    pub fn set_angular_damping(&mut self, damping: f32) {
        self.angular_damping = damping;
    }

    pub fn gravity_scale(&self) -> f32 {
        self.gravity_scale
    }

    pub fn set_gravity_scale(&mut self, scale: f32) {
        self.gravity_scale = scale;
    }

    #[inline]
    pub fn is_awake(&self) -> bool {
        self.awake
    }

    /// Sleeping bodies have their velocities and forces cleared.
    pub fn set_awake(&mut self, awake: bool) {
        if awake {
            if !self.awake {
                self.awake = true;
                self.sleep_time = 0.0;
            }
        } else {
            self.awake = false;
            self.sleep_time = 0.0;
            self.linear_velocity = Vec2::ZERO;
            self.angular_velocity = 0.0;
            self.force = Vec2::ZERO;
            self.torque = 0.0;
        }
    }

    pub fn is_sleeping_allowed(&self) -> bool {
        self.allow_sleep
    }

    pub fn set_sleeping_allowed(&mut self, flag: bool) {
        self.allow_sleep = flag;
        if !flag {
            self.set_awake(true);
        }
    }

    pub fn is_fixed_rotation(&self) -> bool {
        self.fixed_rotation
    }

    pub fn fixtures(&self) -> &[FixtureHandle] {
        &self.fixtures
    }

    pub fn joints(&self) -> &[JointHandle] {
        &self.joints
    }

    /// Rebuild the origin transform from the sweep.
    #[inline]
    pub fn synchronize_transform(&mut self) {
        self.xf.q = Rot::new(self.sweep.a);
        self.xf.p = self.sweep.c - self.xf.q.apply(self.sweep.local_center);
    }

    /// Write a solver position for the center of mass and refresh the transform.
    #[inline]
    pub(crate) fn set_sweep_position(&mut self, c: Vec2, a: f32) {
        self.sweep.c = c;
        self.sweep.a = a;
        self.synchronize_transform();
    }

    /// Transform at the start of the current step.
    pub(crate) fn transform_at_step_start(&self) -> Transform {
        self.sweep.transform_at(0.0)
    }

    /// Teleport the body origin. The caller refreshes broad-phase proxies.
    pub(crate) fn set_transform(&mut self, position: Vec2, angle: f32) {
        self.xf = Transform::new(position, angle);
        self.sweep.c = self.xf.apply(self.sweep.local_center);
        self.sweep.a = angle;
        self.sweep.c0 = self.sweep.c;
        self.sweep.a0 = angle;
    }

    /// Recompute mass, center of mass and inertia from fixture mass data.
    ///
    /// Static and kinematic bodies get zero mass. A dynamic body without
    /// positive-density fixtures gets unit mass so it still responds to gravity.
    pub(crate) fn reset_mass_data<I>(&mut self, fixture_mass: I)
    where
        I: IntoIterator<Item = MassData>,
    {
        self.mass = 0.0;
        self.inv_mass = 0.0;
        self.inertia = 0.0;
        self.inv_i = 0.0;
        self.sweep.local_center = Vec2::ZERO;

        if self.body_type != BodyType::Dynamic {
            self.sweep.c0 = self.xf.p;
            self.sweep.c = self.xf.p;
            self.sweep.a0 = self.sweep.a;
            return;
        }

        let mut local_center = Vec2::ZERO;
        for md in fixture_mass {
            self.mass += md.mass;
            local_center += md.mass * md.center;
            self.inertia += md.inertia;
        }

        if self.mass > 0.0 {
            self.inv_mass = 1.0 / self.mass;
            local_center *= self.inv_mass;
        } else {
            self.mass = 1.0;
            self.inv_mass = 1.0;
        }

        if self.inertia > 0.0 && !self.fixed_rotation {
            // Shift to the center of mass.
            self.inertia -= self.mass * local_center.length_squared();
            debug_assert!(self.inertia > 0.0);
            self.inv_i = if self.inertia > 0.0 {
                1.0 / self.inertia
            } else {
                0.0
            };
        } else {
            self.inertia = 0.0;
            self.inv_i = 0.0;
        }

        let old_center = self.sweep.c;
        self.sweep.local_center = local_center;
        self.sweep.c = self.xf.apply(local_center);
        self.sweep.c0 = self.sweep.c;

        // Keep the velocity of the body origin unchanged.
        self.linear_velocity += cross_sv(self.angular_velocity, self.sweep.c - old_center);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{CircleShape, PolygonShape, Shape};

    const EPS: f32 = 1e-4;

    #[test]
    fn test_new_dynamic_body_has_unit_mass() {
        let body = Body::new(&BodyDef::dynamic().with_position(Vec2::new(1.0, 2.0)));
        assert_eq!(body.mass(), 1.0);
        assert_eq!(body.inv_mass, 1.0);
        assert_eq!(body.inv_i, 0.0);
        assert_eq!(body.position(), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_static_body_ignores_velocity() {
        let mut def = BodyDef::default();
        def.linear_velocity = Vec2::new(3.0, 0.0);
        let mut body = Body::new(&def);
        assert_eq!(body.linear_velocity(), Vec2::ZERO);
        body.set_linear_velocity(Vec2::new(1.0, 1.0));
        assert_eq!(body.linear_velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_reset_mass_data_offset_fixture() {
        let mut body = Body::new(&BodyDef::dynamic());
        let circle = Shape::Circle(CircleShape::new(0.5).with_position(Vec2::new(1.0, 0.0)));
        let square = Shape::Polygon(PolygonShape::new_box(0.5, 0.5));
        body.reset_mass_data([circle.compute_mass(1.0), square.compute_mass(1.0)]);

        let m_circle = std::f32::consts::PI * 0.25;
        let m_square = 1.0;
        let total = m_circle + m_square;
        assert!((body.mass() - total).abs() < EPS);
        let expected_center = Vec2::new(m_circle / total, 0.0);
        assert!(
            (body.local_center() - expected_center).length() < EPS,
            "center = {:?}",
            body.local_center()
        );
        assert!((body.world_center() - expected_center).length() < EPS);
        assert!(body.inv_i > 0.0);
        // Inertia about the origin survives the round trip.
        let about_origin = circle.compute_mass(1.0).inertia + square.compute_mass(1.0).inertia;
        assert!((body.inertia() - about_origin).abs() < EPS);
    }

    #[test]
    fn test_fixed_rotation_has_no_inertia() {
        let mut def = BodyDef::dynamic();
        def.fixed_rotation = true;
        let mut body = Body::new(&def);
        let square = Shape::Polygon(PolygonShape::new_box(1.0, 1.0));
        body.reset_mass_data([square.compute_mass(1.0)]);
        assert!(body.mass() > 0.0);
        assert_eq!(body.inv_i, 0.0);
    }

    #[test]
    fn test_impulse_at_point_spins_body() {
        let mut body = Body::new(&BodyDef::dynamic());
        let square = Shape::Polygon(PolygonShape::new_box(1.0, 1.0));
        body.reset_mass_data([square.compute_mass(1.0)]);
        body.apply_linear_impulse(Vec2::new(0.0, 1.0), Vec2::new(1.0, 0.0), true);
        assert!((body.linear_velocity().y - body.inv_mass).abs() < EPS);
        assert!(body.angular_velocity() > 0.0);

        let v = body.linear_velocity_from_world_point(Vec2::new(1.0, 0.0));
        let expected = body.linear_velocity() + Vec2::new(0.0, body.angular_velocity());
        assert!((v - expected).length() < EPS);
    }

    #[test]
    fn test_sleep_clears_motion() {
        let mut body = Body::new(&BodyDef::dynamic());
        body.set_linear_velocity(Vec2::new(1.0, 0.0));
        body.apply_force_to_center(Vec2::new(0.0, 5.0), true);
        body.set_awake(false);
        assert!(!body.is_awake());
        assert_eq!(body.linear_velocity(), Vec2::ZERO);
        assert_eq!(body.force, Vec2::ZERO);

        // Forces on a sleeping body are dropped unless it is woken.
        body.apply_force_to_center(Vec2::new(0.0, 5.0), false);
        assert_eq!(body.force, Vec2::ZERO);
        body.apply_force_to_center(Vec2::new(0.0, 5.0), true);
        assert!(body.is_awake());
        assert_eq!(body.force, Vec2::new(0.0, 5.0));
    }

    #[test]
    fn test_local_world_point_roundtrip() {
        let body = Body::new(
            &BodyDef::dynamic()
                .with_position(Vec2::new(2.0, -1.0))
                .with_angle(0.6),
        );
        let p = Vec2::new(0.3, 0.9);
        assert!((body.local_point(body.world_point(p)) - p).length() < EPS);
        let v = Vec2::new(-1.0, 0.5);
        assert!((body.local_vector(body.world_vector(v)) - v).length() < EPS);
    }

    #[test]
    fn test_transform_at_step_start_ignores_current_pose() {
        let mut body = Body::new(
            &BodyDef::dynamic()
                .with_position(Vec2::new(2.0, -1.0))
                .with_angle(0.6),
        );
        let circle = Shape::Circle(CircleShape::new(0.5).with_position(Vec2::new(1.0, 0.0)));
        body.reset_mass_data([circle.compute_mass(1.0)]);
        let start = *body.transform();

        let c = body.sweep.c + Vec2::new(3.0, 1.0);
        let a = body.sweep.a + 0.4;
        body.set_sweep_position(c, a);

        let xf = body.transform_at_step_start();
        assert!(
            (xf.p - start.p).length() < EPS,
            "p = {:?}, start = {:?}",
            xf.p, start.p
        );
        assert!((xf.q.angle() - 0.6).abs() < EPS, "angle = {}", xf.q.angle());
        assert!((body.position() - start.p).length() > 1.0);
    }
}
