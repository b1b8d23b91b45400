use glam::{Mat2, Mat3, Vec2, Vec3};

use crate::dynamics::body::Body;
use crate::dynamics::world::World;
use crate::dynamics::{BodyHandle, TimeStep};
use crate::error::{PhysicsError, Result};
use crate::math::{cross, solve22, solve33, solve33_as22, Rot};
use crate::settings::{ANGULAR_SLOP, LINEAR_SLOP, MAX_LINEAR_CORRECTION};

use super::{anchor_arm, lookup_pair, JointConstraint, LimitState, SolverBody};

/// Lets body B slide along an axis fixed in body A, with no relative rotation.
#[derive(Debug, Clone)]
pub struct PrismaticJointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub collide_connected: bool,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    /// Translation axis in body A's frame. Default: +x.
    pub local_axis_a: Vec2,
    /// `angle_b - angle_a` held by the joint.
    pub reference_angle: f32,
    pub enable_limit: bool,
    pub lower_translation: f32,
    pub upper_translation: f32,
    pub enable_motor: bool,
    pub max_motor_force: f32,
    /// Meters per second.
    pub motor_speed: f32,
}

impl Default for PrismaticJointDef {
    fn default() -> Self {
        Self {
            body_a: BodyHandle(0),
            body_b: BodyHandle(0),
            collide_connected: false,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            local_axis_a: Vec2::X,
            reference_angle: 0.0,
            enable_limit: false,
            lower_translation: 0.0,
            upper_translation: 0.0,
            enable_motor: false,
            max_motor_force: 0.0,
            motor_speed: 0.0,
        }
    }
}

impl PrismaticJointDef {
    /// Shared world anchor and a world axis; the reference angle is the
    /// bodies' current relative angle.
    pub fn new(
        world: &World,
        body_a: BodyHandle,
        body_b: BodyHandle,
        anchor: Vec2,
        axis: Vec2,
    ) -> Result<Self> {
        let (a, b) = lookup_pair(&world.bodies, body_a, body_b)?;
        Ok(Self {
            body_a,
            body_b,
            local_anchor_a: a.local_point(anchor),
            local_anchor_b: b.local_point(anchor),
            local_axis_a: a.local_vector(axis),
            reference_angle: b.angle() - a.angle(),
            ..Self::default()
        })
    }

    pub fn with_limits(mut self, lower: f32, upper: f32) -> Self {
        self.enable_limit = true;
        self.lower_translation = lower;
        self.upper_translation = upper;
        self
    }

    pub fn with_motor(mut self, speed: f32, max_force: f32) -> Self {
        self.enable_motor = true;
        self.motor_speed = speed;
        self.max_motor_force = max_force;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.local_axis_a.length_squared() < f32::EPSILON {
            return Err(PhysicsError::InvalidJointDef("axis must be non-zero"));
        }
        if self.lower_translation > self.upper_translation {
            return Err(PhysicsError::InvalidJointDef(
                "lower translation exceeds upper translation",
            ));
        }
        if self.max_motor_force < 0.0 {
            return Err(PhysicsError::InvalidJointDef("max motor force must be non-negative"));
        }
        Ok(())
    }
}

// Linear constraint (point-to-line)
// d = pB - pA = xB + rB - xA - rA
// C = dot(perp, d)
// Cdot = dot(d, cross(wA, perp)) + dot(perp, vB + cross(wB, rB) - vA - cross(wA, rA))
// J = [-perp, -cross(d + rA, perp), perp, cross(rB, perp)]
//
// Angular constraint
// C = aB - aA - reference_angle
// J = [0 0 -1 0 0 1]
//
// Limit and motor act along `axis` with the same Jacobian shape:
// J = [-axis, -cross(d + rA, axis), axis, cross(rB, axis)]

#[derive(Debug, Clone)]
pub struct PrismaticJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    local_x_axis_a: Vec2,
    local_y_axis_a: Vec2,
    reference_angle: f32,
    /// (perpendicular, angular, limit) accumulated impulses.
    impulse: Vec3,
    motor_impulse: f32,
    lower_translation: f32,
    upper_translation: f32,
    max_motor_force: f32,
    motor_speed: f32,
    enable_limit: bool,
    enable_motor: bool,
    limit_state: LimitState,

    body_a: SolverBody,
    body_b: SolverBody,
    axis: Vec2,
    perp: Vec2,
    s1: f32,
    s2: f32,
    a1: f32,
    a2: f32,
    k: Mat3,
    motor_mass: f32,
}

impl PrismaticJoint {
    pub(crate) fn new(def: &PrismaticJointDef) -> Self {
        let local_x_axis_a = def.local_axis_a.normalize_or_zero();
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            local_x_axis_a,
            local_y_axis_a: local_x_axis_a.perp(),
            reference_angle: def.reference_angle,
            impulse: Vec3::ZERO,
            motor_impulse: 0.0,
            lower_translation: def.lower_translation,
            upper_translation: def.upper_translation,
            max_motor_force: def.max_motor_force,
            motor_speed: def.motor_speed,
            enable_limit: def.enable_limit,
            enable_motor: def.enable_motor,
            limit_state: LimitState::Inactive,
            body_a: SolverBody::default(),
            body_b: SolverBody::default(),
            axis: Vec2::ZERO,
            perp: Vec2::ZERO,
            s1: 0.0,
            s2: 0.0,
            a1: 0.0,
            a2: 0.0,
            k: Mat3::ZERO,
            motor_mass: 0.0,
        }
    }

    pub fn local_axis_a(&self) -> Vec2 {
        self.local_x_axis_a
    }

    pub fn reference_angle(&self) -> f32 {
        self.reference_angle
    }

    /// Signed offset of anchor B from anchor A along the axis.
    pub fn joint_translation(&self, a: &Body, b: &Body) -> f32 {
        let p_a = a.world_point(self.local_anchor_a);
        let p_b = b.world_point(self.local_anchor_b);
        (p_b - p_a).dot(a.world_vector(self.local_x_axis_a))
    }

    pub fn limit_state(&self) -> LimitState {
        self.limit_state
    }

    pub fn is_limit_enabled(&self) -> bool {
        self.enable_limit
    }

    pub fn enable_limit(&mut self, flag: bool) {
        if flag != self.enable_limit {
            self.enable_limit = flag;
            self.impulse.z = 0.0;
        }
    }

    pub fn lower_limit(&self) -> f32 {
        self.lower_translation
    }

    pub fn upper_limit(&self) -> f32 {
        self.upper_translation
    }

    /// Swaps the bounds if given out of order.
    pub fn set_limits(&mut self, lower: f32, upper: f32) {
        let (lower, upper) = (lower.min(upper), lower.max(upper));
        if lower != self.lower_translation || upper != self.upper_translation {
            self.lower_translation = lower;
            self.upper_translation = upper;
            self.impulse.z = 0.0;
        }
    }

    pub fn is_motor_enabled(&self) -> bool {
        self.enable_motor
    }

    pub fn enable_motor(&mut self, flag: bool) {
        self.enable_motor = flag;
    }

    pub fn motor_speed(&self) -> f32 {
        self.motor_speed
    }

    pub fn set_motor_speed(&mut self, speed: f32) {
        self.motor_speed = speed;
    }

    pub fn max_motor_force(&self) -> f32 {
        self.max_motor_force
    }

    pub fn set_max_motor_force(&mut self, force: f32) {
        self.max_motor_force = force;
    }

    /// Motor force applied over the last step.
    pub fn motor_force(&self, inv_dt: f32) -> f32 {
        inv_dt * self.motor_impulse
    }

    fn limits_equal(&self) -> bool {
        (self.upper_translation - self.lower_translation).abs() < 2.0 * LINEAR_SLOP
    }

    fn effective_mass(&self, i_a: f32, i_b: f32, m: f32, s: (f32, f32), a: (f32, f32)) -> Mat3 {
        let (s1, s2) = s;
        let (a1, a2) = a;
        let k11 = m + i_a * s1 * s1 + i_b * s2 * s2;
        let k12 = i_a * s1 + i_b * s2;
        let k13 = i_a * s1 * a1 + i_b * s2 * a2;
        let mut k22 = i_a + i_b;
        if k22 == 0.0 {
            // Both bodies have fixed rotation.
            k22 = 1.0;
        }
        let k23 = i_a * a1 + i_b * a2;
        let k33 = m + i_a * a1 * a1 + i_b * a2 * a2;
        Mat3::from_cols(
            Vec3::new(k11, k12, k13),
            Vec3::new(k12, k22, k23),
            Vec3::new(k13, k23, k33),
        )
    }
}

impl JointConstraint for PrismaticJoint {
    fn init_velocity_constraints(&mut self, a: &mut Body, b: &mut Body, step: &TimeStep) {
        self.body_a = SolverBody::of(a);
        self.body_b = SolverBody::of(b);
        let (m_a, i_a) = (self.body_a.inv_mass, self.body_a.inv_i);
        let (m_b, i_b) = (self.body_b.inv_mass, self.body_b.inv_i);

        let q_a = Rot::new(a.sweep.a);
        let r_a = anchor_arm(a.sweep.a, self.local_anchor_a, self.body_a.local_center);
        let r_b = anchor_arm(b.sweep.a, self.local_anchor_b, self.body_b.local_center);
        let d = b.sweep.c - a.sweep.c + r_b - r_a;

        // Motor and limit along the axis.
        self.axis = q_a.apply(self.local_x_axis_a);
        self.a1 = cross(d + r_a, self.axis);
        self.a2 = cross(r_b, self.axis);
        let k = m_a + m_b + i_a * self.a1 * self.a1 + i_b * self.a2 * self.a2;
        self.motor_mass = if k > 0.0 { 1.0 / k } else { 0.0 };

        // Perpendicular and angular.
        self.perp = q_a.apply(self.local_y_axis_a);
        self.s1 = cross(d + r_a, self.perp);
        self.s2 = cross(r_b, self.perp);

        self.k = self.effective_mass(i_a, i_b, m_a + m_b, (self.s1, self.s2), (self.a1, self.a2));

        if self.enable_limit {
            let translation = self.axis.dot(d);
            if self.limits_equal() {
                self.limit_state = LimitState::Equal;
            } else if translation <= self.lower_translation {
                if self.limit_state != LimitState::AtLower {
                    self.limit_state = LimitState::AtLower;
                    self.impulse.z = 0.0;
                }
            } else if translation >= self.upper_translation {
                if self.limit_state != LimitState::AtUpper {
                    self.limit_state = LimitState::AtUpper;
                    self.impulse.z = 0.0;
                }
            } else {
                self.limit_state = LimitState::Inactive;
                self.impulse.z = 0.0;
            }
        } else {
            self.limit_state = LimitState::Inactive;
            self.impulse.z = 0.0;
        }

        if !self.enable_motor {
            self.motor_impulse = 0.0;
        }

        if step.warm_starting {
            self.impulse *= step.dt_ratio;
            self.motor_impulse *= step.dt_ratio;

            let axial = self.motor_impulse + self.impulse.z;
            let p = self.impulse.x * self.perp + axial * self.axis;
            let l_a = self.impulse.x * self.s1 + self.impulse.y + axial * self.a1;
            let l_b = self.impulse.x * self.s2 + self.impulse.y + axial * self.a2;

            a.linear_velocity -= m_a * p;
            a.angular_velocity -= i_a * l_a;
            b.linear_velocity += m_b * p;
            b.angular_velocity += i_b * l_b;
        } else {
            self.impulse = Vec3::ZERO;
            self.motor_impulse = 0.0;
        }
    }

    fn solve_velocity_constraints(&mut self, a: &mut Body, b: &mut Body, step: &TimeStep) {
        let (m_a, i_a) = (self.body_a.inv_mass, self.body_a.inv_i);
        let (m_b, i_b) = (self.body_b.inv_mass, self.body_b.inv_i);

        let mut v_a = a.linear_velocity;
        let mut w_a = a.angular_velocity;
        let mut v_b = b.linear_velocity;
        let mut w_b = b.angular_velocity;

        if self.enable_motor && self.limit_state != LimitState::Equal {
            let cdot = self.axis.dot(v_b - v_a) + self.a2 * w_b - self.a1 * w_a;
            let impulse = self.motor_mass * (self.motor_speed - cdot);
            let old_impulse = self.motor_impulse;
            let max_impulse = step.dt * self.max_motor_force;
            self.motor_impulse = (old_impulse + impulse).clamp(-max_impulse, max_impulse);
            let impulse = self.motor_impulse - old_impulse;

            let p = impulse * self.axis;
            v_a -= m_a * p;
            w_a -= i_a * impulse * self.a1;
            v_b += m_b * p;
            w_b += i_b * impulse * self.a2;
        }

        let cdot1 = Vec2::new(
            self.perp.dot(v_b - v_a) + self.s2 * w_b - self.s1 * w_a,
            w_b - w_a,
        );

        let (p, l_a, l_b) = if self.enable_limit && self.limit_state != LimitState::Inactive {
            let cdot2 = self.axis.dot(v_b - v_a) + self.a2 * w_b - self.a1 * w_a;
            let cdot = Vec3::new(cdot1.x, cdot1.y, cdot2);

            let f1 = self.impulse;
            self.impulse += solve33(&self.k, -cdot);

            match self.limit_state {
                LimitState::AtLower => self.impulse.z = self.impulse.z.max(0.0),
                LimitState::AtUpper => self.impulse.z = self.impulse.z.min(0.0),
                _ => {}
            }

            // Re-solve the 2x2 block given the clamped limit impulse.
            let rhs = -cdot1 - (self.impulse.z - f1.z) * self.k.z_axis.truncate();
            let f2r = solve33_as22(&self.k, rhs) + f1.truncate();
            self.impulse.x = f2r.x;
            self.impulse.y = f2r.y;

            let df = self.impulse - f1;
            (
                df.x * self.perp + df.z * self.axis,
                df.x * self.s1 + df.y + df.z * self.a1,
                df.x * self.s2 + df.y + df.z * self.a2,
            )
        } else {
            let df = solve33_as22(&self.k, -cdot1);
            self.impulse.x += df.x;
            self.impulse.y += df.y;
            (
                df.x * self.perp,
                df.x * self.s1 + df.y,
                df.x * self.s2 + df.y,
            )
        };

        v_a -= m_a * p;
        w_a -= i_a * l_a;
        v_b += m_b * p;
        w_b += i_b * l_b;

        a.linear_velocity = v_a;
        a.angular_velocity = w_a;
        b.linear_velocity = v_b;
        b.angular_velocity = w_b;
    }

    fn solve_position_constraints(&mut self, a: &mut Body, b: &mut Body) -> bool {
        let (m_a, i_a) = (self.body_a.inv_mass, self.body_a.inv_i);
        let (m_b, i_b) = (self.body_b.inv_mass, self.body_b.inv_i);

        let (mut c_a, mut a_a) = (a.sweep.c, a.sweep.a);
        let (mut c_b, mut a_b) = (b.sweep.c, b.sweep.a);

        let q_a = Rot::new(a_a);
        let r_a = anchor_arm(a_a, self.local_anchor_a, self.body_a.local_center);
        let r_b = anchor_arm(a_b, self.local_anchor_b, self.body_b.local_center);
        let d = c_b + r_b - c_a - r_a;

        let axis = q_a.apply(self.local_x_axis_a);
        let a1 = cross(d + r_a, axis);
        let a2 = cross(r_b, axis);
        let perp = q_a.apply(self.local_y_axis_a);
        let s1 = cross(d + r_a, perp);
        let s2 = cross(r_b, perp);

        let c1 = Vec2::new(perp.dot(d), a_b - a_a - self.reference_angle);

        let mut linear_error = c1.x.abs();
        let angular_error = c1.y.abs();

        let mut active = false;
        let mut c2 = 0.0;
        if self.enable_limit {
            let translation = axis.dot(d);
            if self.limits_equal() {
                c2 = (translation - self.lower_translation)
                    .clamp(-MAX_LINEAR_CORRECTION, MAX_LINEAR_CORRECTION);
                linear_error = linear_error.max((translation - self.lower_translation).abs());
                active = true;
            } else if translation <= self.lower_translation {
                c2 = (translation - self.lower_translation + LINEAR_SLOP)
                    .clamp(-MAX_LINEAR_CORRECTION, 0.0);
                linear_error = linear_error.max(self.lower_translation - translation);
                active = true;
            } else if translation >= self.upper_translation {
                c2 = (translation - self.upper_translation - LINEAR_SLOP)
                    .clamp(0.0, MAX_LINEAR_CORRECTION);
                linear_error = linear_error.max(translation - self.upper_translation);
                active = true;
            }
        }

        let impulse = if active {
            let k = self.effective_mass(i_a, i_b, m_a + m_b, (s1, s2), (a1, a2));
            solve33(&k, -Vec3::new(c1.x, c1.y, c2))
        } else {
            let k11 = m_a + m_b + i_a * s1 * s1 + i_b * s2 * s2;
            let k12 = i_a * s1 + i_b * s2;
            let mut k22 = i_a + i_b;
            if k22 == 0.0 {
                k22 = 1.0;
            }
            let k = Mat2::from_cols(Vec2::new(k11, k12), Vec2::new(k12, k22));
            solve22(&k, -c1).extend(0.0)
        };

        let p = impulse.x * perp + impulse.z * axis;
        let l_a = impulse.x * s1 + impulse.y + impulse.z * a1;
        let l_b = impulse.x * s2 + impulse.y + impulse.z * a2;

        c_a -= m_a * p;
        a_a -= i_a * l_a;
        c_b += m_b * p;
        a_b += i_b * l_b;

        a.set_sweep_position(c_a, a_a);
        b.set_sweep_position(c_b, a_b);

        linear_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }

    fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * (self.impulse.x * self.perp + (self.motor_impulse + self.impulse.z) * self.axis)
    }

    fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.impulse.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::PolygonShape;
    use crate::config::PhysicsConfig;
    use crate::dynamics::{BodyDef, FixtureDef, JointHandle, JointKind};

    fn prismatic(world: &World, joint: JointHandle) -> &PrismaticJoint {
        match world.joint(joint).unwrap().kind() {
            JointKind::Prismatic(j) => j,
            other => panic!("unexpected joint {:?}", other),
        }
    }

    fn prismatic_mut(world: &mut World, joint: JointHandle) -> &mut PrismaticJoint {
        match world.joint_mut(joint).unwrap().kind_mut() {
            JointKind::Prismatic(j) => j,
            _ => panic!("unexpected joint"),
        }
    }

    /// A block on a horizontal rail, no gravity.
    fn slider(lower: f32, upper: f32) -> (World, BodyHandle, BodyHandle, JointHandle) {
        let config = PhysicsConfig {
            gravity: Vec2::ZERO,
            ..Default::default()
        };
        let mut world = World::new(config);
        let ground = world.create_body(&BodyDef::default());
        let block = world.create_body(&BodyDef::dynamic());
        let fixture = FixtureDef::new(PolygonShape::new_box(0.5, 0.25)).with_density(1.0);
        world.create_fixture(block, &fixture).unwrap();
        let def = PrismaticJointDef::new(&world, ground, block, Vec2::ZERO, Vec2::X)
            .unwrap()
            .with_limits(lower, upper);
        let joint = world.create_joint(def).unwrap();
        (world, ground, block, joint)
    }

    fn translation(
        world: &World,
        ground: BodyHandle,
        block: BodyHandle,
        joint: JointHandle,
    ) -> f32 {
        let a = world.body(ground).unwrap();
        let b = world.body(block).unwrap();
        prismatic(world, joint).joint_translation(a, b)
    }

    #[test]
    fn test_limit_state_sequence() {
        let (mut world, ground, block, joint) = slider(-1.0, 1.0);

        // Drive into the lower stop.
        world
            .body_mut(block)
            .unwrap()
            .set_linear_velocity(Vec2::new(-3.0, 0.0));
        for _ in 0..60 {
            world.step(1.0 / 60.0);
        }
        assert_eq!(prismatic(&world, joint).limit_state(), LimitState::AtLower);
        let t = translation(&world, ground, block, joint);
        assert!(t > -1.0 - 0.02, "translation = {}", t);

        // Back into the free range.
        world
            .body_mut(block)
            .unwrap()
            .set_linear_velocity(Vec2::new(1.0, 0.0));
        for _ in 0..30 {
            world.step(1.0 / 60.0);
        }
        assert_eq!(prismatic(&world, joint).limit_state(), LimitState::Inactive);

        // On to the upper stop.
        world
            .body_mut(block)
            .unwrap()
            .set_linear_velocity(Vec2::new(3.0, 0.0));
        for _ in 0..60 {
            world.step(1.0 / 60.0);
        }
        assert_eq!(prismatic(&world, joint).limit_state(), LimitState::AtUpper);
        let t = translation(&world, ground, block, joint);
        assert!(t < 1.0 + 0.02, "translation = {}", t);
    }

    #[test]
    fn test_equal_limits_lock_translation() {
        // Bounds closer than two linear slops count as equal.
        for (lower, upper) in [(0.0, 0.0), (0.0, 0.5 * LINEAR_SLOP), (0.0, 0.005)] {
            let (mut world, ground, block, joint) = slider(lower, upper);
            world
                .body_mut(block)
                .unwrap()
                .set_linear_velocity(Vec2::new(2.0, 0.0));
            for _ in 0..30 {
                world.step(1.0 / 60.0);
            }
            assert_eq!(
                prismatic(&world, joint).limit_state(),
                LimitState::Equal,
                "limits ({}, {})",
                lower, upper
            );
            let t = translation(&world, ground, block, joint);
            assert!(
                t.abs() < 0.01,
                "limits ({}, {}): translation = {}",
                lower, upper, t
            );
        }
    }

    #[test]
    fn test_motor_drives_along_axis_without_rotation() {
        let (mut world, ground, block, joint) = slider(-10.0, 10.0);
        {
            let j = prismatic_mut(&mut world, joint);
            j.enable_motor(true);
            j.set_motor_speed(2.0);
            j.set_max_motor_force(100.0);
        }
        for _ in 0..60 {
            world.step(1.0 / 60.0);
        }
        let body = world.body(block).unwrap();
        assert!(
            (body.linear_velocity().x - 2.0).abs() < 1e-3,
            "v = {:?}",
            body.linear_velocity()
        );
        assert!(body.linear_velocity().y.abs() < 1e-4);
        assert!(body.angle().abs() < 1e-4, "angle = {}", body.angle());
        let t = translation(&world, ground, block, joint);
        assert!((t - 2.0).abs() < 0.1, "translation = {}", t);
    }

    #[test]
    fn test_inverted_limits_rejected() {
        let (mut world, ground, block, _) = slider(0.0, 1.0);
        let def = PrismaticJointDef::new(&world, ground, block, Vec2::ZERO, Vec2::X)
            .unwrap()
            .with_limits(1.0, -1.0);
        assert!(matches!(
            world.create_joint(def),
            Err(PhysicsError::InvalidJointDef(_))
        ));
    }
}
