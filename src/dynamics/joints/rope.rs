use glam::Vec2;

use crate::dynamics::body::Body;
use crate::dynamics::world::World;
use crate::dynamics::{BodyHandle, TimeStep};
use crate::error::{PhysicsError, Result};
use crate::math::{cross, cross_sv, normalize_and_length};
use crate::settings::{LINEAR_SLOP, MAX_LINEAR_CORRECTION};

use super::{anchor_arm, lookup_pair, JointConstraint, LimitState, SolverBody};

/// Caps the distance between two anchor points. Slack ropes apply no force.
#[derive(Debug, Clone)]
pub struct RopeJointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub collide_connected: bool,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    /// Default: 0.
    pub max_length: f32,
}

impl Default for RopeJointDef {
    fn default() -> Self {
        Self {
            body_a: BodyHandle(0),
            body_b: BodyHandle(0),
            collide_connected: false,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            max_length: 0.0,
        }
    }
}

impl RopeJointDef {
    pub fn new(
        world: &World,
        body_a: BodyHandle,
        body_b: BodyHandle,
        anchor_a: Vec2,
        anchor_b: Vec2,
        max_length: f32,
    ) -> Result<Self> {
        let (a, b) = lookup_pair(&world.bodies, body_a, body_b)?;
        Ok(Self {
            body_a,
            body_b,
            collide_connected: false,
            local_anchor_a: a.local_point(anchor_a),
            local_anchor_b: b.local_point(anchor_b),
            max_length,
        })
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_length < 0.0 {
            return Err(PhysicsError::InvalidJointDef("max length must be non-negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RopeJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    max_length: f32,
    length: f32,
    impulse: f32,
    state: LimitState,

    body_a: SolverBody,
    body_b: SolverBody,
    u: Vec2,
    r_a: Vec2,
    r_b: Vec2,
    mass: f32,
}

impl RopeJoint {
    pub(crate) fn new(def: &RopeJointDef) -> Self {
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            max_length: def.max_length,
            length: 0.0,
            impulse: 0.0,
            state: LimitState::Inactive,
            body_a: SolverBody::default(),
            body_b: SolverBody::default(),
            u: Vec2::ZERO,
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            mass: 0.0,
        }
    }

    pub fn max_length(&self) -> f32 {
        self.max_length
    }

    pub fn set_max_length(&mut self, length: f32) {
        self.max_length = length.max(0.0);
    }

    /// `AtUpper` while the rope is taut.
    pub fn limit_state(&self) -> LimitState {
        self.state
    }

    /// Accumulated impulse along the rope. Never positive.
    pub fn impulse(&self) -> f32 {
        self.impulse
    }
}

impl JointConstraint for RopeJoint {
    fn init_velocity_constraints(&mut self, a: &mut Body, b: &mut Body, step: &TimeStep) {
        self.body_a = SolverBody::of(a);
        self.body_b = SolverBody::of(b);
        let (m_a, i_a) = (self.body_a.inv_mass, self.body_a.inv_i);
        let (m_b, i_b) = (self.body_b.inv_mass, self.body_b.inv_i);

        self.r_a = anchor_arm(a.sweep.a, self.local_anchor_a, self.body_a.local_center);
        self.r_b = anchor_arm(b.sweep.a, self.local_anchor_b, self.body_b.local_center);
        self.u = b.sweep.c + self.r_b - a.sweep.c - self.r_a;

        self.length = self.u.length();
        let c = self.length - self.max_length;
        self.state = if c > 0.0 {
            LimitState::AtUpper
        } else {
            LimitState::Inactive
        };

        if self.length > LINEAR_SLOP {
            self.u *= 1.0 / self.length;
        } else {
            self.u = Vec2::ZERO;
            self.mass = 0.0;
            self.impulse = 0.0;
            return;
        }

        let cr_a = cross(self.r_a, self.u);
        let cr_b = cross(self.r_b, self.u);
        let inv_mass = m_a + i_a * cr_a * cr_a + m_b + i_b * cr_b * cr_b;
        self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };

        if step.warm_starting {
            self.impulse *= step.dt_ratio;
            let p = self.impulse * self.u;
            a.linear_velocity -= m_a * p;
            a.angular_velocity -= i_a * cross(self.r_a, p);
            b.linear_velocity += m_b * p;
            b.angular_velocity += i_b * cross(self.r_b, p);
        } else {
            self.impulse = 0.0;
        }
    }

    fn solve_velocity_constraints(&mut self, a: &mut Body, b: &mut Body, step: &TimeStep) {
        let vp_a = a.linear_velocity + cross_sv(a.angular_velocity, self.r_a);
        let vp_b = b.linear_velocity + cross_sv(b.angular_velocity, self.r_b);
        let c = self.length - self.max_length;
        let mut cdot = self.u.dot(vp_b - vp_a);

        // Predictive: allow closing the remaining slack within this step.
        if c < 0.0 {
            cdot += step.inv_dt * c;
        }

        let impulse = -self.mass * cdot;
        let old_impulse = self.impulse;
        self.impulse = (self.impulse + impulse).min(0.0);
        let impulse = self.impulse - old_impulse;

        let p = impulse * self.u;
        a.linear_velocity -= self.body_a.inv_mass * p;
        a.angular_velocity -= self.body_a.inv_i * cross(self.r_a, p);
        b.linear_velocity += self.body_b.inv_mass * p;
        b.angular_velocity += self.body_b.inv_i * cross(self.r_b, p);
    }

    fn solve_position_constraints(&mut self, a: &mut Body, b: &mut Body) -> bool {
        let (mut c_a, mut a_a) = (a.sweep.c, a.sweep.a);
        let (mut c_b, mut a_b) = (b.sweep.c, b.sweep.a);

        let r_a = anchor_arm(a_a, self.local_anchor_a, self.body_a.local_center);
        let r_b = anchor_arm(a_b, self.local_anchor_b, self.body_b.local_center);
        let mut u = c_b + r_b - c_a - r_a;

        let length = normalize_and_length(&mut u);
        let c = (length - self.max_length).clamp(0.0, MAX_LINEAR_CORRECTION);

        let impulse = -self.mass * c;
        let p = impulse * u;

        c_a -= self.body_a.inv_mass * p;
        a_a -= self.body_a.inv_i * cross(r_a, p);
        c_b += self.body_b.inv_mass * p;
        a_b += self.body_b.inv_i * cross(r_b, p);

        a.set_sweep_position(c_a, a_a);
        b.set_sweep_position(c_b, a_b);

        length - self.max_length < LINEAR_SLOP
    }

    fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        (inv_dt * self.impulse) * self.u
    }

    fn reaction_torque(&self, _inv_dt: f32) -> f32 {
        0.0
    }
}
