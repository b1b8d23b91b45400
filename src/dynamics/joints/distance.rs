use std::f32::consts::PI;

use glam::Vec2;

use crate::dynamics::body::Body;
use crate::dynamics::world::World;
use crate::dynamics::{BodyHandle, TimeStep};
use crate::error::{PhysicsError, Result};
use crate::math::{cross, cross_sv, normalize_and_length};
use crate::settings::{LINEAR_SLOP, MAX_LINEAR_CORRECTION};

use super::{anchor_arm, lookup_pair, JointConstraint, SolverBody};

/// Keeps two anchor points at a fixed distance, optionally through a spring.
#[derive(Debug, Clone)]
pub struct DistanceJointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub collide_connected: bool,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    /// Rest length. Default: 1.
    pub length: f32,
    /// Spring frequency in hertz. 0 makes the joint rigid.
    pub frequency_hz: f32,
    /// Spring damping ratio, 1 is critical damping.
    pub damping_ratio: f32,
}

impl Default for DistanceJointDef {
    fn default() -> Self {
        Self {
            body_a: BodyHandle(0),
            body_b: BodyHandle(0),
            collide_connected: false,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            length: 1.0,
            frequency_hz: 0.0,
            damping_ratio: 0.0,
        }
    }
}

impl DistanceJointDef {
    /// Anchor both bodies at world points; the rest length is their
    /// current distance.
    pub fn new(
        world: &World,
        body_a: BodyHandle,
        body_b: BodyHandle,
        anchor_a: Vec2,
        anchor_b: Vec2,
    ) -> Result<Self> {
        let (a, b) = lookup_pair(&world.bodies, body_a, body_b)?;
        Ok(Self {
            body_a,
            body_b,
            local_anchor_a: a.local_point(anchor_a),
            local_anchor_b: b.local_point(anchor_b),
            length: anchor_a.distance(anchor_b),
            ..Self::default()
        })
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.length < 0.0 {
            return Err(PhysicsError::InvalidJointDef("length must be non-negative"));
        }
        if self.frequency_hz < 0.0 || self.damping_ratio < 0.0 {
            return Err(PhysicsError::InvalidJointDef("spring parameters must be non-negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DistanceJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    length: f32,
    frequency_hz: f32,
    damping_ratio: f32,
    impulse: f32,

    body_a: SolverBody,
    body_b: SolverBody,
    r_a: Vec2,
    r_b: Vec2,
    u: Vec2,
    mass: f32,
    gamma: f32,
    bias: f32,
}

impl DistanceJoint {
    pub(crate) fn new(def: &DistanceJointDef) -> Self {
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            length: def.length,
            frequency_hz: def.frequency_hz,
            damping_ratio: def.damping_ratio,
            impulse: 0.0,
            body_a: SolverBody::default(),
            body_b: SolverBody::default(),
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            u: Vec2::ZERO,
            mass: 0.0,
            gamma: 0.0,
            bias: 0.0,
        }
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn set_length(&mut self, length: f32) {
        self.length = length.max(0.0);
    }

    pub fn frequency_hz(&self) -> f32 {
        self.frequency_hz
    }

    pub fn set_frequency_hz(&mut self, hz: f32) {
        self.frequency_hz = hz;
    }

    pub fn damping_ratio(&self) -> f32 {
        self.damping_ratio
    }

    pub fn set_damping_ratio(&mut self, ratio: f32) {
        self.damping_ratio = ratio;
    }
}

impl JointConstraint for DistanceJoint {
    fn init_velocity_constraints(&mut self, a: &mut Body, b: &mut Body, step: &TimeStep) {
        self.body_a = SolverBody::of(a);
        self.body_b = SolverBody::of(b);
        let (m_a, i_a) = (self.body_a.inv_mass, self.body_a.inv_i);
        let (m_b, i_b) = (self.body_b.inv_mass, self.body_b.inv_i);

        self.r_a = anchor_arm(a.sweep.a, self.local_anchor_a, self.body_a.local_center);
        self.r_b = anchor_arm(b.sweep.a, self.local_anchor_b, self.body_b.local_center);
        self.u = b.sweep.c + self.r_b - a.sweep.c - self.r_a;

        let length = self.u.length();
        if length > LINEAR_SLOP {
            self.u *= 1.0 / length;
        } else {
            self.u = Vec2::ZERO;
        }

        let cr_a = cross(self.r_a, self.u);
        let cr_b = cross(self.r_b, self.u);
        let mut inv_mass = m_a + i_a * cr_a * cr_a + m_b + i_b * cr_b * cr_b;
        self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };

        if self.frequency_hz > 0.0 {
            let c = length - self.length;
            let omega = 2.0 * PI * self.frequency_hz;
            let d = 2.0 * self.mass * self.damping_ratio * omega;
            let k = self.mass * omega * omega;

            let h = step.dt;
            self.gamma = h * (d + h * k);
            self.gamma = if self.gamma != 0.0 {
                1.0 / self.gamma
            } else {
                0.0
            };
            self.bias = c * h * k * self.gamma;

            inv_mass += self.gamma;
            self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };
        } else {
            self.gamma = 0.0;
            self.bias = 0.0;
        }

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

    fn solve_velocity_constraints(&mut self, a: &mut Body, b: &mut Body, _step: &TimeStep) {
        let vp_a = a.linear_velocity + cross_sv(a.angular_velocity, self.r_a);
        let vp_b = b.linear_velocity + cross_sv(b.angular_velocity, self.r_b);
        let cdot = self.u.dot(vp_b - vp_a);

        let impulse = -self.mass * (cdot + self.bias + self.gamma * self.impulse);
        self.impulse += impulse;

        let p = impulse * self.u;
        a.linear_velocity -= self.body_a.inv_mass * p;
        a.angular_velocity -= self.body_a.inv_i * cross(self.r_a, p);
        b.linear_velocity += self.body_b.inv_mass * p;
        b.angular_velocity += self.body_b.inv_i * cross(self.r_b, p);
    }

    fn solve_position_constraints(&mut self, a: &mut Body, b: &mut Body) -> bool {
        if self.frequency_hz > 0.0 {
            // Soft joints have no position correction.
            return true;
        }

        let (mut c_a, mut a_a) = (a.sweep.c, a.sweep.a);
        let (mut c_b, mut a_b) = (b.sweep.c, b.sweep.a);

        let r_a = anchor_arm(a_a, self.local_anchor_a, self.body_a.local_center);
        let r_b = anchor_arm(a_b, self.local_anchor_b, self.body_b.local_center);
        let mut u = c_b + r_b - c_a - r_a;

        let length = normalize_and_length(&mut u);
        let c = (length - self.length).clamp(-MAX_LINEAR_CORRECTION, MAX_LINEAR_CORRECTION);

        let impulse = -self.mass * c;
        let p = impulse * u;

        c_a -= self.body_a.inv_mass * p;
        a_a -= self.body_a.inv_i * cross(r_a, p);
        c_b += self.body_b.inv_mass * p;
        a_b += self.body_b.inv_i * cross(r_b, p);

        a.set_sweep_position(c_a, a_a);
        b.set_sweep_position(c_b, a_b);

        c.abs() < LINEAR_SLOP
    }

    fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        (inv_dt * self.impulse) * self.u
    }

    fn reaction_torque(&self, _inv_dt: f32) -> f32 {
        0.0
    }
}
