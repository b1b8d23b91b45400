use glam::Vec2;

use crate::dynamics::body::Body;
use crate::dynamics::world::World;
use crate::dynamics::{BodyHandle, TimeStep};
use crate::error::{PhysicsError, Result};

use super::{lookup_pair, JointConstraint};

/// Soft drive of the relative angle `angle_b - angle_a` toward a target.
#[derive(Debug, Clone)]
pub struct AngleJointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub collide_connected: bool,
    /// Target relative angle in radians.
    pub target_angle: f32,
    /// Fraction of the angular error corrected per step. Default: 0.2.
    pub bias_factor: f32,
    /// Per-iteration impulse cap. Default: unbounded.
    pub max_impulse: f32,
    /// 0 is stiff, 1 disables the drive. Default: 0.
    pub softness: f32,
}

impl Default for AngleJointDef {
    fn default() -> Self {
        Self {
            body_a: BodyHandle(0),
            body_b: BodyHandle(0),
            collide_connected: false,
            target_angle: 0.0,
            bias_factor: 0.2,
            max_impulse: f32::MAX,
            softness: 0.0,
        }
    }
}

impl AngleJointDef {
    /// Hold the current relative angle of the two bodies.
    pub fn new(world: &World, body_a: BodyHandle, body_b: BodyHandle) -> Result<Self> {
        let (a, b) = lookup_pair(&world.bodies, body_a, body_b)?;
        Ok(Self {
            body_a,
            body_b,
            target_angle: b.angle() - a.angle(),
            ..Self::default()
        })
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.softness) {
            return Err(PhysicsError::InvalidJointDef("softness must be in [0, 1]"));
        }
        if self.bias_factor < 0.0 {
            return Err(PhysicsError::InvalidJointDef("bias factor must be non-negative"));
        }
        if self.max_impulse < 0.0 {
            return Err(PhysicsError::InvalidJointDef("max impulse must be non-negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AngleJoint {
    target_angle: f32,
    bias_factor: f32,
    max_impulse: f32,
    softness: f32,

    bias: f32,
    mass_factor: f32,
    inv_i_a: f32,
    inv_i_b: f32,
    /// Impulse applied during the current step.
    impulse: f32,
}

impl AngleJoint {
    pub(crate) fn new(def: &AngleJointDef) -> Self {
        Self {
            target_angle: def.target_angle,
            bias_factor: def.bias_factor,
            max_impulse: def.max_impulse,
            softness: def.softness,
            bias: 0.0,
            mass_factor: 0.0,
            inv_i_a: 0.0,
            inv_i_b: 0.0,
            impulse: 0.0,
        }
    }

    pub fn target_angle(&self) -> f32 {
        self.target_angle
    }

    pub fn set_target_angle(&mut self, angle: f32) {
        self.target_angle = angle;
    }

    pub fn bias_factor(&self) -> f32 {
        self.bias_factor
    }

    pub fn set_bias_factor(&mut self, bias_factor: f32) {
        self.bias_factor = bias_factor;
    }

    pub fn max_impulse(&self) -> f32 {
        self.max_impulse
    }

    pub fn set_max_impulse(&mut self, max_impulse: f32) {
        self.max_impulse = max_impulse;
    }

    pub fn softness(&self) -> f32 {
        self.softness
    }

    pub fn set_softness(&mut self, softness: f32) {
        self.softness = softness;
    }
}

impl JointConstraint for AngleJoint {
    fn init_velocity_constraints(&mut self, a: &mut Body, b: &mut Body, step: &TimeStep) {
        self.inv_i_a = a.inv_i;
        self.inv_i_b = b.inv_i;

        let error = b.sweep.a - a.sweep.a - self.target_angle;
        self.bias = -self.bias_factor * step.inv_dt * error;

        let inv_i = self.inv_i_a + self.inv_i_b;
        self.mass_factor = if inv_i > 0.0 {
            (1.0 - self.softness) / inv_i
        } else {
            0.0
        };
        self.impulse = 0.0;
    }

    fn solve_velocity_constraints(&mut self, a: &mut Body, b: &mut Body, _step: &TimeStep) {
        let p = (self.bias - b.angular_velocity + a.angular_velocity) * self.mass_factor;
        let impulse = p.signum() * p.abs().min(self.max_impulse);
        self.impulse += impulse;

        a.angular_velocity -= self.inv_i_a * impulse;
        b.angular_velocity += self.inv_i_b * impulse;
    }

    fn solve_position_constraints(&mut self, _a: &mut Body, _b: &mut Body) -> bool {
        true
    }

    fn reaction_force(&self, _inv_dt: f32) -> Vec2 {
        Vec2::ZERO
    }

    fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.impulse
    }
}
