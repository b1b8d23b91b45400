use std::f32::consts::PI;

use glam::Vec2;

use crate::dynamics::body::Body;
use crate::dynamics::world::World;
use crate::dynamics::{BodyHandle, TimeStep};
use crate::error::{PhysicsError, Result};
use crate::math::{cross, Rot};
use crate::settings::LINEAR_SLOP;

use super::{anchor_arm, lookup_pair, JointConstraint, SolverBody};

/// Keeps the anchor of body B on a line through the anchor of body A.
///
/// Body B rotates freely, optionally driven by a motor, and can be held
/// along the line by a spring. This is the usual vehicle suspension.
#[derive(Debug, Clone)]
pub struct LineJointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub collide_connected: bool,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    /// Line direction in body A's frame. Default: +x.
    pub local_axis_a: Vec2,
    pub enable_motor: bool,
    pub max_motor_torque: f32,
    /// Radians per second.
    pub motor_speed: f32,
    /// Suspension frequency. 0 disables the spring. Default: 2.
    pub frequency_hz: f32,
    /// Default: 0.7.
    pub damping_ratio: f32,
}

impl Default for LineJointDef {
    fn default() -> Self {
        Self {
            body_a: BodyHandle(0),
            body_b: BodyHandle(0),
            collide_connected: false,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            local_axis_a: Vec2::X,
            enable_motor: false,
            max_motor_torque: 0.0,
            motor_speed: 0.0,
            frequency_hz: 2.0,
            damping_ratio: 0.7,
        }
    }
}

impl LineJointDef {
    /// Shared world anchor and a world axis.
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
            ..Self::default()
        })
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.local_axis_a.length_squared() < f32::EPSILON {
            return Err(PhysicsError::InvalidJointDef("axis must be non-zero"));
        }
        if self.frequency_hz < 0.0 || self.damping_ratio < 0.0 {
            return Err(PhysicsError::InvalidJointDef("spring parameters must be non-negative"));
        }
        if self.max_motor_torque < 0.0 {
            return Err(PhysicsError::InvalidJointDef("max motor torque must be non-negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LineJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    local_x_axis_a: Vec2,
    local_y_axis_a: Vec2,

    impulse: f32,
    motor_impulse: f32,
    spring_impulse: f32,

    max_motor_torque: f32,
    motor_speed: f32,
    enable_motor: bool,
    frequency_hz: f32,
    damping_ratio: f32,

    body_a: SolverBody,
    body_b: SolverBody,
    ax: Vec2,
    ay: Vec2,
    s_ax: f32,
    s_bx: f32,
    s_ay: f32,
    s_by: f32,
    mass: f32,
    motor_mass: f32,
    spring_mass: f32,
    bias: f32,
    gamma: f32,
}

impl LineJoint {
    pub(crate) fn new(def: &LineJointDef) -> Self {
        let local_x_axis_a = def.local_axis_a.normalize_or_zero();
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            local_x_axis_a,
            local_y_axis_a: local_x_axis_a.perp(),
            impulse: 0.0,
            motor_impulse: 0.0,
            spring_impulse: 0.0,
            max_motor_torque: def.max_motor_torque,
            motor_speed: def.motor_speed,
            enable_motor: def.enable_motor,
            frequency_hz: def.frequency_hz,
            damping_ratio: def.damping_ratio,
            body_a: SolverBody::default(),
            body_b: SolverBody::default(),
            ax: Vec2::ZERO,
            ay: Vec2::ZERO,
            s_ax: 0.0,
            s_bx: 0.0,
            s_ay: 0.0,
            s_by: 0.0,
            mass: 0.0,
            motor_mass: 0.0,
            spring_mass: 0.0,
            bias: 0.0,
            gamma: 0.0,
        }
    }

    pub fn local_axis_a(&self) -> Vec2 {
        self.local_x_axis_a
    }

    /// Signed offset of anchor B from anchor A along the axis.
    pub fn joint_translation(&self, a: &Body, b: &Body) -> f32 {
        let p_a = a.world_point(self.local_anchor_a);
        let p_b = b.world_point(self.local_anchor_b);
        (p_b - p_a).dot(a.world_vector(self.local_x_axis_a))
    }

    pub fn joint_speed(&self, a: &Body, b: &Body) -> f32 {
        b.angular_velocity - a.angular_velocity
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

    pub fn max_motor_torque(&self) -> f32 {
        self.max_motor_torque
    }

    pub fn set_max_motor_torque(&mut self, torque: f32) {
        self.max_motor_torque = torque;
    }

    /// Motor torque applied over the last step.
    pub fn motor_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.motor_impulse
    }

    pub fn spring_frequency_hz(&self) -> f32 {
        self.frequency_hz
    }

    pub fn set_spring_frequency_hz(&mut self, hz: f32) {
        self.frequency_hz = hz;
    }

    pub fn spring_damping_ratio(&self) -> f32 {
        self.damping_ratio
    }

    pub fn set_spring_damping_ratio(&mut self, ratio: f32) {
        self.damping_ratio = ratio;
    }
}

impl JointConstraint for LineJoint {
    fn init_velocity_constraints(&mut self, a: &mut Body, b: &mut Body, step: &TimeStep) {
        self.body_a = SolverBody::of(a);
        self.body_b = SolverBody::of(b);
        let (m_a, i_a) = (self.body_a.inv_mass, self.body_a.inv_i);
        let (m_b, i_b) = (self.body_b.inv_mass, self.body_b.inv_i);

        let q_a = Rot::new(a.sweep.a);
        let r_a = anchor_arm(a.sweep.a, self.local_anchor_a, self.body_a.local_center);
        let r_b = anchor_arm(b.sweep.a, self.local_anchor_b, self.body_b.local_center);
        let d = b.sweep.c + r_b - a.sweep.c - r_a;

        // Point to line.
        self.ay = q_a.apply(self.local_y_axis_a);
        self.s_ay = cross(d + r_a, self.ay);
        self.s_by = cross(r_b, self.ay);

        let k = m_a + m_b + i_a * self.s_ay * self.s_ay + i_b * self.s_by * self.s_by;
        self.mass = if k > 0.0 { 1.0 / k } else { 0.0 };

        // Spring along the axis.
        self.spring_mass = 0.0;
        self.bias = 0.0;
        self.gamma = 0.0;
        self.ax = q_a.apply(self.local_x_axis_a);
        self.s_ax = cross(d + r_a, self.ax);
        self.s_bx = cross(r_b, self.ax);
        if self.frequency_hz > 0.0 {
            let inv_mass = m_a + m_b + i_a * self.s_ax * self.s_ax + i_b * self.s_bx * self.s_bx;
            if inv_mass > 0.0 {
                let mass = 1.0 / inv_mass;
                let c = d.dot(self.ax);
                let omega = 2.0 * PI * self.frequency_hz;
                let damp = 2.0 * mass * self.damping_ratio * omega;
                let stiffness = mass * omega * omega;

                let h = step.dt;
                self.gamma = h * (damp + h * stiffness);
                if self.gamma > 0.0 {
                    self.gamma = 1.0 / self.gamma;
                }
                self.bias = c * h * stiffness * self.gamma;

                let k = inv_mass + self.gamma;
                self.spring_mass = if k > 0.0 { 1.0 / k } else { 0.0 };
            }
        } else {
            self.spring_impulse = 0.0;
        }

        // Rotational motor.
        if self.enable_motor {
            let k = i_a + i_b;
            self.motor_mass = if k > 0.0 { 1.0 / k } else { 0.0 };
        } else {
            self.motor_mass = 0.0;
            self.motor_impulse = 0.0;
        }

        if step.warm_starting {
            self.impulse *= step.dt_ratio;
            self.spring_impulse *= step.dt_ratio;
            self.motor_impulse *= step.dt_ratio;

            let p = self.impulse * self.ay + self.spring_impulse * self.ax;
            let l_a =
                self.impulse * self.s_ay + self.spring_impulse * self.s_ax + self.motor_impulse;
            let l_b =
                self.impulse * self.s_by + self.spring_impulse * self.s_bx + self.motor_impulse;

            a.linear_velocity -= m_a * p;
            a.angular_velocity -= i_a * l_a;
            b.linear_velocity += m_b * p;
            b.angular_velocity += i_b * l_b;
        } else {
            self.impulse = 0.0;
            self.spring_impulse = 0.0;
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

        // Spring.
        {
            let cdot = self.ax.dot(v_b - v_a) + self.s_bx * w_b - self.s_ax * w_a;
            let impulse = -self.spring_mass * (cdot + self.bias + self.gamma * self.spring_impulse);
            self.spring_impulse += impulse;

            let p = impulse * self.ax;
            v_a -= m_a * p;
            w_a -= i_a * impulse * self.s_ax;
            v_b += m_b * p;
            w_b += i_b * impulse * self.s_bx;
        }

        // Motor.
        {
            let cdot = w_b - w_a - self.motor_speed;
            let impulse = -self.motor_mass * cdot;

            let old_impulse = self.motor_impulse;
            let max_impulse = step.dt * self.max_motor_torque;
            self.motor_impulse = (self.motor_impulse + impulse).clamp(-max_impulse, max_impulse);
            let impulse = self.motor_impulse - old_impulse;

            w_a -= i_a * impulse;
            w_b += i_b * impulse;
        }

        // Point to line.
        {
            let cdot = self.ay.dot(v_b - v_a) + self.s_by * w_b - self.s_ay * w_a;
            let impulse = -self.mass * cdot;
            self.impulse += impulse;

            let p = impulse * self.ay;
            v_a -= m_a * p;
            w_a -= i_a * impulse * self.s_ay;
            v_b += m_b * p;
            w_b += i_b * impulse * self.s_by;
        }

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

        let r_a = anchor_arm(a_a, self.local_anchor_a, self.body_a.local_center);
        let r_b = anchor_arm(a_b, self.local_anchor_b, self.body_b.local_center);
        let d = c_b - c_a + r_b - r_a;

        let ay = Rot::new(a_a).apply(self.local_y_axis_a);
        let s_ay = cross(d + r_a, ay);
        let s_by = cross(r_b, ay);

        let c = d.dot(ay);
        let k = m_a + m_b + i_a * s_ay * s_ay + i_b * s_by * s_by;
        let impulse = if k != 0.0 { -c / k } else { 0.0 };

        let p = impulse * ay;
        c_a -= m_a * p;
        a_a -= i_a * impulse * s_ay;
        c_b += m_b * p;
        a_b += i_b * impulse * s_by;

        a.set_sweep_position(c_a, a_a);
        b.set_sweep_position(c_b, a_b);

        c.abs() <= LINEAR_SLOP
    }

    fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        inv_dt * (self.impulse * self.ay + self.spring_impulse * self.ax)
    }

    fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.motor_impulse
    }
}
