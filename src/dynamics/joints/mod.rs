//! Joint constraints between pairs of bodies.
//!
//! Every joint follows the same three-phase contract as contacts:
//! initialize velocity constraints (and warm start), iterate velocity
//! constraints, then iterate position constraints. Joint kinds are variants
//! of [`JointKind`]; shared behavior lives in the [`JointConstraint`] trait.

mod angle;
mod distance;
mod line;
mod prismatic;
mod rope;

pub use angle::{AngleJoint, AngleJointDef};
pub use distance::{DistanceJoint, DistanceJointDef};
pub use line::{LineJoint, LineJointDef};
pub use prismatic::{PrismaticJoint, PrismaticJointDef};
pub use rope::{RopeJoint, RopeJointDef};

use glam::Vec2;

use crate::error::{PhysicsError, Result};
use crate::math::{Rot, Transform};

use super::body::Body;
use super::{body_pair, BodyHandle, TimeStep};

/// State of a one- or two-sided limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitState {
    #[default]
    Inactive,
    AtLower,
    AtUpper,
    /// Lower and upper bounds coincide.
    Equal,
}

/// Solver contract shared by all joints.
///
/// Body `a` and `b` are the joint's two bodies, borrowed for the call.
/// Position solvers write sweeps through [`Body::set_sweep_position`], which
/// keeps transforms in sync.
pub trait JointConstraint {
    fn init_velocity_constraints(&mut self, a: &mut Body, b: &mut Body, step: &TimeStep);

    fn solve_velocity_constraints(&mut self, a: &mut Body, b: &mut Body, step: &TimeStep);

    /// Returns `true` when the position error is within tolerance.
    fn solve_position_constraints(&mut self, a: &mut Body, b: &mut Body) -> bool;

    /// Reaction force on body B at the anchor, in newtons.
    fn reaction_force(&self, inv_dt: f32) -> Vec2;

    /// Reaction torque on body B, in newton-meters.
    fn reaction_torque(&self, inv_dt: f32) -> f32;
}

/// Mass properties of one body, cached at the start of a step.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SolverBody {
    pub(crate) local_center: Vec2,
    pub(crate) inv_mass: f32,
    pub(crate) inv_i: f32,
}

impl SolverBody {
    pub(crate) fn of(body: &Body) -> Self {
        Self {
            local_center: body.sweep.local_center,
            inv_mass: body.inv_mass,
            inv_i: body.inv_i,
        }
    }
}

/// Anchor arm from the center of mass in world orientation.
#[inline]
pub(crate) fn anchor_arm(angle: f32, local_anchor: Vec2, local_center: Vec2) -> Vec2 {
    Rot::new(angle).apply(local_anchor - local_center)
}

fn lookup<'a>(bodies: &'a [Body], handle: BodyHandle) -> Result<&'a Body> {
    bodies
        .get(handle.0)
        .ok_or(PhysicsError::UnknownBody(handle))
}

/// Resolve two distinct bodies for a joint definition helper.
pub(crate) fn lookup_pair<'a>(
    bodies: &'a [Body],
    body_a: BodyHandle,
    body_b: BodyHandle,
) -> Result<(&'a Body, &'a Body)> {
    if body_a == body_b {
        return Err(PhysicsError::SameBody);
    }
    Ok((lookup(bodies, body_a)?, lookup(bodies, body_b)?))
}

/// The variant-specific part of a joint.
#[derive(Debug, Clone)]
pub enum JointKind {
    Angle(AngleJoint),
    Distance(DistanceJoint),
    Rope(RopeJoint),
    Line(LineJoint),
    Prismatic(PrismaticJoint),
}

macro_rules! dispatch {
    ($self:ident, $joint:ident => $body:expr) => {
        match $self {
            JointKind::Angle($joint) => $body,
            JointKind::Distance($joint) => $body,
            JointKind::Rope($joint) => $body,
            JointKind::Line($joint) => $body,
            JointKind::Prismatic($joint) => $body,
        }
    };
}

impl JointConstraint for JointKind {
    fn init_velocity_constraints(&mut self, a: &mut Body, b: &mut Body, step: &TimeStep) {
        dispatch!(self, j => j.init_velocity_constraints(a, b, step))
    }

    fn solve_velocity_constraints(&mut self, a: &mut Body, b: &mut Body, step: &TimeStep) {
        dispatch!(self, j => j.solve_velocity_constraints(a, b, step))
    }

    fn solve_position_constraints(&mut self, a: &mut Body, b: &mut Body) -> bool {
        dispatch!(self, j => j.solve_position_constraints(a, b))
    }

    fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        dispatch!(self, j => j.reaction_force(inv_dt))
    }

    fn reaction_torque(&self, inv_dt: f32) -> f32 {
        dispatch!(self, j => j.reaction_torque(inv_dt))
    }
}

impl JointKind {
    /// Anchors in each body's local frame. The angle joint has none and
    /// reports the body origins.
    pub fn local_anchors(&self) -> (Vec2, Vec2) {
        match self {
            JointKind::Angle(_) => (Vec2::ZERO, Vec2::ZERO),
            JointKind::Distance(j) => (j.local_anchor_a, j.local_anchor_b),
            JointKind::Rope(j) => (j.local_anchor_a, j.local_anchor_b),
            JointKind::Line(j) => (j.local_anchor_a, j.local_anchor_b),
            JointKind::Prismatic(j) => (j.local_anchor_a, j.local_anchor_b),
        }
    }
}

/// A joint owned by the world.
#[derive(Debug, Clone)]
pub struct Joint {
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) collide_connected: bool,
    pub(crate) island_flag: bool,
    pub(crate) kind: JointKind,
}

impl Joint {
    pub(crate) fn new(def: JointDef) -> Self {
        let (body_a, body_b) = def.bodies();
        let collide_connected = def.collide_connected();
        let kind = match def {
            JointDef::Angle(d) => JointKind::Angle(AngleJoint::new(&d)),
            JointDef::Distance(d) => JointKind::Distance(DistanceJoint::new(&d)),
            JointDef::Rope(d) => JointKind::Rope(RopeJoint::new(&d)),
            JointDef::Line(d) => JointKind::Line(LineJoint::new(&d)),
            JointDef::Prismatic(d) => JointKind::Prismatic(PrismaticJoint::new(&d)),
        };
        Self {
            body_a,
            body_b,
            collide_connected,
            island_flag: false,
            kind,
        }
    }

    pub fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    pub fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    pub fn collide_connected(&self) -> bool {
        self.collide_connected
    }

    pub fn kind(&self) -> &JointKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut JointKind {
        &mut self.kind
    }

    /// Whether this joint links bodies `a` and `b`, in either order.
    pub(crate) fn connects(&self, a: usize, b: usize) -> bool {
        let (ja, jb) = (self.body_a.0, self.body_b.0);
        (ja == a && jb == b) || (ja == b && jb == a)
    }

    /// The other body of the joint, as seen from `body`.
    pub(crate) fn other(&self, body: usize) -> usize {
        if self.body_a.0 == body {
            self.body_b.0
        } else {
            self.body_a.0
        }
    }

    /// World-space anchors given the body transforms.
    pub fn anchors(&self, xf_a: &Transform, xf_b: &Transform) -> (Vec2, Vec2) {
        let (local_a, local_b) = self.kind.local_anchors();
        (xf_a.apply(local_a), xf_b.apply(local_b))
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.kind.reaction_force(inv_dt)
    }

    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        self.kind.reaction_torque(inv_dt)
    }

    pub(crate) fn init_velocity_constraints(&mut self, bodies: &mut [Body], step: &TimeStep) {
        let (a, b) = body_pair(bodies, self.body_a.0, self.body_b.0);
        self.kind.init_velocity_constraints(a, b, step);
    }

    pub(crate) fn solve_velocity_constraints(&mut self, bodies: &mut [Body], step: &TimeStep) {
        let (a, b) = body_pair(bodies, self.body_a.0, self.body_b.0);
        self.kind.solve_velocity_constraints(a, b, step);
    }

    pub(crate) fn solve_position_constraints(&mut self, bodies: &mut [Body]) -> bool {
        let (a, b) = body_pair(bodies, self.body_a.0, self.body_b.0);
        self.kind.solve_position_constraints(a, b)
    }
}

/// Parameters used to create a joint.
#[derive(Debug, Clone)]
pub enum JointDef {
    Angle(AngleJointDef),
    Distance(DistanceJointDef),
    Rope(RopeJointDef),
    Line(LineJointDef),
    Prismatic(PrismaticJointDef),
}

impl JointDef {
    pub fn bodies(&self) -> (BodyHandle, BodyHandle) {
        match self {
            JointDef::Angle(d) => (d.body_a, d.body_b),
            JointDef::Distance(d) => (d.body_a, d.body_b),
            JointDef::Rope(d) => (d.body_a, d.body_b),
            JointDef::Line(d) => (d.body_a, d.body_b),
            JointDef::Prismatic(d) => (d.body_a, d.body_b),
        }
    }

    pub fn collide_connected(&self) -> bool {
        match self {
            JointDef::Angle(d) => d.collide_connected,
            JointDef::Distance(d) => d.collide_connected,
            JointDef::Rope(d) => d.collide_connected,
            JointDef::Line(d) => d.collide_connected,
            JointDef::Prismatic(d) => d.collide_connected,
        }
    }

    /// Check body references and variant parameters.
    pub(crate) fn validate(&self, bodies: &[Body]) -> Result<()> {
        let (a, b) = self.bodies();
        lookup_pair(bodies, a, b)?;
        match self {
            JointDef::Angle(d) => d.validate(),
            JointDef::Distance(d) => d.validate(),
            JointDef::Rope(d) => d.validate(),
            JointDef::Line(d) => d.validate(),
            JointDef::Prismatic(d) => d.validate(),
        }
    }
}

impl From<AngleJointDef> for JointDef {
    fn from(def: AngleJointDef) -> Self {
        JointDef::Angle(def)
    }
}

impl From<DistanceJointDef> for JointDef {
    fn from(def: DistanceJointDef) -> Self {
        JointDef::Distance(def)
    }
}

impl From<RopeJointDef> for JointDef {
    fn from(def: RopeJointDef) -> Self {
        JointDef::Rope(def)
    }
}

impl From<LineJointDef> for JointDef {
    fn from(def: LineJointDef) -> Self {
        JointDef::Line(def)
    }
}

impl From<PrismaticJointDef> for JointDef {
    fn from(def: PrismaticJointDef) -> Self {
        JointDef::Prismatic(def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::BodyDef;

    #[test]
    fn test_lookup_pair_rejects_same_and_unknown() {
        let bodies = vec![
            Body::new(&BodyDef::default()),
            Body::new(&BodyDef::dynamic()),
        ];
        assert_eq!(
            lookup_pair(&bodies, BodyHandle(1), BodyHandle(1)).err(),
            Some(PhysicsError::SameBody)
        );
        assert_eq!(
            lookup_pair(&bodies, BodyHandle(0), BodyHandle(7)).err(),
            Some(PhysicsError::UnknownBody(BodyHandle(7)))
        );
        assert!(lookup_pair(&bodies, BodyHandle(0), BodyHandle(1)).is_ok());
    }

    #[test]
    fn test_joint_connects_either_order() {
        let def = RopeJointDef {
            body_a: BodyHandle(2),
            body_b: BodyHandle(5),
            ..RopeJointDef::default()
        };
        let joint = Joint::new(def.into());
        assert!(joint.connects(2, 5));
        assert!(joint.connects(5, 2));
        assert!(!joint.connects(2, 3));
        assert_eq!(joint.other(5), 2);
        assert!(!joint.collide_connected());
    }
}
