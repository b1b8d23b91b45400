//! Rigid body dynamics: bodies, fixtures, contacts, joints and the world
//! that steps them.
//!
//! # Step pipeline
//!
//! 1. Update contacts from the broad phase and run the narrow phase
//! 2. Build islands of awake bodies connected by touching contacts and joints
//! 3. Per island: integrate velocities, solve velocity constraints,
//!    integrate positions, solve position constraints, update sleep
//! 4. Move broad-phase proxies and look for new pairs
//! 5. Clear force accumulators

pub mod body;
pub mod contact;
pub(crate) mod contact_manager;
pub(crate) mod contact_solver;
pub mod fixture;
pub(crate) mod island;
pub mod joints;
pub mod world;

pub use body::{Body, BodyDef, BodyType};
pub use contact::{Contact, ContactEvent};
pub use fixture::{Filter, Fixture, FixtureDef, FixtureProxy};
pub use joints::{
    AngleJoint, AngleJointDef, DistanceJoint, DistanceJointDef, Joint, JointConstraint, JointDef,
    JointKind, LimitState, LineJoint, LineJointDef, PrismaticJoint, PrismaticJointDef, RopeJoint,
    RopeJointDef,
};
pub use world::World;

/// Handle to a body owned by a [`World`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub(crate) usize);

/// Handle to a fixture owned by a [`World`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixtureHandle(pub(crate) usize);

/// Handle to a joint owned by a [`World`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JointHandle(pub(crate) usize);

impl BodyHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

impl FixtureHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

impl JointHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Per-step solver parameters.
#[derive(Debug, Clone, Copy)]
pub struct TimeStep {
    pub dt: f32,
    /// `1 / dt`, or zero for a zero-length step.
    pub inv_dt: f32,
    /// `dt * inv_dt0`: rescales warm-start impulses when the step changes.
    pub dt_ratio: f32,
    pub velocity_iterations: u32,
    pub position_iterations: u32,
    pub warm_starting: bool,
}

impl TimeStep {
    pub fn new(dt: f32, inv_dt0: f32, velocity_iterations: u32, position_iterations: u32) -> Self {
        Self {
            dt,
            inv_dt: if dt > 0.0 { 1.0 / dt } else { 0.0 },
            dt_ratio: inv_dt0 * dt,
            velocity_iterations,
            position_iterations,
            warm_starting: true,
        }
    }
}

/// Borrow two distinct bodies mutably.
///
/// # Panics
/// If `a == b` or either index is out of range.
pub(crate) fn body_pair(bodies: &mut [Body], a: usize, b: usize) -> (&mut Body, &mut Body) {
    assert_ne!(a, b, "constraint connects body {a} to itself");
    if a < b {
        let (lo, hi) = bodies.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = bodies.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_pair_either_order() {
        let mut bodies = vec![
            Body::new(&BodyDef::default()),
            Body::new(&BodyDef::dynamic()),
            Body::new(&BodyDef::kinematic()),
        ];
        let (a, b) = body_pair(&mut bodies, 2, 0);
        assert_eq!(a.body_type(), BodyType::Kinematic);
        assert_eq!(b.body_type(), BodyType::Static);

        let (a, b) = body_pair(&mut bodies, 0, 1);
        assert_eq!(a.body_type(), BodyType::Static);
        assert_eq!(b.body_type(), BodyType::Dynamic);
    }

    #[test]
    fn test_time_step_ratio() {
        let step = TimeStep::new(1.0 / 30.0, 60.0, 8, 3);
        assert!((step.inv_dt - 30.0).abs() < 1e-3);
        assert!((step.dt_ratio - 2.0).abs() < 1e-5);

        let zero = TimeStep::new(0.0, 60.0, 8, 3);
        assert_eq!(zero.inv_dt, 0.0);
    }
}
