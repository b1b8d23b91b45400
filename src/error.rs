//! Errors returned by fallible construction APIs.
//!
//! Solver code never fails; degenerate numerics fall back to simpler paths.
//! These errors cover invalid user input at the world boundary.

use thiserror::Error;

use crate::dynamics::{BodyHandle, FixtureHandle, JointHandle};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("polygon needs between 3 and {max} vertices, got {count}")]
    PolygonVertexCount { count: usize, max: usize },

    #[error("polygon is degenerate: {0}")]
    DegeneratePolygon(&'static str),

    #[error("chain needs at least {min} vertices, got {count}")]
    ChainVertexCount { count: usize, min: usize },

    #[error("chain vertices {0} and {1} are too close together")]
    ChainVerticesTooClose(usize, usize),

    #[error("circle radius must be positive, got {0}")]
    InvalidRadius(f32),

    #[error("unknown body {0:?}")]
    UnknownBody(BodyHandle),

    #[error("unknown fixture {0:?}")]
    UnknownFixture(FixtureHandle),

    #[error("unknown joint {0:?}")]
    UnknownJoint(JointHandle),

    #[error("a joint cannot connect a body to itself")]
    SameBody,

    #[error("invalid joint definition: {0}")]
    InvalidJointDef(&'static str),
}

pub type Result<T> = std::result::Result<T, PhysicsError>;
