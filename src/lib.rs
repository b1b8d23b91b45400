//! Rein 2D Physics
//!
//! A 2D rigid body physics core: GJK distance queries, manifold generation,
//! a sequential impulse contact solver and a joint framework.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **math** - Rotations, transforms, sweeps and guarded matrix solves
//! 2. **collision** - Shapes, AABBs, broad phase, GJK and contact manifolds
//! 3. **dynamics** - Bodies, fixtures, contacts, joints, islands and the world
//! 4. **ecs** - hecs ECS integration (feature = "ecs")
//!
//! # Example
//!
//! ```
//! use rein_physics2d::{BodyDef, CircleShape, FixtureDef, PhysicsConfig, PolygonShape, World};
//! use glam::Vec2;
//!
//! let mut world = World::new(PhysicsConfig::default());
//! let ground = world.create_body(&BodyDef::default());
//! world
//!     .create_fixture(ground, &FixtureDef::new(PolygonShape::new_box(10.0, 1.0)))
//!     .unwrap();
//!
//! let ball = world.create_body(&BodyDef::dynamic().with_position(Vec2::new(0.0, 4.0)));
//! world
//!     .create_fixture(ball, &FixtureDef::new(CircleShape::new(0.5)).with_density(1.0))
//!     .unwrap();
//!
//! for _ in 0..60 {
//!     world.step(1.0 / 60.0);
//! }
//! assert!(world.body(ball).unwrap().position().y < 4.0);
//! ```

pub mod collision;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod math;
pub mod settings;

#[cfg(feature = "ecs")]
pub mod ecs;

// Re-export commonly used types
pub use collision::{
    Aabb, ChainShape, CircleShape, EdgeShape, Manifold, MassData, PolygonShape, Shape,
    WorldManifold,
};

pub use config::PhysicsConfig;

pub use dynamics::{
    AngleJointDef, Body, BodyDef, BodyHandle, BodyType, Contact, ContactEvent, DistanceJointDef,
    Filter, Fixture, FixtureDef, FixtureHandle, Joint, JointDef, JointHandle, JointKind,
    LimitState, LineJointDef, PrismaticJointDef, RopeJointDef, World,
};

pub use error::{PhysicsError, Result};

pub use math::{Rot, Sweep, Transform};

#[cfg(feature = "ecs")]
pub use ecs::{spawn_body, sync_poses, PhysicsBody, Pose2D};

pub use glam;
