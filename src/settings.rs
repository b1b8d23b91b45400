//! Tuning constants for collision and the constraint solvers.
//!
//! Units are meters, kilograms and seconds.

use std::f32::consts::PI;

/// Maximum number of contact points between two convex shapes.
pub const MAX_MANIFOLD_POINTS: usize = 2;

/// Maximum number of vertices on a convex polygon.
pub const MAX_POLYGON_VERTICES: usize = 8;

/// Fattening applied to broad-phase AABBs so small motions don't trigger updates.
pub const AABB_EXTENSION: f32 = 0.1;

/// Scales the displacement used to predict AABB motion.
pub const AABB_MULTIPLIER: f32 = 2.0;

/// Collision and constraint tolerance.
pub const LINEAR_SLOP: f32 = 0.005;

/// Angular collision and constraint tolerance.
pub const ANGULAR_SLOP: f32 = 2.0 / 180.0 * PI;

/// Skin radius of polygons and edges.
pub const POLYGON_RADIUS: f32 = 2.0 * LINEAR_SLOP;

/// Maximum number of GJK iterations.
pub const MAX_DISTANCE_ITERATIONS: usize = 20;

/// Relative velocity below which collisions are treated as inelastic.
pub const VELOCITY_THRESHOLD: f32 = 1.0;

/// Largest linear position correction applied in one position iteration.
pub const MAX_LINEAR_CORRECTION: f32 = 0.2;

/// Largest angular position correction applied in one position iteration.
pub const MAX_ANGULAR_CORRECTION: f32 = 8.0 / 180.0 * PI;

/// Largest translation of a body in one step.
pub const MAX_TRANSLATION: f32 = 2.0;
pub const MAX_TRANSLATION_SQUARED: f32 = MAX_TRANSLATION * MAX_TRANSLATION;

/// Largest rotation of a body in one step.
pub const MAX_ROTATION: f32 = 0.5 * PI;
pub const MAX_ROTATION_SQUARED: f32 = MAX_ROTATION * MAX_ROTATION;

/// Fraction of overlap resolved per position iteration.
pub const BAUMGARTE: f32 = 0.2;

/// Block solver rejects two-point manifolds with a worse condition estimate.
pub const MAX_CONDITION_NUMBER: f32 = 1000.0;

/// Time a body must be still before it sleeps.
pub const TIME_TO_SLEEP: f32 = 0.5;

/// Linear velocity below which a body may sleep.
pub const LINEAR_SLEEP_TOLERANCE: f32 = 0.01;

/// Angular velocity below which a body may sleep.
pub const ANGULAR_SLEEP_TOLERANCE: f32 = 2.0 / 180.0 * PI;
