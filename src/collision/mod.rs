//! Collision detection: shapes, bounding volumes, the broad phase and the
//! narrow phase (GJK distance and manifold generation).

pub mod aabb;
pub mod broad_phase;
pub mod collide;
pub mod distance;
pub mod manifold;
pub mod shapes;

pub use aabb::{Aabb, RayCastInput, RayCastOutput};
pub use broad_phase::{BroadPhase, BruteForceBroadPhase, ProxyId};
pub use collide::collide;
pub use distance::{
    distance, test_overlap, DistanceInput, DistanceOutput, DistanceProxy, SimplexCache,
};
pub use manifold::{ContactId, FeatureType, Manifold, ManifoldPoint, ManifoldType, WorldManifold};
pub use shapes::{ChainShape, CircleShape, EdgeShape, MassData, PolygonShape, Shape, ShapeType};
