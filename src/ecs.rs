//! Bridge between the physics [`World`] and a `hecs` ECS world.
//!
//! Entities carry a [`PhysicsBody`] linking them to a body and a [`Pose2D`]
//! that [`sync_poses`] refreshes after each physics step.

use glam::Vec2;

use crate::dynamics::{BodyDef, BodyHandle, FixtureDef, World};
use crate::error::Result;

/// Links an entity to a body owned by the physics world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsBody(pub BodyHandle);

/// World-space position and angle of an entity's body origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose2D {
    pub position: Vec2,
    /// Radians.
    pub angle: f32,
}

/// Create a body with its fixtures and spawn an entity linked to it.
pub fn spawn_body(
    physics: &mut World,
    ecs: &mut hecs::World,
    def: &BodyDef,
    fixtures: &[FixtureDef],
) -> Result<(hecs::Entity, BodyHandle)> {
    let body = physics.create_body(def);
    for fixture in fixtures {
        physics.create_fixture(body, fixture)?;
    }

    let pose = Pose2D {
        position: def.position,
        angle: def.angle,
    };
    let entity = ecs.spawn((PhysicsBody(body), pose));
    Ok((entity, body))
}

/// Copy body transforms into every entity with a `PhysicsBody` and a `Pose2D`.
///
/// Entities whose handle does not resolve are left untouched.
pub fn sync_poses(physics: &World, ecs: &mut hecs::World) {
    for (_, (link, pose)) in ecs.query_mut::<(&PhysicsBody, &mut Pose2D)>() {
        if let Some(body) = physics.body(link.0) {
            pose.position = body.position();
            pose.angle = body.angle();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::CircleShape;
    use crate::config::PhysicsConfig;

    const EPS: f32 = 1e-5;

    #[test]
    fn test_spawn_body_links_entity() {
        let mut physics = World::new(PhysicsConfig::default());
        let mut ecs = hecs::World::new();

        let def = BodyDef::dynamic()
            .with_position(Vec2::new(1.0, 2.0))
            .with_angle(0.5);
        let fixtures = [FixtureDef::new(CircleShape::new(0.5)).with_density(1.0)];
        let (entity, body) = spawn_body(&mut physics, &mut ecs, &def, &fixtures).unwrap();

        assert_eq!(ecs.get::<&PhysicsBody>(entity).unwrap().0, body);
        assert_eq!(physics.fixture_count(), 1);
        let pose = *ecs.get::<&Pose2D>(entity).unwrap();
        assert!((pose.position - Vec2::new(1.0, 2.0)).length() < EPS);
        assert!((pose.angle - 0.5).abs() < EPS);
    }

    #[test]
    fn test_sync_poses_follows_body() {
        let mut physics = World::new(PhysicsConfig::default());
        let mut ecs = hecs::World::new();
        let def = BodyDef::dynamic().with_position(Vec2::new(0.0, 10.0));
        let fixtures = [FixtureDef::new(CircleShape::new(0.5)).with_density(1.0)];
        let (entity, body) = spawn_body(&mut physics, &mut ecs, &def, &fixtures).unwrap();

        for _ in 0..30 {
            physics.step(1.0 / 60.0);
        }
        sync_poses(&physics, &mut ecs);

        let pose = *ecs.get::<&Pose2D>(entity).unwrap();
        let expected = physics.body(body).unwrap().position();
        assert!(
            pose.position.y < 10.0,
            "body should have fallen: y = {}",
            pose.position.y
        );
        assert!((pose.position - expected).length() < EPS);
    }

    #[test]
    fn test_sync_poses_skips_entities_without_pose() {
        let mut physics = World::new(PhysicsConfig::default());
        let mut ecs = hecs::World::new();
        let body = physics.create_body(&BodyDef::dynamic());
        let entity = ecs.spawn((PhysicsBody(body),));

        sync_poses(&physics, &mut ecs);
        assert!(ecs.get::<&Pose2D>(entity).is_err());
    }

    #[test]
    fn test_spawn_body_propagates_fixture_errors() {
        let mut physics = World::new(PhysicsConfig::default());
        let mut ecs = hecs::World::new();
        let fixtures = [FixtureDef::new(CircleShape::new(-1.0))];
        let result = spawn_body(&mut physics, &mut ecs, &BodyDef::dynamic(), &fixtures);
        assert!(result.is_err());
        assert_eq!(ecs.len(), 0);
    }
}
