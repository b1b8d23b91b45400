//! Headless demo: a ball pit, a pendulum and a wheel on a spring, stepped
//! for a few seconds with poses mirrored into an ECS world.
//!
//! Run with `RUST_LOG=info cargo run --manifest-path rein-app/Cargo.toml`
//! (or `RUST_LOG=trace` to see the physics events).

use anyhow::Result;
use glam::Vec2;
use rein_physics2d::ecs::{spawn_body, sync_poses, PhysicsBody, Pose2D};
use rein_physics2d::{
    BodyDef, CircleShape, ContactEvent, DistanceJointDef, FixtureDef, LineJointDef, PhysicsConfig,
    PolygonShape, World,
};

const DT: f32 = 1.0 / 60.0;
const STEPS: usize = 300;

/// Name tag so the log lines are readable.
struct Label(&'static str);

fn build_scene(physics: &mut World, ecs: &mut hecs::World) -> Result<()> {
    // Ground
    let ground_fixture = FixtureDef::new(PolygonShape::new_box(20.0, 1.0)).with_friction(0.6);
    let (ground_entity, _) = spawn_body(
        physics,
        ecs,
        &BodyDef::default().with_position(Vec2::new(0.0, -1.0)),
        &[ground_fixture],
    )?;
    ecs.insert_one(ground_entity, Label("ground"))?;

    // Ball pit
    for i in 0..6 {
        let position = Vec2::new(-6.0 + i as f32 * 0.9, 3.0 + i as f32 * 1.2);
        let (entity, _) = spawn_body(
            physics,
            ecs,
            &BodyDef::dynamic().with_position(position),
            &[FixtureDef::new(CircleShape::new(0.4))
                .with_density(1.0)
                .with_restitution(0.3)],
        )?;
        ecs.insert_one(entity, Label("ball"))?;
    }

    // Pendulum hung from a static pivot
    let pivot_point = Vec2::new(4.0, 8.0);
    let bob_point = Vec2::new(7.0, 8.0);
    let pivot = physics.create_body(&BodyDef::default().with_position(pivot_point));
    let bob_fixture = FixtureDef::new(PolygonShape::new_box(0.3, 0.3)).with_density(2.0);
    let (bob_entity, bob) = spawn_body(
        physics,
        ecs,
        &BodyDef::dynamic().with_position(bob_point),
        &[bob_fixture],
    )?;
    ecs.insert_one(bob_entity, Label("pendulum"))?;
    let def = DistanceJointDef::new(physics, pivot, bob, pivot_point, bob_point)?;
    physics.create_joint(def)?;

    // Chassis with a sprung wheel
    let chassis_fixture = FixtureDef::new(PolygonShape::new_box(1.0, 0.25)).with_density(1.0);
    let (chassis_entity, chassis) = spawn_body(
        physics,
        ecs,
        &BodyDef::dynamic().with_position(Vec2::new(10.0, 2.0)),
        &[chassis_fixture],
    )?;
    ecs.insert_one(chassis_entity, Label("chassis"))?;
    let (wheel_entity, wheel) = spawn_body(
        physics,
        ecs,
        &BodyDef::dynamic().with_position(Vec2::new(10.0, 1.0)),
        &[FixtureDef::new(CircleShape::new(0.5))
            .with_density(1.0)
            .with_friction(0.9)],
    )?;
    ecs.insert_one(wheel_entity, Label("wheel"))?;
    let mut def = LineJointDef::new(physics, chassis, wheel, Vec2::new(10.0, 1.0), Vec2::Y)?;
    def.frequency_hz = 4.0;
    physics.create_joint(def)?;

    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let mut physics = World::new(PhysicsConfig::default());
    let mut ecs = hecs::World::new();
    build_scene(&mut physics, &mut ecs)?;

    log::info!(
        "scene: {} bodies, {} fixtures, {} joints",
        physics.body_count(),
        physics.fixture_count(),
        physics.joint_count()
    );

    let mut begins = 0usize;
    let mut ends = 0usize;
    for frame in 0..STEPS {
        physics.step(DT);
        sync_poses(&physics, &mut ecs);

        for event in physics.drain_contact_events() {
            match event {
                ContactEvent::Begin { .. } => begins += 1,
                ContactEvent::End { .. } => ends += 1,
            }
        }

        if frame % 60 == 0 {
            log::info!(
                "t = {:.1}s: {} contacts, {} begin / {} end events so far",
                frame as f32 * DT,
                physics.contact_count(),
                begins,
                ends
            );
        }
    }

    for (_, (link, pose, label)) in ecs.query_mut::<(&PhysicsBody, &Pose2D, &Label)>() {
        let awake = physics.body(link.0).map(|b| b.is_awake()).unwrap_or(false);
        log::info!(
            "{:>8}: position ({:6.2}, {:6.2}) angle {:6.2} {}",
            label.0,
            pose.position.x,
            pose.position.y,
            pose.angle,
            if awake { "awake" } else { "asleep" }
        );
    }

    Ok(())
}
