//! End-to-end scenarios driven through the public `World` API.

use glam::Vec2;
use rein_physics2d::settings::{LINEAR_SLOP, POLYGON_RADIUS};
use rein_physics2d::{
    BodyDef, BodyHandle, CircleShape, ContactEvent, DistanceJointDef, FixtureDef, PhysicsConfig,
    PolygonShape, PrismaticJointDef, RopeJointDef, World,
};

const DT: f32 = 1.0 / 60.0;

/// Static ground whose top face lies on y = 0.
fn world_with_ground() -> (World, BodyHandle) {
    let mut world = World::new(PhysicsConfig::default());
    let ground = world.create_body(&BodyDef::default().with_position(Vec2::new(0.0, -1.0)));
    world
        .create_fixture(ground, &FixtureDef::new(PolygonShape::new_box(20.0, 1.0)))
        .unwrap();
    (world, ground)
}

fn drop_circle(world: &mut World, position: Vec2) -> BodyHandle {
    let body = world.create_body(&BodyDef::dynamic().with_position(position));
    let fixture = FixtureDef::new(CircleShape::new(1.0)).with_density(1.0);
    world.create_fixture(body, &fixture).unwrap();
    body
}

#[test]
fn test_two_circles_come_to_rest_on_ground() {
    let (mut world, _) = world_with_ground();
    let left = drop_circle(&mut world, Vec2::new(-3.0, 4.0));
    let right = drop_circle(&mut world, Vec2::new(3.0, 6.0));

    for _ in 0..600 {
        world.step(DT);
    }

    // Resting separation settles around -LINEAR_SLOP plus the ground's skin.
    let tolerance = 2.0 * LINEAR_SLOP + POLYGON_RADIUS;
    for handle in [left, right] {
        let body = world.body(handle).unwrap();
        let gap = body.position().y - 1.0;
        assert!(gap.abs() < tolerance, "gap from ground = {}", gap);
        assert!(
            body.linear_velocity().length() < 0.05,
            "linear velocity = {:?}",
            body.linear_velocity()
        );
        assert!(
            body.angular_velocity().abs() < 0.05,
            "angular velocity = {}",
            body.angular_velocity()
        );
    }
    assert_eq!(world.contact_count(), 2);
}

#[test]
fn test_resting_bodies_fall_asleep_and_report_begin() {
    let (mut world, _) = world_with_ground();
    let ball = drop_circle(&mut world, Vec2::new(0.0, 2.0));

    let mut begins = 0;
    for _ in 0..600 {
        world.step(DT);
        begins += world
            .drain_contact_events()
            .filter(|e| matches!(e, ContactEvent::Begin { .. }))
            .count();
    }

    assert_eq!(begins, 1, "ball should land once");
    assert!(!world.body(ball).unwrap().is_awake());
}

#[test]
fn test_box_stack_stays_upright() {
    let (mut world, _) = world_with_ground();
    let mut boxes = Vec::new();
    for i in 0..3 {
        let def = BodyDef::dynamic().with_position(Vec2::new(0.0, 0.5 + 1.05 * i as f32));
        let body = world.create_body(&def);
        world
            .create_fixture(
                body,
                &FixtureDef::new(PolygonShape::new_box(0.5, 0.5))
                    .with_density(1.0)
                    .with_friction(0.6),
            )
            .unwrap();
        boxes.push(body);
    }

    for _ in 0..300 {
        world.step(DT);
    }

    for (i, handle) in boxes.iter().enumerate() {
        let body = world.body(*handle).unwrap();
        let expected_y = 0.5 + i as f32;
        assert!(
            (body.position().y - expected_y).abs() < 0.1,
            "box {} at y = {}",
            i,
            body.position().y
        );
        assert!(
            body.position().x.abs() < 0.05,
            "box {} drifted to x = {}",
            i,
            body.position().x
        );
        assert!(
            body.angle().abs() < 0.05,
            "box {} tilted to {}",
            i,
            body.angle()
        );
    }
}

#[test]
fn test_pendulum_keeps_length_and_swings() {
    let mut world = World::new(PhysicsConfig::default());
    let pivot = world.create_body(&BodyDef::default().with_position(Vec2::new(0.0, 5.0)));
    let bob = world.create_body(&BodyDef::dynamic().with_position(Vec2::new(2.0, 5.0)));
    let fixture = FixtureDef::new(CircleShape::new(0.25)).with_density(1.0);
    world.create_fixture(bob, &fixture).unwrap();

    let def = DistanceJointDef::new(&world, pivot, bob, Vec2::new(0.0, 5.0), Vec2::new(2.0, 5.0))
        .unwrap();
    world.create_joint(def).unwrap();

    let mut crossed_left = false;
    for _ in 0..240 {
        world.step(DT);
        let p = world.body(bob).unwrap().position();
        let length = (p - Vec2::new(0.0, 5.0)).length();
        assert!((length - 2.0).abs() < 0.02, "length = {}", length);
        crossed_left |= p.x < -1.0;
    }
    assert!(crossed_left, "pendulum never swung to the other side");
}

#[test]
fn test_rope_chain_hangs_within_total_length() {
    let mut world = World::new(PhysicsConfig::default());
    let anchor = world.create_body(&BodyDef::default().with_position(Vec2::new(0.0, 10.0)));

    let mut prev = anchor;
    let mut prev_point = Vec2::new(0.0, 10.0);
    let mut last = anchor;
    for i in 1..=4 {
        let point = Vec2::new(0.5 * i as f32, 10.0);
        let link = world.create_body(&BodyDef::dynamic().with_position(point));
        let fixture = FixtureDef::new(CircleShape::new(0.1)).with_density(1.0);
        world.create_fixture(link, &fixture).unwrap();
        let def = RopeJointDef::new(&world, prev, link, prev_point, point, 0.5).unwrap();
        world.create_joint(def).unwrap();
        prev = link;
        prev_point = point;
        last = link;
    }

    for _ in 0..300 {
        world.step(DT);
    }

    let end = world.body(last).unwrap().position();
    let reach = (end - Vec2::new(0.0, 10.0)).length();
    assert!(reach < 2.0 + 0.1, "chain stretched to {}", reach);
    assert!(end.y < 9.0, "chain should hang down: y = {}", end.y);
}

#[test]
fn test_prismatic_slider_rests_on_lower_limit() {
    let (mut world, ground) = world_with_ground();
    let slider = world.create_body(&BodyDef::dynamic().with_position(Vec2::new(0.0, 3.0)));
    let fixture = FixtureDef::new(PolygonShape::new_box(0.25, 0.25)).with_density(1.0);
    world.create_fixture(slider, &fixture).unwrap();

    let def = PrismaticJointDef::new(&world, ground, slider, Vec2::new(0.0, 3.0), Vec2::Y)
        .unwrap()
        .with_limits(-1.0, 1.0);
    world.create_joint(def).unwrap();

    for _ in 0..240 {
        world.step(DT);
    }

    let body = world.body(slider).unwrap();
    assert!(
        (body.position().y - 2.0).abs() < 0.02,
        "y = {}",
        body.position().y
    );
    assert!(body.position().x.abs() < 1e-3, "x = {}", body.position().x);
    assert!(body.angle().abs() < 1e-3, "angle = {}", body.angle());
}
