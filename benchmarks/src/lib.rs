//! Scene setup shared by the physics benchmarks.

use anyhow::Result;
use glam::Vec2;
use rein_physics2d::collision::{BroadPhase, BruteForceBroadPhase, ProxyId};
use rein_physics2d::{
    Aabb, BodyDef, BodyHandle, CircleShape, FixtureDef, PhysicsConfig, PolygonShape,
    RopeJointDef, World,
};

/// Deterministic pseudo-random sequence in `[0, 1)`, so runs are comparable.
pub struct Lcg(u32);

impl Lcg {
    pub fn new(seed: u32) -> Self {
        Self(seed)
    }

    pub fn next_f32(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (self.0 >> 8) as f32 / (1u32 << 24) as f32
    }
}

/// Static ground box whose top face lies on y = 0.
pub fn add_ground(world: &mut World, half_width: f32) -> Result<BodyHandle> {
    let ground = world.create_body(&BodyDef::default().with_position(Vec2::new(0.0, -1.0)));
    let fixture = FixtureDef::new(PolygonShape::new_box(half_width, 1.0));
    world.create_fixture(ground, &fixture)?;
    Ok(ground)
}

/// `n` bodies, alternating circles and boxes, dropped in a loose grid above
/// the ground.
pub fn setup_falling_scene(n: usize) -> Result<World> {
    let mut world = World::new(PhysicsConfig::default());
    let columns = (n as f32).sqrt().ceil().max(1.0) as usize;
    add_ground(&mut world, columns as f32 * 1.5 + 2.0)?;

    let mut rng = Lcg::new(7);
    for i in 0..n {
        let x = (i % columns) as f32 * 1.5 - columns as f32 * 0.75 + 0.2 * rng.next_f32();
        let y = 2.0 + (i / columns) as f32 * 1.5;
        let body = world.create_body(&BodyDef::dynamic().with_position(Vec2::new(x, y)));
        let fixture = if i % 2 == 0 {
            FixtureDef::new(CircleShape::new(0.5))
        } else {
            FixtureDef::new(PolygonShape::new_box(0.5, 0.5))
        };
        world.create_fixture(body, &fixture.with_density(1.0).with_friction(0.6))?;
    }
    Ok(world)
}

/// A `height` box pyramid, stepped until most contacts exist so the solver
/// dominates the next step.
pub fn setup_pyramid(height: usize) -> Result<World> {
    let mut world = World::new(PhysicsConfig::default());
    add_ground(&mut world, height as f32 + 5.0)?;

    let shape = PolygonShape::new_box(0.5, 0.5);
    for row in 0..height {
        let count = height - row;
        let y = 0.5 + row as f32 * 1.0;
        for col in 0..count {
            let x = col as f32 * 1.05 - count as f32 * 0.525;
            let body = world.create_body(&BodyDef::dynamic().with_position(Vec2::new(x, y)));
            world.create_fixture(body, &FixtureDef::new(shape).with_density(1.0))?;
        }
    }
    for _ in 0..5 {
        world.step(1.0 / 60.0);
    }
    Ok(world)
}

/// A hanging chain of `links` small circles joined by ropes.
pub fn setup_rope_chain(links: usize) -> Result<World> {
    let mut world = World::new(PhysicsConfig::default());
    let anchor = world.create_body(&BodyDef::default().with_position(Vec2::new(0.0, 20.0)));

    let mut prev = anchor;
    let mut prev_point = Vec2::new(0.0, 20.0);
    for i in 1..=links {
        let point = Vec2::new(0.5 * i as f32, 20.0);
        let link = world.create_body(&BodyDef::dynamic().with_position(point));
        let fixture = FixtureDef::new(CircleShape::new(0.1)).with_density(1.0);
        world.create_fixture(link, &fixture)?;
        let def = RopeJointDef::new(&world, prev, link, prev_point, point, 0.5)?;
        world.create_joint(def)?;
        prev = link;
        prev_point = point;
    }
    Ok(world)
}

/// Broad phase filled with `n` unit AABBs spread over a square of side
/// `extent`.
pub fn setup_broad_phase(n: usize, extent: f32) -> (BruteForceBroadPhase<usize>, Vec<ProxyId>) {
    let mut broad_phase = BruteForceBroadPhase::new();
    let mut rng = Lcg::new(11);
    let proxies = (0..n)
        .map(|i| {
            let center = Vec2::new(rng.next_f32(), rng.next_f32()) * extent;
            let aabb = Aabb::new(center - Vec2::splat(0.5), center + Vec2::splat(0.5));
            broad_phase.create_proxy(aabb, i)
        })
        .collect();
    (broad_phase, proxies)
}
