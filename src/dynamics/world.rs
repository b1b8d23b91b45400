//! The world owns bodies, fixtures, joints and contacts and advances them.

use glam::Vec2;

use crate::collision::{
    Aabb, BroadPhase, BruteForceBroadPhase, MassData, RayCastInput, Shape, WorldManifold,
};
use crate::config::PhysicsConfig;
use crate::error::{PhysicsError, Result};

use super::body::{Body, BodyDef, BodyType};
use super::contact::{Contact, ContactEvent};
use super::contact_manager::ContactManager;
use super::fixture::{Filter, Fixture, FixtureDef, FixtureProxy};
use super::island::Island;
use super::joints::{Joint, JointDef};
use super::{BodyHandle, FixtureHandle, JointHandle, TimeStep};

/// A physics world.
///
/// Bodies and fixtures live for the lifetime of the world; joints can be
/// destroyed. The caller chooses the step length on every call to
/// [`World::step`].
pub struct World {
    config: PhysicsConfig,
    pub(crate) bodies: Vec<Body>,
    pub(crate) fixtures: Vec<Fixture>,
    pub(crate) joints: Vec<Option<Joint>>,
    pub(crate) contact_manager: ContactManager,
    /// Set when fixtures were added since the last pair search.
    new_fixture: bool,
    /// Inverse of the previous step length, for warm-start scaling.
    inv_dt0: f32,
    island: Island,
}

impl World {
    /// Create a world with the brute-force broad phase.
    pub fn new(config: PhysicsConfig) -> Self {
        Self::with_broad_phase(config, Box::new(BruteForceBroadPhase::new()))
    }

    /// Create a world with a caller-provided broad phase.
    pub fn with_broad_phase(
        config: PhysicsConfig,
        broad_phase: Box<dyn BroadPhase<FixtureProxy>>,
    ) -> Self {
        let threshold = config.velocity_threshold;
        Self {
            config,
            bodies: Vec::new(),
            fixtures: Vec::new(),
            joints: Vec::new(),
            contact_manager: ContactManager::new(broad_phase, threshold),
            new_fixture: false,
            inv_dt0: 0.0,
            island: Island::default(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn gravity(&self) -> Vec2 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.config.gravity = gravity;
    }

    pub fn create_body(&mut self, def: &BodyDef) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len());
        self.bodies.push(Body::new(def));
        tracing::trace!(body = handle.0, body_type = ?def.body_type, "body created");
        handle
    }

    /// Attach a shape to a body. Bodies with positive-density fixtures get
    /// their mass recomputed.
    pub fn create_fixture(&mut self, body: BodyHandle, def: &FixtureDef) -> Result<FixtureHandle> {
        let xf = self
            .bodies
            .get(body.0)
            .ok_or(PhysicsError::UnknownBody(body))?
            .xf;
        if let Shape::Circle(circle) = &def.shape {
            if !(circle.radius > 0.0) {
                return Err(PhysicsError::InvalidRadius(circle.radius));
            }
        }

        let handle = FixtureHandle(self.fixtures.len());
        let mut fixture = Fixture::new(body, def);
        for child in 0..fixture.shape.child_count() {
            let aabb = fixture.shape.compute_aabb(&xf, child);
            let user_data = FixtureProxy {
                fixture: handle,
                child,
            };
            let proxy = self
                .contact_manager
                .broad_phase
                .create_proxy(aabb, user_data);
            fixture.proxies.push(proxy);
        }
        self.fixtures.push(fixture);
        self.bodies[body.0].fixtures.push(handle);

        if def.density > 0.0 {
            self.reset_mass_data(body.0);
        }

        // Pick up the new proxies at the start of the next step.
        self.new_fixture = true;
        Ok(handle)
    }

    fn reset_mass_data(&mut self, body: usize) {
        let fixtures = &self.fixtures;
        let masses: Vec<MassData> = self.bodies[body]
            .fixtures
            .iter()
            .map(|h| &fixtures[h.0])
            .filter(|f| f.density > 0.0)
            .map(|f| f.shape.compute_mass(f.density))
            .collect();
        self.bodies[body].reset_mass_data(masses);
    }

    /// Create a joint. Unless the joint allows it, its bodies stop colliding.
    pub fn create_joint(&mut self, def: impl Into<JointDef>) -> Result<JointHandle> {
        let def = def.into();
        def.validate(&self.bodies)?;

        let joint = Joint::new(def);
        let handle = JointHandle(self.joints.len());
        let (a, b) = (joint.body_a.0, joint.body_b.0);
        self.bodies[a].joints.push(handle);
        self.bodies[b].joints.push(handle);

        if !joint.collide_connected {
            self.contact_manager.flag_body_pair(&self.fixtures, a, b);
        }

        self.joints.push(Some(joint));
        tracing::trace!(joint = handle.0, body_a = a, body_b = b, "joint created");
        Ok(handle)
    }

    /// Remove a joint and wake its bodies. Joint handles are never reused.
    pub fn destroy_joint(&mut self, handle: JointHandle) -> Result<()> {
        let joint = self
            .joints
            .get_mut(handle.0)
            .and_then(Option::take)
            .ok_or(PhysicsError::UnknownJoint(handle))?;

        for body in [joint.body_a.0, joint.body_b.0] {
            let b = &mut self.bodies[body];
            b.joints.retain(|&h| h != handle);
            b.set_awake(true);
        }

        if !joint.collide_connected {
            // Let the broad phase report the pair again.
            self.touch_body_proxies(joint.body_b.0);
        }

        tracing::trace!(joint = handle.0, "joint destroyed");
        Ok(())
    }

    /// Advance the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        let span = tracing::trace_span!("world_step", dt);
        let _enter = span.enter();

        let mut step = TimeStep::new(
            dt,
            self.inv_dt0,
            self.config.velocity_iterations,
            self.config.position_iterations,
        );
        step.warm_starting = self.config.warm_starting;

        self.update_contacts();

        if step.dt > 0.0 {
            self.solve(&step);
            self.inv_dt0 = step.inv_dt;
        }

        if self.config.auto_clear_forces {
            self.clear_forces();
        }
    }

    /// Find pairs for new fixtures, then run the narrow phase.
    pub(crate) fn update_contacts(&mut self) {
        if self.new_fixture {
            self.contact_manager
                .find_new_contacts(&self.bodies, &self.fixtures, &self.joints);
            self.new_fixture = false;
        }
        self.contact_manager
            .collide(&mut self.bodies, &self.fixtures, &self.joints);
    }

    fn solve(&mut self, step: &TimeStep) {
        for body in &mut self.bodies {
            body.island_flag = false;
        }
        for contact in &mut self.contact_manager.contacts {
            contact.island_flag = false;
        }
        for joint in self.joints.iter_mut().flatten() {
            joint.island_flag = false;
        }

        // Contact adjacency per body, rebuilt each step.
        let mut contact_edges: Vec<Vec<usize>> = vec![Vec::new(); self.bodies.len()];
        for (index, contact) in self.contact_manager.contacts.iter().enumerate() {
            contact_edges[self.fixtures[contact.fixture_a.0].body.0].push(index);
            contact_edges[self.fixtures[contact.fixture_b.0].body.0].push(index);
        }

        let mut island = std::mem::take(&mut self.island);
        let mut stack = Vec::new();
        let mut island_count = 0usize;

        for seed in 0..self.bodies.len() {
            {
                let body = &self.bodies[seed];
                if body.island_flag || !body.awake || body.body_type == BodyType::Static {
                    continue;
                }
            }

            island.clear();
            stack.clear();
            stack.push(seed);
            self.bodies[seed].island_flag = true;

            // Depth first search over the constraint graph.
            while let Some(index) = stack.pop() {
                island.bodies.push(index);
                let body = &mut self.bodies[index];
                body.set_awake(true);

                // Static bodies do not propagate islands.
                if body.body_type == BodyType::Static {
                    continue;
                }

                for &contact_index in &contact_edges[index] {
                    let contact = &mut self.contact_manager.contacts[contact_index];
                    if contact.island_flag || !contact.enabled || !contact.touching {
                        continue;
                    }
                    let fixture_a = &self.fixtures[contact.fixture_a.0];
                    let fixture_b = &self.fixtures[contact.fixture_b.0];
                    if fixture_a.is_sensor || fixture_b.is_sensor {
                        continue;
                    }

                    contact.island_flag = true;
                    island.contacts.push(contact_index);

                    let other = if fixture_a.body.0 == index {
                        fixture_b.body.0
                    } else {
                        fixture_a.body.0
                    };
                    if !self.bodies[other].island_flag {
                        self.bodies[other].island_flag = true;
                        stack.push(other);
                    }
                }

                for k in 0..self.bodies[index].joints.len() {
                    let handle = self.bodies[index].joints[k];
                    let Some(joint) = self.joints[handle.0].as_mut() else {
                        continue;
                    };
                    if joint.island_flag {
                        continue;
                    }
                    joint.island_flag = true;
                    island.joints.push(handle.0);

                    let other = joint.other(index);
                    if !self.bodies[other].island_flag {
                        self.bodies[other].island_flag = true;
                        stack.push(other);
                    }
                }
            }

            island.solve(
                step,
                self.config.gravity,
                self.config.allow_sleep,
                &mut self.bodies,
                &mut self.contact_manager.contacts,
                &self.fixtures,
                &mut self.joints,
            );
            island_count += 1;

            // Static bodies may join other islands.
            for &index in &island.bodies {
                let body = &mut self.bodies[index];
                if body.body_type == BodyType::Static {
                    body.island_flag = false;
                }
            }
        }

        tracing::trace!(islands = island_count, "islands solved");
        self.island = island;

        // Move proxies of bodies that were simulated.
        for index in 0..self.bodies.len() {
            let body = &self.bodies[index];
            if !body.island_flag || body.body_type == BodyType::Static {
                continue;
            }
            self.synchronize_fixtures(index);
        }

        self.contact_manager
            .find_new_contacts(&self.bodies, &self.fixtures, &self.joints);
    }

    /// Update broad-phase proxies to cover the body's sweep over the last step.
    fn synchronize_fixtures(&mut self, body: usize) {
        let b = &self.bodies[body];
        let xf1 = b.transform_at_step_start();
        let xf2 = b.xf;

        for handle in &b.fixtures {
            let fixture = &self.fixtures[handle.0];
            for (child, &proxy) in fixture.proxies.iter().enumerate() {
                let aabb1 = fixture.shape.compute_aabb(&xf1, child);
                let aabb2 = fixture.shape.compute_aabb(&xf2, child);
                let displacement = aabb2.center() - aabb1.center();
                self.contact_manager
                    .broad_phase
                    .move_proxy(proxy, aabb1.combine(&aabb2), displacement);
            }
        }
    }

    fn touch_body_proxies(&mut self, body: usize) {
        for handle in &self.bodies[body].fixtures {
            for &proxy in &self.fixtures[handle.0].proxies {
                self.contact_manager.broad_phase.touch_proxy(proxy);
            }
        }
    }

    /// Zero the force and torque accumulators of every body.
    pub fn clear_forces(&mut self) {
        for body in &mut self.bodies {
            body.force = Vec2::ZERO;
            body.torque = 0.0;
        }
    }

    /// Teleport a body and wake it. Contacts are updated on the next step.
    pub fn set_transform(&mut self, body: BodyHandle, position: Vec2, angle: f32) -> Result<()> {
        let b = self
            .bodies
            .get_mut(body.0)
            .ok_or(PhysicsError::UnknownBody(body))?;
        b.set_transform(position, angle);
        if b.body_type != BodyType::Static {
            b.set_awake(true);
        }

        let xf = b.xf;
        for handle in &b.fixtures {
            let fixture = &self.fixtures[handle.0];
            for (child, &proxy) in fixture.proxies.iter().enumerate() {
                let aabb = fixture.shape.compute_aabb(&xf, child);
                self.contact_manager
                    .broad_phase
                    .move_proxy(proxy, aabb, Vec2::ZERO);
            }
        }

        self.contact_manager
            .find_new_contacts(&self.bodies, &self.fixtures, &self.joints);
        Ok(())
    }

    /// Replace a fixture's filter. Existing contacts are re-filtered on the
    /// next step and new pairs are searched.
    pub fn set_filter_data(&mut self, fixture: FixtureHandle, filter: Filter) -> Result<()> {
        let f = self
            .fixtures
            .get_mut(fixture.0)
            .ok_or(PhysicsError::UnknownFixture(fixture))?;
        f.filter = filter;
        self.contact_manager.flag_fixture(fixture);
        for &proxy in &self.fixtures[fixture.0].proxies {
            self.contact_manager.broad_phase.touch_proxy(proxy);
        }
        Ok(())
    }

    /// Visit fixtures whose fat AABB overlaps `aabb`. Return `false` from the
    /// callback to stop.
    pub fn query_aabb(&self, aabb: &Aabb, mut callback: impl FnMut(FixtureHandle) -> bool) {
        let broad_phase = &self.contact_manager.broad_phase;
        broad_phase.query(aabb, &mut |proxy| {
            callback(broad_phase.user_data(proxy).fixture)
        });
    }

    /// Cast a ray from `p1` to `p2` against every fixture.
    ///
    /// The callback receives the fixture, hit point, surface normal and
    /// fraction along the ray. It returns `-1` to ignore the hit, `0` to
    /// stop, the fraction to clip the ray to this hit, or `1` to continue.
    pub fn ray_cast(
        &self,
        p1: Vec2,
        p2: Vec2,
        mut callback: impl FnMut(FixtureHandle, Vec2, Vec2, f32) -> f32,
    ) {
        let input = RayCastInput {
            p1,
            p2,
            max_fraction: 1.0,
        };
        let broad_phase = &self.contact_manager.broad_phase;
        broad_phase.ray_cast(&input, &mut |sub_input, proxy| {
            let FixtureProxy { fixture, child } = broad_phase.user_data(proxy);
            let f = &self.fixtures[fixture.0];
            let xf = &self.bodies[f.body.0].xf;
            match f.shape.ray_cast(sub_input, xf, child) {
                Some(output) => {
                    let fraction = output.fraction;
                    let point = (1.0 - fraction) * sub_input.p1 + fraction * sub_input.p2;
                    callback(fixture, point, output.normal, fraction)
                }
                None => sub_input.max_fraction,
            }
        });
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle.0)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle.0)
    }

    /// Handles of all bodies in creation order.
    pub fn body_handles(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        (0..self.bodies.len()).map(BodyHandle)
    }

    pub fn fixture(&self, handle: FixtureHandle) -> Option<&Fixture> {
        self.fixtures.get(handle.0)
    }

    /// Material setters on the fixture apply to contacts created afterwards.
    pub fn fixture_mut(&mut self, handle: FixtureHandle) -> Option<&mut Fixture> {
        self.fixtures.get_mut(handle.0)
    }

    pub fn joint(&self, handle: JointHandle) -> Option<&Joint> {
        self.joints.get(handle.0).and_then(Option::as_ref)
    }

    /// Mutable access to a joint. Wakes both bodies, since any parameter
    /// change may move them.
    pub fn joint_mut(&mut self, handle: JointHandle) -> Option<&mut Joint> {
        let joint = self.joints.get_mut(handle.0).and_then(Option::as_mut)?;
        self.bodies[joint.body_a.0].set_awake(true);
        self.bodies[joint.body_b.0].set_awake(true);
        Some(joint)
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contact_manager.contacts
    }

    /// World-space normal, points and separations of a contact.
    pub fn world_manifold(&self, contact: &Contact) -> WorldManifold {
        let fixture_a = &self.fixtures[contact.fixture_a.0];
        let fixture_b = &self.fixtures[contact.fixture_b.0];
        WorldManifold::new(
            &contact.manifold,
            &self.bodies[fixture_a.body.0].xf,
            fixture_a.shape.radius(),
            &self.bodies[fixture_b.body.0].xf,
            fixture_b.shape.radius(),
        )
    }

    /// Take the begin/end touch events queued since the last call.
    pub fn drain_contact_events(&mut self) -> impl Iterator<Item = ContactEvent> + '_ {
        self.contact_manager.events.drain(..)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn fixture_count(&self) -> usize {
        self.fixtures.len()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.iter().flatten().count()
    }

    pub fn contact_count(&self) -> usize {
        self.contact_manager.contacts.len()
    }

    pub fn proxy_count(&self) -> usize {
        self.contact_manager.broad_phase.proxy_count()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}
