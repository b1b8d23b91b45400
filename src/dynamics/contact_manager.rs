//! Owns the broad phase and the contact list.

use std::collections::HashSet;

use crate::collision::BroadPhase;

use super::body::{Body, BodyType};
use super::contact::{Contact, ContactEvent};
use super::fixture::{Fixture, FixtureProxy};
use super::joints::Joint;
use super::FixtureHandle;

type PairKey = (FixtureProxy, FixtureProxy);

fn pair_key(a: FixtureProxy, b: FixtureProxy) -> PairKey {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Two bodies may collide when at least one is dynamic and no joint between
/// them disables collision.
pub(crate) fn bodies_should_collide(
    bodies: &[Body],
    joints: &[Option<Joint>],
    body_a: usize,
    body_b: usize,
) -> bool {
    let a = &bodies[body_a];
    let b = &bodies[body_b];
    if a.body_type != BodyType::Dynamic && b.body_type != BodyType::Dynamic {
        return false;
    }
    !a.joints.iter().any(|handle| {
        joints
            .get(handle.0)
            .and_then(Option::as_ref)
            .is_some_and(|joint| !joint.collide_connected && joint.connects(body_a, body_b))
    })
}

pub(crate) struct ContactManager {
    pub(crate) broad_phase: Box<dyn BroadPhase<FixtureProxy>>,
    pub(crate) contacts: Vec<Contact>,
    pairs: HashSet<PairKey>,
    pub(crate) events: Vec<ContactEvent>,
    pub(crate) restitution_threshold: f32,
}

impl ContactManager {
    pub(crate) fn new(
        broad_phase: Box<dyn BroadPhase<FixtureProxy>>,
        restitution_threshold: f32,
    ) -> Self {
        Self {
            broad_phase,
            contacts: Vec::new(),
            pairs: HashSet::new(),
            events: Vec::new(),
            restitution_threshold,
        }
    }

    /// Create contacts for new broad-phase pairs.
    pub(crate) fn find_new_contacts(
        &mut self,
        bodies: &[Body],
        fixtures: &[Fixture],
        joints: &[Option<Joint>],
    ) {
        let mut new_pairs = Vec::new();
        self.broad_phase
            .update_pairs(&mut |a, b| new_pairs.push((a, b)));

        for (proxy_a, proxy_b) in new_pairs {
            self.add_pair(proxy_a, proxy_b, bodies, fixtures, joints);
        }
    }

    fn add_pair(
        &mut self,
        proxy_a: FixtureProxy,
        proxy_b: FixtureProxy,
        bodies: &[Body],
        fixtures: &[Fixture],
        joints: &[Option<Joint>],
    ) {
        let (handle_a, child_a) = (proxy_a.fixture, proxy_a.child);
        let (handle_b, child_b) = (proxy_b.fixture, proxy_b.child);
        let fixture_a = &fixtures[handle_a.0];
        let fixture_b = &fixtures[handle_b.0];

        let body_a = fixture_a.body.0;
        let body_b = fixture_b.body.0;
        if body_a == body_b {
            return;
        }

        let key = pair_key(proxy_a, proxy_b);
        if self.pairs.contains(&key) {
            return;
        }

        if !bodies_should_collide(bodies, joints, body_a, body_b) {
            return;
        }
        if !fixture_a.filter.should_collide(&fixture_b.filter) {
            return;
        }

        let Some(contact) = Contact::new(
            (handle_a, fixture_a, child_a),
            (handle_b, fixture_b, child_b),
            self.restitution_threshold,
        ) else {
            return;
        };

        tracing::trace!(
            fixture_a = contact.fixture_a.0,
            fixture_b = contact.fixture_b.0,
            "contact created"
        );
        self.pairs.insert(key);
        self.contacts.push(contact);
    }

    /// Remove the contact at `index`, reporting an end event if it was touching.
    pub(crate) fn destroy(&mut self, index: usize) {
        let contact = self.contacts.swap_remove(index);
        if contact.touching {
            self.events.push(ContactEvent::End {
                fixture_a: contact.fixture_a,
                fixture_b: contact.fixture_b,
            });
        }
        self.pairs.remove(&pair_key(
            FixtureProxy {
                fixture: contact.fixture_a,
                child: contact.child_a,
            },
            FixtureProxy {
                fixture: contact.fixture_b,
                child: contact.child_b,
            },
        ));
        tracing::trace!(
            fixture_a = contact.fixture_a.0,
            fixture_b = contact.fixture_b.0,
            "contact destroyed"
        );
    }

    /// Flag every contact that involves `fixture` for re-filtering.
    pub(crate) fn flag_fixture(&mut self, fixture: FixtureHandle) {
        for contact in &mut self.contacts {
            if contact.fixture_a == fixture || contact.fixture_b == fixture {
                contact.filter_flag = true;
            }
        }
    }

    /// Flag contacts between two bodies for re-filtering.
    pub(crate) fn flag_body_pair(&mut self, fixtures: &[Fixture], body_a: usize, body_b: usize) {
        for contact in &mut self.contacts {
            let a = fixtures[contact.fixture_a.0].body.0;
            let b = fixtures[contact.fixture_b.0].body.0;
            if (a == body_a && b == body_b) || (a == body_b && b == body_a) {
                contact.filter_flag = true;
            }
        }
    }

    /// Narrow phase: drop contacts whose fat AABBs stopped overlapping or
    /// that are now filtered out, update the rest.
    pub(crate) fn collide(
        &mut self,
        bodies: &mut [Body],
        fixtures: &[Fixture],
        joints: &[Option<Joint>],
    ) {
        let mut i = 0;
        while i < self.contacts.len() {
            let contact = &self.contacts[i];
            let fixture_a = &fixtures[contact.fixture_a.0];
            let fixture_b = &fixtures[contact.fixture_b.0];
            let body_a = fixture_a.body.0;
            let body_b = fixture_b.body.0;

            if contact.filter_flag {
                if !bodies_should_collide(bodies, joints, body_a, body_b)
                    || !fixture_a.filter.should_collide(&fixture_b.filter)
                {
                    self.destroy(i);
                    continue;
                }
                self.contacts[i].filter_flag = false;
            }

            let active = |b: &Body| b.awake && b.body_type != BodyType::Static;
            if !active(&bodies[body_a]) && !active(&bodies[body_b]) {
                i += 1;
                continue;
            }

            let contact = &self.contacts[i];
            let proxy_a = fixture_a.proxies[contact.child_a];
            let proxy_b = fixture_b.proxies[contact.child_b];
            if !self.broad_phase.test_overlap(proxy_a, proxy_b) {
                self.destroy(i);
                continue;
            }

            let xf_a = bodies[body_a].xf;
            let xf_b = bodies[body_b].xf;
            let contact = &mut self.contacts[i];
            let was_touching = contact.update(fixture_a, &xf_a, fixture_b, &xf_b);
            let touching = contact.touching;

            if touching != was_touching {
                let sensor = fixture_a.is_sensor || fixture_b.is_sensor;
                if !sensor {
                    bodies[body_a].set_awake(true);
                    bodies[body_b].set_awake(true);
                }
                let (fixture_a, fixture_b) = (contact.fixture_a, contact.fixture_b);
                self.events.push(if touching {
                    ContactEvent::Begin {
                        fixture_a,
                        fixture_b,
                    }
                } else {
                    ContactEvent::End {
                        fixture_a,
                        fixture_b,
                    }
                });
            }

            i += 1;
        }
    }
}
