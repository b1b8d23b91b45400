//! Contacts between fixture children that overlap in the broad phase.
//!
//! A contact exists while the fat AABBs overlap; it is *touching* only
//! while the narrow phase reports manifold points (or, for sensors, while
//! the shapes overlap).

use crate::collision::{collide, test_overlap, Manifold, ShapeType};
use crate::math::Transform;

use super::fixture::Fixture;
use super::FixtureHandle;

/// Touch state changes reported by
/// [`World::drain_contact_events`](super::World::drain_contact_events).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactEvent {
    Begin {
        fixture_a: FixtureHandle,
        fixture_b: FixtureHandle,
    },
    End {
        fixture_a: FixtureHandle,
        fixture_b: FixtureHandle,
    },
}

/// Friction mixing: geometric mean, so a zero-friction fixture slides on anything.
#[inline]
pub fn mix_friction(friction_a: f32, friction_b: f32) -> f32 {
    (friction_a * friction_b).sqrt()
}

/// Restitution mixing: the bouncier fixture wins.
#[inline]
pub fn mix_restitution(restitution_a: f32, restitution_b: f32) -> f32 {
    restitution_a.max(restitution_b)
}

/// Whether the shapes of a pair must swap so the narrow phase gets its
/// expected order (reference shape first, circles last).
fn needs_swap(type_a: ShapeType, type_b: ShapeType) -> bool {
    match (type_a, type_b) {
        (ShapeType::Circle, other) => other != ShapeType::Circle,
        (ShapeType::Polygon, ShapeType::Edge | ShapeType::Chain) => true,
        _ => false,
    }
}

/// Edges and chains have no interior and never collide with each other.
fn can_collide(type_a: ShapeType, type_b: ShapeType) -> bool {
    let thin = |t: ShapeType| matches!(t, ShapeType::Edge | ShapeType::Chain);
    !(thin(type_a) && thin(type_b))
}

#[derive(Debug, Clone)]
pub struct Contact {
    pub(crate) fixture_a: FixtureHandle,
    pub(crate) child_a: usize,
    pub(crate) fixture_b: FixtureHandle,
    pub(crate) child_b: usize,
    pub(crate) manifold: Manifold,
    pub(crate) friction: f32,
    pub(crate) restitution: f32,
    pub(crate) restitution_threshold: f32,
    pub(crate) touching: bool,
    pub(crate) enabled: bool,
    /// Set when the fixtures' filters or joint links changed.
    pub(crate) filter_flag: bool,
    pub(crate) island_flag: bool,
}

impl Contact {
    /// Build a contact for a fixture-child pair, reordering the pair when
    /// the narrow phase needs it. Returns `None` for pairs that never touch.
    pub(crate) fn new(
        a: (FixtureHandle, &Fixture, usize),
        b: (FixtureHandle, &Fixture, usize),
        restitution_threshold: f32,
    ) -> Option<Self> {
        let type_a = a.1.shape.shape_type();
        let type_b = b.1.shape.shape_type();
        if !can_collide(type_a, type_b) {
            return None;
        }

        let ((ha, fa, ca), (hb, fb, cb)) = if needs_swap(type_a, type_b) {
            (b, a)
        } else {
            (a, b)
        };

        Some(Self {
            fixture_a: ha,
            child_a: ca,
            fixture_b: hb,
            child_b: cb,
            manifold: Manifold::default(),
            friction: mix_friction(fa.friction, fb.friction),
            restitution: mix_restitution(fa.restitution, fb.restitution),
            restitution_threshold,
            touching: false,
            enabled: true,
            filter_flag: false,
            island_flag: false,
        })
    }

    pub fn fixture_a(&self) -> FixtureHandle {
        self.fixture_a
    }

    pub fn child_a(&self) -> usize {
        self.child_a
    }

    pub fn fixture_b(&self) -> FixtureHandle {
        self.fixture_b
    }

    pub fn child_b(&self) -> usize {
        self.child_b
    }

    pub fn manifold(&self) -> &Manifold {
        &self.manifold
    }

    pub fn is_touching(&self) -> bool {
        self.touching
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Re-run the narrow phase. Returns the touching state before the update.
    ///
    /// Manifold points keep the impulses of old points with the same feature
    /// id so the solver can warm start.
    pub(crate) fn update(
        &mut self,
        fixture_a: &Fixture,
        xf_a: &Transform,
        fixture_b: &Fixture,
        xf_b: &Transform,
    ) -> bool {
        let old_manifold = self.manifold;
        let was_touching = self.touching;
        self.enabled = true;

        let sensor = fixture_a.is_sensor || fixture_b.is_sensor;
        if sensor {
            self.touching = test_overlap(
                &fixture_a.shape,
                self.child_a,
                &fixture_b.shape,
                self.child_b,
                xf_a,
                xf_b,
            );
            // Sensors never produce contact points.
            self.manifold.point_count = 0;
        } else {
            self.manifold = collide(
                &fixture_a.shape,
                self.child_a,
                xf_a,
                &fixture_b.shape,
                self.child_b,
                xf_b,
            );
            self.touching = self.manifold.point_count > 0;

            for mp2 in self.manifold.points_mut() {
                mp2.normal_impulse = 0.0;
                mp2.tangent_impulse = 0.0;
                let key = mp2.id.key();
                if let Some(mp1) = old_manifold.points().iter().find(|mp1| mp1.id.key() == key) {
                    mp2.normal_impulse = mp1.normal_impulse;
                    mp2.tangent_impulse = mp1.tangent_impulse;
                }
            }
        }

        was_touching
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{CircleShape, EdgeShape, PolygonShape};
    use crate::dynamics::fixture::FixtureDef;
    use crate::dynamics::BodyHandle;
    use glam::Vec2;

    fn fixture(shape: impl Into<crate::collision::Shape>) -> Fixture {
        Fixture::new(BodyHandle(0), &FixtureDef::new(shape))
    }

    #[test]
    fn test_mixing_rules() {
        assert!((mix_friction(0.4, 0.9) - 0.6).abs() < 1e-6);
        assert_eq!(mix_friction(0.0, 1.0), 0.0);
        assert_eq!(mix_restitution(0.1, 0.7), 0.7);
    }

    #[test]
    fn test_circle_goes_last() {
        let circle = fixture(CircleShape::new(1.0));
        let square = fixture(PolygonShape::new_box(1.0, 1.0));
        let contact = Contact::new(
            (FixtureHandle(0), &circle, 0),
            (FixtureHandle(1), &square, 0),
            1.0,
        )
        .unwrap();
        assert_eq!(contact.fixture_a(), FixtureHandle(1));
        assert_eq!(contact.fixture_b(), FixtureHandle(0));
    }

    #[test]
    fn test_edge_pairs_rejected_and_ordered() {
        let edge = fixture(EdgeShape::new(Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0)));
        let square = fixture(PolygonShape::new_box(1.0, 1.0));
        assert!(Contact::new(
            (FixtureHandle(0), &edge, 0),
            (FixtureHandle(1), &edge, 0),
            1.0
        )
        .is_none());

        let contact = Contact::new(
            (FixtureHandle(1), &square, 0),
            (FixtureHandle(0), &edge, 0),
            1.0,
        )
        .unwrap();
        assert_eq!(contact.fixture_a(), FixtureHandle(0));
    }

    #[test]
    fn test_update_carries_impulses_by_feature() {
        let ground = fixture(PolygonShape::new_box(2.0, 0.5));
        let block = fixture(PolygonShape::new_box(0.5, 0.5));
        let mut contact = Contact::new(
            (FixtureHandle(0), &ground, 0),
            (FixtureHandle(1), &block, 0),
            1.0,
        )
        .unwrap();

        let xf_a = Transform::IDENTITY;
        let xf_b = Transform::new(Vec2::new(0.0, 0.99), 0.0);
        assert!(!contact.update(&ground, &xf_a, &block, &xf_b));
        assert!(contact.is_touching());
        assert_eq!(contact.manifold().point_count, 2);

        for (i, mp) in contact.manifold.points_mut().iter_mut().enumerate() {
            mp.normal_impulse = 1.0 + i as f32;
            mp.tangent_impulse = 0.5;
        }

        // Small motion keeps the same features.
        let xf_b = Transform::new(Vec2::new(0.01, 0.985), 0.0);
        assert!(contact.update(&ground, &xf_a, &block, &xf_b));
        let impulses: Vec<f32> = contact
            .manifold()
            .points()
            .iter()
            .map(|p| p.normal_impulse)
            .collect();
        assert_eq!(impulses, vec![1.0, 2.0]);

        // Separated: no longer touching.
        let far = Transform::new(Vec2::new(0.0, 3.0), 0.0);
        assert!(contact.update(&ground, &xf_a, &block, &far));
        assert!(!contact.is_touching());
    }

    #[test]
    fn test_sensor_reports_overlap_without_points() {
        let mut sensor = fixture(CircleShape::new(1.0));
        sensor.is_sensor = true;
        let square = fixture(PolygonShape::new_box(1.0, 1.0));
        let mut contact = Contact::new(
            (FixtureHandle(0), &sensor, 0),
            (FixtureHandle(1), &square, 0),
            1.0,
        )
        .unwrap();
        // After ordering A is the polygon.
        let xf_circle = Transform::new(Vec2::new(1.5, 0.0), 0.0);
        contact.update(&square, &Transform::IDENTITY, &sensor, &xf_circle);
        assert!(contact.is_touching());
        assert_eq!(contact.manifold().point_count, 0);
    }
}
