//! Fixtures attach shapes to bodies with material and filtering data.

use glam::Vec2;

use crate::collision::{Aabb, ProxyId, Shape};
use crate::math::Transform;

use super::{BodyHandle, FixtureHandle};

/// Collision filtering data.
///
/// Two fixtures in the same non-zero group always collide (positive group)
/// or never collide (negative group). Otherwise each fixture's mask must
/// accept the other's category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    /// Default: 0x0001.
    pub category_bits: u16,
    /// Default: 0xFFFF.
    pub mask_bits: u16,
    /// Default: 0.
    pub group_index: i16,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            category_bits: 0x0001,
            mask_bits: 0xFFFF,
            group_index: 0,
        }
    }
}

impl Filter {
    pub fn should_collide(&self, other: &Filter) -> bool {
        if self.group_index == other.group_index && self.group_index != 0 {
            return self.group_index > 0;
        }
        (self.mask_bits & other.category_bits) != 0 && (self.category_bits & other.mask_bits) != 0
    }
}

/// Parameters used to create a fixture.
#[derive(Debug, Clone)]
pub struct FixtureDef {
    pub shape: Shape,
    /// kg/m^2. Default: 0.
    pub density: f32,
    /// Default: 0.2.
    pub friction: f32,
    /// Default: 0.
    pub restitution: f32,
    /// Sensors report overlaps but generate no collision response.
    pub is_sensor: bool,
    pub filter: Filter,
}

impl FixtureDef {
    pub fn new(shape: impl Into<Shape>) -> Self {
        Self {
            shape: shape.into(),
            density: 0.0,
            friction: 0.2,
            restitution: 0.0,
            is_sensor: false,
            filter: Filter::default(),
        }
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_sensor(mut self, is_sensor: bool) -> Self {
        self.is_sensor = is_sensor;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

/// User data stored in the broad phase for each fixture child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixtureProxy {
    pub fixture: FixtureHandle,
    pub child: usize,
}

/// A shape attached to a body.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub(crate) body: BodyHandle,
    pub(crate) shape: Shape,
    pub(crate) density: f32,
    pub(crate) friction: f32,
    pub(crate) restitution: f32,
    pub(crate) is_sensor: bool,
    pub(crate) filter: Filter,
    /// One broad-phase proxy per shape child.
    pub(crate) proxies: Vec<ProxyId>,
}

impl Fixture {
    pub(crate) fn new(body: BodyHandle, def: &FixtureDef) -> Self {
        Self {
            body,
            shape: def.shape.clone(),
            density: def.density,
            friction: def.friction,
            restitution: def.restitution,
            is_sensor: def.is_sensor,
            filter: def.filter,
            proxies: Vec::new(),
        }
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Affects contacts created after the change.
    pub fn set_friction(&mut self, friction: f32) {
        self.friction = friction;
    }

    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Affects contacts created after the change.
    pub fn set_restitution(&mut self, restitution: f32) {
        self.restitution = restitution;
    }

    pub fn is_sensor(&self) -> bool {
        self.is_sensor
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Whether the world point lies inside this fixture, given its body transform.
    pub fn test_point(&self, xf: &Transform, p: Vec2) -> bool {
        self.shape.test_point(xf, p)
    }

    pub fn compute_aabb(&self, xf: &Transform, child: usize) -> Aabb {
        self.shape.compute_aabb(xf, child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_default_collides() {
        assert!(Filter::default().should_collide(&Filter::default()));
    }

    #[test]
    fn test_filter_groups_override_masks() {
        let friends = Filter {
            group_index: 2,
            mask_bits: 0,
            ..Default::default()
        };
        assert!(friends.should_collide(&friends));

        let loners = Filter {
            group_index: -1,
            ..Default::default()
        };
        assert!(!loners.should_collide(&loners));
        assert!(loners.should_collide(&Filter::default()));
    }

    #[test]
    fn test_filter_masks() {
        let player = Filter {
            category_bits: 0x0002,
            mask_bits: 0xFFFF & !0x0002,
            group_index: 0,
        };
        let wall = Filter::default();
        assert!(!player.should_collide(&player));
        assert!(player.should_collide(&wall));
    }
}
