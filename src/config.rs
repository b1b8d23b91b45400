//! World configuration.

use glam::Vec2;

use crate::settings::VELOCITY_THRESHOLD;

/// Configuration for the physics simulation.
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    /// Gravity vector. Default: (0, -10).
    pub gravity: Vec2,
    /// Number of velocity solver iterations per step. Default: 8.
    pub velocity_iterations: u32,
    /// Number of position solver iterations per step. Default: 3.
    pub position_iterations: u32,
    /// Seed contact and joint solvers with last step's impulses. Default: true.
    pub warm_starting: bool,
    /// Let resting islands go to sleep. Default: true.
    pub allow_sleep: bool,
    /// Zero force accumulators at the end of every step. Default: true.
    pub auto_clear_forces: bool,
    /// Approach speed below which restitution is ignored. Default: 1.0.
    pub velocity_threshold: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -10.0),
            velocity_iterations: 8,
            position_iterations: 3,
            warm_starting: true,
            allow_sleep: true,
            auto_clear_forces: true,
            velocity_threshold: VELOCITY_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_physics_config_default() {
        let config = PhysicsConfig::default();
        assert_eq!(config.gravity, Vec2::new(0.0, -10.0));
        assert_eq!(config.velocity_iterations, 8);
        assert_eq!(config.position_iterations, 3);
        assert!(config.warm_starting);
        assert!(config.allow_sleep);
        assert!((config.velocity_threshold - 1.0).abs() < 1e-6);
    }
}
