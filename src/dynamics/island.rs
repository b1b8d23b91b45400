//! Islands: groups of awake bodies linked by touching contacts and joints,
//! solved together and put to sleep together.

use glam::Vec2;

use crate::settings::{
    ANGULAR_SLEEP_TOLERANCE, LINEAR_SLEEP_TOLERANCE, MAX_ROTATION, MAX_ROTATION_SQUARED,
    MAX_TRANSLATION, MAX_TRANSLATION_SQUARED, TIME_TO_SLEEP,
};

use super::body::{Body, BodyType};
use super::contact::Contact;
use super::contact_solver::ContactSolver;
use super::fixture::Fixture;
use super::joints::Joint;
use super::TimeStep;

/// Indices into the world's body, contact and joint storage.
#[derive(Debug, Default)]
pub(crate) struct Island {
    pub(crate) bodies: Vec<usize>,
    pub(crate) contacts: Vec<usize>,
    pub(crate) joints: Vec<usize>,
}

impl Island {
    pub(crate) fn clear(&mut self) {
        self.bodies.clear();
        self.contacts.clear();
        self.joints.clear();
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn solve(
        &self,
        step: &TimeStep,
        gravity: Vec2,
        allow_sleep: bool,
        bodies: &mut [Body],
        contacts: &mut [Contact],
        fixtures: &[Fixture],
        joints: &mut [Option<Joint>],
    ) {
        let h = step.dt;

        // Integrate velocities.
        for &i in &self.bodies {
            let b = &mut bodies[i];
            b.sweep.c0 = b.sweep.c;
            b.sweep.a0 = b.sweep.a;

            if b.body_type == BodyType::Dynamic {
                b.linear_velocity += h * (b.gravity_scale * gravity + b.inv_mass * b.force);
                b.angular_velocity += h * b.inv_i * b.torque;

                // Pade approximation of exp(-h * damping), stable for large steps.
                b.linear_velocity *= 1.0 / (1.0 + h * b.linear_damping);
                b.angular_velocity *= 1.0 / (1.0 + h * b.angular_damping);
            }
        }

        let mut contact_solver =
            ContactSolver::new(step, &self.contacts, contacts, fixtures, bodies);
        contact_solver.initialize_velocity_constraints(contacts, bodies);
        if step.warm_starting {
            contact_solver.warm_start(bodies);
        }

        for &j in &self.joints {
            if let Some(joint) = joints[j].as_mut() {
                joint.init_velocity_constraints(bodies, step);
            }
        }

        for _ in 0..step.velocity_iterations {
            for &j in &self.joints {
                if let Some(joint) = joints[j].as_mut() {
                    joint.solve_velocity_constraints(bodies, step);
                }
            }
            contact_solver.solve_velocity_constraints(bodies);
        }

        contact_solver.store_impulses(contacts);

        // Integrate positions.
        for &i in &self.bodies {
            let b = &mut bodies[i];
            let mut v = b.linear_velocity;
            let mut w = b.angular_velocity;

            let translation = h * v;
            if translation.length_squared() > MAX_TRANSLATION_SQUARED {
                v *= MAX_TRANSLATION / translation.length();
            }
            let rotation = h * w;
            if rotation * rotation > MAX_ROTATION_SQUARED {
                w *= MAX_ROTATION / rotation.abs();
            }

            b.linear_velocity = v;
            b.angular_velocity = w;
            let c = b.sweep.c + h * v;
            let a = b.sweep.a + h * w;
            b.set_sweep_position(c, a);
        }

        let mut position_solved = false;
        for _ in 0..step.position_iterations {
            let contacts_okay = contact_solver.solve_position_constraints(bodies);

            let mut joints_okay = true;
            for &j in &self.joints {
                if let Some(joint) = joints[j].as_mut() {
                    let okay = joint.solve_position_constraints(bodies);
                    joints_okay = joints_okay && okay;
                }
            }

            if contacts_okay && joints_okay {
                position_solved = true;
                break;
            }
        }

        if !position_solved {
            tracing::debug!(
                bodies = self.bodies.len(),
                contacts = self.contacts.len(),
                joints = self.joints.len(),
                "position constraints not converged"
            );
        }

        if allow_sleep {
            self.update_sleep(h, position_solved, bodies);
        }
    }

    fn update_sleep(&self, h: f32, position_solved: bool, bodies: &mut [Body]) {
        let lin_tol_sqr = LINEAR_SLEEP_TOLERANCE * LINEAR_SLEEP_TOLERANCE;
        let ang_tol_sqr = ANGULAR_SLEEP_TOLERANCE * ANGULAR_SLEEP_TOLERANCE;

        let mut min_sleep_time = f32::MAX;
        for &i in &self.bodies {
            let b = &mut bodies[i];
            if b.body_type == BodyType::Static {
                continue;
            }

            if !b.allow_sleep
                || b.angular_velocity * b.angular_velocity > ang_tol_sqr
                || b.linear_velocity.length_squared() > lin_tol_sqr
            {
                b.sleep_time = 0.0;
                min_sleep_time = 0.0;
            } else {
                b.sleep_time += h;
                min_sleep_time = min_sleep_time.min(b.sleep_time);
            }
        }

        if min_sleep_time >= TIME_TO_SLEEP && position_solved {
            tracing::trace!(bodies = self.bodies.len(), "island asleep");
            for &i in &self.bodies {
                bodies[i].set_awake(false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::BodyDef;

    const EPS: f32 = 1e-5;

    fn solve_alone(body: Body, step: &TimeStep, gravity: Vec2) -> Body {
        let mut bodies = vec![body];
        let island = Island {
            bodies: vec![0],
            ..Default::default()
        };
        island.solve(step, gravity, true, &mut bodies, &mut [], &[], &mut []);
        bodies.remove(0)
    }

    #[test]
    fn test_free_fall_semi_implicit() {
        let step = TimeStep::new(0.1, 10.0, 8, 3);
        let body = Body::new(&BodyDef::dynamic());
        let body = solve_alone(body, &step, Vec2::new(0.0, -10.0));
        assert!((body.linear_velocity().y + 1.0).abs() < EPS);
        // Position uses the updated velocity.
        assert!(
            (body.position().y + 0.1).abs() < EPS,
            "y = {}",
            body.position().y
        );
        assert_eq!(body.sweep.c0, Vec2::ZERO);
    }

    #[test]
    fn test_damping_and_gravity_scale() {
        let step = TimeStep::new(0.5, 2.0, 8, 3);
        let mut def = BodyDef::dynamic();
        def.linear_velocity = Vec2::new(2.0, 0.0);
        def.linear_damping = 2.0;
        def.gravity_scale = 0.0;
        let body = solve_alone(Body::new(&def), &step, Vec2::new(0.0, -10.0));
        // 2 / (1 + 0.5 * 2)
        assert!((body.linear_velocity() - Vec2::new(1.0, 0.0)).length() < EPS);
    }

    #[test]
    fn test_translation_clamp() {
        let step = TimeStep::new(1.0, 1.0, 8, 3);
        let mut def = BodyDef::dynamic();
        def.linear_velocity = Vec2::new(100.0, 0.0);
        def.angular_velocity = 10.0;
        let body = solve_alone(Body::new(&def), &step, Vec2::ZERO);
        assert!((body.position().x - MAX_TRANSLATION).abs() < EPS);
        assert!((body.angle() - MAX_ROTATION).abs() < EPS);
    }

    #[test]
    fn test_resting_island_falls_asleep() {
        let step = TimeStep::new(0.1, 10.0, 8, 3);
        let mut bodies = vec![Body::new(&BodyDef::dynamic())];
        let island = Island {
            bodies: vec![0],
            ..Default::default()
        };
        for i in 0..4 {
            island.solve(&step, Vec2::ZERO, true, &mut bodies, &mut [], &[], &mut []);
            assert!(bodies[0].is_awake(), "asleep too early at step {}", i);
        }
        for _ in 0..2 {
            island.solve(&step, Vec2::ZERO, true, &mut bodies, &mut [], &[], &mut []);
        }
        assert!(!bodies[0].is_awake());

        // Not while sleeping is disallowed.
        let mut def = BodyDef::dynamic();
        def.allow_sleep = false;
        let mut bodies = vec![Body::new(&def)];
        for _ in 0..20 {
            island.solve(&step, Vec2::ZERO, true, &mut bodies, &mut [], &[], &mut []);
        }
        assert!(bodies[0].is_awake());
    }
}
