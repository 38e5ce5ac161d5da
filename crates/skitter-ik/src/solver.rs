//! Finite-difference gradient descent IK solver.
//!
//! Each iteration estimates the slope of the end-effector-to-target distance
//! with respect to one joint at a time by applying a small trial rotation,
//! measuring, and undoing it. The joint is then rotated downhill. No Jacobian
//! is formed; the solver is a cheap local heuristic meant to be run for a
//! fixed budget every frame against a moving target.

use nalgebra::Vector3;
use tracing::trace;

use skitter_core::config::IkConfig;

use crate::chain::{JointAxis, JointChain};

/// Outcome of one [`GradientSolver::solve`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkReport {
    /// Iterations that moved at least one joint.
    pub iterations: u32,
    /// Of those, iterations spent pulling toward the pole target.
    pub pole_iterations: u32,
    /// End-effector within threshold of the target after solving.
    pub converged: bool,
    /// End-effector-to-target distance before solving.
    pub initial_distance: f32,
    /// End-effector-to-target distance after solving.
    pub final_distance: f32,
}

/// Derivative-free gradient descent over joint angles.
#[derive(Debug, Clone)]
pub struct GradientSolver {
    config: IkConfig,
}

impl Default for GradientSolver {
    fn default() -> Self {
        Self::new(IkConfig::default())
    }
}

impl GradientSolver {
    pub const fn new(config: IkConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &IkConfig {
        &self.config
    }

    /// Bend `chain` toward `target`, then toward `pole` once the target is met.
    ///
    /// Joint angles are updated in place. The pole pass still descends on the
    /// target distance; it only runs while the target is already satisfied,
    /// so it nudges the chain without trading away the primary goal.
    pub fn solve(
        &self,
        chain: &mut JointChain,
        target: &Vector3<f32>,
        pole: &Vector3<f32>,
    ) -> IkReport {
        let threshold = self.config.threshold;
        let initial_distance = chain.distance_to(target);
        let mut iterations = 0;
        let mut pole_iterations = 0;

        for _ in 0..self.config.iterations {
            if chain.distance_to(target) > threshold {
                self.descend_primary(chain, target);
                self.descend(chain, JointChain::ROOT, JointAxis::Pivot, target);
            } else if chain.distance_to(pole) > threshold {
                self.descend_primary(chain, target);
                pole_iterations += 1;
            } else {
                break;
            }
            iterations += 1;
        }

        let final_distance = chain.distance_to(target);
        let report = IkReport {
            iterations,
            pole_iterations,
            converged: final_distance <= threshold,
            initial_distance,
            final_distance,
        };
        trace!(?report, "ik solve");
        report
    }

    fn descend_primary(&self, chain: &mut JointChain, target: &Vector3<f32>) {
        for step in 0..chain.path().len() {
            let joint = chain.path()[step];
            self.descend(chain, joint, JointAxis::Primary, target);
        }
    }

    /// One downhill rotation of a single joint axis.
    fn descend(&self, chain: &mut JointChain, joint: usize, axis: JointAxis, target: &Vector3<f32>) {
        let slope = self.slope(chain, joint, axis, target);
        chain.turn(joint, axis, -slope * self.config.learning_rate);
    }

    /// Forward-difference slope of the target distance w.r.t. one joint axis.
    fn slope(&self, chain: &mut JointChain, joint: usize, axis: JointAxis, target: &Vector3<f32>) -> f32 {
        let trial = self.config.trial_angle;
        let before = chain.distance_to(target);
        chain.turn(joint, axis, trial);
        let after = chain.distance_to(target);
        chain.turn(joint, axis, -trial);
        (after - before) / trial
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
