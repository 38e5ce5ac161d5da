//! Step trajectory and landing point selection.
//!
//! A step moves the foot target horizontally toward a fixed landing point at
//! a bounded speed while lifting it on a half-sine arc. Progress along the arc
//! is measured on the horizontal plane only, so the lift itself never slows
//! the step down.

use std::f32::consts::PI;

use nalgebra::Vector3;
use tracing::trace;

use skitter_core::config::LandingStrategy;
use skitter_core::ground::{GroundQuery, LayerMask};

/// Horizontal lengths below this count as zero.
const EPSILON: f32 = 1e-5;

/// Projection of `v` onto the horizontal (XY) plane.
pub fn horizontal(v: &Vector3<f32>) -> Vector3<f32> {
    Vector3::new(v.x, v.y, 0.0)
}

/// Distance between two points ignoring height.
pub fn horizontal_distance(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    horizontal(&(a - b)).norm()
}

/// Half-sine lift at `progress` in `[0, 1]`.
///
/// Zero at both ends, `amplitude` at the midpoint.
pub fn arc_height(progress: f32, amplitude: f32) -> f32 {
    amplitude * (PI * progress.clamp(0.0, 1.0)).sin()
}

// ---------------------------------------------------------------------------
// StepTrajectory
// ---------------------------------------------------------------------------

/// In-flight step from a rest point to a landing point.
#[derive(Debug, Clone, PartialEq)]
pub struct StepTrajectory {
    origin: Vector3<f32>,
    destination: Vector3<f32>,
    /// Horizontal length of the whole step.
    planned: f32,
    /// Foot position on the ground track, without lift.
    track: Vector3<f32>,
}

impl StepTrajectory {
    pub fn new(origin: Vector3<f32>, destination: Vector3<f32>) -> Self {
        Self {
            origin,
            destination,
            planned: horizontal_distance(&origin, &destination),
            track: origin,
        }
    }

    pub const fn origin(&self) -> &Vector3<f32> {
        &self.origin
    }

    pub const fn destination(&self) -> &Vector3<f32> {
        &self.destination
    }

    pub const fn planned_distance(&self) -> f32 {
        self.planned
    }

    /// Horizontal distance left to travel.
    pub fn remaining(&self) -> f32 {
        horizontal_distance(&self.track, &self.destination)
    }

    /// Fraction of the horizontal distance covered, in `[0, 1]`.
    ///
    /// A step with no horizontal extent is complete from the start.
    pub fn progress(&self) -> f32 {
        if self.planned <= EPSILON {
            return 1.0;
        }
        (1.0 - self.remaining() / self.planned).clamp(0.0, 1.0)
    }

    /// Foot position at the current progress, lifted by the arc.
    pub fn position(&self, amplitude: f32) -> Vector3<f32> {
        let p = self.progress();
        let base_z = self.origin.z + (self.destination.z - self.origin.z) * p;
        Vector3::new(self.track.x, self.track.y, base_z + arc_height(p, amplitude))
    }

    /// Move along the track by at most `max_travel` without overshooting,
    /// and return the new foot position.
    pub fn advance(&mut self, max_travel: f32, amplitude: f32) -> Vector3<f32> {
        let remaining = self.remaining();
        if remaining <= max_travel || remaining <= EPSILON {
            self.track = self.destination;
        } else {
            let dir = horizontal(&(self.destination - self.track)) / remaining;
            self.track += dir * max_travel;
        }
        self.position(amplitude)
    }

    /// Whether `foot` is within `tolerance` of the landing point.
    pub fn has_arrived(&self, foot: &Vector3<f32>, tolerance: f32) -> bool {
        (foot - self.destination).norm() <= tolerance
    }
}

// ---------------------------------------------------------------------------
// LandingSensor
// ---------------------------------------------------------------------------

/// Tracks a leg root's direction of travel and picks landing points.
#[derive(Debug, Clone, Default)]
pub struct LandingSensor {
    previous_root: Option<Vector3<f32>>,
    heading: Vector3<f32>,
    last_hit: Option<Vector3<f32>>,
}

impl LandingSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record this frame's root position and update the heading.
    ///
    /// The heading is the normalised horizontal displacement since the last
    /// frame, or zero when the root has not moved.
    pub fn observe_root(&mut self, root: &Vector3<f32>) {
        self.heading = match self.previous_root {
            Some(prev) => {
                let delta = horizontal(&(root - prev));
                let len = delta.norm();
                if len > EPSILON {
                    delta / len
                } else {
                    Vector3::zeros()
                }
            }
            None => Vector3::zeros(),
        };
        self.previous_root = Some(*root);
    }

    /// Unit horizontal direction of travel, or zero.
    pub const fn heading(&self) -> &Vector3<f32> {
        &self.heading
    }

    /// Seed the fallback used when a landing ray misses.
    pub fn remember_hit(&mut self, hit: Vector3<f32>) {
        self.last_hit = Some(hit);
    }

    /// Candidate point on the horizontal circle of `radius` around `center`.
    pub fn candidate(
        &self,
        center: &Vector3<f32>,
        radius: f32,
        strategy: LandingStrategy,
    ) -> Vector3<f32> {
        let sign = match strategy {
            LandingStrategy::Ahead => 1.0,
            LandingStrategy::Antipodal => -1.0,
        };
        center + self.heading * (sign * radius)
    }

    /// Pick the landing point for a step starting now.
    ///
    /// Casts straight down from the candidate at the height of `center`. On a
    /// miss the last ground hit is reused; with no hit ever seen the candidate
    /// itself is returned.
    pub fn landing_point(
        &mut self,
        center: &Vector3<f32>,
        radius: f32,
        strategy: LandingStrategy,
        ground: &dyn GroundQuery,
        ray_range: f32,
        exclude: LayerMask,
    ) -> Vector3<f32> {
        let candidate = self.candidate(center, radius, strategy);
        if let Some(hit) = ground.raycast_down(&candidate, ray_range, exclude) {
            self.last_hit = Some(hit);
            return hit;
        }
        trace!(?candidate, "landing ray missed; reusing last hit");
        self.last_hit.unwrap_or(candidate)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use skitter_core::ground::FlatGround;
    use skitter_test_utils::{NoGround, ScriptedGround};

    #[test]
    fn arc_shape() {
        assert_relative_eq!(arc_height(0.0, 4.0), 0.0);
        assert_relative_eq!(arc_height(0.5, 4.0), 4.0, epsilon = 1e-6);
        assert_relative_eq!(arc_height(1.0, 4.0), 0.0, epsilon = 1e-5);
        assert_relative_eq!(arc_height(1.7, 4.0), 0.0, epsilon = 1e-5);
        assert_relative_eq!(arc_height(-0.2, 4.0), 0.0);
    }

    #[test]
    fn trajectory_starts_at_origin_and_ends_at_destination() {
        let origin = Vector3::new(0.0, 0.0, 0.0);
        let dest = Vector3::new(10.0, 0.0, 0.0);
        let mut traj = StepTrajectory::new(origin, dest);
        assert_relative_eq!(traj.planned_distance(), 10.0);
        assert_relative_eq!(traj.progress(), 0.0);
        assert_relative_eq!(traj.position(4.0).z, 0.0);

        let end = traj.advance(100.0, 4.0);
        assert_relative_eq!(end.x, 10.0);
        assert_relative_eq!(end.z, 0.0, epsilon = 1e-5);
        assert_relative_eq!(traj.progress(), 1.0);
        assert!(traj.has_arrived(&end, 0.6));
    }

    #[test]
    fn trajectory_peaks_halfway() {
        let mut traj = StepTrajectory::new(Vector3::zeros(), Vector3::new(0.0, 8.0, 0.0));
        let mid = traj.advance(4.0, 4.0);
        assert_relative_eq!(traj.progress(), 0.5, epsilon = 1e-6);
        assert_relative_eq!(mid.y, 4.0, epsilon = 1e-6);
        assert_relative_eq!(mid.z, 4.0, epsilon = 1e-5);
    }

    #[test]
    fn trajectory_interpolates_ground_height() {
        let mut traj = StepTrajectory::new(Vector3::zeros(), Vector3::new(4.0, 0.0, 2.0));
        let p = traj.advance(1.0, 0.0);
        assert_relative_eq!(p.z, 0.5, epsilon = 1e-6);
        let end = traj.advance(10.0, 0.0);
        assert_relative_eq!(end.z, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn remaining_distance_strictly_decreases_and_finishes_in_bounded_frames() {
        let dest = Vector3::new(7.0, -3.0, 1.0);
        let mut traj = StepTrajectory::new(Vector3::new(-2.0, 1.0, 0.0), dest);
        let speed = 140.0;
        let dt = 1.0 / 60.0;
        let bound = (traj.planned_distance() / (speed * dt)).ceil() as usize;

        let mut previous = traj.remaining();
        let mut frames = 0;
        while traj.remaining() > 0.0 {
            traj.advance(speed * dt, 4.0);
            frames += 1;
            assert!(traj.remaining() < previous);
            previous = traj.remaining();
            assert!(frames <= bound);
        }
        assert!(frames >= 1);
    }

    #[test]
    fn slower_steps_take_longer() {
        let frames_at = |speed: f32| {
            let mut traj = StepTrajectory::new(Vector3::zeros(), Vector3::new(10.0, 0.0, 0.0));
            let mut frames = 0;
            while traj.remaining() > 0.0 {
                traj.advance(speed / 60.0, 4.0);
                frames += 1;
            }
            frames
        };
        assert!(frames_at(70.0) > frames_at(140.0));
    }

    #[test]
    fn degenerate_step_is_flat_and_finite() {
        let p = Vector3::new(1.0, 2.0, 3.0);
        let mut traj = StepTrajectory::new(p, p);
        assert_relative_eq!(traj.progress(), 1.0);
        let foot = traj.advance(2.0, 4.0);
        assert!(foot.iter().all(|c| c.is_finite()));
        assert_relative_eq!(foot.z, 3.0, epsilon = 1e-5);
        assert!(traj.has_arrived(&foot, 0.6));
    }

    #[test]
    fn vertical_only_step_has_no_arc() {
        let mut traj = StepTrajectory::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let foot = traj.advance(1.0, 4.0);
        assert_relative_eq!(foot.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn sensor_heading_follows_root_motion() {
        let mut sensor = LandingSensor::new();
        sensor.observe_root(&Vector3::new(0.0, 0.0, 5.0));
        assert_relative_eq!(sensor.heading().norm(), 0.0);

        sensor.observe_root(&Vector3::new(0.0, 2.0, 7.0));
        assert_relative_eq!(sensor.heading().y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(sensor.heading().z, 0.0);

        sensor.observe_root(&Vector3::new(0.0, 2.0, 7.0));
        assert_relative_eq!(sensor.heading().norm(), 0.0);
    }

    #[test]
    fn candidate_sign_depends_on_strategy() {
        let mut sensor = LandingSensor::new();
        sensor.observe_root(&Vector3::zeros());
        sensor.observe_root(&Vector3::new(1.0, 0.0, 0.0));
        let center = Vector3::new(0.0, 10.0, 6.0);

        let ahead = sensor.candidate(&center, 5.4, LandingStrategy::Ahead);
        assert_relative_eq!(ahead.x, 5.4, epsilon = 1e-6);
        let behind = sensor.candidate(&center, 5.4, LandingStrategy::Antipodal);
        assert_relative_eq!(behind.x, -5.4, epsilon = 1e-6);
        assert_relative_eq!(behind.y, 10.0);
    }

    #[test]
    fn landing_point_lands_on_ground() {
        let mut sensor = LandingSensor::new();
        sensor.observe_root(&Vector3::zeros());
        sensor.observe_root(&Vector3::new(0.5, 0.0, 0.0));
        let ground = FlatGround::new(0.25);
        let point = sensor.landing_point(
            &Vector3::new(0.0, 10.0, 6.0),
            5.4,
            LandingStrategy::Ahead,
            &ground,
            10.0,
            LayerMask::NONE,
        );
        assert_relative_eq!(point.x, 5.4, epsilon = 1e-6);
        assert_relative_eq!(point.z, 0.25);
    }

    #[test]
    fn landing_ray_starts_at_candidate_on_center_height() {
        let mut sensor = LandingSensor::new();
        sensor.observe_root(&Vector3::zeros());
        sensor.observe_root(&Vector3::new(0.0, -1.0, 0.0));
        let ground = ScriptedGround::new(vec![Some(Vector3::new(0.0, 4.6, 0.0))]);
        let center = Vector3::new(0.0, 10.0, 6.0);

        sensor.landing_point(&center, 5.4, LandingStrategy::Ahead, &ground, 10.0, LayerMask::NONE);

        let origins = ground.origins();
        assert_eq!(origins.len(), 1);
        assert_relative_eq!(origins[0], Vector3::new(0.0, 4.6, 6.0), epsilon = 1e-6);
    }

    #[test]
    fn landing_miss_reuses_last_hit() {
        let mut sensor = LandingSensor::new();
        let ground = ScriptedGround::new(vec![Some(Vector3::new(1.0, 1.0, 0.0)), None]);
        let center = Vector3::new(0.0, 0.0, 6.0);

        let first = sensor.landing_point(&center, 5.0, LandingStrategy::Ahead, &ground, 10.0, LayerMask::NONE);
        let second = sensor.landing_point(&center, 5.0, LandingStrategy::Ahead, &ground, 10.0, LayerMask::NONE);
        assert_eq!(first, second);
    }

    #[test]
    fn landing_miss_without_history_uses_candidate() {
        let mut sensor = LandingSensor::new();
        let center = Vector3::new(3.0, 4.0, 6.0);
        let point = sensor.landing_point(&center, 5.0, LandingStrategy::Ahead, &NoGround, 10.0, LayerMask::NONE);
        assert_eq!(point, center);
    }
}
