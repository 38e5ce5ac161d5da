//! Per-leg stepping state machine.
//!
//! ```text
//!            clearance > max_distance            can_step
//!  Resting ────────────────────────► Queued ──────────────► Stepping
//!     ▲                                                        │
//!     └──────────────── foot within arrival tolerance ─────────┘
//! ```
//!
//! A [`LegUnit`] owns its joint chain and the foot/pole targets its IK solve
//! chases. Each frame it senses the ground under its stepping-area center,
//! compares that point against the planted foot, and asks the
//! [`GaitScheduler`] for permission to step once the gap grows too large.

use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};
use tracing::{debug, trace};

use skitter_core::config::LocomotionConfig;
use skitter_core::ground::{GroundQuery, LayerMask};
use skitter_core::types::LegId;
use skitter_ik::{GradientSolver, IkReport, JointChain};

use crate::gait::GaitScheduler;
use crate::swing::{LandingSensor, StepTrajectory, horizontal};

/// Static description of a leg, supplied at assembly.
#[derive(Debug, Clone)]
pub struct LegSpec {
    pub id: LegId,
    /// Leg root mount in the body frame.
    pub mount: Isometry3<f32>,
    /// Stepping-area center in the body frame. Ground rays start here.
    pub stance: Vector3<f32>,
    /// Joint chain with its base at the mount.
    pub chain: JointChain,
}

/// Where a leg is in its stepping cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum LegPhase {
    /// Foot planted at its rest origin.
    Resting,
    /// Waiting for the scheduler to admit the step.
    Queued,
    /// Foot in flight toward a fixed landing point.
    Stepping(StepTrajectory),
}

/// What changed for a leg during one update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepEvents {
    pub queued: bool,
    pub started: bool,
    pub landed: bool,
}

/// Per-frame inputs shared by every leg.
#[derive(Clone, Copy)]
pub struct LegContext<'a> {
    pub config: &'a LocomotionConfig,
    pub ground: &'a dyn GroundQuery,
    pub exclude: LayerMask,
    /// Body-to-world transform after this frame's motion.
    pub body: &'a Isometry3<f32>,
    pub dt: f32,
}

/// A single leg: chain, targets and stepping state.
#[derive(Debug, Clone)]
pub struct LegUnit {
    id: LegId,
    mount: Isometry3<f32>,
    stance: Vector3<f32>,
    chain: JointChain,
    phase: LegPhase,
    /// IK target for the end-effector.
    foot: Vector3<f32>,
    /// Where the foot was last planted.
    rest: Vector3<f32>,
    /// Last ground hit under the stepping-area center.
    clearance_point: Vector3<f32>,
    pole: Vector3<f32>,
    /// Horizontal angle from the leg root toward the foot.
    facing: f32,
    sensor: LandingSensor,
}

impl LegUnit {
    /// Attach the leg to a body at `body` and plant the foot.
    ///
    /// The foot starts on the ground under the stepping-area center, or at the
    /// chain's current end-effector when the ground is out of reach.
    pub fn new(
        spec: LegSpec,
        body: &Isometry3<f32>,
        ground: &dyn GroundQuery,
        config: &LocomotionConfig,
    ) -> Self {
        let LegSpec {
            id,
            mount,
            stance,
            mut chain,
        } = spec;
        chain.set_base(body * mount);

        let center = body * Point3::from(stance);
        let planted = ground
            .raycast_down(&center.coords, config.ground.ray_range, config.ground.exclude_mask())
            .unwrap_or_else(|| chain.end_effector_position());

        let mut sensor = LandingSensor::new();
        sensor.observe_root(&chain.root_position());
        sensor.remember_hit(planted);

        let mut leg = Self {
            id,
            mount,
            stance,
            chain,
            phase: LegPhase::Resting,
            foot: planted,
            rest: planted,
            clearance_point: planted,
            pole: planted,
            facing: 0.0,
            sensor,
        };
        leg.align_pole(config);
        leg
    }

    pub const fn id(&self) -> LegId {
        self.id
    }

    pub const fn phase(&self) -> &LegPhase {
        &self.phase
    }

    pub const fn is_stepping(&self) -> bool {
        matches!(self.phase, LegPhase::Stepping(_))
    }

    /// Queued or stepping: the leg has asked to step and not yet landed.
    pub const fn is_queued(&self) -> bool {
        !matches!(self.phase, LegPhase::Resting)
    }

    pub const fn foot_target(&self) -> &Vector3<f32> {
        &self.foot
    }

    pub const fn rest_origin(&self) -> &Vector3<f32> {
        &self.rest
    }

    pub const fn pole_target(&self) -> &Vector3<f32> {
        &self.pole
    }

    pub const fn clearance_point(&self) -> &Vector3<f32> {
        &self.clearance_point
    }

    pub const fn chain(&self) -> &JointChain {
        &self.chain
    }

    pub const fn mount(&self) -> &Isometry3<f32> {
        &self.mount
    }

    /// The in-flight step, if any.
    pub const fn trajectory(&self) -> Option<&StepTrajectory> {
        match &self.phase {
            LegPhase::Stepping(traj) => Some(traj),
            _ => None,
        }
    }

    /// Distance between the planted foot and the ground under the
    /// stepping-area center.
    pub fn clearance(&self) -> f32 {
        (self.clearance_point - self.foot).norm()
    }

    /// Stepping-area center in world space.
    pub fn stance_center(&self, body: &Isometry3<f32>) -> Vector3<f32> {
        (body * Point3::from(self.stance)).coords
    }

    /// Whether the end-effector is near the limit of the chain's reach.
    pub fn is_fully_extended(&self, extension_ratio: f32) -> bool {
        let span = (self.chain.end_effector_position() - self.chain.root_position()).norm();
        span > extension_ratio * self.chain.reach()
    }

    /// Move the chain base with the body.
    pub fn attach(&mut self, body: &Isometry3<f32>) {
        self.chain.set_base(body * self.mount);
    }

    /// Advance the state machine by one frame.
    pub fn update(&mut self, scheduler: &mut GaitScheduler, ctx: &LegContext<'_>) -> StepEvents {
        let mut events = StepEvents::default();
        self.sensor.observe_root(&self.chain.root_position());
        self.sense(ctx);

        if matches!(self.phase, LegPhase::Resting) {
            self.foot = self.rest;
            if self.clearance() > ctx.config.gait.max_distance {
                scheduler.request_step(self.id);
                self.phase = LegPhase::Queued;
                events.queued = true;
                trace!(leg = %self.id, clearance = self.clearance(), "step requested");
            }
        }

        if matches!(self.phase, LegPhase::Queued) && scheduler.can_step(self.id) {
            let center = self.stance_center(ctx.body);
            let landing = self.sensor.landing_point(
                &center,
                ctx.config.landing_radius(),
                ctx.config.step.landing,
                ctx.ground,
                ctx.config.ground.ray_range,
                ctx.exclude,
            );
            debug!(leg = %self.id, ?landing, "step started");
            self.phase = LegPhase::Stepping(StepTrajectory::new(self.foot, landing));
            events.started = true;
        }

        if let LegPhase::Stepping(traj) = &mut self.phase {
            let travel = ctx.config.step_speed() * ctx.dt;
            self.foot = traj.advance(travel, ctx.config.step.step_height);

            if traj.has_arrived(&self.foot, ctx.config.step.arrival_tolerance) {
                let landing = *traj.destination();
                self.foot = landing;
                self.rest = landing;
                self.phase = LegPhase::Resting;
                scheduler.release(self.id);
                events.landed = true;
                debug!(leg = %self.id, "step landed");
            }
        }

        self.align_pole(ctx.config);
        events
    }

    /// Run one IK solve toward the current foot and pole targets.
    pub fn solve(&mut self, solver: &GradientSolver) -> IkReport {
        solver.solve(&mut self.chain, &self.foot, &self.pole)
    }

    /// Ray cast under the stepping-area center; keep the last hit on a miss.
    fn sense(&mut self, ctx: &LegContext<'_>) {
        let center = self.stance_center(ctx.body);
        match ctx
            .ground
            .raycast_down(&center, ctx.config.ground.ray_range, ctx.exclude)
        {
            Some(hit) => self.clearance_point = hit,
            None => trace!(leg = %self.id, "ground ray missed; keeping last point"),
        }
    }

    /// Point the pole target out from the root along the foot's horizontal
    /// direction.
    fn align_pole(&mut self, config: &LocomotionConfig) {
        let toward = horizontal(&(self.foot - self.chain.root_position()));
        if toward.norm() > 1e-5 {
            self.facing = toward.y.atan2(toward.x);
        }
        let [x, y, z] = config.step.pole_offset;
        let turn = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.facing);
        self.pole = self.foot + turn * Vector3::new(x, y, z);
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
    use skitter_core::types::{BodyPose, Side};
    use skitter_test_utils::{NoGround, ScriptedGround};

    use crate::layout::HexapodLayout;

    fn spec(id: LegId) -> LegSpec {
        HexapodLayout::default().leg_spec(id).unwrap()
    }

    fn context<'a>(
        config: &'a LocomotionConfig,
        ground: &'a dyn GroundQuery,
        body: &'a Isometry3<f32>,
    ) -> LegContext<'a> {
        LegContext {
            config,
            ground,
            exclude: config.ground.exclude_mask(),
            body,
            dt: 1.0 / 60.0,
        }
    }

    fn body_at(x: f32) -> Isometry3<f32> {
        BodyPose::new(Vector3::new(x, 0.0, 6.0), 0.0).isometry()
    }

    #[test]
    fn new_leg_plants_foot_under_stance_center() {
        let config = LocomotionConfig::default();
        let ground = FlatGround::new(0.0);
        let leg = LegUnit::new(spec(LegId::left(1)), &body_at(0.0), &ground, &config);
        assert_eq!(leg.phase(), &LegPhase::Resting);
        assert_relative_eq!(leg.foot_target().z, 0.0);
        assert!(leg.foot_target().y > 0.0);
        assert_relative_eq!(leg.clearance(), 0.0);
    }

    #[test]
    fn new_leg_without_ground_uses_end_effector() {
        let config = LocomotionConfig::default();
        let leg = LegUnit::new(spec(LegId::right(0)), &body_at(0.0), &NoGround, &config);
        assert_relative_eq!(
            (leg.foot_target() - leg.chain().end_effector_position()).norm(),
            0.0
        );
    }

    #[test]
    fn leg_rests_while_clearance_is_small() {
        let config = LocomotionConfig::default();
        let ground = FlatGround::new(0.0);
        let mut leg = LegUnit::new(spec(LegId::left(0)), &body_at(0.0), &ground, &config);
        let mut sched = GaitScheduler::new();

        let body = body_at(3.0);
        leg.attach(&body);
        let events = leg.update(&mut sched, &context(&config, &ground, &body));
        assert_eq!(events, StepEvents::default());
        assert!(!leg.is_queued());
        assert!(sched.waiting().is_empty());
    }

    #[test]
    fn leg_queues_then_steps_when_admitted() {
        let config = LocomotionConfig::default();
        let ground = FlatGround::new(0.0);
        let mut leg = LegUnit::new(spec(LegId::left(0)), &body_at(0.0), &ground, &config);
        let mut sched = GaitScheduler::new();

        let body = body_at(7.0);
        leg.attach(&body);
        let events = leg.update(&mut sched, &context(&config, &ground, &body));
        assert!(events.queued);
        assert!(!events.started);
        assert_eq!(leg.phase(), &LegPhase::Queued);
        assert!(leg.is_queued());
        assert_eq!(sched.waiting(), &[LegId::left(0)]);

        sched.tick(|_| false);
        let events = leg.update(&mut sched, &context(&config, &ground, &body));
        assert!(events.started);
        assert!(leg.is_stepping());
        assert!(leg.is_queued());
    }

    #[test]
    fn step_lands_ahead_and_releases() {
        let config = LocomotionConfig::default();
        let ground = FlatGround::new(0.0);
        let mut leg = LegUnit::new(spec(LegId::right(1)), &body_at(0.0), &ground, &config);
        let mut sched = GaitScheduler::new();

        let mut landed = false;
        let mut x = 0.0;
        for _ in 0..120 {
            x += 10.0 / 60.0;
            let body = body_at(x);
            leg.attach(&body);
            sched.tick(|_| false);
            let events = leg.update(&mut sched, &context(&config, &ground, &body));
            if events.landed {
                landed = true;
                break;
            }
        }

        assert!(landed);
        assert_eq!(leg.phase(), &LegPhase::Resting);
        assert!(sched.active().is_empty());
        assert_eq!(leg.rest_origin(), leg.foot_target());
        let center = leg.stance_center(&body_at(x));
        assert!(leg.foot_target().x > center.x, "landed behind the stance center");
        assert_relative_eq!(leg.foot_target().z, 0.0);
    }

    #[test]
    fn foot_stays_planted_while_waiting() {
        let config = LocomotionConfig::default();
        let ground = FlatGround::new(0.0);
        let mut leg = LegUnit::new(spec(LegId::left(2)), &body_at(0.0), &ground, &config);
        let planted = *leg.foot_target();
        let mut sched = GaitScheduler::new();
        sched.request_step(LegId::right(0));
        sched.tick(|_| false);

        let body = body_at(9.0);
        leg.attach(&body);
        for _ in 0..5 {
            sched.tick(|_| false);
            leg.update(&mut sched, &context(&config, &ground, &body));
        }
        assert_eq!(leg.phase(), &LegPhase::Queued);
        assert_eq!(leg.foot_target(), &planted);
    }

    #[test]
    fn clearance_ray_miss_keeps_last_sensed_point() {
        let config = LocomotionConfig::default();
        let ground = ScriptedGround::new(vec![
            Some(Vector3::new(0.0, 12.0, 0.0)),
            Some(Vector3::new(0.5, 12.0, 0.0)),
            None,
        ]);
        let mut leg = LegUnit::new(spec(LegId::left(1)), &body_at(0.0), &ground, &config);
        let mut sched = GaitScheduler::new();

        let body = body_at(0.0);
        leg.update(&mut sched, &context(&config, &ground, &body));
        assert_eq!(leg.clearance_point(), &Vector3::new(0.5, 12.0, 0.0));

        let far = body_at(20.0);
        leg.attach(&far);
        let events = leg.update(&mut sched, &context(&config, &ground, &far));

        assert_eq!(ground.origins().len(), 3);
        assert_relative_eq!(ground.origins()[2], Vector3::new(20.0, 12.0, 6.0), epsilon = 1e-5);
        assert_eq!(leg.clearance_point(), &Vector3::new(0.5, 12.0, 0.0));
        assert!(leg.clearance_point().iter().all(|c| c.is_finite()));
        assert_relative_eq!(leg.clearance(), 0.5, epsilon = 1e-6);
        assert_eq!(events, StepEvents::default());
        assert_eq!(leg.phase(), &LegPhase::Resting);
        assert!(sched.waiting().is_empty());
    }

    /// Pole expected from the current foot and leg root.
    fn expected_pole(leg: &LegUnit, config: &LocomotionConfig) -> Vector3<f32> {
        let toward = horizontal(&(leg.foot_target() - leg.chain().root_position()));
        let facing = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), toward.y.atan2(toward.x));
        let [x, y, z] = config.step.pole_offset;
        leg.foot_target() + facing * Vector3::new(x, y, z)
    }

    #[test]
    fn pole_follows_foot_through_a_step() {
        let config = LocomotionConfig::default();
        let ground = FlatGround::new(0.0);
        let mut leg = LegUnit::new(spec(LegId::left(0)), &body_at(0.0), &ground, &config);
        let mut sched = GaitScheduler::new();

        let mut stepping_frames = 0;
        let mut landed = false;
        let mut x = 0.0;
        for _ in 0..120 {
            x += 10.0 / 60.0;
            let body = body_at(x);
            leg.attach(&body);
            sched.tick(|_| false);
            let events = leg.update(&mut sched, &context(&config, &ground, &body));
            assert_relative_eq!(*leg.pole_target(), expected_pole(&leg, &config), epsilon = 1e-4);
            if leg.is_stepping() {
                stepping_frames += 1;
            }
            if events.landed {
                landed = true;
                break;
            }
        }
        assert!(landed);
        assert!(stepping_frames > 0);

        let body = body_at(x);
        leg.update(&mut sched, &context(&config, &ground, &body));
        assert_eq!(leg.phase(), &LegPhase::Resting);
        assert_relative_eq!(*leg.pole_target(), expected_pole(&leg, &config), epsilon = 1e-4);
    }

    #[test]
    fn pole_points_outward_and_up() {
        let config = LocomotionConfig::default();
        let ground = FlatGround::new(0.0);
        for side in [Side::Left, Side::Right] {
            let leg = LegUnit::new(spec(LegId::new(side, 1)), &body_at(0.0), &ground, &config);
            let pole = leg.pole_target();
            let foot = leg.foot_target();
            assert!((pole.y - foot.y) * side.sign() > 0.0);
            assert_relative_eq!(pole.z, foot.z + config.step.pole_offset[2], epsilon = 1e-5);
        }
    }

    #[test]
    fn extension_detected_past_reach_ratio() {
        let config = LocomotionConfig::default();
        let ground = FlatGround::new(0.0);
        let mut leg = LegUnit::new(spec(LegId::left(1)), &body_at(0.0), &ground, &config);
        assert!(!leg.is_fully_extended(0.95));
        for joint in 0..leg.chain.len() {
            let angle = leg.chain.joints()[joint].angle;
            leg.chain.turn(joint, skitter_ik::JointAxis::Primary, -angle);
        }
        assert!(leg.is_fully_extended(0.95));
    }
}
