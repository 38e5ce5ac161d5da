//! Body frame driver.
//!
//! [`Body`] owns the legs, the scheduler and the IK solver. One call to
//! [`Body::frame`] runs a full locomotion frame:
//!
//! 1. apply the motion command to the body pose (optionally slowed while a
//!    waiting leg is overstretched),
//! 2. carry every leg's chain base along with the body,
//! 3. admit waiting legs,
//! 4. update each leg's stepping state,
//! 5. solve IK toward the new foot targets,
//! 6. publish queued-state changes to the feedback hook.
//!
//! The frame path never fails; bad geometry is rejected at assembly.

use std::collections::HashSet;

use skitter_core::config::LocomotionConfig;
use skitter_core::error::{AssemblyError, SkitterError};
use skitter_core::ground::GroundQuery;
use skitter_core::types::{BodyPose, LegId, MotionCommand};
use skitter_ik::GradientSolver;
use tracing::{debug, info};

use crate::gait::{Admission, GaitScheduler};
use crate::leg::{LegContext, LegSpec, LegUnit};

/// Solves run per leg at assembly so the chains start near their feet.
const SETTLE_SOLVES: usize = 10;

/// Receives "leg is queued" changes, e.g. to recolour a leg.
pub trait QueueFeedback: Send + Sync {
    fn leg_queued(&mut self, leg: LegId, queued: bool);
}

impl<F> QueueFeedback for F
where
    F: FnMut(LegId, bool) + Send + Sync,
{
    fn leg_queued(&mut self, leg: LegId, queued: bool) {
        self(leg, queued);
    }
}

/// Summary of one [`Body::frame`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Frame counter, starting at 1.
    pub frame: u64,
    /// Legs admitted by the scheduler this frame.
    pub admitted: Vec<Admission>,
    /// Legs that asked to step this frame.
    pub queued: Vec<LegId>,
    /// Legs that lifted off this frame.
    pub started: Vec<LegId>,
    /// Legs that landed this frame.
    pub landed: Vec<LegId>,
    /// Legs in the air after the frame.
    pub stepping: usize,
    /// Legs still waiting for admission after the frame.
    pub waiting: usize,
    /// Factor applied to the move speed this frame.
    pub speed_scale: f32,
    /// Largest end-effector-to-target distance after IK.
    pub max_ik_error: f32,
}

impl FrameReport {
    /// Number of admissions that bypassed the exclusion rules.
    pub fn overrides(&self) -> usize {
        self.admitted.iter().filter(|a| a.overridden).count()
    }
}

/// A legged body: pose, legs, scheduler and solver.
pub struct Body {
    config: LocomotionConfig,
    pose: BodyPose,
    legs: Vec<LegUnit>,
    scheduler: GaitScheduler,
    solver: GradientSolver,
    feedback: Option<Box<dyn QueueFeedback>>,
    /// Last queued state sent to the feedback hook, per leg.
    reported: Vec<bool>,
    frame: u64,
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Body")
            .field("pose", &self.pose)
            .field("legs", &self.legs.len())
            .field("scheduler", &self.scheduler)
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

impl Body {
    /// Validate `config` and the leg set, plant every foot and settle the
    /// chains with a few IK solves.
    pub fn assemble(
        config: LocomotionConfig,
        pose: BodyPose,
        specs: Vec<LegSpec>,
        ground: &dyn GroundQuery,
    ) -> Result<Self, SkitterError> {
        config.validate()?;
        if specs.is_empty() {
            return Err(AssemblyError::NoLegs.into());
        }
        let mut seen = HashSet::new();
        if let Some(dup) = specs.iter().find(|s| !seen.insert(s.id)) {
            return Err(AssemblyError::DuplicateLeg(dup.id).into());
        }

        let body = pose.isometry();
        let solver = GradientSolver::new(config.ik.clone());
        let mut legs: Vec<LegUnit> = specs
            .into_iter()
            .map(|spec| LegUnit::new(spec, &body, ground, &config))
            .collect();
        for leg in &mut legs {
            for _ in 0..SETTLE_SOLVES {
                leg.solve(&solver);
            }
        }

        info!(legs = legs.len(), "body assembled");
        Ok(Self {
            reported: vec![false; legs.len()],
            config,
            pose,
            legs,
            scheduler: GaitScheduler::new(),
            solver,
            feedback: None,
            frame: 0,
        })
    }

    /// Install a queued-state feedback hook.
    #[must_use]
    pub fn with_feedback(mut self, feedback: impl QueueFeedback + 'static) -> Self {
        self.feedback = Some(Box::new(feedback));
        self
    }

    pub const fn config(&self) -> &LocomotionConfig {
        &self.config
    }

    pub const fn pose(&self) -> &BodyPose {
        &self.pose
    }

    pub fn legs(&self) -> &[LegUnit] {
        &self.legs
    }

    pub fn leg(&self, id: LegId) -> Option<&LegUnit> {
        self.legs.iter().find(|l| l.id() == id)
    }

    pub const fn scheduler(&self) -> &GaitScheduler {
        &self.scheduler
    }

    /// Frames run so far.
    pub const fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Whether any leg waiting for admission is overstretched.
    pub fn waiting_leg_overextended(&self) -> bool {
        let ratio = self.config.step.extension_ratio;
        self.scheduler
            .waiting()
            .iter()
            .filter_map(|&id| self.leg(id))
            .any(|leg| leg.is_fully_extended(ratio))
    }

    /// Run one locomotion frame of length `dt` seconds.
    pub fn frame(&mut self, command: &MotionCommand, dt: f32, ground: &dyn GroundQuery) -> FrameReport {
        self.frame += 1;
        let gait = &self.config.gait;

        let speed_scale = if gait.slow_when_hyperextended && self.waiting_leg_overextended() {
            gait.hyperextension_slowdown
        } else {
            1.0
        };
        if !command.is_idle() {
            self.pose
                .apply(command, gait.move_speed * speed_scale, gait.turn_speed, dt);
        }

        let body = self.pose.isometry();
        for leg in &mut self.legs {
            leg.attach(&body);
        }

        let ratio = self.config.step.extension_ratio;
        let legs = &self.legs;
        let admitted = self.scheduler.tick(|id| {
            legs.iter()
                .find(|l| l.id() == id)
                .is_some_and(|l| l.is_fully_extended(ratio))
        });

        let ctx = LegContext {
            config: &self.config,
            ground,
            exclude: self.config.ground.exclude_mask(),
            body: &body,
            dt,
        };
        let mut report = FrameReport {
            frame: self.frame,
            admitted,
            speed_scale,
            ..FrameReport::default()
        };
        for leg in &mut self.legs {
            let events = leg.update(&mut self.scheduler, &ctx);
            if events.queued {
                report.queued.push(leg.id());
            }
            if events.started {
                report.started.push(leg.id());
            }
            if events.landed {
                report.landed.push(leg.id());
            }
        }

        for leg in &mut self.legs {
            let ik = leg.solve(&self.solver);
            report.max_ik_error = report.max_ik_error.max(ik.final_distance);
        }

        report.stepping = self.legs.iter().filter(|l| l.is_stepping()).count();
        report.waiting = self.scheduler.waiting().len();
        self.publish_feedback();

        if report.overrides() > 0 {
            debug!(frame = self.frame, overrides = report.overrides(), "exclusion overridden");
        }
        report
    }

    fn publish_feedback(&mut self) {
        let Some(feedback) = self.feedback.as_mut() else {
            return;
        };
        for (leg, reported) in self.legs.iter().zip(self.reported.iter_mut()) {
            let queued = leg.is_queued();
            if queued != *reported {
                feedback.leg_queued(leg.id(), queued);
                *reported = queued;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
