//! Exclusion-scheduled stepping gait for multi-legged bodies.
//!
//! Each leg plants its foot and only steps once the ground under its
//! stepping-area center has drifted too far from that foot. A central
//! scheduler decides which queued legs may lift, keeping opposite same-parity
//! legs and same-side neighbours on the ground while one of them steps.
//!
//! # Architecture
//!
//! ```text
//! MotionCommand ──► Body::frame
//!                     ├─ BodyPose::apply
//!                     ├─ GaitScheduler::tick      (admission)
//!                     ├─ LegUnit::update          (Resting → Queued → Stepping)
//!                     │    └─ LandingSensor / StepTrajectory
//!                     └─ LegUnit::solve           (GradientSolver IK)
//! ```
//!
//! [`HexapodLayout`] builds a ready-to-walk six-legged body; with the `bevy`
//! feature, [`plugin::SkitterGaitPlugin`] drives a [`Body`] from an ECS app.

pub mod body;
pub mod gait;
pub mod layout;
pub mod leg;
#[cfg(feature = "bevy")]
pub mod plugin;
pub mod swing;

pub use body::{Body, FrameReport, QueueFeedback};
pub use gait::{Admission, GaitScheduler, blocks};
pub use layout::HexapodLayout;
pub use leg::{LegContext, LegPhase, LegSpec, LegUnit, StepEvents};
#[cfg(feature = "bevy")]
pub use plugin::{GroundResource, LastFrameReport, LocomotionBody, MotionInput, SkitterGaitPlugin};
pub use swing::{LandingSensor, StepTrajectory, arc_height, horizontal, horizontal_distance};
