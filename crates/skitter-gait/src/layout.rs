//! Standard two-sided multi-legged layout.
//!
//! Legs are mounted in pairs along the body's X axis, index 0 at the front.
//! Each leg is a three-joint chain pointing outward from its mount: a hip
//! that both lifts (about local Y) and swings (pivot about local Z), a knee
//! and an ankle.

use std::f32::consts::FRAC_PI_2;

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use skitter_core::config::LocomotionConfig;
use skitter_core::error::{AssemblyError, SkitterError};
use skitter_core::ground::GroundQuery;
use skitter_core::types::{BodyPose, LegId};
use skitter_ik::{JointChain, JointSpec};

use crate::body::Body;
use crate::leg::LegSpec;

/// Starting bend so the first solves do not begin at the straight-leg
/// singularity. Roughly places the foot on the ground at the default stance.
const HIP_ANGLE: f32 = -0.3;
const KNEE_ANGLE: f32 = 1.2;
const ANKLE_ANGLE: f32 = 0.4;

/// Geometry of a symmetric body with `legs_per_side` leg pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HexapodLayout {
    pub legs_per_side: u32,
    /// Distance between neighbouring mounts along X.
    pub spacing: f32,
    /// Lateral offset of each mount from the body center line.
    pub half_width: f32,
    pub femur: f32,
    pub tibia: f32,
    pub foot: f32,
    /// Lateral distance from mount to stepping-area center.
    pub stance_reach: f32,
    /// Body height above the ground at assembly.
    pub body_height: f32,
}

impl Default for HexapodLayout {
    fn default() -> Self {
        Self {
            legs_per_side: 3,
            spacing: 6.0,
            half_width: 2.0,
            femur: 6.0,
            tibia: 7.0,
            foot: 3.0,
            stance_reach: 10.0,
            body_height: 6.0,
        }
    }
}

impl HexapodLayout {
    /// Layout with `legs_per_side` pairs and default dimensions.
    pub fn with_legs_per_side(legs_per_side: u32) -> Self {
        Self {
            legs_per_side,
            ..Self::default()
        }
    }

    /// Leg ids front to back, alternating left and right.
    pub fn leg_ids(&self) -> Vec<LegId> {
        (0..self.legs_per_side)
            .flat_map(|i| [LegId::left(i), LegId::right(i)])
            .collect()
    }

    /// Body-frame X of mount `index`; the pattern is centred on the origin.
    fn mount_x(&self, index: u32) -> f32 {
        let middle = self.legs_per_side.saturating_sub(1) as f32 / 2.0;
        self.spacing * (middle - index as f32)
    }

    /// Leg root mount in the body frame. Local +X points away from the body.
    pub fn mount(&self, id: LegId) -> Isometry3<f32> {
        let side = id.side.sign();
        Isometry3::from_parts(
            Translation3::new(self.mount_x(id.index), side * self.half_width, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), side * FRAC_PI_2),
        )
    }

    /// Stepping-area center in the body frame.
    pub fn stance(&self, id: LegId) -> Vector3<f32> {
        let side = id.side.sign();
        Vector3::new(
            self.mount_x(id.index),
            side * (self.half_width + self.stance_reach),
            0.0,
        )
    }

    pub fn chain(&self) -> Result<JointChain, AssemblyError> {
        JointChain::builder()
            .joint(
                JointSpec::new("hip")
                    .with_axis(Vector3::y())
                    .with_pivot_axis(Vector3::z())
                    .with_angle(HIP_ANGLE),
            )
            .joint(
                JointSpec::new("knee")
                    .with_offset(Vector3::new(self.femur, 0.0, 0.0))
                    .with_axis(Vector3::y())
                    .with_angle(KNEE_ANGLE),
            )
            .joint(
                JointSpec::new("ankle")
                    .with_offset(Vector3::new(self.tibia, 0.0, 0.0))
                    .with_axis(Vector3::y())
                    .with_angle(ANKLE_ANGLE),
            )
            .tip(Vector3::new(self.foot, 0.0, 0.0))
            .build()
    }

    pub fn leg_spec(&self, id: LegId) -> Result<LegSpec, AssemblyError> {
        Ok(LegSpec {
            id,
            mount: self.mount(id),
            stance: self.stance(id),
            chain: self.chain()?,
        })
    }

    pub fn leg_specs(&self) -> Result<Vec<LegSpec>, AssemblyError> {
        self.leg_ids().into_iter().map(|id| self.leg_spec(id)).collect()
    }

    /// Body pose at the origin, `body_height` above `ground_height`.
    pub fn pose(&self, ground_height: f32) -> BodyPose {
        BodyPose::new(Vector3::new(0.0, 0.0, ground_height + self.body_height), 0.0)
    }

    /// Assemble a body standing over flat ground at height zero.
    pub fn assemble(
        &self,
        config: LocomotionConfig,
        ground: &dyn GroundQuery,
    ) -> Result<Body, SkitterError> {
        Body::assemble(config, self.pose(0.0), self.leg_specs()?, ground)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
