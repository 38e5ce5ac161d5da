//! Fixed-topology joint chain for a single leg.
//!
//! A [`JointChain`] is an arena of [`ChainJoint`] records linked by index
//! (`next`), from the root (index 0) to a designated end-effector. Each joint
//! carries two rotational degrees of freedom: a primary bend axis and a
//! secondary pivot axis. The chain base is the leg mount in world space and
//! is moved by the owning leg every frame.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, UnitVector3, Vector3};

use skitter_core::error::AssemblyError;
use tracing::warn;

/// Which rotational degree of freedom of a joint to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointAxis {
    /// Bend axis, driven for every joint.
    Primary,
    /// Secondary twist axis, driven on the root only.
    Pivot,
}

/// A single joint in the chain.
#[derive(Debug, Clone)]
pub struct ChainJoint {
    /// Joint name, for diagnostics.
    pub name: String,
    /// Static transform from the parent joint frame (or the chain base).
    pub origin: Isometry3<f32>,
    /// Primary (bend) axis in the joint's local frame.
    pub axis: UnitVector3<f32>,
    /// Secondary (pivot) axis in the joint's local frame.
    pub pivot_axis: UnitVector3<f32>,
    /// Rotation about `axis` (rad).
    pub angle: f32,
    /// Rotation about `pivot_axis` (rad).
    pub pivot: f32,
    /// Index of the child joint, if any.
    pub next: Option<usize>,
}

impl ChainJoint {
    /// Local rotation: pivot first, then bend.
    fn rotation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_axis_angle(&self.pivot_axis, self.pivot)
            * UnitQuaternion::from_axis_angle(&self.axis, self.angle)
    }
}

/// An ordered joint chain from root to end-effector.
///
/// The topology is validated once at construction and never changes, so the
/// root-to-end-effector path is cached.
#[derive(Debug, Clone)]
pub struct JointChain {
    base: Isometry3<f32>,
    joints: Vec<ChainJoint>,
    /// Joint indices from root to end-effector inclusive.
    path: Vec<usize>,
    end_effector: usize,
    /// Foot point in the end-effector joint frame.
    tip: Vector3<f32>,
}

impl JointChain {
    /// Index of the root joint.
    pub const ROOT: usize = 0;

    /// Build a chain from explicit joint records.
    ///
    /// Follows `next` links from the root until `end_effector` is reached.
    /// If the links stop short, the chain keeps the reachable prefix and its
    /// last joint becomes the end-effector; a root with no child leaves a
    /// root-only chain.
    ///
    /// # Errors
    ///
    /// Fails on an empty chain, an end-effector index outside the arena, an
    /// out-of-range link or a cycle.
    pub fn from_joints(
        joints: Vec<ChainJoint>,
        end_effector: usize,
        tip: Vector3<f32>,
    ) -> Result<Self, AssemblyError> {
        if joints.is_empty() {
            return Err(AssemblyError::EmptyChain);
        }
        if end_effector >= joints.len() {
            return Err(AssemblyError::EndEffectorOutOfRange { end_effector });
        }

        let mut path = vec![Self::ROOT];
        let mut visited = vec![false; joints.len()];
        visited[Self::ROOT] = true;
        let mut current = Self::ROOT;

        while current != end_effector {
            let Some(next) = joints[current].next else {
                warn!(
                    end_effector,
                    reached = current,
                    "joint links stop before the end effector; solving the reachable joints only"
                );
                break;
            };
            if next >= joints.len() {
                return Err(AssemblyError::LinkOutOfRange {
                    joint: current,
                    next,
                });
            }
            if visited[next] {
                return Err(AssemblyError::LinkCycle { joint: current });
            }
            visited[next] = true;
            path.push(next);
            current = next;
        }

        Ok(Self {
            base: Isometry3::identity(),
            joints,
            path,
            end_effector: current,
            tip,
        })
    }

    /// Start building a serial chain.
    pub fn builder() -> ChainBuilder {
        ChainBuilder::default()
    }

    /// Number of joints in the arena.
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn joints(&self) -> &[ChainJoint] {
        &self.joints
    }

    /// Joint indices from root to end-effector.
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub const fn end_effector(&self) -> usize {
        self.end_effector
    }

    pub const fn base(&self) -> &Isometry3<f32> {
        &self.base
    }

    /// Move the chain mount (world frame).
    pub fn set_base(&mut self, base: Isometry3<f32>) {
        self.base = base;
    }

    /// Rotate a joint about one of its axes by `delta` radians.
    pub fn turn(&mut self, joint: usize, axis: JointAxis, delta: f32) {
        let j = &mut self.joints[joint];
        match axis {
            JointAxis::Primary => j.angle += delta,
            JointAxis::Pivot => j.pivot += delta,
        }
    }

    /// Primary angles in arena order.
    pub fn angles(&self) -> Vec<f32> {
        self.joints.iter().map(|j| j.angle).collect()
    }

    /// World position of the root joint (the leg root).
    pub fn root_position(&self) -> Vector3<f32> {
        (self.base * self.joints[Self::ROOT].origin).translation.vector
    }

    /// World position of the end-effector tip.
    pub fn end_effector_position(&self) -> Vector3<f32> {
        let frame = self.path.iter().fold(self.base, |transform, &i| {
            let joint = &self.joints[i];
            transform * joint.origin * joint.rotation()
        });
        frame.transform_point(&Point3::from(self.tip)).coords
    }

    /// Distance from the end-effector tip to `target`.
    pub fn distance_to(&self, target: &Vector3<f32>) -> f32 {
        (self.end_effector_position() - target).norm()
    }

    /// Length of the fully straightened chain, measured from the root joint.
    pub fn reach(&self) -> f32 {
        let links: f32 = self
            .path
            .iter()
            .skip(1)
            .map(|&i| self.joints[i].origin.translation.vector.norm())
            .sum();
        links + self.tip.norm()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Description of one joint for [`ChainBuilder`].
#[derive(Debug, Clone)]
pub struct JointSpec {
    pub name: String,
    /// Translation from the parent joint frame.
    pub offset: Vector3<f32>,
    pub axis: Vector3<f32>,
    pub pivot_axis: Vector3<f32>,
    pub angle: f32,
}

impl JointSpec {
    /// A joint at the parent origin bending about Y and pivoting about Z.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            offset: Vector3::zeros(),
            axis: Vector3::y(),
            pivot_axis: Vector3::z(),
            angle: 0.0,
        }
    }

    #[must_use]
    pub fn with_offset(mut self, offset: Vector3<f32>) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn with_axis(mut self, axis: Vector3<f32>) -> Self {
        self.axis = axis;
        self
    }

    #[must_use]
    pub fn with_pivot_axis(mut self, pivot_axis: Vector3<f32>) -> Self {
        self.pivot_axis = pivot_axis;
        self
    }

    #[must_use]
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }
}

/// Builds a serial chain where each joint links to the next one added.
#[derive(Debug, Clone, Default)]
pub struct ChainBuilder {
    specs: Vec<JointSpec>,
    tip: Vector3<f32>,
}

impl ChainBuilder {
    #[must_use]
    pub fn joint(mut self, spec: JointSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Foot offset from the last joint.
    #[must_use]
    pub fn tip(mut self, tip: Vector3<f32>) -> Self {
        self.tip = tip;
        self
    }

    pub fn build(self) -> Result<JointChain, AssemblyError> {
        let count = self.specs.len();
        let joints = self
            .specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| {
                let axis = UnitVector3::try_new(spec.axis, f32::EPSILON)
                    .ok_or(AssemblyError::DegenerateAxis { joint: i })?;
                let pivot_axis = UnitVector3::try_new(spec.pivot_axis, f32::EPSILON)
                    .ok_or(AssemblyError::DegenerateAxis { joint: i })?;
                Ok(ChainJoint {
                    name: spec.name,
                    origin: Isometry3::from_parts(
                        Translation3::from(spec.offset),
                        UnitQuaternion::identity(),
                    ),
                    axis,
                    pivot_axis,
                    angle: spec.angle,
                    pivot: 0.0,
                    next: (i + 1 < count).then_some(i + 1),
                })
            })
            .collect::<Result<Vec<_>, AssemblyError>>()?;

        JointChain::from_joints(joints, count.saturating_sub(1), self.tip)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
