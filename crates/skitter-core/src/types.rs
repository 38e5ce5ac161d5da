use std::fmt;

use nalgebra::{Isometry3, UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Side / LegId
// ---------------------------------------------------------------------------

/// Which side of the body a leg is mounted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Lateral sign in the body frame (+Y is left).
    pub const fn sign(self) -> f32 {
        match self {
            Self::Left => 1.0,
            Self::Right => -1.0,
        }
    }
}

/// Identity of a leg: its side and its position along the body.
///
/// Index 0 is the front-most leg on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LegId {
    pub side: Side,
    pub index: u32,
}

impl LegId {
    pub const fn new(side: Side, index: u32) -> Self {
        Self { side, index }
    }

    pub const fn left(index: u32) -> Self {
        Self::new(Side::Left, index)
    }

    pub const fn right(index: u32) -> Self {
        Self::new(Side::Right, index)
    }

    /// Parity class (`index mod 2`).
    pub const fn parity(self) -> u32 {
        self.index % 2
    }

    /// Legs on opposite sides sharing a parity class.
    pub const fn is_diagonal_partner(self, other: Self) -> bool {
        !matches!(
            (self.side, other.side),
            (Side::Left, Side::Left) | (Side::Right, Side::Right)
        ) && self.parity() == other.parity()
    }

    /// Legs on the same side with neighbouring indices.
    pub const fn is_neighbour(self, other: Self) -> bool {
        matches!(
            (self.side, other.side),
            (Side::Left, Side::Left) | (Side::Right, Side::Right)
        ) && self.index.abs_diff(other.index) == 1
    }
}

impl fmt::Display for LegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            Side::Left => 'L',
            Side::Right => 'R',
        };
        write!(f, "{side}{}", self.index)
    }
}

// ---------------------------------------------------------------------------
// MotionCommand
// ---------------------------------------------------------------------------

/// Body motion request for one frame, produced by an input layer.
///
/// `movement` is in the body frame (+X forward, +Y left) and scaled by the
/// configured move speed. `turn` is a signed turn factor scaled by the turn
/// speed; positive turns counter-clockwise seen from above.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionCommand {
    pub movement: Vector2<f32>,
    pub turn: f32,
}

impl MotionCommand {
    pub const fn new(movement: Vector2<f32>, turn: f32) -> Self {
        Self { movement, turn }
    }

    pub fn forward(amount: f32) -> Self {
        Self::new(Vector2::new(amount, 0.0), 0.0)
    }

    pub fn turn_in_place(turn: f32) -> Self {
        Self::new(Vector2::zeros(), turn)
    }

    pub fn is_idle(&self) -> bool {
        self.movement == Vector2::zeros() && self.turn == 0.0
    }
}

// ---------------------------------------------------------------------------
// BodyPose
// ---------------------------------------------------------------------------

/// Planar pose of the body: world position and heading about +Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyPose {
    pub position: Vector3<f32>,
    /// Heading in radians, wrapped to (-pi, pi].
    pub yaw: f32,
}

impl Default for BodyPose {
    fn default() -> Self {
        Self::new(Vector3::zeros(), 0.0)
    }
}

impl BodyPose {
    pub const fn new(position: Vector3<f32>, yaw: f32) -> Self {
        Self { position, yaw }
    }

    pub fn rotation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.yaw)
    }

    /// Body-to-world transform.
    pub fn isometry(&self) -> Isometry3<f32> {
        Isometry3::from_parts(self.position.into(), self.rotation())
    }

    /// Translate in the body frame, then rotate about the body position.
    ///
    /// `turn_speed` is in degrees per second.
    pub fn apply(&mut self, command: &MotionCommand, move_speed: f32, turn_speed: f32, dt: f32) {
        let local = Vector3::new(command.movement.x, command.movement.y, 0.0) * (move_speed * dt);
        self.position += self.rotation() * local;
        self.yaw = wrap_angle(self.yaw + command.turn * turn_speed.to_radians() * dt);
    }
}

/// Wrap an angle in radians to (-pi, pi].
pub fn wrap_angle(angle: f32) -> f32 {
    let tau = std::f32::consts::TAU;
    let wrapped = (angle + std::f32::consts::PI).rem_euclid(tau) - std::f32::consts::PI;
    if wrapped <= -std::f32::consts::PI {
        wrapped + tau
    } else {
        wrapped
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
