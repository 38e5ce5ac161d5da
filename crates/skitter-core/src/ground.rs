//! Downward ground queries.
//!
//! Locomotion never talks to a physics engine directly. Legs sense the ground
//! through [`GroundQuery`], which a host (a physics backend, a heightmap, or
//! the reference implementations here) provides each frame.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// LayerMask
// ---------------------------------------------------------------------------

/// Bit set of surface layers (0..32).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);

    /// Mask containing a single layer. Layers past 31 yield an empty mask.
    pub const fn layer(layer: u8) -> Self {
        match 1u32.checked_shl(layer as u32) {
            Some(bit) => Self(bit),
            None => Self::NONE,
        }
    }

    pub fn from_layers(layers: &[u8]) -> Self {
        layers
            .iter()
            .fold(Self::NONE, |mask, &l| mask.union(Self::layer(l)))
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, layer: u8) -> bool {
        self.0 & Self::layer(layer).0 != 0
    }
}

// ---------------------------------------------------------------------------
// GroundQuery
// ---------------------------------------------------------------------------

/// Straight-down ray query against the walkable surfaces of a scene.
pub trait GroundQuery {
    /// Nearest surface point directly below `origin` within `max_range`,
    /// ignoring surfaces whose layer is in `exclude`.
    fn raycast_down(
        &self,
        origin: &Vector3<f32>,
        max_range: f32,
        exclude: LayerMask,
    ) -> Option<Vector3<f32>>;
}

impl<T: GroundQuery + ?Sized> GroundQuery for &T {
    fn raycast_down(
        &self,
        origin: &Vector3<f32>,
        max_range: f32,
        exclude: LayerMask,
    ) -> Option<Vector3<f32>> {
        (**self).raycast_down(origin, max_range, exclude)
    }
}

impl<T: GroundQuery + ?Sized> GroundQuery for Box<T> {
    fn raycast_down(
        &self,
        origin: &Vector3<f32>,
        max_range: f32,
        exclude: LayerMask,
    ) -> Option<Vector3<f32>> {
        (**self).raycast_down(origin, max_range, exclude)
    }
}

/// Height of a horizontal surface as seen from `origin`, if the ray reaches it.
fn hit_height(origin: &Vector3<f32>, height: f32, max_range: f32) -> Option<f32> {
    let drop = origin.z - height;
    (drop >= 0.0 && drop <= max_range).then_some(height)
}

// ---------------------------------------------------------------------------
// FlatGround
// ---------------------------------------------------------------------------

/// Infinite horizontal plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlatGround {
    pub height: f32,
    #[serde(default)]
    pub layer: u8,
}

impl FlatGround {
    pub const fn new(height: f32) -> Self {
        Self { height, layer: 0 }
    }
}

impl GroundQuery for FlatGround {
    fn raycast_down(
        &self,
        origin: &Vector3<f32>,
        max_range: f32,
        exclude: LayerMask,
    ) -> Option<Vector3<f32>> {
        if exclude.contains(self.layer) {
            return None;
        }
        hit_height(origin, self.height, max_range).map(|z| Vector3::new(origin.x, origin.y, z))
    }
}

// ---------------------------------------------------------------------------
// PlateGround
// ---------------------------------------------------------------------------

/// Axis-aligned horizontal rectangle at a fixed height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plate {
    pub min: [f32; 2],
    pub max: [f32; 2],
    pub height: f32,
    #[serde(default)]
    pub layer: u8,
}

impl Plate {
    pub fn contains_xy(&self, x: f32, y: f32) -> bool {
        x >= self.min[0] && x <= self.max[0] && y >= self.min[1] && y <= self.max[1]
    }
}

/// Uneven terrain built from stacked horizontal plates.
///
/// A downward ray hits the highest plate that lies below the origin and
/// within range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlateGround {
    #[serde(default)]
    pub plates: Vec<Plate>,
}

impl PlateGround {
    pub const fn new(plates: Vec<Plate>) -> Self {
        Self { plates }
    }

    /// Builder: add a plate.
    #[must_use]
    pub fn with_plate(mut self, plate: Plate) -> Self {
        self.plates.push(plate);
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self, crate::error::ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

impl GroundQuery for PlateGround {
    fn raycast_down(
        &self,
        origin: &Vector3<f32>,
        max_range: f32,
        exclude: LayerMask,
    ) -> Option<Vector3<f32>> {
        self.plates
            .iter()
            .filter(|p| !exclude.contains(p.layer) && p.contains_xy(origin.x, origin.y))
            .filter_map(|p| hit_height(origin, p.height, max_range))
            .max_by(f32::total_cmp)
            .map(|z| Vector3::new(origin.x, origin.y, z))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
