use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ground::LayerMask;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_move_speed() -> f32 {
    10.0
}
const fn default_turn_speed() -> f32 {
    15.0
}
const fn default_max_distance() -> f32 {
    6.0
}
const fn default_hyperextension_slowdown() -> f32 {
    0.01
}
const fn default_step_speed_multiplier() -> f32 {
    14.0
}
const fn default_arrival_tolerance() -> f32 {
    0.6
}
const fn default_landing_radius_factor() -> f32 {
    0.9
}
const fn default_step_height() -> f32 {
    4.0
}
const fn default_extension_ratio() -> f32 {
    0.95
}
const fn default_pole_offset() -> [f32; 3] {
    [2.0, 0.0, 6.0]
}
const fn default_iterations() -> u32 {
    20
}
const fn default_threshold() -> f32 {
    0.05
}
const fn default_learning_rate() -> f32 {
    // 5 deg per deg-slope, expressed in radians.
    0.001_523
}
const fn default_trial_angle() -> f32 {
    // 0.01 deg
    1.745e-4
}
const fn default_ray_range() -> f32 {
    10.0
}
fn default_exclude_layers() -> Vec<u8> {
    vec![9]
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn in_unit_range(field: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: field.into(),
            message: format!("{value} is outside [0, 1]"),
        })
    }
}

// ---------------------------------------------------------------------------
// GaitConfig
// ---------------------------------------------------------------------------

/// Body motion and step trigger settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaitConfig {
    /// Body translation speed (units/s) for a unit movement command.
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,

    /// Body turn speed (deg/s) for a unit turn command.
    #[serde(default = "default_turn_speed")]
    pub turn_speed: f32,

    /// Clearance above which a leg asks to step.
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,

    /// Slow the body down while any queued leg is fully extended.
    #[serde(default)]
    pub slow_when_hyperextended: bool,

    /// Speed factor applied when `slow_when_hyperextended` triggers.
    #[serde(default = "default_hyperextension_slowdown")]
    pub hyperextension_slowdown: f32,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            move_speed: default_move_speed(),
            turn_speed: default_turn_speed(),
            max_distance: default_max_distance(),
            slow_when_hyperextended: false,
            hyperextension_slowdown: default_hyperextension_slowdown(),
        }
    }
}

// ---------------------------------------------------------------------------
// StepConfig
// ---------------------------------------------------------------------------

/// Which way the landing point is projected from the stepping-area center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandingStrategy {
    /// Along the leg's direction of travel.
    #[default]
    Ahead,
    /// Against the leg's direction of travel.
    Antipodal,
}

/// Per-step trajectory settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfig {
    /// Foot travel speed is `move_speed * step_speed_multiplier`.
    #[serde(default = "default_step_speed_multiplier")]
    pub step_speed_multiplier: f32,

    /// A step completes once the foot is this close to its landing point.
    #[serde(default = "default_arrival_tolerance")]
    pub arrival_tolerance: f32,

    /// Landing radius as a fraction of `max_distance`.
    #[serde(default = "default_landing_radius_factor")]
    pub landing_radius_factor: f32,

    /// Peak of the half-sine lift arc.
    #[serde(default = "default_step_height")]
    pub step_height: f32,

    #[serde(default)]
    pub landing: LandingStrategy,

    /// A leg counts as fully extended past this fraction of its chain reach.
    #[serde(default = "default_extension_ratio")]
    pub extension_ratio: f32,

    /// Pole target offset from the foot, in the leg's horizontal facing frame.
    #[serde(default = "default_pole_offset")]
    pub pole_offset: [f32; 3],
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            step_speed_multiplier: default_step_speed_multiplier(),
            arrival_tolerance: default_arrival_tolerance(),
            landing_radius_factor: default_landing_radius_factor(),
            step_height: default_step_height(),
            landing: LandingStrategy::default(),
            extension_ratio: default_extension_ratio(),
            pole_offset: default_pole_offset(),
        }
    }
}

impl StepConfig {
    /// Foot travel speed during a step.
    pub fn step_speed(&self, move_speed: f32) -> f32 {
        move_speed * self.step_speed_multiplier
    }
}

// ---------------------------------------------------------------------------
// IkConfig
// ---------------------------------------------------------------------------

/// Finite-difference IK settings. Angles are in radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IkConfig {
    /// Descent iterations per frame.
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Distance below which a goal counts as reached.
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Gradient step: joints rotate by `-slope * learning_rate`.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,

    /// Trial rotation used to estimate each slope.
    #[serde(default = "default_trial_angle")]
    pub trial_angle: f32,
}

impl Default for IkConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            threshold: default_threshold(),
            learning_rate: default_learning_rate(),
            trial_angle: default_trial_angle(),
        }
    }
}

// ---------------------------------------------------------------------------
// GroundConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundConfig {
    /// Maximum length of downward ground rays.
    #[serde(default = "default_ray_range")]
    pub ray_range: f32,

    /// Layers ignored by ground rays (the body's own colliders).
    #[serde(default = "default_exclude_layers")]
    pub exclude_layers: Vec<u8>,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            ray_range: default_ray_range(),
            exclude_layers: default_exclude_layers(),
        }
    }
}

impl GroundConfig {
    pub fn exclude_mask(&self) -> LayerMask {
        LayerMask::from_layers(&self.exclude_layers)
    }
}

// ---------------------------------------------------------------------------
// LocomotionConfig
// ---------------------------------------------------------------------------

/// Complete locomotion configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocomotionConfig {
    #[serde(default)]
    pub gait: GaitConfig,
    #[serde(default)]
    pub step: StepConfig,
    #[serde(default)]
    pub ik: IkConfig,
    #[serde(default)]
    pub ground: GroundConfig,
}

impl LocomotionConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let gait = &self.gait;
        if !(gait.move_speed >= 0.0 && gait.move_speed.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "gait.move_speed".into(),
                message: format!("{} must be finite and >= 0", gait.move_speed),
            });
        }
        if !gait.turn_speed.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "gait.turn_speed".into(),
                message: "must be finite".into(),
            });
        }
        positive("gait.max_distance", gait.max_distance)?;
        in_unit_range("gait.hyperextension_slowdown", gait.hyperextension_slowdown)?;

        let step = &self.step;
        positive("step.step_speed_multiplier", step.step_speed_multiplier)?;
        positive("step.arrival_tolerance", step.arrival_tolerance)?;
        in_unit_range("step.landing_radius_factor", step.landing_radius_factor)?;
        if !(step.step_height >= 0.0 && step.step_height.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "step.step_height".into(),
                message: format!("{} must be finite and >= 0", step.step_height),
            });
        }
        positive("step.extension_ratio", step.extension_ratio)?;

        let ik = &self.ik;
        if ik.iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ik.iterations".into(),
                message: "must be at least 1".into(),
            });
        }
        positive("ik.threshold", ik.threshold)?;
        positive("ik.learning_rate", ik.learning_rate)?;
        positive("ik.trial_angle", ik.trial_angle)?;

        positive("ground.ray_range", self.ground.ray_range)?;
        if let Some(&layer) = self.ground.exclude_layers.iter().find(|&&l| l >= 32) {
            return Err(ConfigError::InvalidValue {
                field: "ground.exclude_layers".into(),
                message: format!("layer {layer} is out of range"),
            });
        }
        Ok(())
    }

    /// Parse and validate from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Foot travel speed during a step.
    pub fn step_speed(&self) -> f32 {
        self.step.step_speed(self.gait.move_speed)
    }

    /// Distance from the stepping-area center at which landing points are placed.
    pub fn landing_radius(&self) -> f32 {
        self.gait.max_distance * self.step.landing_radius_factor
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
