// skitter-core: Types, config, errors and ground queries for skitter locomotion.

pub mod config;
pub mod error;
pub mod ground;
pub mod types;

pub mod prelude {
    pub use crate::config::{
        GaitConfig, GroundConfig, IkConfig, LandingStrategy, LocomotionConfig, StepConfig,
    };
    pub use crate::error::{AssemblyError, ConfigError, SkitterError};
    pub use crate::ground::{FlatGround, GroundQuery, LayerMask, Plate, PlateGround};
    pub use crate::types::{BodyPose, LegId, MotionCommand, Side};
}
