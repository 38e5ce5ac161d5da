use thiserror::Error;

use crate::types::LegId;

/// Top-level error type for skitter.
#[derive(Debug, Error)]
pub enum SkitterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{field} must be > 0 (got {value})")]
    NonPositive { field: &'static str, value: f32 },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors raised while assembling a body or a joint chain.
///
/// Assembly happens once; nothing in the per-frame path returns these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    #[error("Joint chain has no joints")]
    EmptyChain,

    #[error("Joint {joint} links to {next}, which is out of range")]
    LinkOutOfRange { joint: usize, next: usize },

    #[error("Joint chain loops back on itself at joint {joint}")]
    LinkCycle { joint: usize },

    #[error("End effector {end_effector} is outside the joint arena")]
    EndEffectorOutOfRange { end_effector: usize },

    #[error("Joint {joint} has a zero-length rotation axis")]
    DegenerateAxis { joint: usize },

    #[error("Body has no legs")]
    NoLegs,

    #[error("Leg {0} appears more than once")]
    DuplicateLeg(LegId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    #[test]
    fn skitter_error_from_config_error() {
        let err = ConfigError::NonPositive {
            field: "gait.max_distance",
            value: -1.0,
        };
        let skitter_err: SkitterError = err.into();
        assert!(matches!(skitter_err, SkitterError::Config(_)));
        assert!(skitter_err.to_string().contains("-1"));
    }

    #[test]
    fn skitter_error_from_assembly_error() {
        let err = AssemblyError::DuplicateLeg(LegId::new(Side::Left, 2));
        let skitter_err: SkitterError = err.into();
        assert!(matches!(skitter_err, SkitterError::Assembly(_)));
        assert!(skitter_err.to_string().contains("L2"));
    }

    #[test]
    fn config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::Io(_)));
    }

    #[test]
    fn config_error_display_messages() {
        assert_eq!(
            ConfigError::NonPositive {
                field: "step.arrival_tolerance",
                value: 0.0
            }
            .to_string(),
            "step.arrival_tolerance must be > 0 (got 0)"
        );
        assert_eq!(
            ConfigError::InvalidValue {
                field: "ground.exclude_layers".into(),
                message: "layer 40 is out of range".into()
            }
            .to_string(),
            "Invalid value for ground.exclude_layers: layer 40 is out of range"
        );
    }

    #[test]
    fn assembly_error_display_messages() {
        assert_eq!(
            AssemblyError::EmptyChain.to_string(),
            "Joint chain has no joints"
        );
        assert_eq!(
            AssemblyError::LinkOutOfRange { joint: 1, next: 7 }.to_string(),
            "Joint 1 links to 7, which is out of range"
        );
        assert_eq!(
            AssemblyError::LinkCycle { joint: 0 }.to_string(),
            "Joint chain loops back on itself at joint 0"
        );
        assert_eq!(
            AssemblyError::EndEffectorOutOfRange { end_effector: 3 }.to_string(),
            "End effector 3 is outside the joint arena"
        );
        assert_eq!(
            AssemblyError::DegenerateAxis { joint: 2 }.to_string(),
            "Joint 2 has a zero-length rotation axis"
        );
        assert_eq!(AssemblyError::NoLegs.to_string(), "Body has no legs");
    }
}
