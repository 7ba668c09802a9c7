//! Error types for feature construction and remeshing.

use slur_config::ConfigError;
use slur_dynamics::DynamicsError;

/// Errors raised while turning raw geometry into a feature
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("Geometry kind `{0}` cannot be used as a feature")]
    UnsupportedGeometry(&'static str),
    #[error("Geometry is empty")]
    EmptyGeometry,
    #[error("Geometry contains NaN or infinite coordinates")]
    NonFinite,
    #[error("{kind} needs at least {required} points, found {found}")]
    TooFewPoints {
        kind: &'static str,
        required: usize,
        found: usize,
    },
    #[error("Vertex index {index} out of range (count: {count})")]
    IndexOutOfRange { index: u32, count: usize },
}

/// Errors raised while setting up or running a remesher
#[derive(Debug, thiserror::Error)]
pub enum RemeshError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dynamics(#[from] DynamicsError),
}
