//! Shared configuration for SpatialSlur
//!
//! This crate provides the single source of truth for solver tolerances,
//! iteration caps and remeshing parameters shared by the dynamics and tools
//! crates. Every struct loads from JSON and falls back to field defaults.

use serde::{Deserialize, Serialize};

/// Default convergence tolerance on aggregate step energy
pub const DEFAULT_TOLERANCE: f64 = 1.0e-6;

/// Default iteration cap for a full solve
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// Default solver iterations run between two remesh passes
pub const DEFAULT_ITERATIONS_PER_PASS: usize = 20;

/// Errors raised while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Solver configuration for the iterate-until-converged loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Aggregate (linear + angular) energy at or below which a solve stops
    pub tolerance: f64,
    /// Maximum number of steps a solve may take
    pub max_iterations: usize,
    /// Evaluate constraints and integrate bodies on the rayon pool
    pub parallel: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            parallel: true,
        }
    }
}

impl SolverConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the convergence tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the iteration cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Toggle parallel evaluation
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Load from a JSON document, validating the result
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConfigError::Invalid {
                field: "tolerance",
                reason: format!("{} is not a non-negative finite number", self.tolerance),
            });
        }
        Ok(())
    }
}

/// Parameters for dynamic remeshing against a target feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemeshConfig {
    /// Edges shorter than `.0` are collapsed, edges longer than `.1` are split
    pub length_range: (f64, f64),
    /// Solver steps run after each topology pass
    pub iterations_per_pass: usize,
    /// Weight of the feature attraction constraint on every vertex
    pub feature_weight: f64,
    /// Weight of the tangential smoothing constraint on every vertex
    pub smooth_weight: f64,
    /// Solver settings used during relaxation
    pub solver: SolverConfig,
}

impl Default for RemeshConfig {
    fn default() -> Self {
        Self {
            length_range: (0.5, 1.0),
            iterations_per_pass: DEFAULT_ITERATIONS_PER_PASS,
            feature_weight: 1.0,
            smooth_weight: 0.5,
            solver: SolverConfig::default(),
        }
    }
}

impl RemeshConfig {
    /// Create a remesh config targeting the given edge length range
    pub fn new(min_length: f64, max_length: f64) -> Self {
        Self {
            length_range: (min_length, max_length),
            ..Self::default()
        }
    }

    pub fn min_length(&self) -> f64 {
        self.length_range.0
    }

    pub fn max_length(&self) -> f64 {
        self.length_range.1
    }

    /// Load from a JSON document, validating the result
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = self.length_range;
        if !(min > 0.0 && min.is_finite() && max.is_finite()) {
            return Err(ConfigError::Invalid {
                field: "length_range",
                reason: format!("bounds ({min}, {max}) must be positive and finite"),
            });
        }
        // Splitting an edge of length `max` yields two halves; they must not
        // immediately qualify for collapse or the passes oscillate.
        if max < 2.0 * min {
            return Err(ConfigError::Invalid {
                field: "length_range",
                reason: format!("max {max} must be at least twice min {min}"),
            });
        }
        for (field, weight) in [
            ("feature_weight", self.feature_weight),
            ("smooth_weight", self.smooth_weight),
        ] {
            if !(weight > 0.0 && weight.is_finite()) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("weight {weight} must be positive and finite"),
                });
            }
        }
        self.solver.validate()
    }
}
