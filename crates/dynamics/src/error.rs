//! Error types for constraint and solver configuration.

use glam::DVec3;

/// Errors raised when configuring constraints or registering them with a solver.
///
/// Out-of-range body access while stepping is a programming error and
/// panics instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DynamicsError {
    #[error("Weight must be positive and finite, got {0}")]
    InvalidWeight(f64),
    #[error("Normal must be finite and non-zero")]
    DegenerateNormal,
    #[error("Expected {expected} body indices, found {found}")]
    IndexCountMismatch { expected: usize, found: usize },
    #[error("Body index {index} out of range (count: {count})")]
    BodyOutOfRange { index: usize, count: usize },
    #[error("Invalid constraint parameter: {0}")]
    InvalidParameter(String),
}

/// Validate a constraint weight.
pub(crate) fn check_weight(weight: f64) -> Result<f64, DynamicsError> {
    if weight > 0.0 && weight.is_finite() {
        Ok(weight)
    } else {
        Err(DynamicsError::InvalidWeight(weight))
    }
}

/// Reject NaN or infinite coordinates.
pub(crate) fn check_point(point: DVec3) -> Result<DVec3, DynamicsError> {
    if point.is_finite() {
        Ok(point)
    } else {
        Err(DynamicsError::InvalidParameter(format!(
            "point {point} is not finite"
        )))
    }
}

/// Check that a reassignment supplies the expected number of indices.
pub(crate) fn check_arity(indices: &[usize], expected: usize) -> Result<(), DynamicsError> {
    if indices.len() == expected {
        Ok(())
    } else {
        Err(DynamicsError::IndexCountMismatch {
            expected,
            found: indices.len(),
        })
    }
}
