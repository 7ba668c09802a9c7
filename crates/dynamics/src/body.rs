//! Bodies relaxed by the solver.
//!
//! A body's current state only changes in [`Body::integrate`]. During the
//! Calculate phase constraints read bodies immutably; during Apply they only
//! add to the accumulators.

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Translational state of a body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyPosition {
    pub current: DVec3,
    /// Σ weight · delta for the current step
    pub delta_sum: DVec3,
    /// Σ weight for the current step
    pub weight_sum: f64,
}

impl BodyPosition {
    pub fn new(current: DVec3) -> Self {
        Self {
            current,
            delta_sum: DVec3::ZERO,
            weight_sum: 0.0,
        }
    }

    /// Accumulate a correction with the given weight
    pub fn add_delta(&mut self, delta: DVec3, weight: f64) {
        self.delta_sum += delta * weight;
        self.weight_sum += weight;
    }

    pub fn reset_delta(&mut self) {
        self.delta_sum = DVec3::ZERO;
        self.weight_sum = 0.0;
    }

    /// Move by the weighted average of the accumulated corrections.
    ///
    /// Does nothing when no correction was accumulated.
    pub fn integrate(&mut self) {
        if self.weight_sum > 0.0 {
            self.current += self.delta_sum / self.weight_sum;
        }
    }
}

/// Rotational state of a body.
///
/// Rotation deltas are scaled axes (axis · angle), so they average the same
/// way position deltas do.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyRotation {
    pub current: DQuat,
    pub delta_sum: DVec3,
    pub weight_sum: f64,
}

impl BodyRotation {
    pub fn new(current: DQuat) -> Self {
        Self {
            current: current.normalize(),
            delta_sum: DVec3::ZERO,
            weight_sum: 0.0,
        }
    }

    pub fn add_delta(&mut self, delta: DVec3, weight: f64) {
        self.delta_sum += delta * weight;
        self.weight_sum += weight;
    }

    pub fn reset_delta(&mut self) {
        self.delta_sum = DVec3::ZERO;
        self.weight_sum = 0.0;
    }

    /// Rotate by the weighted average scaled axis (applied in world frame).
    pub fn integrate(&mut self) {
        if self.weight_sum > 0.0 {
            let delta = DQuat::from_scaled_axis(self.delta_sum / self.weight_sum);
            self.current = (delta * self.current).normalize();
        }
    }
}

/// A point mass with an optional orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub position: BodyPosition,
    pub rotation: Option<BodyRotation>,
}

impl Body {
    /// Create a body without orientation
    pub fn new(position: DVec3) -> Self {
        Self {
            position: BodyPosition::new(position),
            rotation: None,
        }
    }

    /// Create a body that also carries an orientation
    pub fn with_rotation(position: DVec3, rotation: DQuat) -> Self {
        Self {
            position: BodyPosition::new(position),
            rotation: Some(BodyRotation::new(rotation)),
        }
    }

    pub fn current_position(&self) -> DVec3 {
        self.position.current
    }

    /// Current orientation, identity for bodies without one
    pub fn current_rotation(&self) -> DQuat {
        self.rotation.map_or(DQuat::IDENTITY, |r| r.current)
    }

    pub fn reset_delta(&mut self) {
        self.position.reset_delta();
        if let Some(rotation) = &mut self.rotation {
            rotation.reset_delta();
        }
    }

    /// Integrate accumulated corrections. Rotation is only integrated when
    /// `rotate` is set.
    pub fn integrate(&mut self, rotate: bool) {
        self.position.integrate();
        if rotate {
            if let Some(rotation) = &mut self.rotation {
                rotation.integrate();
            }
        }
    }
}

impl From<DVec3> for Body {
    fn from(position: DVec3) -> Self {
        Body::new(position)
    }
}
