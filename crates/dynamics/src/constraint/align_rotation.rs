use glam::{DQuat, DVec3};

use super::{Constraint, Energy};
use crate::body::Body;
use crate::error::{check_arity, check_weight, DynamicsError};

/// Rotates a body toward a target orientation.
///
/// Bodies without an orientation receive nothing.
#[derive(Debug, Clone)]
pub struct AlignRotation {
    index: usize,
    target: DQuat,
    weight: f64,
    /// Scaled axis taking the current orientation to the target
    delta: DVec3,
}

impl AlignRotation {
    pub fn new(index: usize, target: DQuat, weight: f64) -> Result<Self, DynamicsError> {
        Ok(Self {
            index,
            target: check_rotation(target)?,
            weight: check_weight(weight)?,
            delta: DVec3::ZERO,
        })
    }

    pub fn target(&self) -> DQuat {
        self.target
    }

    pub fn set_target(&mut self, target: DQuat) -> Result<(), DynamicsError> {
        self.target = check_rotation(target)?;
        Ok(())
    }
}

fn check_rotation(rotation: DQuat) -> Result<DQuat, DynamicsError> {
    let length = rotation.length();
    if length.is_finite() && length > f64::EPSILON {
        Ok(rotation / length)
    } else {
        Err(DynamicsError::InvalidParameter(
            "target rotation is not a valid quaternion".to_string(),
        ))
    }
}

impl Constraint for AlignRotation {
    fn calculate(&mut self, bodies: &[Body]) {
        let Some(rotation) = bodies[self.index].rotation else {
            self.delta = DVec3::ZERO;
            return;
        };
        let mut q = self.target * rotation.current.inverse();
        // Shortest arc
        if q.w < 0.0 {
            q = -q;
        }
        self.delta = q.to_scaled_axis();
    }

    fn apply(&self, bodies: &mut [Body]) {
        if let Some(rotation) = &mut bodies[self.index].rotation {
            rotation.add_delta(self.delta, self.weight);
        }
    }

    fn energy(&self) -> Energy {
        Energy::angular(self.delta.length())
    }

    fn affects_position(&self) -> bool {
        false
    }

    fn affects_rotation(&self) -> bool {
        true
    }

    fn indices(&self) -> Vec<usize> {
        vec![self.index]
    }

    fn set_indices(&mut self, indices: &[usize]) -> Result<(), DynamicsError> {
        check_arity(indices, 1)?;
        self.index = indices[0];
        Ok(())
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}
