use glam::DVec3;

use super::{Constraint, Energy};
use crate::body::Body;
use crate::error::{check_arity, check_point, check_weight, DynamicsError};

/// Anchors a body to a fixed point.
#[derive(Debug, Clone)]
pub struct OnTarget {
    index: usize,
    target: DVec3,
    weight: f64,
    delta: DVec3,
}

impl OnTarget {
    pub fn new(index: usize, target: DVec3, weight: f64) -> Result<Self, DynamicsError> {
        Ok(Self {
            index,
            target: check_point(target)?,
            weight: check_weight(weight)?,
            delta: DVec3::ZERO,
        })
    }

    pub fn target(&self) -> DVec3 {
        self.target
    }

    pub fn set_target(&mut self, target: DVec3) -> Result<(), DynamicsError> {
        self.target = check_point(target)?;
        Ok(())
    }

    pub fn set_weight(&mut self, weight: f64) -> Result<(), DynamicsError> {
        self.weight = check_weight(weight)?;
        Ok(())
    }
}

impl Constraint for OnTarget {
    fn calculate(&mut self, bodies: &[Body]) {
        self.delta = self.target - bodies[self.index].position.current;
    }

    fn apply(&self, bodies: &mut [Body]) {
        bodies[self.index].position.add_delta(self.delta, self.weight);
    }

    fn energy(&self) -> Energy {
        Energy::linear(self.delta.length())
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
