use glam::DVec3;

use super::{Constraint, Energy};
use crate::body::Body;
use crate::error::{check_arity, check_point, check_weight, DynamicsError};

/// Pulls a body onto a plane along the plane normal.
#[derive(Debug, Clone)]
pub struct OnPlane {
    index: usize,
    origin: DVec3,
    normal: DVec3,
    weight: f64,
    delta: DVec3,
}

impl OnPlane {
    /// The normal is normalized; zero or non-finite normals are rejected.
    pub fn new(index: usize, origin: DVec3, normal: DVec3, weight: f64) -> Result<Self, DynamicsError> {
        Ok(Self {
            index,
            origin: check_point(origin)?,
            normal: unit_normal(normal)?,
            weight: check_weight(weight)?,
            delta: DVec3::ZERO,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    /// Unit plane normal
    pub fn normal(&self) -> DVec3 {
        self.normal
    }

    /// Correction cached by the last `calculate`
    pub fn delta(&self) -> DVec3 {
        self.delta
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn set_origin(&mut self, origin: DVec3) -> Result<(), DynamicsError> {
        self.origin = check_point(origin)?;
        Ok(())
    }

    pub fn set_normal(&mut self, normal: DVec3) -> Result<(), DynamicsError> {
        self.normal = unit_normal(normal)?;
        Ok(())
    }

    pub fn set_weight(&mut self, weight: f64) -> Result<(), DynamicsError> {
        self.weight = check_weight(weight)?;
        Ok(())
    }
}

fn unit_normal(normal: DVec3) -> Result<DVec3, DynamicsError> {
    normal.try_normalize().ok_or(DynamicsError::DegenerateNormal)
}

impl Constraint for OnPlane {
    fn calculate(&mut self, bodies: &[Body]) {
        let p = bodies[self.index].position.current;
        self.delta = self.normal * (self.origin - p).dot(self.normal);
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
