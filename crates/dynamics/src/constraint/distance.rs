use glam::DVec3;

use super::{Constraint, Energy};
use crate::body::Body;
use crate::error::{check_arity, check_weight, DynamicsError};

/// Restores the distance between two bodies.
///
/// Both bodies move by half the error, in opposite directions along the
/// segment joining them.
#[derive(Debug, Clone)]
pub struct Distance {
    start: usize,
    end: usize,
    length: f64,
    weight: f64,
    delta: DVec3,
}

impl Distance {
    pub fn new(start: usize, end: usize, length: f64, weight: f64) -> Result<Self, DynamicsError> {
        check_distinct(start, end)?;
        Ok(Self {
            start,
            end,
            length: check_length(length)?,
            weight: check_weight(weight)?,
            delta: DVec3::ZERO,
        })
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn set_length(&mut self, length: f64) -> Result<(), DynamicsError> {
        self.length = check_length(length)?;
        Ok(())
    }

    pub fn set_weight(&mut self, weight: f64) -> Result<(), DynamicsError> {
        self.weight = check_weight(weight)?;
        Ok(())
    }
}

fn check_length(length: f64) -> Result<f64, DynamicsError> {
    if length >= 0.0 && length.is_finite() {
        Ok(length)
    } else {
        Err(DynamicsError::InvalidParameter(format!(
            "rest length {length} must be non-negative and finite"
        )))
    }
}

fn check_distinct(start: usize, end: usize) -> Result<(), DynamicsError> {
    if start == end {
        return Err(DynamicsError::InvalidParameter(format!(
            "distance constraint joins body {start} to itself"
        )));
    }
    Ok(())
}

impl Constraint for Distance {
    fn calculate(&mut self, bodies: &[Body]) {
        let d = bodies[self.end].position.current - bodies[self.start].position.current;
        let current = d.length();
        self.delta = if current > f64::EPSILON {
            // Correction for start; end receives the negation
            d * (0.5 * (1.0 - self.length / current))
        } else {
            DVec3::ZERO
        };
    }

    fn apply(&self, bodies: &mut [Body]) {
        bodies[self.start].position.add_delta(self.delta, self.weight);
        bodies[self.end].position.add_delta(-self.delta, self.weight);
    }

    fn energy(&self) -> Energy {
        Energy::linear(2.0 * self.delta.length())
    }

    fn indices(&self) -> Vec<usize> {
        vec![self.start, self.end]
    }

    fn set_indices(&mut self, indices: &[usize]) -> Result<(), DynamicsError> {
        check_arity(indices, 2)?;
        check_distinct(indices[0], indices[1])?;
        self.start = indices[0];
        self.end = indices[1];
        Ok(())
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::test_util::bodies;

    #[test]
    fn test_restores_rest_length_symmetrically() {
        let mut bodies = bodies(&[DVec3::ZERO, DVec3::new(4.0, 0.0, 0.0)]);
        let mut c = Distance::new(0, 1, 2.0, 1.0).unwrap();

        c.calculate(&bodies);
        assert!((c.energy().linear - 2.0).abs() < 1e-12);

        c.apply(&mut bodies);
        for body in &mut bodies {
            body.integrate(false);
        }

        assert!((bodies[0].current_position() - DVec3::new(1.0, 0.0, 0.0)).length() < 1e-12);
        assert!((bodies[1].current_position() - DVec3::new(3.0, 0.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_coincident_bodies_are_left_alone() {
        let bodies = bodies(&[DVec3::ONE, DVec3::ONE]);
        let mut c = Distance::new(0, 1, 1.0, 1.0).unwrap();

        c.calculate(&bodies);

        assert_eq!(c.energy(), Energy::ZERO);
    }

    #[test]
    fn test_set_indices_rejects_self_loop() {
        let mut c = Distance::new(0, 1, 1.0, 1.0).unwrap();

        assert!(c.set_indices(&[3, 3]).is_err());
        assert!(c.set_indices(&[3]).is_err());
        assert_eq!(c.indices(), vec![0, 1]);

        c.set_indices(&[5, 2]).unwrap();
        assert_eq!(c.indices(), vec![5, 2]);
    }
}
