use std::collections::HashSet;

use glam::DVec3;

use super::{Constraint, Energy};
use crate::body::Body;
use crate::error::{check_arity, check_weight, DynamicsError};

/// Pulls a body toward the centroid of its neighbours (umbrella operator).
///
/// A tangential smooth treats the neighbours as a closed ring in
/// rotational order and drops the part of the pull along the ring normal,
/// so the body slides over the surface instead of cutting through it.
#[derive(Debug, Clone)]
pub struct Smooth {
    index: usize,
    neighbors: Vec<usize>,
    weight: f64,
    tangential: bool,
    delta: DVec3,
}

impl Smooth {
    pub fn new(index: usize, neighbors: Vec<usize>, weight: f64) -> Result<Self, DynamicsError> {
        check_neighbors(index, &neighbors)?;
        Ok(Self {
            index,
            neighbors,
            weight: check_weight(weight)?,
            tangential: false,
            delta: DVec3::ZERO,
        })
    }

    /// Smooth within the tangent plane of an ordered one-ring.
    pub fn tangential(index: usize, ring: Vec<usize>, weight: f64) -> Result<Self, DynamicsError> {
        Ok(Self {
            tangential: true,
            ..Self::new(index, ring, weight)?
        })
    }

    pub fn neighbors(&self) -> &[usize] {
        &self.neighbors
    }

    pub fn is_tangential(&self) -> bool {
        self.tangential
    }

    /// Area-weighted normal of the fan spanned by the ring around `centre`
    fn ring_normal(&self, bodies: &[Body], centre: DVec3) -> Option<DVec3> {
        if self.neighbors.len() < 3 {
            return None;
        }
        let normal: DVec3 = self
            .neighbors
            .iter()
            .zip(self.neighbors.iter().cycle().skip(1))
            .map(|(&a, &b)| {
                let pa = bodies[a].position.current - centre;
                let pb = bodies[b].position.current - centre;
                pa.cross(pb)
            })
            .sum();
        normal.try_normalize()
    }
}

/// The smoothed body may not be its own neighbour, and no neighbour may repeat.
fn check_neighbors(index: usize, neighbors: &[usize]) -> Result<(), DynamicsError> {
    if neighbors.contains(&index) {
        return Err(DynamicsError::InvalidParameter(format!(
            "smooth constraint lists body {index} as its own neighbour"
        )));
    }
    let mut seen = HashSet::with_capacity(neighbors.len());
    if let Some(&repeated) = neighbors.iter().find(|&&n| !seen.insert(n)) {
        return Err(DynamicsError::InvalidParameter(format!(
            "smooth constraint lists neighbour {repeated} more than once"
        )));
    }
    Ok(())
}

impl Constraint for Smooth {
    fn calculate(&mut self, bodies: &[Body]) {
        if self.neighbors.is_empty() {
            self.delta = DVec3::ZERO;
            return;
        }
        let sum: DVec3 = self
            .neighbors
            .iter()
            .map(|&i| bodies[i].position.current)
            .sum();
        let centre = bodies[self.index].position.current;
        let centroid = sum / self.neighbors.len() as f64;
        self.delta = centroid - centre;

        if self.tangential {
            if let Some(normal) = self.ring_normal(bodies, centre) {
                self.delta -= normal * self.delta.dot(normal);
            }
        }
    }

    fn apply(&self, bodies: &mut [Body]) {
        bodies[self.index].position.add_delta(self.delta, self.weight);
    }

    fn energy(&self) -> Energy {
        Energy::linear(self.delta.length())
    }

    /// The smoothed body first, then its neighbours
    fn indices(&self) -> Vec<usize> {
        let mut indices = Vec::with_capacity(1 + self.neighbors.len());
        indices.push(self.index);
        indices.extend_from_slice(&self.neighbors);
        indices
    }

    fn set_indices(&mut self, indices: &[usize]) -> Result<(), DynamicsError> {
        check_arity(indices, 1 + self.neighbors.len())?;
        check_neighbors(indices[0], &indices[1..])?;
        self.index = indices[0];
        self.neighbors.copy_from_slice(&indices[1..]);
        Ok(())
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}
