//! Constraint contract and variants.
//!
//! Each step the solver calls [`Constraint::calculate`] on every constraint
//! (read-only, possibly in parallel), then [`Constraint::apply`] on every
//! constraint (serial, additive), then integrates the bodies.

mod align_rotation;
mod distance;
mod on_feature;
mod on_plane;
mod on_target;
mod smooth;

use std::fmt::Debug;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::body::Body;
use crate::error::DynamicsError;

pub use align_rotation::AlignRotation;
pub use distance::Distance;
pub use on_feature::OnFeature;
pub use on_plane::OnPlane;
pub use on_target::OnTarget;
pub use smooth::Smooth;

/// Magnitude of a constraint's last computed correction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Energy {
    pub linear: f64,
    pub angular: f64,
}

impl Energy {
    pub const ZERO: Energy = Energy {
        linear: 0.0,
        angular: 0.0,
    };

    pub fn linear(linear: f64) -> Self {
        Self {
            linear,
            angular: 0.0,
        }
    }

    pub fn angular(angular: f64) -> Self {
        Self {
            linear: 0.0,
            angular,
        }
    }

    /// Sum of both components, compared against the solver tolerance
    pub fn total(&self) -> f64 {
        self.linear + self.angular
    }
}

impl Add for Energy {
    type Output = Energy;

    fn add(self, rhs: Energy) -> Energy {
        Energy {
            linear: self.linear + rhs.linear,
            angular: self.angular + rhs.angular,
        }
    }
}

impl AddAssign for Energy {
    fn add_assign(&mut self, rhs: Energy) {
        *self = *self + rhs;
    }
}

impl Sum for Energy {
    fn sum<I: Iterator<Item = Energy>>(iter: I) -> Energy {
        iter.fold(Energy::ZERO, Add::add)
    }
}

/// A rule producing weighted corrections for one or more bodies.
///
/// Bodies are referenced by index into the solver's body array. Indexing
/// out of range during a step panics; [`crate::Solver::add_constraint`]
/// checks indices up front.
pub trait Constraint: Send + Sync + Debug {
    /// Compute and cache this step's correction. Must not depend on the
    /// order in which other constraints are calculated.
    fn calculate(&mut self, bodies: &[Body]);

    /// Add the cached correction, scaled by [`Constraint::weight`], to the
    /// referenced bodies' accumulators.
    fn apply(&self, bodies: &mut [Body]);

    /// Energy of the correction cached by the last `calculate`
    fn energy(&self) -> Energy;

    fn affects_position(&self) -> bool {
        true
    }

    fn affects_rotation(&self) -> bool {
        false
    }

    /// Body indices in declaration order
    fn indices(&self) -> Vec<usize>;

    /// Replace every body index at once, in the order [`Constraint::indices`]
    /// reports them. Leaves the constraint untouched on error.
    fn set_indices(&mut self, indices: &[usize]) -> Result<(), DynamicsError>;

    fn weight(&self) -> f64;
}
