//! SpatialSlur dynamics
//!
//! A positional-dynamics solver that relaxes a set of bodies toward
//! satisfying independent geometric constraints:
//! - [`Body`] - Point mass with accumulated position (and optional rotation) deltas
//! - [`Constraint`] - Calculate / Apply / energy contract implemented by every variant
//! - [`Feature`] - Closest-point target consumed by attraction constraints
//! - [`Solver`] - Owns bodies and constraints and steps them to convergence
//!
//! Constraints refer to bodies by index only. When the body array is
//! renumbered (for example after a remesh), remap the constraints with
//! [`Solver::remap_body_indices`] or regenerate them.

pub mod body;
pub mod constraint;
pub mod error;
pub mod feature;
pub mod solver;

pub use body::{Body, BodyPosition, BodyRotation};
pub use constraint::{
    AlignRotation, Constraint, Distance, Energy, OnFeature, OnPlane, OnTarget, Smooth,
};
pub use error::DynamicsError;
pub use feature::{Feature, FeatureRank};
pub use solver::{SolveReport, Solver, StepReport};
