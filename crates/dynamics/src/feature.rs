//! Closest-point targets.
//!
//! Concrete features (points, polylines, meshes) live in the tools crate;
//! constraints only depend on this trait.

use std::fmt::Debug;

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Topological dimension of a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeatureRank {
    Point = 0,
    Curve = 1,
    Surface = 2,
}

impl FeatureRank {
    pub fn value(self) -> u8 {
        self as u8
    }
}

/// A geometric target that answers closest-point queries.
///
/// Implementations own a copy of their source geometry and are immutable,
/// so queries may run concurrently from the Calculate phase.
pub trait Feature: Send + Sync + Debug {
    fn rank(&self) -> FeatureRank;

    /// Closest point on the feature to `query`
    fn closest_point(&self, query: DVec3) -> DVec3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_values() {
        assert_eq!(FeatureRank::Point.value(), 0);
        assert_eq!(FeatureRank::Curve.value(), 1);
        assert_eq!(FeatureRank::Surface.value(), 2);
        assert!(FeatureRank::Curve < FeatureRank::Surface);
    }
}
