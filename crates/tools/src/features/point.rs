use glam::DVec3;
use slur_dynamics::{Feature, FeatureRank};

/// A fixed location. Every query returns it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointFeature {
    point: DVec3,
}

impl PointFeature {
    pub fn new(point: DVec3) -> Self {
        Self { point }
    }

    pub fn point(&self) -> DVec3 {
        self.point
    }
}

impl Feature for PointFeature {
    fn rank(&self) -> FeatureRank {
        FeatureRank::Point
    }

    fn closest_point(&self, _query: DVec3) -> DVec3 {
        self.point
    }
}
