use glam::DVec3;
use slur_dynamics::{Feature, FeatureRank};

use crate::error::FeatureError;

/// A polyline, open or closed.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveFeature {
    points: Vec<DVec3>,
    closed: bool,
}

impl CurveFeature {
    /// Needs at least two points. A closed polyline also joins the last
    /// point back to the first.
    pub fn new(points: Vec<DVec3>, closed: bool) -> Result<Self, FeatureError> {
        if points.is_empty() {
            return Err(FeatureError::EmptyGeometry);
        }
        if points.len() < 2 {
            return Err(FeatureError::TooFewPoints {
                kind: "polyline",
                required: 2,
                found: points.len(),
            });
        }
        if !points.iter().all(|p| p.is_finite()) {
            return Err(FeatureError::NonFinite);
        }
        Ok(Self { points, closed })
    }

    pub fn points(&self) -> &[DVec3] {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn segments(&self) -> impl Iterator<Item = (DVec3, DVec3)> + '_ {
        let closing = self
            .closed
            .then(|| (self.points[self.points.len() - 1], self.points[0]));
        self.points
            .windows(2)
            .map(|w| (w[0], w[1]))
            .chain(closing)
    }
}

/// Closest point to `p` on the segment `a`-`b`
pub fn closest_point_on_segment(p: DVec3, a: DVec3, b: DVec3) -> DVec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f64::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

impl Feature for CurveFeature {
    fn rank(&self) -> FeatureRank {
        FeatureRank::Curve
    }

    fn closest_point(&self, query: DVec3) -> DVec3 {
        let mut best = self.points[0];
        let mut best_sq = f64::INFINITY;
        for (a, b) in self.segments() {
            let candidate = closest_point_on_segment(query, a, b);
            let d_sq = candidate.distance_squared(query);
            if d_sq < best_sq {
                best_sq = d_sq;
                best = candidate;
            }
        }
        best
    }
}
