use std::sync::Arc;

use glam::DVec3;

use super::{Constraint, Energy};
use crate::body::Body;
use crate::error::{check_arity, check_weight, DynamicsError};
use crate::feature::Feature;

/// Pulls a body toward the closest point on a feature.
///
/// Features are shared, so many constraints can target the same surface
/// without copying it.
#[derive(Debug, Clone)]
pub struct OnFeature {
    index: usize,
    feature: Arc<dyn Feature>,
    weight: f64,
    delta: DVec3,
}

impl OnFeature {
    pub fn new(index: usize, feature: Arc<dyn Feature>, weight: f64) -> Result<Self, DynamicsError> {
        Ok(Self {
            index,
            feature,
            weight: check_weight(weight)?,
            delta: DVec3::ZERO,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn feature(&self) -> &Arc<dyn Feature> {
        &self.feature
    }

    pub fn delta(&self) -> DVec3 {
        self.delta
    }

    pub fn set_feature(&mut self, feature: Arc<dyn Feature>) {
        self.feature = feature;
    }

    pub fn set_weight(&mut self, weight: f64) -> Result<(), DynamicsError> {
        self.weight = check_weight(weight)?;
        Ok(())
    }
}

impl Constraint for OnFeature {
    fn calculate(&mut self, bodies: &[Body]) {
        let p = bodies[self.index].position.current;
        self.delta = self.feature.closest_point(p) - p;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::test_util::bodies;
    use crate::feature::FeatureRank;

    /// Unit sphere at the origin
    #[derive(Debug)]
    struct Sphere;

    impl Feature for Sphere {
        fn rank(&self) -> FeatureRank {
            FeatureRank::Surface
        }

        fn closest_point(&self, query: DVec3) -> DVec3 {
            query.try_normalize().unwrap_or(DVec3::X)
        }
    }

    #[test]
    fn test_pulls_to_closest_point() {
        let mut bodies = bodies(&[DVec3::new(0.0, 3.0, 0.0)]);
        let mut c = OnFeature::new(0, Arc::new(Sphere), 1.0).unwrap();

        c.calculate(&bodies);
        assert!((c.delta() - DVec3::new(0.0, -2.0, 0.0)).length() < 1e-12);
        assert!((c.energy().linear - 2.0).abs() < 1e-12);

        c.apply(&mut bodies);
        bodies[0].integrate(false);
        assert!((bodies[0].current_position() - DVec3::Y).length() < 1e-12);
    }

    #[test]
    fn test_shared_feature() {
        let sphere: Arc<dyn Feature> = Arc::new(Sphere);
        let a = OnFeature::new(0, sphere.clone(), 1.0).unwrap();
        let b = OnFeature::new(1, sphere.clone(), 2.0).unwrap();

        assert_eq!(Arc::strong_count(&sphere), 3);
        assert_eq!(a.feature().rank(), b.feature().rank());
    }
}
