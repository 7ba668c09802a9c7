//! Closest-point features and the geometry classifier that builds them.
//!
//! Features copy their source geometry. Changing the source afterwards has
//! no effect on a feature; build a new one instead.

mod curve;
mod mesh;
mod point;

use std::sync::Arc;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use slur_dynamics::Feature;
use slur_mesh::HeMesh;
use tracing::debug;

use crate::error::FeatureError;

pub use curve::{closest_point_on_segment, CurveFeature};
pub use mesh::{closest_point_on_triangle, MeshFeature};
pub use point::PointFeature;

/// An indexed triangle list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub positions: Vec<DVec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl From<&HeMesh> for TriangleMesh {
    fn from(mesh: &HeMesh) -> Self {
        let (positions, triangles) = mesh.to_triangles();
        Self {
            positions,
            triangles,
        }
    }
}

/// Raw geometry handed in by a caller.
///
/// Only points, polylines and meshes map to features; the remaining kinds
/// are recognized so they can be rejected by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Point(DVec3),
    Polyline { points: Vec<DVec3>, closed: bool },
    Mesh(TriangleMesh),
    PointCloud(Vec<DVec3>),
    Plane { origin: DVec3, normal: DVec3 },
}

impl Geometry {
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "point",
            Geometry::Polyline { .. } => "polyline",
            Geometry::Mesh(_) => "mesh",
            Geometry::PointCloud(_) => "point cloud",
            Geometry::Plane { .. } => "plane",
        }
    }
}

impl From<DVec3> for Geometry {
    fn from(point: DVec3) -> Self {
        Geometry::Point(point)
    }
}

impl From<TriangleMesh> for Geometry {
    fn from(mesh: TriangleMesh) -> Self {
        Geometry::Mesh(mesh)
    }
}

impl From<&HeMesh> for Geometry {
    fn from(mesh: &HeMesh) -> Self {
        Geometry::Mesh(mesh.into())
    }
}

/// Classify a geometry and build the matching feature.
pub fn create_feature(geometry: impl Into<Geometry>) -> Result<Arc<dyn Feature>, FeatureError> {
    let geometry = geometry.into();
    let kind = geometry.kind();

    let feature: Arc<dyn Feature> = match geometry {
        Geometry::Point(point) => {
            if !point.is_finite() {
                return Err(FeatureError::NonFinite);
            }
            Arc::new(PointFeature::new(point))
        }
        Geometry::Polyline { points, closed } => Arc::new(CurveFeature::new(points, closed)?),
        Geometry::Mesh(mesh) => Arc::new(MeshFeature::new(mesh)?),
        Geometry::PointCloud(_) | Geometry::Plane { .. } => {
            return Err(FeatureError::UnsupportedGeometry(kind));
        }
    };

    debug!("create_feature: {} -> rank {}", kind, feature.rank().value());
    Ok(feature)
}

#[cfg(test)]
mod tests {
    use slur_dynamics::FeatureRank;

    use super::*;

    #[test]
    fn test_classifies_each_kind() {
        let point = create_feature(DVec3::ONE).unwrap();
        assert_eq!(point.rank(), FeatureRank::Point);

        let curve = create_feature(Geometry::Polyline {
            points: vec![DVec3::ZERO, DVec3::X],
            closed: false,
        })
        .unwrap();
        assert_eq!(curve.rank(), FeatureRank::Curve);

        let positions = [DVec3::ZERO, DVec3::X, DVec3::Y];
        let he_mesh = HeMesh::from_triangles(&positions, &[[0, 1, 2]]).unwrap();
        let surface = create_feature(&he_mesh).unwrap();
        assert_eq!(surface.rank(), FeatureRank::Surface);
        let p = surface.closest_point(DVec3::new(0.2, 0.2, 1.0));
        assert!((p - DVec3::new(0.2, 0.2, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_rejects_unsupported_kinds() {
        let err = create_feature(Geometry::PointCloud(vec![DVec3::ZERO])).unwrap_err();
        assert_eq!(err, FeatureError::UnsupportedGeometry("point cloud"));

        let err = create_feature(Geometry::Plane {
            origin: DVec3::ZERO,
            normal: DVec3::Z,
        })
        .unwrap_err();
        assert_eq!(err, FeatureError::UnsupportedGeometry("plane"));
    }

    #[test]
    fn test_rejects_non_finite_point() {
        let err = create_feature(DVec3::new(f64::INFINITY, 0.0, 0.0)).unwrap_err();
        assert_eq!(err, FeatureError::NonFinite);
    }

    #[test]
    fn test_feature_is_decoupled_from_source() {
        let positions = [DVec3::ZERO, DVec3::X, DVec3::Y];
        let mut he_mesh = HeMesh::from_triangles(&positions, &[[0, 1, 2]]).unwrap();
        let feature = create_feature(&he_mesh).unwrap();

        he_mesh.set_position(slur_mesh::VertexId(0), DVec3::new(0.0, 0.0, 5.0));

        assert!(feature.closest_point(DVec3::ZERO).length() < 1e-12);
    }
}
