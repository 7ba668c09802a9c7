//! SpatialSlur tools
//!
//! Builds on the mesh and dynamics crates:
//! - [`features`] - Point, polyline and mesh closest-point targets, and the
//!   [`create_feature`] factory that classifies raw geometry
//! - [`spatial`] - Triangle octree backing mesh feature queries
//! - [`remesh`] - Dynamic remeshing: split / collapse / flip, then relax
//!   the vertices with the constraint solver

pub mod error;
pub mod features;
pub mod remesh;
pub mod spatial;

pub use error::{FeatureError, RemeshError};
pub use features::{
    create_feature, CurveFeature, Geometry, MeshFeature, PointFeature, TriangleMesh,
};
pub use remesh::{DynamicRemesher, RemeshReport};
