//! SpatialSlur mesh topology
//!
//! This crate provides the halfedge structure used for dynamic remeshing:
//! - [`half_edge::HalfedgeList`] - Twin-paired halfedge arena with tombstones and compaction
//! - [`half_edge::ElementList`] - The same reclamation scheme for vertices and faces
//! - [`half_edge::HeMesh`] - A complete halfedge mesh with split / flip / collapse operators
//!
//! All cross references are typed integer handles. Handles stay stable until
//! the owning list is compacted; compaction returns a [`half_edge::Reindex`]
//! that callers use to remap anything they captured beforehand.

pub mod half_edge;

pub use half_edge::*;
