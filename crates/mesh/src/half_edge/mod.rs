//! Halfedge mesh data structure for dynamic remeshing
//!
//! Provides topology information (vertex-face adjacency, boundary loops,
//! one-ring circulation) and the local operators a remesher needs, all on
//! top of arenas that tombstone deleted elements and reclaim them in a
//! single compaction pass.

mod compaction;
mod construction;
mod lists;
mod modification;
mod topology;
mod types;
mod validation;

pub use compaction::MeshReindex;
pub use lists::{ElementList, FaceList, HalfedgeList, HeElement, Reindex, VertexList};
pub use types::{Face, FaceId, Halfedge, HalfedgeId, MeshError, Vertex, VertexId};

/// Halfedge mesh data structure
///
/// Every edge is a twin pair of halfedges; boundary halfedges have no face
/// and are linked into boundary loops, so circulation never dead-ends.
#[derive(Debug, Clone, Default)]
pub struct HeMesh {
    pub(crate) vertices: VertexList,
    pub(crate) halfedges: HalfedgeList,
    pub(crate) faces: FaceList,
}
