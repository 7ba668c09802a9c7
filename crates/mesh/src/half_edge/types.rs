//! Type definitions for the halfedge mesh data structure.

use glam::DVec3;

/// Type-safe vertex identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u32);

/// Type-safe halfedge identifier
///
/// Halfedges are allocated in twin pairs: ids `2k` and `2k + 1` are always
/// twins, so the twin of any halfedge is found by flipping the lowest bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HalfedgeId(pub u32);

/// Type-safe face identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(pub u32);

impl VertexId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl FaceId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl HalfedgeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// The oppositely directed partner of this halfedge
    pub fn twin(self) -> HalfedgeId {
        HalfedgeId(self.0 ^ 1)
    }

    /// True for the even member of a pair
    pub fn is_leader(self) -> bool {
        self.0 & 1 == 0
    }

    /// The even member of this halfedge's pair
    pub fn leader(self) -> HalfedgeId {
        HalfedgeId(self.0 & !1)
    }
}

/// A vertex in the halfedge mesh
#[derive(Debug, Clone)]
pub struct Vertex {
    pub(crate) index: VertexId,
    pub position: DVec3,
    /// One outgoing halfedge; the boundary one if the vertex is on a boundary
    pub(crate) first: Option<HalfedgeId>,
    pub(crate) unused: bool,
}

impl Vertex {
    pub(crate) fn new(index: VertexId, position: DVec3) -> Self {
        Self {
            index,
            position,
            first: None,
            unused: false,
        }
    }

    pub fn index(&self) -> VertexId {
        self.index
    }

    pub fn first(&self) -> Option<HalfedgeId> {
        self.first
    }

    pub fn is_unused(&self) -> bool {
        self.unused
    }
}

/// A directed halfedge
///
/// The twin is implied by position (see [`HalfedgeId::twin`]). The unused
/// flag only changes through pair operations on [`super::HalfedgeList`], so
/// both members of a pair always agree on it.
#[derive(Debug, Clone)]
pub struct Halfedge {
    pub(crate) index: HalfedgeId,
    /// The vertex this halfedge starts from
    pub(crate) start: VertexId,
    /// The face on the left of this halfedge (None on a boundary)
    pub(crate) face: Option<FaceId>,
    /// The next halfedge around the face (or boundary loop)
    pub(crate) next: HalfedgeId,
    /// The previous halfedge around the face (or boundary loop)
    pub(crate) prev: HalfedgeId,
    pub(crate) unused: bool,
}

impl Halfedge {
    pub fn index(&self) -> HalfedgeId {
        self.index
    }

    pub fn twin(&self) -> HalfedgeId {
        self.index.twin()
    }

    pub fn start(&self) -> VertexId {
        self.start
    }

    pub fn face(&self) -> Option<FaceId> {
        self.face
    }

    pub fn next(&self) -> HalfedgeId {
        self.next
    }

    pub fn prev(&self) -> HalfedgeId {
        self.prev
    }

    pub fn is_unused(&self) -> bool {
        self.unused
    }

    /// True if no face lies on the left of this halfedge
    pub fn is_boundary(&self) -> bool {
        self.face.is_none()
    }
}

/// A face (polygon) in the mesh
#[derive(Debug, Clone)]
pub struct Face {
    pub(crate) index: FaceId,
    /// One halfedge on the boundary of this face
    pub(crate) first: HalfedgeId,
    pub(crate) unused: bool,
}

impl Face {
    pub(crate) fn new(index: FaceId, first: HalfedgeId) -> Self {
        Self {
            index,
            first,
            unused: false,
        }
    }

    pub fn index(&self) -> FaceId {
        self.index
    }

    pub fn first(&self) -> HalfedgeId {
        self.first
    }

    pub fn is_unused(&self) -> bool {
        self.unused
    }
}

/// Errors that can occur while building or checking a halfedge mesh
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("Mesh has no faces")]
    NoFaces,
    #[error("Vertex index {index} out of range (count: {count})")]
    IndexOutOfRange { index: u32, count: usize },
    #[error("Degenerate face {0}: repeated vertex")]
    DegenerateFace(usize),
    #[error("Non-manifold edge ({0}, {1})")]
    NonManifoldEdge(u32, u32),
    #[error("Non-manifold vertex {0}")]
    NonManifoldVertex(u32),
    #[error("Invalid mesh topology: {0}")]
    InvalidTopology(String),
}
