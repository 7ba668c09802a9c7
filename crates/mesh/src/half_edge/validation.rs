//! Validation methods for HeMesh.
//!
//! Checks the invariants the operators rely on:
//! - next/prev reciprocity and endpoint continuity along loops
//! - face loops closed, at least 3 long, and consistently labelled
//! - vertex firsts leave their vertex, with boundary vertices on the boundary
//!
//! Unused elements are skipped, but no used element may reference one.

use super::types::{FaceId, MeshError};
use super::HeMesh;

impl HeMesh {
    /// Validate the mesh topology.
    pub fn validate(&self) -> Result<(), MeshError> {
        self.validate_halfedges()?;
        self.validate_faces()?;
        self.validate_vertices()
    }

    fn validate_halfedges(&self) -> Result<(), MeshError> {
        let count = self.halfedges.len();
        if count % 2 != 0 {
            return Err(MeshError::InvalidTopology(format!(
                "odd halfedge count {}",
                count
            )));
        }

        for he in self.halfedges.iter() {
            let twin = &self.halfedges[he.twin()];
            if he.unused != twin.unused {
                return Err(MeshError::InvalidTopology(format!(
                    "Halfedge {:?}: twin {:?} disagrees on unused",
                    he.index, twin.index
                )));
            }
            if he.unused {
                continue;
            }

            for (label, link) in [("next", he.next), ("prev", he.prev)] {
                if link.index() >= count {
                    return Err(MeshError::InvalidTopology(format!(
                        "Halfedge {:?}: {} {:?} out of range",
                        he.index, label, link
                    )));
                }
                if self.halfedges[link].unused {
                    return Err(MeshError::InvalidTopology(format!(
                        "Halfedge {:?}: {} {:?} is unused",
                        he.index, label, link
                    )));
                }
            }

            let next = &self.halfedges[he.next];
            if next.prev != he.index {
                return Err(MeshError::InvalidTopology(format!(
                    "Halfedge {:?}: next.prev = {:?}, expected {:?}",
                    he.index, next.prev, he.index
                )));
            }
            if self.halfedges[he.prev].next != he.index {
                return Err(MeshError::InvalidTopology(format!(
                    "Halfedge {:?}: prev.next = {:?}, expected {:?}",
                    he.index, self.halfedges[he.prev].next, he.index
                )));
            }
            if next.start != twin.start {
                return Err(MeshError::InvalidTopology(format!(
                    "Halfedge {:?}: ends at {:?} but next starts at {:?}",
                    he.index, twin.start, next.start
                )));
            }
            if next.face != he.face {
                return Err(MeshError::InvalidTopology(format!(
                    "Halfedge {:?}: face {:?} differs from next's {:?}",
                    he.index, he.face, next.face
                )));
            }
            if he.start == twin.start {
                return Err(MeshError::InvalidTopology(format!(
                    "Halfedge {:?}: loop edge at {:?}",
                    he.index, he.start
                )));
            }

            if he.start.index() >= self.vertices.len() || self.vertices[he.start].unused {
                return Err(MeshError::InvalidTopology(format!(
                    "Halfedge {:?}: start {:?} missing or unused",
                    he.index, he.start
                )));
            }
            if let Some(face) = he.face {
                if face.index() >= self.faces.len() || self.faces[face].unused {
                    return Err(MeshError::InvalidTopology(format!(
                        "Halfedge {:?}: face {:?} missing or unused",
                        he.index, face
                    )));
                }
            }
        }

        Ok(())
    }

    fn validate_faces(&self) -> Result<(), MeshError> {
        for face in self.faces.iter().filter(|f| !f.unused) {
            let start = face.first;
            if start.index() >= self.halfedges.len() || self.halfedges[start].unused {
                return Err(MeshError::InvalidTopology(format!(
                    "Face {:?}: first {:?} missing or unused",
                    face.index, start
                )));
            }

            let mut current = start;
            let mut count = 0;
            loop {
                let he = &self.halfedges[current];
                if he.face != Some(face.index) {
                    return Err(MeshError::InvalidTopology(format!(
                        "Face {:?}: halfedge {:?} belongs to {:?}",
                        face.index, current, he.face
                    )));
                }

                current = he.next;
                count += 1;

                if count > self.halfedges.len() {
                    return Err(MeshError::InvalidTopology(format!(
                        "Face {:?}: loop does not close",
                        face.index
                    )));
                }
                if current == start {
                    break;
                }
            }

            if count < 3 {
                return Err(MeshError::InvalidTopology(format!(
                    "Face {:?}: only {} edges",
                    face.index, count
                )));
            }
        }

        Ok(())
    }

    fn validate_vertices(&self) -> Result<(), MeshError> {
        for vertex in self.vertices.iter().filter(|v| !v.unused) {
            let Some(first) = vertex.first else {
                continue; // Isolated vertex
            };
            if first.index() >= self.halfedges.len() || self.halfedges[first].unused {
                return Err(MeshError::InvalidTopology(format!(
                    "Vertex {:?}: first {:?} missing or unused",
                    vertex.index, first
                )));
            }
            if self.halfedges[first].start != vertex.index {
                return Err(MeshError::InvalidTopology(format!(
                    "Vertex {:?}: first {:?} starts at {:?}",
                    vertex.index, first, self.halfedges[first].start
                )));
            }

            let ring = self.outgoing_halfedges(vertex.index);
            if ring.iter().any(|&he| self.halfedges[he].start != vertex.index) {
                return Err(MeshError::InvalidTopology(format!(
                    "Vertex {:?}: ring does not close",
                    vertex.index
                )));
            }

            let boundary_count = ring
                .iter()
                .filter(|&&he| self.halfedges[he].face.is_none())
                .count();
            if boundary_count > 1 {
                return Err(MeshError::NonManifoldVertex(vertex.index.0));
            }
            if boundary_count == 1 && self.halfedges[first].face.is_some() {
                return Err(MeshError::InvalidTopology(format!(
                    "Vertex {:?}: on the boundary but first {:?} is interior",
                    vertex.index, first
                )));
            }
        }

        // Every used outgoing halfedge must be reachable from its start's first
        let mut reached = vec![false; self.halfedges.len()];
        for vertex in self.vertices.iter().filter(|v| !v.unused) {
            for he in self.outgoing_halfedges(vertex.index) {
                reached[he.index()] = true;
            }
        }
        if let Some(he) = self
            .halfedges
            .iter()
            .find(|he| !he.unused && !reached[he.index.index()])
        {
            return Err(MeshError::InvalidTopology(format!(
                "Halfedge {:?}: not in the ring of {:?}",
                he.index, he.start
            )));
        }

        Ok(())
    }

    /// Whether a face is used and bounded by exactly three halfedges
    pub fn is_triangle(&self, face: FaceId) -> bool {
        !self.faces[face].unused && self.face_halfedges(face).len() == 3
    }

    /// Count of used vertices with no incident edges
    pub fn isolated_vertex_count(&self) -> usize {
        self.vertices
            .iter()
            .filter(|v| !v.unused && v.first.is_none())
            .count()
    }
}
