//! Reclamation of unused mesh elements.
//!
//! Attribute arrays keyed by vertex, halfedge or face index are owned by the
//! caller. They have to be compacted with the `compact_*_attributes` methods
//! *before* [`HeMesh::compact`], because those replay the deletion state
//! that compaction consumes. Each call site that maintains such arrays is
//! responsible for this ordering.

use tracing::debug;

use super::lists::Reindex;
use super::types::{FaceId, HalfedgeId, VertexId};
use super::HeMesh;

/// Result of mesh compaction - maps old IDs to new IDs.
///
/// Handles captured before compaction are stale afterwards; remap them
/// through these tables or discard them.
#[derive(Debug, Clone)]
pub struct MeshReindex {
    pub vertices: Reindex,
    pub halfedges: Reindex,
    pub faces: Reindex,
}

impl MeshReindex {
    pub fn vertex(&self, old: VertexId) -> Option<VertexId> {
        self.vertices.get(old.index()).map(VertexId)
    }

    pub fn halfedge(&self, old: HalfedgeId) -> Option<HalfedgeId> {
        self.halfedges.get(old.index()).map(HalfedgeId)
    }

    pub fn face(&self, old: FaceId) -> Option<FaceId> {
        self.faces.get(old.index()).map(FaceId)
    }

    pub fn is_identity(&self) -> bool {
        self.vertices.is_identity() && self.halfedges.is_identity() && self.faces.is_identity()
    }
}

impl HeMesh {
    pub fn count_unused_vertices(&self) -> usize {
        self.vertices.count_unused()
    }

    pub fn count_unused_halfedges(&self) -> usize {
        self.halfedges.count_unused()
    }

    pub fn count_unused_faces(&self) -> usize {
        self.faces.count_unused()
    }

    /// Compact a per-vertex attribute array. Call before [`HeMesh::compact`].
    pub fn compact_vertex_attributes<U>(&self, attributes: &mut Vec<U>) {
        self.vertices.compact_attributes(attributes);
    }

    /// Compact a per-halfedge attribute array. Call before [`HeMesh::compact`].
    pub fn compact_halfedge_attributes<U>(&self, attributes: &mut Vec<U>) {
        self.halfedges.compact_attributes(attributes);
    }

    /// Compact a per-face attribute array. Call before [`HeMesh::compact`].
    pub fn compact_face_attributes<U>(&self, attributes: &mut Vec<U>) {
        self.faces.compact_attributes(attributes);
    }

    /// Remove all unused elements and remap every cross reference.
    ///
    /// Element order is preserved within each list and capacities are
    /// unchanged. Compaction runs to completion in one call; there is no
    /// partial state to recover from.
    pub fn compact(&mut self) -> MeshReindex {
        let before = (self.vertices.len(), self.halfedges.len(), self.faces.len());

        if self.vertices.count_unused() == 0
            && self.halfedges.count_unused() == 0
            && self.faces.count_unused() == 0
        {
            return MeshReindex {
                vertices: Reindex::identity(before.0),
                halfedges: Reindex::identity(before.1),
                faces: Reindex::identity(before.2),
            };
        }

        let vertices = self.vertices.compact();
        let halfedges = self.halfedges.compact();
        let faces = self.faces.compact();

        let map_vertex = |id: VertexId| match vertices.get(id.index()) {
            Some(new) => VertexId(new),
            None => panic!("live halfedge starts at reclaimed vertex {:?}", id),
        };
        let map_halfedge = |id: HalfedgeId| match halfedges.get(id.index()) {
            Some(new) => HalfedgeId(new),
            None => panic!("live element references reclaimed halfedge {:?}", id),
        };
        let map_face = |id: FaceId| match faces.get(id.index()) {
            Some(new) => FaceId(new),
            None => panic!("live halfedge references reclaimed face {:?}", id),
        };

        for i in 0..self.halfedges.len() {
            let id = HalfedgeId(i as u32);
            let he = &mut self.halfedges[id];
            he.start = map_vertex(he.start);
            he.face = he.face.map(map_face);
        }

        for i in 0..self.vertices.len() {
            let v = &mut self.vertices[VertexId(i as u32)];
            v.first = v.first.map(map_halfedge);
        }

        for i in 0..self.faces.len() {
            let f = &mut self.faces[FaceId(i as u32)];
            f.first = map_halfedge(f.first);
        }

        debug!(
            "compact: {:?} -> ({}, {}, {}) (vertices, halfedges, faces)",
            before,
            self.vertices.len(),
            self.halfedges.len(),
            self.faces.len()
        );

        MeshReindex {
            vertices,
            halfedges,
            faces,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use glam::DVec3;

    use super::*;
    use crate::half_edge::fixtures::*;

    /// Triangles as sets of rounded positions, independent of indexing.
    fn triangle_set(mesh: &HeMesh) -> HashSet<Vec<[i64; 3]>> {
        let (positions, triangles) = mesh.to_triangles();
        let key = |p: DVec3| [(p.x * 1e6) as i64, (p.y * 1e6) as i64, (p.z * 1e6) as i64];
        triangles
            .iter()
            .map(|t| {
                let mut corners: Vec<[i64; 3]> =
                    t.iter().map(|&i| key(positions[i as usize])).collect();
                corners.sort();
                corners
            })
            .collect()
    }

    #[test]
    fn test_compact_no_dead_elements() {
        let mut mesh = create_bowtie_mesh();
        let counts = (mesh.vertex_count(), mesh.halfedge_count(), mesh.face_count());

        let reindex = mesh.compact();

        assert!(reindex.is_identity());
        assert_eq!(
            (mesh.vertex_count(), mesh.halfedge_count(), mesh.face_count()),
            counts
        );
    }

    #[test]
    fn test_compact_after_collapse() {
        let mut mesh = create_octahedron();
        let he = mesh.find_halfedge(VertexId(0), VertexId(2)).unwrap();
        mesh.collapse_edge(he).unwrap();
        let expected = triangle_set(&mesh);
        let capacity = mesh.halfedge_list().capacity();

        let reindex = mesh.compact();

        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.face_count(), 6);
        assert_eq!(mesh.halfedge_count(), 18);
        assert_eq!(mesh.halfedge_list().capacity(), capacity);
        assert_eq!(mesh.count_unused_halfedges(), 0);
        assert_eq!(reindex.vertex(VertexId(2)), None);
        assert_eq!(reindex.vertex(VertexId(3)), Some(VertexId(2)));
        assert!(mesh.validate().is_ok(), "{:?}", mesh.validate());
        assert_eq!(triangle_set(&mesh), expected);

        for (i, he) in mesh.halfedges().iter().enumerate() {
            assert_eq!(he.index().index(), i);
            assert_eq!(mesh.halfedge(he.twin()).twin(), he.index());
        }
    }

    #[test]
    fn test_attributes_follow_their_elements() {
        let mut mesh = create_octahedron();
        let he = mesh.find_halfedge(VertexId(0), VertexId(2)).unwrap();
        mesh.collapse_edge(he).unwrap();

        // Tag each element with something derivable from the topology
        let mut vertex_tags: Vec<DVec3> = mesh.positions();
        let mut halfedge_tags: Vec<(DVec3, DVec3)> = (0..mesh.halfedge_count())
            .map(|i| {
                let id = HalfedgeId(i as u32);
                let start = mesh.position(mesh.halfedge(id).start());
                (start, mesh.position(mesh.end_vertex(id)))
            })
            .collect();
        let mut face_tags: Vec<FaceId> = mesh.faces().iter().map(|f| f.index()).collect();

        mesh.compact_vertex_attributes(&mut vertex_tags);
        mesh.compact_halfedge_attributes(&mut halfedge_tags);
        mesh.compact_face_attributes(&mut face_tags);
        let reindex = mesh.compact();

        assert_eq!(vertex_tags, mesh.positions());
        assert_eq!(halfedge_tags.len(), mesh.halfedge_count());
        for (i, (start, end)) in halfedge_tags.iter().enumerate() {
            let id = HalfedgeId(i as u32);
            assert_eq!(*start, mesh.position(mesh.halfedge(id).start()));
            assert_eq!(*end, mesh.position(mesh.end_vertex(id)));
        }
        for (new, old) in face_tags.iter().enumerate() {
            assert_eq!(reindex.face(*old), Some(FaceId(new as u32)));
        }
    }
}
