//! Topology query methods for HeMesh.

use glam::DVec3;

use super::lists::{FaceList, HalfedgeList, VertexList};
use super::types::{Face, FaceId, Halfedge, HalfedgeId, Vertex, VertexId};
use super::HeMesh;

impl HeMesh {
    // ========================================================================
    // Accessors
    // ========================================================================

    /// Get vertex by ID (panics when out of range)
    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id]
    }

    /// Get halfedge by ID (panics when out of range)
    pub fn halfedge(&self, id: HalfedgeId) -> &Halfedge {
        &self.halfedges[id]
    }

    /// Get face by ID (panics when out of range)
    pub fn face(&self, id: FaceId) -> &Face {
        &self.faces[id]
    }

    pub fn vertices(&self) -> &[Vertex] {
        self.vertices.as_slice()
    }

    pub fn halfedges(&self) -> &[Halfedge] {
        self.halfedges.as_slice()
    }

    pub fn faces(&self) -> &[Face] {
        self.faces.as_slice()
    }

    pub fn vertex_list(&self) -> &VertexList {
        &self.vertices
    }

    pub fn halfedge_list(&self) -> &HalfedgeList {
        &self.halfedges
    }

    pub fn face_list(&self) -> &FaceList {
        &self.faces
    }

    /// Number of vertices, tombstones included
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of halfedges, tombstones included
    pub fn halfedge_count(&self) -> usize {
        self.halfedges.len()
    }

    /// Number of faces, tombstones included
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn position(&self, id: VertexId) -> DVec3 {
        self.vertices[id].position
    }

    pub fn set_position(&mut self, id: VertexId, position: DVec3) {
        self.vertices[id].position = position;
    }

    /// Positions of all vertices (tombstones included), index-aligned
    pub fn positions(&self) -> Vec<DVec3> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    // ========================================================================
    // Topology Queries
    // ========================================================================

    /// The vertex a halfedge points to
    pub fn end_vertex(&self, he: HalfedgeId) -> VertexId {
        self.halfedges.twin(he).start
    }

    /// Iterate the leaders of all used edges
    pub fn edges(&self) -> impl Iterator<Item = HalfedgeId> + '_ {
        self.halfedges
            .iter()
            .filter(|he| he.index.is_leader() && !he.unused)
            .map(|he| he.index)
    }

    /// All halfedges leaving a vertex, in rotational order.
    ///
    /// Boundary halfedges are included, so a boundary vertex yields its
    /// full fan starting from its boundary halfedge.
    pub fn outgoing_halfedges(&self, vertex_id: VertexId) -> Vec<HalfedgeId> {
        let mut result = Vec::new();
        let Some(start) = self.vertices[vertex_id].first else {
            return result;
        };

        let mut current = start;
        loop {
            result.push(current);
            // twin ends at this vertex; its next leaves it again
            current = self.halfedges.twin(current).next;

            if current == start || result.len() > self.halfedges.len() {
                break;
            }
        }

        result
    }

    /// Vertices connected to a vertex by an edge
    pub fn vertex_neighbors(&self, vertex_id: VertexId) -> Vec<VertexId> {
        self.outgoing_halfedges(vertex_id)
            .into_iter()
            .map(|he| self.end_vertex(he))
            .collect()
    }

    /// Number of edges at a vertex
    pub fn valence(&self, vertex_id: VertexId) -> usize {
        self.outgoing_halfedges(vertex_id).len()
    }

    /// Faces around a vertex
    pub fn vertex_faces(&self, vertex_id: VertexId) -> Vec<FaceId> {
        self.outgoing_halfedges(vertex_id)
            .into_iter()
            .filter_map(|he| self.halfedges[he].face)
            .collect()
    }

    /// The halfedges forming the boundary of a face
    pub fn face_halfedges(&self, face_id: FaceId) -> Vec<HalfedgeId> {
        let start = self.faces[face_id].first;
        let mut result = Vec::with_capacity(3);
        let mut current = start;

        loop {
            result.push(current);
            current = self.halfedges[current].next;

            if current == start || result.len() > self.halfedges.len() {
                break;
            }
        }

        result
    }

    /// The vertices of a face in order
    pub fn face_vertices(&self, face_id: FaceId) -> Vec<VertexId> {
        self.face_halfedges(face_id)
            .into_iter()
            .map(|he| self.halfedges[he].start)
            .collect()
    }

    /// Find the halfedge running `from -> to`
    pub fn find_halfedge(&self, from: VertexId, to: VertexId) -> Option<HalfedgeId> {
        self.outgoing_halfedges(from)
            .into_iter()
            .find(|&he| self.end_vertex(he) == to)
    }

    /// Check if a halfedge lies on the boundary (has no face)
    pub fn is_boundary_halfedge(&self, he: HalfedgeId) -> bool {
        self.halfedges[he].face.is_none()
    }

    /// Check if either side of an edge is on the boundary
    pub fn is_boundary_edge(&self, he: HalfedgeId) -> bool {
        self.is_boundary_halfedge(he) || self.is_boundary_halfedge(he.twin())
    }

    /// Check if a vertex is on the boundary.
    ///
    /// Relies on boundary vertices storing their boundary halfedge as first.
    pub fn is_boundary_vertex(&self, vertex_id: VertexId) -> bool {
        match self.vertices[vertex_id].first {
            Some(he) => self.halfedges[he].face.is_none(),
            None => true, // Isolated vertex
        }
    }

    // ========================================================================
    // Geometry Queries
    // ========================================================================

    /// Vector from start to end of a halfedge
    pub fn halfedge_vector(&self, he: HalfedgeId) -> DVec3 {
        self.position(self.end_vertex(he)) - self.position(self.halfedges[he].start)
    }

    pub fn edge_length(&self, he: HalfedgeId) -> f64 {
        self.halfedge_vector(he).length()
    }

    /// Midpoint of an edge
    pub fn edge_midpoint(&self, he: HalfedgeId) -> DVec3 {
        let start = self.position(self.halfedges[he].start);
        let end = self.position(self.end_vertex(he));
        (start + end) * 0.5
    }

    /// Area-weighted (unnormalized) face normal via Newell's method
    pub fn face_area_normal(&self, face_id: FaceId) -> DVec3 {
        let verts = self.face_vertices(face_id);
        let mut normal = DVec3::ZERO;
        for (i, &v) in verts.iter().enumerate() {
            let a = self.position(v);
            let b = self.position(verts[(i + 1) % verts.len()]);
            normal += a.cross(b);
        }
        normal * 0.5
    }

    pub fn face_normal(&self, face_id: FaceId) -> DVec3 {
        self.face_area_normal(face_id).normalize_or_zero()
    }

    /// Area-weighted average of adjacent face normals
    pub fn vertex_normal(&self, vertex_id: VertexId) -> DVec3 {
        self.vertex_faces(vertex_id)
            .into_iter()
            .map(|f| self.face_area_normal(f))
            .sum::<DVec3>()
            .normalize_or_zero()
    }

    /// Centroid of the one-ring neighbours
    pub fn neighbor_centroid(&self, vertex_id: VertexId) -> Option<DVec3> {
        let neighbors = self.vertex_neighbors(vertex_id);
        if neighbors.is_empty() {
            return None;
        }
        let sum: DVec3 = neighbors.iter().map(|&v| self.position(v)).sum();
        Some(sum / neighbors.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::half_edge::fixtures::*;

    #[test]
    fn test_face_vertices() {
        let mesh = create_bowtie_mesh();
        let verts = mesh.face_vertices(FaceId(0));
        assert_eq!(verts, vec![VertexId(0), VertexId(1), VertexId(2)]);
    }

    #[test]
    fn test_vertex_faces() {
        let mesh = create_bowtie_mesh();
        let mut faces = mesh.vertex_faces(VertexId(0));
        faces.sort();
        assert_eq!(faces, vec![FaceId(0), FaceId(1)]);
        assert_eq!(mesh.vertex_faces(VertexId(2)), vec![FaceId(0)]);
    }

    #[test]
    fn test_interior_vertex_ring() {
        let mesh = create_hex_fan();
        let mut neighbors = mesh.vertex_neighbors(VertexId(0));
        neighbors.sort();
        let expected: Vec<VertexId> = (1..=6).map(VertexId).collect();
        assert_eq!(neighbors, expected);
        assert!(!mesh.is_boundary_vertex(VertexId(0)));
        assert!(mesh.is_boundary_vertex(VertexId(3)));
    }

    #[test]
    fn test_boundary_vertex_ring_includes_both_rim_edges() {
        let mesh = create_hex_fan();
        let mut neighbors = mesh.vertex_neighbors(VertexId(1));
        neighbors.sort();
        assert_eq!(neighbors, vec![VertexId(0), VertexId(2), VertexId(6)]);
        assert_eq!(mesh.valence(VertexId(1)), 3);
    }

    #[test]
    fn test_edges_iterates_leaders() {
        let mesh = create_octahedron();
        assert_eq!(mesh.edges().count(), 12);
        assert!(mesh.edges().all(|he| he.is_leader()));
    }

    #[test]
    fn test_face_normal_points_up() {
        let mesh = create_hex_fan();
        let normal = mesh.face_normal(FaceId(0));
        assert!((normal - DVec3::Z).length() < 1e-12);
        assert!((mesh.vertex_normal(VertexId(0)) - DVec3::Z).length() < 1e-12);
    }

    #[test]
    fn test_find_halfedge_direction() {
        let mesh = create_bowtie_mesh();
        let he = mesh.find_halfedge(VertexId(1), VertexId(2)).unwrap();
        assert_eq!(mesh.halfedge(he).start(), VertexId(1));
        assert_eq!(mesh.end_vertex(he), VertexId(2));
        assert!(mesh.find_halfedge(VertexId(2), VertexId(3)).is_none());
    }
}
