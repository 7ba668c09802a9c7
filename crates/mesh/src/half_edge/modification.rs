//! Modification methods for HeMesh.
//!
//! Operators never shrink the arenas. Elements they retire are marked
//! unused and stay in place until [`HeMesh::compact`] runs, so handles
//! captured before an operator remain valid (if possibly unused) after it.

use tracing::trace;

use super::types::{Face, FaceId, HalfedgeId, VertexId};
use super::HeMesh;

impl HeMesh {
    /// Split an edge at its midpoint, triangulating the adjacent triangles.
    ///
    /// For edge AB shared by triangles ABC and BAD this creates vertex M and
    /// triangles AMC, MBC, MAD and BMD. A boundary side is left as a
    /// boundary. Non-triangular sides keep M as an extra polygon corner.
    ///
    /// ```text
    ///        C                    C
    ///       / \                  /|\
    ///      /   \                / | \
    ///     A-----B      ->      A--M--B
    ///      \   /                \ | /
    ///       \ /                  \|/
    ///        D                    D
    /// ```
    ///
    /// Returns the new vertex, or `None` if the halfedge is unused.
    pub fn split_edge(&mut self, he: HalfedgeId) -> Option<VertexId> {
        let mid = self.edge_midpoint(he);
        self.split_edge_at(he, mid)
    }

    /// Split an edge at the given position. See [`HeMesh::split_edge`].
    pub fn split_edge_at(&mut self, he: HalfedgeId, position: glam::DVec3) -> Option<VertexId> {
        if self.halfedges[he].unused {
            return None;
        }
        trace!("split_edge: START he={:?}", he);

        // ===== PHASE 1: GATHER =====
        let t = he.twin();
        let v_b = self.halfedges[t].start;
        let h1 = self.halfedges[he].next;
        let tp = self.halfedges[t].prev;

        // ===== PHASE 2: CREATE VERTEX AND PAIR =====
        let v_m = self.add_vertex(position);
        let n = self.halfedges.add_pair(v_m, v_b); // M -> B, twin B -> M
        let nt = n.twin();

        // ===== PHASE 3: SPLICE =====
        // he keeps A -> M; n continues to B on the same side
        self.halfedges[he].next = n;
        self.halfedges[n].prev = he;
        self.halfedges[n].next = h1;
        self.halfedges[h1].prev = n;
        self.halfedges[n].face = self.halfedges[he].face;

        // t becomes M -> A; nt covers B -> M before it
        self.halfedges[t].start = v_m;
        self.halfedges[tp].next = nt;
        self.halfedges[nt].prev = tp;
        self.halfedges[nt].next = t;
        self.halfedges[t].prev = nt;
        self.halfedges[nt].face = self.halfedges[t].face;

        if self.vertices[v_b].first == Some(t) {
            self.vertices[v_b].first = Some(nt);
        }

        // ===== PHASE 4: TRIANGULATE =====
        // he and nt both end at M; cutting after each of them adds the
        // diagonal from M to the opposite corner.
        for side in [he, nt] {
            if let Some(face) = self.halfedges[side].face {
                if self.face_halfedges(face).len() == 4 {
                    self.cut_corner(side, face);
                }
            }
        }

        // Boundary vertices keep a boundary halfedge as first
        self.vertices[v_m].first = Some(if self.halfedges[t].face.is_none() { t } else { n });

        trace!("split_edge: END created vertex {:?}", v_m);
        Some(v_m)
    }

    /// Split the quad `he -> a -> b -> c` along the diagonal from end(he)
    /// to start(c), leaving `he` in the original face with a new face for
    /// the remaining triangle.
    ///
    /// ```text
    ///   start(c) ---- start(b)
    ///      |  \  new    |
    ///      |    \       |
    ///      |  old \     |
    ///   start(he) - start(a)
    /// ```
    fn cut_corner(&mut self, he: HalfedgeId, face: FaceId) {
        let a = self.halfedges[he].next;
        let b = self.halfedges[a].next;
        let c = self.halfedges[b].next;

        let corner = self.halfedges[a].start;
        let apex = self.halfedges[c].start;

        // d0: apex -> corner (new face), d1: corner -> apex (old face)
        let d0 = self.halfedges.add_pair(apex, corner);
        let d1 = d0.twin();

        let new_face = FaceId(self.faces.len() as u32);
        self.faces.push(Face::new(new_face, a));

        // Old face: he -> d1 -> c
        self.link(he, d1);
        self.link(d1, c);
        self.link(c, he);
        self.halfedges[d1].face = Some(face);
        self.faces[face].first = he;

        // New face: a -> b -> d0
        self.link(b, d0);
        self.link(d0, a);
        for id in [a, b, d0] {
            self.halfedges[id].face = Some(new_face);
        }
    }

    fn link(&mut self, from: HalfedgeId, to: HalfedgeId) {
        self.halfedges[from].next = to;
        self.halfedges[to].prev = from;
    }

    /// Flip an edge by swapping the diagonal of the two adjacent triangles.
    ///
    /// For an edge AB shared by triangles ABC and BAD, flipping creates
    /// triangles DCA and CDB (swapping the shared edge from AB to CD).
    ///
    /// # Returns
    /// - `true` if the edge was flipped
    /// - `false` for boundary edges, non-triangular neighbours, or when CD
    ///   already exists (the flip would create a duplicate edge)
    pub fn flip_edge(&mut self, he: HalfedgeId) -> bool {
        // ===== PHASE 1: GATHER (read-only, fail early) =====
        if self.halfedges[he].unused {
            return false;
        }
        let t = he.twin();
        let (Some(face1), Some(face2)) = (self.halfedges[he].face, self.halfedges[t].face) else {
            return false;
        };
        if self.face_halfedges(face1).len() != 3 || self.face_halfedges(face2).len() != 3 {
            return false;
        }

        let h1 = self.halfedges[he].next; // B -> C
        let h2 = self.halfedges[h1].next; // C -> A
        let t1 = self.halfedges[t].next; // A -> D
        let t2 = self.halfedges[t1].next; // D -> B

        let v_a = self.halfedges[he].start;
        let v_b = self.halfedges[t].start;
        let v_c = self.halfedges[h2].start;
        let v_d = self.halfedges[t2].start;

        // ===== PHASE 2: VALIDATE =====
        if v_c == v_d || self.find_halfedge(v_c, v_d).is_some() {
            trace!(
                "flip_edge: ABORT - edge ({:?}, {:?}) already exists",
                v_c, v_d
            );
            return false;
        }

        // ===== PHASE 3: REWIRE =====
        // he becomes D -> C in face1: he -> h2 -> t1
        self.halfedges[he].start = v_d;
        self.link(he, h2);
        self.link(h2, t1);
        self.link(t1, he);
        self.halfedges[t1].face = Some(face1);

        // t becomes C -> D in face2: t -> t2 -> h1
        self.halfedges[t].start = v_c;
        self.link(t, t2);
        self.link(t2, h1);
        self.link(h1, t);
        self.halfedges[h1].face = Some(face2);

        self.faces[face1].first = he;
        self.faces[face2].first = t;

        // ===== PHASE 4: UPDATE VERTEX FIRSTS =====
        if self.vertices[v_a].first == Some(he) {
            self.vertices[v_a].first = Some(t1);
        }
        if self.vertices[v_b].first == Some(t) {
            self.vertices[v_b].first = Some(h1);
        }

        true
    }

    /// Collapse an edge, merging its end vertex into its start vertex.
    ///
    /// The surviving vertex moves to the edge midpoint, unless exactly one
    /// endpoint is on the boundary, in which case the boundary endpoint
    /// survives in place. The two adjacent triangles, three edges and the
    /// absorbed vertex are marked unused.
    ///
    /// Refused (returns `None`) when:
    /// - the edge itself is on the boundary or both endpoints are
    /// - either adjacent face is not a triangle
    /// - the link condition fails (endpoints share a neighbour other than
    ///   the two opposite corners)
    /// - an opposite corner would drop below valence 3 (2 on the boundary)
    ///
    /// Returns the surviving vertex.
    pub fn collapse_edge(&mut self, he: HalfedgeId) -> Option<VertexId> {
        // ===== PHASE 1: GATHER (read-only, fail early) =====
        if self.halfedges[he].unused || self.is_boundary_edge(he) {
            return None;
        }
        let t = he.twin();
        let v_a = self.halfedges[he].start;
        let v_b = self.halfedges[t].start;

        let a_boundary = self.is_boundary_vertex(v_a);
        let b_boundary = self.is_boundary_vertex(v_b);
        if a_boundary && b_boundary {
            trace!("collapse_edge: ABORT - both endpoints on boundary");
            return None;
        }
        if b_boundary {
            return self.collapse_edge(t);
        }

        let face1 = self.halfedges[he].face?;
        let face2 = self.halfedges[t].face?;
        if self.face_halfedges(face1).len() != 3 || self.face_halfedges(face2).len() != 3 {
            return None;
        }

        let h1 = self.halfedges[he].next; // B -> C
        let h2 = self.halfedges[h1].next; // C -> A
        let t1 = self.halfedges[t].next; // A -> D
        let t2 = self.halfedges[t1].next; // D -> B
        let v_c = self.halfedges[h2].start;
        let v_d = self.halfedges[t2].start;

        // ===== PHASE 2: VALIDATE =====
        let ring_a = self.vertex_neighbors(v_a);
        let ring_b = self.vertex_neighbors(v_b);
        let shared = ring_a.iter().filter(|v| ring_b.contains(v)).count();
        if shared != 2 {
            trace!(
                "collapse_edge: ABORT - link condition ({} shared neighbours)",
                shared
            );
            return None;
        }
        for corner in [v_c, v_d] {
            let min_valence = if self.is_boundary_vertex(corner) { 2 } else { 3 };
            if self.valence(corner) <= min_valence {
                trace!(
                    "collapse_edge: ABORT - corner {:?} valence too low",
                    corner
                );
                return None;
            }
        }

        let b_outgoing = self.outgoing_halfedges(v_b);
        let target = if a_boundary {
            self.position(v_a)
        } else {
            self.edge_midpoint(he)
        };

        // ===== PHASE 3: REWIRE =====
        // h2 (C -> A) takes the place of twin(h1) (C -> B)
        self.replace_halfedge(h1.twin(), h2);
        // t1 (A -> D) takes the place of twin(t2) (B -> D)
        self.replace_halfedge(t2.twin(), t1);

        for out in b_outgoing {
            self.halfedges[out].start = v_a;
        }

        // ===== PHASE 4: RETIRE =====
        self.halfedges.remove_pair(he);
        self.halfedges.remove_pair(h1);
        self.halfedges.remove_pair(t2);
        self.faces.remove(face1.index());
        self.faces.remove(face2.index());
        self.vertices.remove(v_b.index());

        // ===== PHASE 5: UPDATE VERTEX FIRSTS =====
        self.vertices[v_a].position = target;
        self.reset_vertex_first(v_a, h2.twin());
        self.reset_vertex_first(v_c, h2);
        self.reset_vertex_first(v_d, t1.twin());

        trace!("collapse_edge: END merged {:?} into {:?}", v_b, v_a);
        Some(v_a)
    }

    /// Put `keep` into the face loop position held by `old`.
    fn replace_halfedge(&mut self, old: HalfedgeId, keep: HalfedgeId) {
        let face = self.halfedges[old].face;
        let next = self.halfedges[old].next;
        let prev = self.halfedges[old].prev;

        self.halfedges[keep].face = face;
        self.link(prev, keep);
        self.link(keep, next);

        if let Some(face) = face {
            if self.faces[face].first == old {
                self.faces[face].first = keep;
            }
        }
    }

    /// Point a vertex's first at one of its outgoing halfedges, preferring
    /// a boundary halfedge. `seed` must leave the vertex.
    fn reset_vertex_first(&mut self, vertex: VertexId, seed: HalfedgeId) {
        self.vertices[vertex].first = Some(seed);
        let boundary = self
            .outgoing_halfedges(vertex)
            .into_iter()
            .find(|&he| self.halfedges[he].face.is_none());
        if let Some(he) = boundary {
            self.vertices[vertex].first = Some(he);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;
    use crate::half_edge::fixtures::*;

    fn used_faces(mesh: &HeMesh) -> usize {
        mesh.faces().iter().filter(|f| !f.is_unused()).count()
    }

    #[test]
    fn test_split_edge_increases_face_count() {
        let mut mesh = create_bowtie_mesh();
        let he = mesh.find_halfedge(VertexId(0), VertexId(1)).unwrap();

        let mid = mesh.split_edge(he).unwrap();

        assert_eq!(mid, VertexId(4));
        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.face_count(), 4);
        assert_eq!(mesh.valence(mid), 4);
        assert!(mesh.validate().is_ok(), "{:?}", mesh.validate());
    }

    #[test]
    fn test_split_edge_midpoint_position() {
        let mut mesh = create_bowtie_mesh();
        let he = mesh.find_halfedge(VertexId(0), VertexId(1)).unwrap();

        let mid = mesh.split_edge(he).unwrap();

        assert!((mesh.position(mid) - DVec3::ZERO).length() < 1e-12);
    }

    #[test]
    fn test_split_edge_all_faces_are_triangles() {
        let mut mesh = create_octahedron();
        let edges: Vec<HalfedgeId> = mesh.edges().collect();
        for he in edges {
            mesh.split_edge(he);
        }

        assert!(mesh.validate().is_ok(), "{:?}", mesh.validate());
        for i in 0..mesh.face_count() {
            assert_eq!(mesh.face_vertices(FaceId(i as u32)).len(), 3);
        }
        // Octahedron has 12 edges: each split adds a vertex and two faces
        assert_eq!(mesh.vertex_count(), 18);
        assert_eq!(mesh.face_count(), 32);
    }

    #[test]
    fn test_split_edge_on_boundary() {
        let mut mesh = create_bowtie_mesh();
        let he = mesh.find_halfedge(VertexId(1), VertexId(2)).unwrap();

        let mid = mesh.split_edge(he).unwrap();

        assert_eq!(mesh.face_count(), 3);
        assert!(mesh.is_boundary_vertex(mid));
        assert!(mesh.is_boundary_vertex(VertexId(2)));
        assert!(mesh.validate().is_ok(), "{:?}", mesh.validate());
    }

    #[test]
    fn test_split_boundary_halfedge_from_outside() {
        let mut mesh = create_bowtie_mesh();
        let inner = mesh.find_halfedge(VertexId(1), VertexId(2)).unwrap();

        let mid = mesh.split_edge(inner.twin()).unwrap();

        assert_eq!(mesh.face_count(), 3);
        assert!(mesh.is_boundary_vertex(mid));
        assert!(mesh.validate().is_ok(), "{:?}", mesh.validate());
    }

    #[test]
    fn test_flip_edge_swaps_diagonal() {
        let mut mesh = create_bowtie_mesh();
        let he = mesh.find_halfedge(VertexId(0), VertexId(1)).unwrap();

        assert!(mesh.flip_edge(he));

        assert!(mesh.find_halfedge(VertexId(0), VertexId(1)).is_none());
        assert!(mesh.find_halfedge(VertexId(2), VertexId(3)).is_some());
        assert!(mesh.find_halfedge(VertexId(3), VertexId(2)).is_some());
        assert!(mesh.validate().is_ok(), "{:?}", mesh.validate());
    }

    #[test]
    fn test_flip_boundary_edge_refused() {
        let mut mesh = create_bowtie_mesh();
        let he = mesh.find_halfedge(VertexId(1), VertexId(2)).unwrap();
        assert!(!mesh.flip_edge(he));
    }

    #[test]
    fn test_flip_twice_restores_edge() {
        let mut mesh = create_octahedron();
        let he = mesh.find_halfedge(VertexId(0), VertexId(4)).unwrap();

        assert!(mesh.flip_edge(he));
        assert!(mesh.flip_edge(he));

        let ends = [mesh.halfedge(he).start(), mesh.end_vertex(he)];
        assert!(ends.contains(&VertexId(0)) && ends.contains(&VertexId(4)));
        assert!(mesh.validate().is_ok(), "{:?}", mesh.validate());
    }

    #[test]
    fn test_collapse_interior_edge() {
        let mut mesh = create_octahedron();
        let he = mesh.find_halfedge(VertexId(0), VertexId(2)).unwrap();
        // Split first so the opposite corners keep enough valence
        let mid = mesh.split_edge(he).unwrap();
        let he = mesh.find_halfedge(mid, VertexId(2)).unwrap();
        let faces_before = used_faces(&mesh);

        let survivor = mesh.collapse_edge(he).unwrap();

        assert_eq!(survivor, mid);
        assert!(mesh.vertex(VertexId(2)).is_unused());
        assert_eq!(used_faces(&mesh), faces_before - 2);
        assert_eq!(mesh.halfedge_list().count_unused(), 6);
        assert!(mesh.validate().is_ok(), "{:?}", mesh.validate());
    }

    #[test]
    fn test_collapse_refuses_low_valence_corner() {
        let mut mesh = create_octahedron();
        let he = mesh.find_halfedge(VertexId(0), VertexId(2)).unwrap();
        // Opposite corners 4 and 5 have valence 4 and would drop to 3,
        // which is allowed; collapsing again around them is not.
        assert!(mesh.collapse_edge(he).is_some());
        assert!(mesh.validate().is_ok(), "{:?}", mesh.validate());

        let he = mesh.find_halfedge(VertexId(0), VertexId(1)).unwrap();
        assert!(mesh.collapse_edge(he).is_none());
    }

    #[test]
    fn test_collapse_boundary_edge_refused() {
        let mut mesh = create_hex_fan();
        let he = mesh.find_halfedge(VertexId(1), VertexId(2)).unwrap();
        assert!(mesh.collapse_edge(he).is_none());
    }

    #[test]
    fn test_collapse_keeps_boundary_endpoint_in_place() {
        let mut mesh = create_hex_fan();
        let he = mesh.find_halfedge(VertexId(0), VertexId(2)).unwrap();
        let rim = mesh.position(VertexId(2));

        // Centre is interior, rim vertex is on the boundary: the rim survives
        let survivor = mesh.collapse_edge(he).unwrap();

        assert_eq!(survivor, VertexId(2));
        assert!((mesh.position(survivor) - rim).length() < 1e-12);
        assert!(mesh.vertex(VertexId(0)).is_unused());
        assert!(mesh.is_boundary_vertex(survivor));
        assert_eq!(mesh.valence(survivor), 5);
        assert_eq!(used_faces(&mesh), 4);
        assert!(mesh.validate().is_ok(), "{:?}", mesh.validate());
    }
}
