//! Construction and export methods for HeMesh.

use std::collections::HashMap;

use glam::DVec3;
use tracing::debug;

use super::types::{Face, FaceId, HalfedgeId, MeshError, Vertex, VertexId};
use super::HeMesh;

impl HeMesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a halfedge mesh from an indexed triangle list.
    ///
    /// Twin pairs are matched by vertex pair, boundary halfedges are linked
    /// into loops, and each boundary vertex stores its boundary halfedge as
    /// its first. Fails on out-of-range indices, repeated vertices within a
    /// triangle, directed edges used twice, or pinched vertices whose
    /// incident faces form more than one fan.
    pub fn from_triangles(positions: &[DVec3], triangles: &[[u32; 3]]) -> Result<Self, MeshError> {
        if triangles.is_empty() {
            return Err(MeshError::NoFaces);
        }

        let mut mesh = HeMesh::new();
        for &position in positions {
            mesh.add_vertex(position);
        }

        // Directed vertex pair -> halfedge, filled on pair allocation
        let mut edge_map: HashMap<(u32, u32), HalfedgeId> =
            HashMap::with_capacity(triangles.len() * 3);

        for (face_idx, tri) in triangles.iter().enumerate() {
            for &v in tri {
                if v as usize >= positions.len() {
                    return Err(MeshError::IndexOutOfRange {
                        index: v,
                        count: positions.len(),
                    });
                }
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[2] == tri[0] {
                return Err(MeshError::DegenerateFace(face_idx));
            }

            let face_id = FaceId(mesh.faces.len() as u32);
            let mut loop_hes = [HalfedgeId(0); 3];

            for k in 0..3 {
                let (a, b) = (tri[k], tri[(k + 1) % 3]);
                let he = match edge_map.get(&(a, b)) {
                    Some(&he) => {
                        if mesh.halfedges[he].face.is_some() {
                            return Err(MeshError::NonManifoldEdge(a, b));
                        }
                        he
                    }
                    None => {
                        let he = mesh.halfedges.add_pair(VertexId(a), VertexId(b));
                        edge_map.insert((a, b), he);
                        edge_map.insert((b, a), he.twin());
                        he
                    }
                };
                mesh.halfedges[he].face = Some(face_id);
                loop_hes[k] = he;
            }

            for k in 0..3 {
                let he = loop_hes[k];
                mesh.halfedges[he].next = loop_hes[(k + 1) % 3];
                mesh.halfedges[he].prev = loop_hes[(k + 2) % 3];
                mesh.vertices[mesh.halfedges[he].start].first.get_or_insert(he);
            }

            mesh.faces.push(Face::new(face_id, loop_hes[0]));
        }

        mesh.link_boundary_loops()?;
        mesh.check_single_fans()?;

        debug!(
            "from_triangles: {} vertices, {} halfedges, {} faces",
            mesh.vertices.len(),
            mesh.halfedges.len(),
            mesh.faces.len()
        );
        Ok(mesh)
    }

    /// Link face-less halfedges into boundary loops.
    ///
    /// For each boundary halfedge `b = u -> v`, `b.next` is the unique
    /// boundary halfedge leaving `v`.
    fn link_boundary_loops(&mut self) -> Result<(), MeshError> {
        let mut boundary_out: HashMap<VertexId, HalfedgeId> = HashMap::new();

        for he in self.halfedges.iter() {
            if he.face.is_none() {
                if boundary_out.insert(he.start, he.index).is_some() {
                    return Err(MeshError::NonManifoldVertex(he.start.0));
                }
            }
        }

        for (&start, &he) in &boundary_out {
            let end = self.halfedges.twin(he).start;
            let next = *boundary_out.get(&end).ok_or_else(|| {
                MeshError::InvalidTopology(format!("open boundary at vertex {}", end.0))
            })?;
            self.halfedges[he].next = next;
            self.halfedges[next].prev = he;
            self.vertices[start].first = Some(he);
        }

        Ok(())
    }

    /// Every halfedge leaving a vertex must be reachable by circulating from
    /// its first; otherwise the vertex joins several separate fans.
    fn check_single_fans(&self) -> Result<(), MeshError> {
        let mut outgoing = vec![0usize; self.vertices.len()];
        for he in self.halfedges.iter() {
            outgoing[he.start.index()] += 1;
        }

        for vertex in self.vertices.iter() {
            let ring = self.outgoing_halfedges(vertex.index).len();
            if ring != outgoing[vertex.index.index()] {
                return Err(MeshError::NonManifoldVertex(vertex.index.0));
            }
        }
        Ok(())
    }

    /// Add an isolated vertex to the mesh.
    ///
    /// Returns the ID of the newly created vertex.
    pub fn add_vertex(&mut self, position: DVec3) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(Vertex::new(id, position));
        id
    }

    /// Export used faces as an indexed triangle list.
    ///
    /// Unused and isolated vertices are dropped and indices renumbered.
    /// Polygons with more than three sides are fan-triangulated.
    pub fn to_triangles(&self) -> (Vec<DVec3>, Vec<[u32; 3]>) {
        let mut remap: Vec<Option<u32>> = vec![None; self.vertices.len()];
        let mut positions = Vec::new();
        let mut triangles = Vec::with_capacity(self.faces.len());

        let mut index_of = |v: VertexId, positions: &mut Vec<DVec3>| -> u32 {
            *remap[v.index()].get_or_insert_with(|| {
                positions.push(self.vertices[v].position);
                (positions.len() - 1) as u32
            })
        };

        for face in self.faces.iter().filter(|f| !f.unused) {
            let verts = self.face_vertices(face.index);
            let anchor = index_of(verts[0], &mut positions);
            for pair in verts[1..].windows(2) {
                let b = index_of(pair[0], &mut positions);
                let c = index_of(pair[1], &mut positions);
                triangles.push([anchor, b, c]);
            }
        }

        (positions, triangles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::half_edge::fixtures::*;

    #[test]
    fn test_from_triangles_single_triangle() {
        let positions = [DVec3::ZERO, DVec3::X, DVec3::Y];
        let mesh = HeMesh::from_triangles(&positions, &[[0, 1, 2]]).unwrap();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.halfedge_count(), 6);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_boundary_vertices_store_boundary_first() {
        let mesh = create_bowtie_mesh();
        for vertex in mesh.vertices() {
            let first = vertex.first().unwrap();
            assert!(mesh.halfedge(first).is_boundary());
        }
    }

    #[test]
    fn test_shared_edge_is_one_pair() {
        let mesh = create_bowtie_mesh();
        // 5 distinct edges
        assert_eq!(mesh.halfedge_count(), 10);
        let he = mesh.find_halfedge(VertexId(0), VertexId(1)).unwrap();
        let twin = mesh.find_halfedge(VertexId(1), VertexId(0)).unwrap();
        assert_eq!(he.twin(), twin);
        assert!(mesh.halfedge(he).face().is_some());
        assert!(mesh.halfedge(twin).face().is_some());
    }

    #[test]
    fn test_rejects_duplicate_directed_edge() {
        let positions = [DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::Z];
        let result = HeMesh::from_triangles(&positions, &[[0, 1, 2], [0, 1, 3]]);
        assert!(matches!(result, Err(MeshError::NonManifoldEdge(0, 1))));
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let positions = [DVec3::ZERO, DVec3::X, DVec3::Y];
        let result = HeMesh::from_triangles(&positions, &[[0, 1, 7]]);
        assert!(matches!(result, Err(MeshError::IndexOutOfRange { index: 7, .. })));
    }

    /// Consistently oriented faces of the tetrahedron abcd
    fn tetrahedron(a: u32, b: u32, c: u32, d: u32) -> [[u32; 3]; 4] {
        [[a, c, b], [a, b, d], [a, d, c], [b, c, d]]
    }

    #[test]
    fn test_rejects_vertex_shared_by_two_closed_fans() {
        let positions: Vec<DVec3> = (0..7).map(|i| DVec3::new(i as f64, (i * i) as f64, 0.0)).collect();
        let mut triangles = tetrahedron(0, 1, 2, 3).to_vec();
        triangles.extend(tetrahedron(0, 4, 5, 6));

        let result = HeMesh::from_triangles(&positions, &triangles);
        assert!(matches!(result, Err(MeshError::NonManifoldVertex(0))));
    }

    #[test]
    fn test_rejects_closed_fan_touching_open_fan() {
        let positions: Vec<DVec3> = (0..6).map(|i| DVec3::new(i as f64, (i * i) as f64, 0.0)).collect();
        let mut triangles = tetrahedron(0, 1, 2, 3).to_vec();
        triangles.push([0, 4, 5]);

        let result = HeMesh::from_triangles(&positions, &triangles);
        assert!(matches!(result, Err(MeshError::NonManifoldVertex(0))));
    }

    #[test]
    fn test_to_triangles_roundtrip() {
        let mesh = create_octahedron();
        let (positions, triangles) = mesh.to_triangles();
        assert_eq!(positions.len(), 6);
        assert_eq!(triangles.len(), 8);

        let rebuilt = HeMesh::from_triangles(&positions, &triangles).unwrap();
        assert_eq!(rebuilt.halfedge_count(), mesh.halfedge_count());
        assert!(rebuilt.validate().is_ok());
    }
}
