//! Dynamic remeshing against a target feature.
//!
//! Each [`DynamicRemesher::step`] is one pass:
//! 1. split edges longer than the maximum length
//! 2. collapse edges shorter than the minimum length
//! 3. flip edges where that brings vertex valences closer to regular
//! 4. compact the per-vertex attributes, then the mesh
//! 5. rebuild bodies and constraints from the compacted mesh
//! 6. relax with the solver, then write positions back projected onto the
//!    target
//!
//! Per-vertex attributes kept here (`fixed`) are compacted with
//! [`HeMesh::compact_vertex_attributes`] before [`HeMesh::compact`]; any
//! new attribute array must follow the same order.

use std::sync::Arc;

use glam::DVec3;
use slur_config::RemeshConfig;
use slur_dynamics::{Feature, OnFeature, Smooth, SolveReport, Solver};
use slur_mesh::{HalfedgeId, HeMesh, VertexId};
use tracing::{debug, trace};

use crate::error::RemeshError;

/// Split rounds per pass; each round can only halve the longest edges
const MAX_SPLIT_ROUNDS: usize = 8;

/// What one remesh pass did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemeshReport {
    /// Passes run so far, this one included
    pub pass: usize,
    pub splits: usize,
    pub collapses: usize,
    pub flips: usize,
    /// Vertex and face counts after compaction
    pub vertices: usize,
    pub faces: usize,
    pub solve: SolveReport,
}

/// Alternates topology updates with constraint relaxation onto a feature.
#[derive(Debug)]
pub struct DynamicRemesher {
    mesh: HeMesh,
    target: Arc<dyn Feature>,
    config: RemeshConfig,
    /// Index-aligned with the mesh vertices
    fixed: Vec<bool>,
    solver: Solver,
    passes: usize,
}

impl DynamicRemesher {
    pub fn new(mesh: HeMesh, target: Arc<dyn Feature>, config: RemeshConfig) -> Result<Self, RemeshError> {
        config.validate()?;
        let fixed = vec![false; mesh.vertex_count()];
        let solver = Solver::new(config.solver.clone());
        Ok(Self {
            mesh,
            target,
            config,
            fixed,
            solver,
            passes: 0,
        })
    }

    pub fn mesh(&self) -> &HeMesh {
        &self.mesh
    }

    pub fn into_mesh(self) -> HeMesh {
        self.mesh
    }

    pub fn config(&self) -> &RemeshConfig {
        &self.config
    }

    /// Pin a vertex: it is never collapsed away and never moved
    pub fn fix_vertex(&mut self, vertex: VertexId) {
        self.fixed[vertex.index()] = true;
    }

    /// Pin every vertex currently on the boundary
    pub fn fix_boundary(&mut self) {
        for i in 0..self.mesh.vertex_count() {
            let v = VertexId(i as u32);
            if !self.mesh.vertex(v).is_unused() && self.mesh.is_boundary_vertex(v) {
                self.fixed[i] = true;
            }
        }
    }

    pub fn is_fixed(&self, vertex: VertexId) -> bool {
        self.fixed[vertex.index()]
    }

    /// Run one remesh pass.
    pub fn step(&mut self) -> Result<RemeshReport, RemeshError> {
        let splits = self.split_long_edges();
        let collapses = self.collapse_short_edges();
        let flips = self.equalize_valences();

        self.mesh.compact_vertex_attributes(&mut self.fixed);
        self.mesh.compact();

        self.rebuild_solver()?;
        let solve = self
            .solver
            .solve_with_limit(self.config.iterations_per_pass);
        self.write_back_positions();

        self.passes += 1;
        let report = RemeshReport {
            pass: self.passes,
            splits,
            collapses,
            flips,
            vertices: self.mesh.vertex_count(),
            faces: self.mesh.face_count(),
            solve,
        };
        debug!(
            "remesh pass {}: {} splits, {} collapses, {} flips -> {} vertices, {} faces, energy={:.3e}",
            report.pass,
            splits,
            collapses,
            flips,
            report.vertices,
            report.faces,
            solve.energy.total()
        );
        Ok(report)
    }

    /// Split edges above the maximum length, longest first, until none remain
    /// or the round limit is hit.
    pub(crate) fn split_long_edges(&mut self) -> usize {
        let max = self.config.max_length();
        let mut splits = 0;

        for _ in 0..MAX_SPLIT_ROUNDS {
            let mut long: Vec<(HalfedgeId, f64)> = self
                .mesh
                .edges()
                .map(|he| (he, self.mesh.edge_length(he)))
                .filter(|&(_, length)| length > max)
                .collect();
            if long.is_empty() {
                break;
            }
            long.sort_by(|a, b| b.1.total_cmp(&a.1));

            for (he, _) in long {
                if self.mesh.edge_length(he) > max && self.mesh.split_edge(he).is_some() {
                    splits += 1;
                }
            }
        }

        self.fixed.resize(self.mesh.vertex_count(), false);
        splits
    }

    /// Collapse edges below the minimum length, shortest first, when the
    /// merged vertex would not create an edge above the maximum length.
    pub(crate) fn collapse_short_edges(&mut self) -> usize {
        let (min, max) = self.config.length_range;
        let mut short: Vec<(HalfedgeId, f64)> = self
            .mesh
            .edges()
            .map(|he| (he, self.mesh.edge_length(he)))
            .filter(|&(_, length)| length < min)
            .collect();
        short.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut collapses = 0;
        for (he, _) in short {
            if self.mesh.halfedge(he).is_unused() || self.mesh.edge_length(he) >= min {
                continue;
            }
            let a = self.mesh.halfedge(he).start();
            let b = self.mesh.end_vertex(he);
            if self.fixed[a.index()] || self.fixed[b.index()] {
                continue;
            }
            if !self.collapse_keeps_edges_short(a, b, max) {
                trace!("collapse {:?}-{:?} skipped: would stretch neighbours", a, b);
                continue;
            }
            if self.mesh.collapse_edge(he).is_some() {
                collapses += 1;
            }
        }
        collapses
    }

    fn collapse_keeps_edges_short(&self, a: VertexId, b: VertexId, max: f64) -> bool {
        let mesh = &self.mesh;
        let merged = match (mesh.is_boundary_vertex(a), mesh.is_boundary_vertex(b)) {
            (true, false) => mesh.position(a),
            (false, true) => mesh.position(b),
            _ => (mesh.position(a) + mesh.position(b)) * 0.5,
        };
        let max_sq = max * max;
        mesh.vertex_neighbors(a)
            .into_iter()
            .chain(mesh.vertex_neighbors(b))
            .filter(|&v| v != a && v != b)
            .all(|v| mesh.position(v).distance_squared(merged) <= max_sq)
    }

    /// Flip interior edges whose flip lowers the total deviation of the
    /// four diamond vertices from their ideal valence (6 inside, 4 on the
    /// boundary).
    pub(crate) fn equalize_valences(&mut self) -> usize {
        let max = self.config.max_length();
        let edges: Vec<HalfedgeId> = self.mesh.edges().collect();
        let mut flips = 0;

        for he in edges {
            if self.mesh.halfedge(he).is_unused() || self.mesh.is_boundary_edge(he) {
                continue;
            }
            let Some([a, b, c, d]) = self.diamond(he) else {
                continue;
            };

            let deviation = |v: VertexId, change: i32| {
                let target = if self.mesh.is_boundary_vertex(v) { 4 } else { 6 };
                (self.mesh.valence(v) as i32 + change - target).abs()
            };
            let before = deviation(a, 0) + deviation(b, 0) + deviation(c, 0) + deviation(d, 0);
            let after = deviation(a, -1) + deviation(b, -1) + deviation(c, 1) + deviation(d, 1);
            if after >= before {
                continue;
            }

            let (pa, pb, pc, pd) = (
                self.mesh.position(a),
                self.mesh.position(b),
                self.mesh.position(c),
                self.mesh.position(d),
            );
            if pc.distance(pd) > max || !flip_keeps_orientation(pa, pb, pc, pd) {
                continue;
            }
            if self.mesh.flip_edge(he) {
                flips += 1;
            }
        }
        flips
    }

    /// Vertices `[a, b, c, d]` of the two triangles on either side of `he`,
    /// where `he` runs a -> b, c is opposite in its face, d in the twin's.
    fn diamond(&self, he: HalfedgeId) -> Option<[VertexId; 4]> {
        let mesh = &self.mesh;
        let face1 = mesh.halfedge(he).face()?;
        let face2 = mesh.halfedge(he.twin()).face()?;
        if !mesh.is_triangle(face1) || !mesh.is_triangle(face2) {
            return None;
        }
        let a = mesh.halfedge(he).start();
        let b = mesh.end_vertex(he);
        let c = mesh.halfedge(mesh.halfedge(he).prev()).start();
        let d = mesh.halfedge(mesh.halfedge(he.twin()).prev()).start();
        Some([a, b, c, d])
    }

    /// Rebuild bodies from vertex positions and one feature plus one
    /// smoothing constraint per free vertex.
    ///
    /// Interior vertices smooth tangentially over their one-ring. Boundary
    /// vertices only smooth toward their two boundary neighbours so the
    /// boundary does not shrink inward.
    fn rebuild_solver(&mut self) -> Result<(), RemeshError> {
        self.solver.clear_bodies();
        self.solver.add_bodies(self.mesh.positions());

        for i in 0..self.mesh.vertex_count() {
            let v = VertexId(i as u32);
            let Some(first) = self.mesh.vertex(v).first() else {
                continue;
            };
            if self.fixed[i] {
                continue;
            }

            let smooth = if self.mesh.is_boundary_vertex(v) {
                let next = self.mesh.end_vertex(first);
                let prev = self.mesh.halfedge(self.mesh.halfedge(first).prev()).start();
                Smooth::new(i, vec![prev.index(), next.index()], self.config.smooth_weight)?
            } else {
                let ring = self
                    .mesh
                    .vertex_neighbors(v)
                    .into_iter()
                    .map(VertexId::index)
                    .collect();
                Smooth::tangential(i, ring, self.config.smooth_weight)?
            };

            self.solver.add_constraint(OnFeature::new(
                i,
                self.target.clone(),
                self.config.feature_weight,
            )?)?;
            self.solver.add_constraint(smooth)?;
        }

        trace!(
            "rebuild_solver: {} bodies, {} constraints",
            self.solver.body_count(),
            self.solver.constraint_count()
        );
        Ok(())
    }

    /// Copy solved positions into the mesh, snapping free vertices onto the
    /// target.
    fn write_back_positions(&mut self) {
        for (i, position) in self.solver.positions().into_iter().enumerate() {
            let v = VertexId(i as u32);
            let position = if self.fixed[i] || self.mesh.vertex(v).first().is_none() {
                position
            } else {
                self.target.closest_point(position)
            };
            self.mesh.set_position(v, position);
        }
    }
}

/// Whether triangles (d, c, a) and (c, d, b) produced by a flip are
/// non-degenerate and face the same way as the originals (a, b, c), (b, a, d).
fn flip_keeps_orientation(pa: DVec3, pb: DVec3, pc: DVec3, pd: DVec3) -> bool {
    let original = (pb - pa).cross(pc - pa) + (pa - pb).cross(pd - pb);
    let n1 = (pc - pd).cross(pa - pd);
    let n2 = (pd - pc).cross(pb - pc);
    let eps = 1e-12 * original.length_squared().max(1.0);
    n1.length_squared() > eps
        && n2.length_squared() > eps
        && n1.dot(original) > 0.0
        && n2.dot(original) > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{create_feature, TriangleMesh};

    /// A 4 x 4 square in the z = 0 plane, two triangles
    fn square() -> HeMesh {
        let positions = [
            DVec3::ZERO,
            DVec3::new(4.0, 0.0, 0.0),
            DVec3::new(4.0, 4.0, 0.0),
            DVec3::new(0.0, 4.0, 0.0),
        ];
        HeMesh::from_triangles(&positions, &[[0, 1, 2], [0, 2, 3]]).unwrap()
    }

    fn longest_edge(mesh: &HeMesh) -> f64 {
        mesh.edges().map(|he| mesh.edge_length(he)).fold(0.0, f64::max)
    }

    fn remesher(min: f64, max: f64) -> DynamicRemesher {
        let mesh = square();
        let target = create_feature(TriangleMesh::from(&mesh)).unwrap();
        let config = RemeshConfig::new(min, max);
        DynamicRemesher::new(mesh, target, config).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mesh = square();
        let target = create_feature(DVec3::ZERO).unwrap();
        let result = DynamicRemesher::new(mesh, target, RemeshConfig::new(1.0, 1.5));
        assert!(matches!(result, Err(RemeshError::Config(_))));
    }

    #[test]
    fn test_split_phase_bounds_edge_length() {
        let mut remesher = remesher(0.5, 1.2);

        let splits = remesher.split_long_edges();

        assert!(splits > 0);
        assert!(longest_edge(remesher.mesh()) <= 1.2);
        assert_eq!(remesher.fixed.len(), remesher.mesh().vertex_count());
        assert!(remesher.mesh().validate().is_ok(), "{:?}", remesher.mesh().validate());
    }

    #[test]
    fn test_collapse_phase_removes_short_interior_edge() {
        // Hexagonal fan whose centre sits close to one rim vertex
        let mut positions = vec![DVec3::new(0.9, 0.0, 0.0)];
        for i in 0..6 {
            let angle = i as f64 * std::f64::consts::TAU / 6.0;
            positions.push(DVec3::new(angle.cos(), angle.sin(), 0.0));
        }
        let triangles: Vec<[u32; 3]> = (0..6).map(|i| [0, 1 + i, 1 + (i + 1) % 6]).collect();
        let mesh = HeMesh::from_triangles(&positions, &triangles).unwrap();
        let target = create_feature(TriangleMesh::from(&mesh)).unwrap();
        let mut remesher = DynamicRemesher::new(mesh, target, RemeshConfig::new(0.3, 2.5)).unwrap();

        let collapses = remesher.collapse_short_edges();

        assert_eq!(collapses, 1);
        let mesh = remesher.mesh();
        assert!(mesh.vertex(VertexId(0)).is_unused());
        assert!(mesh.validate().is_ok(), "{:?}", mesh.validate());
    }

    #[test]
    fn test_fixed_vertices_survive_collapse() {
        let mut positions = vec![DVec3::new(0.9, 0.0, 0.0)];
        for i in 0..6 {
            let angle = i as f64 * std::f64::consts::TAU / 6.0;
            positions.push(DVec3::new(angle.cos(), angle.sin(), 0.0));
        }
        let triangles: Vec<[u32; 3]> = (0..6).map(|i| [0, 1 + i, 1 + (i + 1) % 6]).collect();
        let mesh = HeMesh::from_triangles(&positions, &triangles).unwrap();
        let target = create_feature(TriangleMesh::from(&mesh)).unwrap();
        let mut remesher = DynamicRemesher::new(mesh, target, RemeshConfig::new(0.3, 2.5)).unwrap();
        remesher.fix_vertex(VertexId(0));

        assert_eq!(remesher.collapse_short_edges(), 0);
    }

    #[test]
    fn test_passes_refine_onto_target() {
        let mut remesher = remesher(0.5, 1.2);
        remesher.fix_boundary();

        let mut last = None;
        for _ in 0..3 {
            last = Some(remesher.step().unwrap());
        }
        let report = last.unwrap();

        assert_eq!(report.pass, 3);
        let mesh = remesher.mesh();
        assert!(mesh.validate().is_ok(), "{:?}", mesh.validate());
        assert_eq!(mesh.count_unused_vertices(), 0);
        assert_eq!(mesh.count_unused_halfedges(), 0);
        assert_eq!(report.vertices, mesh.vertex_count());
        assert!(mesh.vertex_count() > 4);
        assert!(longest_edge(mesh) < 2.0 * 1.2);

        for v in mesh.vertices() {
            let p = v.position;
            assert!(p.z.abs() < 1e-9);
            assert!(p.x > -1e-9 && p.x < 4.0 + 1e-9);
            assert!(p.y > -1e-9 && p.y < 4.0 + 1e-9);
        }
        // Corners were pinned
        for corner in [DVec3::ZERO, DVec3::new(4.0, 4.0, 0.0)] {
            assert!(mesh.vertices().iter().any(|v| v.position == corner));
        }
    }

    #[test]
    fn test_passes_stay_on_curved_target() {
        let positions: Vec<DVec3> = [
            DVec3::X,
            DVec3::NEG_X,
            DVec3::Y,
            DVec3::NEG_Y,
            DVec3::Z,
            DVec3::NEG_Z,
        ]
        .iter()
        .map(|&p| p * 3.0)
        .collect();
        let triangles = [
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ];
        let mesh = HeMesh::from_triangles(&positions, &triangles).unwrap();
        let target = create_feature(TriangleMesh::from(&mesh)).unwrap();
        let mut remesher =
            DynamicRemesher::new(mesh, target.clone(), RemeshConfig::new(0.5, 1.2)).unwrap();

        for _ in 0..3 {
            remesher.step().unwrap();

            let mesh = remesher.mesh();
            assert!(mesh.validate().is_ok(), "{:?}", mesh.validate());
            for v in mesh.vertices() {
                let p = v.position;
                assert!((target.closest_point(p) - p).length() < 1e-9, "{} is off the target", p);
                // Every point on this octahedron has an L1 norm of 3
                assert!((p.abs().element_sum() - 3.0).abs() < 1e-9, "{} left the surface", p);
            }
        }
    }

    #[test]
    fn test_flip_orientation_check() {
        let (a, b) = (DVec3::ZERO, DVec3::new(2.0, 0.0, 0.0));
        let (c, d) = (DVec3::new(1.0, 1.0, 0.0), DVec3::new(1.0, -1.0, 0.0));
        assert!(flip_keeps_orientation(a, b, c, d));

        // Concave diamond: the new diagonal would leave the quad
        let c = DVec3::new(3.0, 0.5, 0.0);
        let d = DVec3::new(3.0, -0.5, 0.0);
        assert!(!flip_keeps_orientation(a, b, c, d));
    }
}
