use glam::DVec3;
use slur_dynamics::{Feature, FeatureRank};

use super::TriangleMesh;
use crate::error::FeatureError;
use crate::spatial::TriangleOctree;

/// A triangle surface, queried through an octree.
#[derive(Debug)]
pub struct MeshFeature {
    positions: Vec<DVec3>,
    triangles: Vec<[u32; 3]>,
    octree: TriangleOctree,
}

impl MeshFeature {
    pub fn new(mesh: TriangleMesh) -> Result<Self, FeatureError> {
        let TriangleMesh {
            positions,
            triangles,
        } = mesh;

        if triangles.is_empty() || positions.is_empty() {
            return Err(FeatureError::EmptyGeometry);
        }
        if !positions.iter().all(|p| p.is_finite()) {
            return Err(FeatureError::NonFinite);
        }
        if let Some(&index) = triangles
            .iter()
            .flatten()
            .find(|&&i| i as usize >= positions.len())
        {
            return Err(FeatureError::IndexOutOfRange {
                index,
                count: positions.len(),
            });
        }

        let octree = TriangleOctree::from_triangles(&positions, &triangles);
        Ok(Self {
            positions,
            triangles,
            octree,
        })
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    fn closest_on(&self, triangle: usize, query: DVec3) -> DVec3 {
        let [a, b, c] = self.triangles[triangle].map(|i| self.positions[i as usize]);
        closest_point_on_triangle(query, a, b, c)
    }
}

impl Feature for MeshFeature {
    fn rank(&self) -> FeatureRank {
        FeatureRank::Surface
    }

    fn closest_point(&self, query: DVec3) -> DVec3 {
        match self.octree.nearest(query, |t| self.closest_on(t, query)) {
            Some((_, point)) => point,
            // The octree holds every triangle, so a hit always exists
            None => query,
        }
    }
}

/// Closest point to `p` on the triangle `a`, `b`, `c` (Ericson's region test).
pub fn closest_point_on_triangle(p: DVec3, a: DVec3, b: DVec3, c: DVec3) -> DVec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}
