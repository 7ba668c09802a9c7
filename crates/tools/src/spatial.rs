//! Spatial indexing for closest-point queries.
//!
//! Triangles are bucketed by centroid into an octree. Every node also keeps
//! the union of its triangles' boxes (its extent), which can reach past the
//! node's own cell; nearest queries prune against the extent.

use glam::DVec3;

/// Configuration for octree construction.
#[derive(Debug, Clone)]
pub struct OctreeConfig {
    /// Maximum depth of the octree.
    pub max_depth: u32,
    /// Maximum items per leaf node before splitting.
    pub max_items_per_leaf: usize,
    /// Minimum node size (prevents infinite subdivision).
    pub min_node_size: f64,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_items_per_leaf: 8,
            min_node_size: 1.0e-6,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: DVec3::splat(f64::MAX),
            max: DVec3::splat(f64::MIN),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = DVec3>) -> Self {
        let mut aabb = Self::empty();
        for point in points {
            aabb.include_point(point);
        }
        aabb
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn include_point(&mut self, point: DVec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn include_aabb(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn contains_point(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Squared distance from a point to the box (zero inside)
    pub fn distance_squared(&self, point: DVec3) -> f64 {
        if self.is_empty() {
            return f64::INFINITY;
        }
        point.clamp(self.min, self.max).distance_squared(point)
    }

    /// Get the octant index for a point (0-7).
    fn octant_for_point(&self, point: DVec3) -> usize {
        let center = self.center();
        let mut index = 0;
        if point.x >= center.x {
            index |= 1;
        }
        if point.y >= center.y {
            index |= 2;
        }
        if point.z >= center.z {
            index |= 4;
        }
        index
    }

    /// Get the bounds for a specific octant.
    fn octant_bounds(&self, octant: usize) -> Aabb {
        let center = self.center();
        let min = DVec3::new(
            if octant & 1 != 0 { center.x } else { self.min.x },
            if octant & 2 != 0 { center.y } else { self.min.y },
            if octant & 4 != 0 { center.z } else { self.min.z },
        );
        let max = DVec3::new(
            if octant & 1 != 0 { self.max.x } else { center.x },
            if octant & 2 != 0 { self.max.y } else { center.y },
            if octant & 4 != 0 { self.max.z } else { center.z },
        );
        Aabb::new(min, max)
    }
}

/// An item stored in the octree: triangle index, centroid and box.
#[derive(Debug, Clone, Copy)]
struct OctreeItem {
    triangle: usize,
    centroid: DVec3,
    bounds: Aabb,
}

#[derive(Debug)]
enum OctreeNode {
    Leaf {
        bounds: Aabb,
        extent: Aabb,
        items: Vec<OctreeItem>,
    },
    Internal {
        bounds: Aabb,
        extent: Aabb,
        children: Box<[Option<OctreeNode>; 8]>,
    },
}

impl OctreeNode {
    fn leaf(bounds: Aabb) -> Self {
        OctreeNode::Leaf {
            bounds,
            extent: Aabb::empty(),
            items: Vec::new(),
        }
    }

    fn extent(&self) -> &Aabb {
        match self {
            OctreeNode::Leaf { extent, .. } | OctreeNode::Internal { extent, .. } => extent,
        }
    }
}

/// Octree over triangles for nearest-point queries.
#[derive(Debug)]
pub struct TriangleOctree {
    root: OctreeNode,
    config: OctreeConfig,
    len: usize,
}

impl TriangleOctree {
    /// Build an octree over indexed triangles.
    pub fn from_triangles(positions: &[DVec3], triangles: &[[u32; 3]]) -> Self {
        Self::with_config(positions, triangles, OctreeConfig::default())
    }

    pub fn with_config(positions: &[DVec3], triangles: &[[u32; 3]], config: OctreeConfig) -> Self {
        let items: Vec<OctreeItem> = triangles
            .iter()
            .enumerate()
            .map(|(triangle, tri)| {
                let corners = tri.map(|i| positions[i as usize]);
                OctreeItem {
                    triangle,
                    centroid: (corners[0] + corners[1] + corners[2]) / 3.0,
                    bounds: Aabb::from_points(corners),
                }
            })
            .collect();

        // Cells are laid out over centroids; pad to keep them off the faces
        let mut bounds = Aabb::from_points(items.iter().map(|item| item.centroid));
        if bounds.is_empty() {
            bounds = Aabb::new(DVec3::ZERO, DVec3::ZERO);
        }
        let padding = bounds.size() * 0.01 + DVec3::splat(0.001);
        bounds.min -= padding;
        bounds.max += padding;

        let mut octree = Self {
            root: OctreeNode::leaf(bounds),
            config,
            len: 0,
        };
        for item in items {
            Self::insert_into_node(&mut octree.root, item, 0, &octree.config);
            octree.len += 1;
        }
        octree
    }

    fn insert_into_node(node: &mut OctreeNode, item: OctreeItem, depth: u32, config: &OctreeConfig) {
        match node {
            OctreeNode::Leaf {
                bounds,
                extent,
                items,
            } => {
                extent.include_aabb(&item.bounds);
                items.push(item);

                if items.len() > config.max_items_per_leaf
                    && depth < config.max_depth
                    && bounds.size().min_element() > config.min_node_size * 2.0
                {
                    let old_items = std::mem::take(items);
                    let old_bounds = *bounds;

                    *node = OctreeNode::Internal {
                        bounds: old_bounds,
                        extent: Aabb::empty(),
                        children: Box::new([None, None, None, None, None, None, None, None]),
                    };

                    for item in old_items {
                        Self::insert_into_node(node, item, depth, config);
                    }
                }
            }
            OctreeNode::Internal {
                bounds,
                extent,
                children,
            } => {
                extent.include_aabb(&item.bounds);
                let octant = bounds.octant_for_point(item.centroid);
                let child = children[octant].get_or_insert_with(|| OctreeNode::leaf(bounds.octant_bounds(octant)));
                Self::insert_into_node(child, item, depth + 1, config);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Find the nearest triangle to `query`.
    ///
    /// `closest` maps a triangle index to its closest point to the query.
    /// Children are visited nearest first and skipped once their extent is
    /// farther than the best hit. Returns the triangle and the point.
    pub fn nearest(&self, query: DVec3, closest: impl Fn(usize) -> DVec3) -> Option<(usize, DVec3)> {
        let mut best: Option<(usize, DVec3)> = None;
        let mut best_sq = f64::INFINITY;
        Self::nearest_in_node(&self.root, query, &closest, &mut best, &mut best_sq);
        best
    }

    fn nearest_in_node(
        node: &OctreeNode,
        query: DVec3,
        closest: &impl Fn(usize) -> DVec3,
        best: &mut Option<(usize, DVec3)>,
        best_sq: &mut f64,
    ) {
        if node.extent().distance_squared(query) >= *best_sq {
            return;
        }

        match node {
            OctreeNode::Leaf { items, .. } => {
                for item in items {
                    if item.bounds.distance_squared(query) >= *best_sq {
                        continue;
                    }
                    let point = closest(item.triangle);
                    let d_sq = point.distance_squared(query);
                    if d_sq < *best_sq {
                        *best_sq = d_sq;
                        *best = Some((item.triangle, point));
                    }
                }
            }
            OctreeNode::Internal { children, .. } => {
                let mut order: Vec<(f64, &OctreeNode)> = children
                    .iter()
                    .flatten()
                    .map(|child| (child.extent().distance_squared(query), child))
                    .collect();
                order.sort_by(|a, b| a.0.total_cmp(&b.0));

                for (d_sq, child) in order {
                    if d_sq >= *best_sq {
                        break;
                    }
                    Self::nearest_in_node(child, query, closest, best, best_sq);
                }
            }
        }
    }
}
