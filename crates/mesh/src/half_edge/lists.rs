//! Element arenas with logical deletion and in-place compaction.
//!
//! Elements are never removed from the middle of a list. Deleting marks them
//! unused (a tombstone) and leaves every other handle valid. `compact` later
//! reclaims the tombstones in one stable pass and reports how handles moved.
//!
//! Attribute arrays kept alongside a list (per-vertex, per-halfedge or
//! per-face data owned by the caller) must be compacted in the same pass:
//! call `compact_attributes` on every such array *before* `compact`, while
//! the unused flags still describe the original layout. Calling it after
//! `compact` panics on the length mismatch.

use std::ops::{Index, IndexMut};

use tracing::debug;

use super::types::{Face, FaceId, Halfedge, HalfedgeId, Vertex, VertexId};

/// Old-to-new index map produced by a compaction pass.
///
/// `get(old)` is `None` for elements that were reclaimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reindex {
    map: Vec<Option<u32>>,
    retained: usize,
}

impl Reindex {
    pub(crate) fn identity(len: usize) -> Self {
        Self {
            map: (0..len as u32).map(Some).collect(),
            retained: len,
        }
    }

    pub fn get(&self, old: usize) -> Option<u32> {
        self.map.get(old).copied().flatten()
    }

    /// Number of elements before compaction
    pub fn old_len(&self) -> usize {
        self.map.len()
    }

    /// Number of elements after compaction
    pub fn retained(&self) -> usize {
        self.retained
    }

    pub fn removed(&self) -> usize {
        self.map.len() - self.retained
    }

    pub fn is_identity(&self) -> bool {
        self.removed() == 0
    }

    pub fn as_slice(&self) -> &[Option<u32>] {
        &self.map
    }
}

/// Shared behaviour of vertices and faces for [`ElementList`].
pub trait HeElement {
    fn is_unused(&self) -> bool;
    fn set_unused(&mut self);
    fn set_index(&mut self, index: u32);
}

impl HeElement for Vertex {
    fn is_unused(&self) -> bool {
        self.unused
    }

    fn set_unused(&mut self) {
        self.unused = true;
        self.first = None;
    }

    fn set_index(&mut self, index: u32) {
        self.index = VertexId(index);
    }
}

impl HeElement for Face {
    fn is_unused(&self) -> bool {
        self.unused
    }

    fn set_unused(&mut self) {
        self.unused = true;
    }

    fn set_index(&mut self, index: u32) {
        self.index = FaceId(index);
    }
}

/// Dense list of single elements (vertices or faces) with tombstones.
#[derive(Debug, Clone)]
pub struct ElementList<E> {
    items: Vec<E>,
}

pub type VertexList = ElementList<Vertex>;
pub type FaceList = ElementList<Face>;

impl<E: HeElement> ElementList<E> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Logical length, tombstones included
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub(crate) fn push(&mut self, element: E) -> usize {
        self.items.push(element);
        self.items.len() - 1
    }

    /// Mark the element at `index` as unused.
    pub(crate) fn remove(&mut self, index: usize) {
        self.items[index].set_unused();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[E] {
        &self.items
    }

    pub fn count_unused(&self) -> usize {
        self.items.iter().filter(|e| e.is_unused()).count()
    }

    /// Remove all unused elements and re-index the remaining ones.
    ///
    /// Relative order is preserved and capacity is unchanged. Cross
    /// references held by *other* lists are not touched; the returned map
    /// is used to rewrite them.
    pub fn compact(&mut self) -> Reindex {
        let mut map = vec![None; self.items.len()];
        let mut marker = 0;

        for i in 0..self.items.len() {
            if self.items[i].is_unused() {
                continue;
            }

            self.items.swap(marker, i);
            self.items[marker].set_index(marker as u32);
            map[i] = Some(marker as u32);
            marker += 1;
        }

        self.items.truncate(marker);
        Reindex {
            map,
            retained: marker,
        }
    }

    /// Move attributes of used elements to the front of `attributes`.
    ///
    /// Returns the number of retained attributes. The tail is left in an
    /// unspecified order and is not truncated.
    pub fn swim_attributes<U>(&self, attributes: &mut [U]) -> usize {
        assert_eq!(
            attributes.len(),
            self.items.len(),
            "attribute array must stay index-aligned with its element list"
        );

        let mut marker = 0;
        for i in 0..self.items.len() {
            if self.items[i].is_unused() {
                continue;
            }
            attributes.swap(marker, i);
            marker += 1;
        }
        marker
    }

    /// Remove all attributes corresponding with unused elements.
    pub fn compact_attributes<U>(&self, attributes: &mut Vec<U>) {
        let marker = self.swim_attributes(attributes);
        attributes.truncate(marker);
    }
}

impl<E: HeElement> Default for ElementList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<VertexId> for ElementList<Vertex> {
    type Output = Vertex;

    fn index(&self, id: VertexId) -> &Vertex {
        &self.items[id.index()]
    }
}

impl IndexMut<VertexId> for ElementList<Vertex> {
    fn index_mut(&mut self, id: VertexId) -> &mut Vertex {
        &mut self.items[id.index()]
    }
}

impl Index<FaceId> for ElementList<Face> {
    type Output = Face;

    fn index(&self, id: FaceId) -> &Face {
        &self.items[id.index()]
    }
}

impl IndexMut<FaceId> for ElementList<Face> {
    fn index_mut(&mut self, id: FaceId) -> &mut Face {
        &mut self.items[id.index()]
    }
}

/// Dense list of halfedge pairs.
///
/// Pairs occupy slots `2k` and `2k + 1`. They are allocated, tombstoned and
/// reclaimed together, so a halfedge never exists without its twin and both
/// members always report the same unused state.
#[derive(Debug, Clone, Default)]
pub struct HalfedgeList {
    items: Vec<Halfedge>,
}

impl HalfedgeList {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Create a list with room for `capacity` halfedges (rounded up to pairs)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity + (capacity & 1)),
        }
    }

    /// Logical length, tombstones included. Always even.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Halfedge> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Halfedge] {
        &self.items
    }

    /// Allocate a new twin pair running `start -> end` and `end -> start`.
    ///
    /// Returns the leader (`start -> end`). Until the pair is linked into
    /// faces, each member's next and prev point at its twin.
    pub fn add_pair(&mut self, start: VertexId, end: VertexId) -> HalfedgeId {
        let leader = HalfedgeId(self.items.len() as u32);
        let twin = leader.twin();

        self.items.push(Halfedge {
            index: leader,
            start,
            face: None,
            next: twin,
            prev: twin,
            unused: false,
        });
        self.items.push(Halfedge {
            index: twin,
            start: end,
            face: None,
            next: leader,
            prev: leader,
            unused: false,
        });

        leader
    }

    /// Mark the pair containing `id` as unused.
    pub fn remove_pair(&mut self, id: HalfedgeId) {
        let leader = id.leader().index();
        for he in &mut self.items[leader..leader + 2] {
            he.unused = true;
            he.face = None;
        }
    }

    pub fn twin(&self, id: HalfedgeId) -> &Halfedge {
        &self.items[id.twin().index()]
    }

    /// Number of unused halfedges (always even)
    pub fn count_unused(&self) -> usize {
        let mut result = 0;

        for i in (0..self.items.len()).step_by(2) {
            if self.items[i].unused {
                result += 2;
            }
        }

        result
    }

    /// Remove all unused pairs and re-index the remaining halfedges.
    ///
    /// Retained pairs keep their relative order, each halfedge's index
    /// becomes its new array offset, and next/prev references inside the
    /// list are rewritten. Capacity is unchanged. Vertex and face
    /// references to halfedges live outside this list and must be remapped
    /// by the caller through the returned [`Reindex`].
    ///
    /// If the list has associated attributes, compact those first.
    pub fn compact(&mut self) -> Reindex {
        let old_len = self.items.len();
        let mut map = vec![None; old_len];
        let mut marker = 0;

        for i in (0..old_len).step_by(2) {
            if self.items[i].unused {
                continue; // skip unused pairs
            }

            for offset in 0..2 {
                self.items.swap(marker, i + offset);
                self.items[marker].index = HalfedgeId(marker as u32);
                map[i + offset] = Some(marker as u32);
                marker += 1;
            }
        }

        self.items.truncate(marker);

        let remap = |id: HalfedgeId| -> HalfedgeId {
            match map[id.index()] {
                Some(new) => HalfedgeId(new),
                None => panic!("live halfedge references reclaimed halfedge {:?}", id),
            }
        };

        for he in &mut self.items {
            he.next = remap(he.next);
            he.prev = remap(he.prev);
        }

        debug!(
            "HalfedgeList::compact: {} -> {} halfedges",
            old_len, marker
        );

        Reindex {
            map,
            retained: marker,
        }
    }

    /// Move attributes of used pairs to the front of `attributes`.
    ///
    /// Replays the retain/skip decisions of [`HalfedgeList::compact`] and
    /// returns the new logical length without truncating. Must run against
    /// the same (pre-compaction) deletion state as the topology.
    pub fn swim_attributes<U>(&self, attributes: &mut [U]) -> usize {
        assert_eq!(
            attributes.len(),
            self.items.len(),
            "attribute array must stay index-aligned with the halfedge list"
        );

        let mut marker = 0;

        for i in (0..self.items.len()).step_by(2) {
            if self.items[i].unused {
                continue; // skip unused pairs
            }
            attributes.swap(marker, i);
            attributes.swap(marker + 1, i + 1);
            marker += 2;
        }

        marker
    }

    /// Remove all attributes corresponding with unused halfedges.
    pub fn compact_attributes<U>(&self, attributes: &mut Vec<U>) {
        let marker = self.swim_attributes(attributes);
        attributes.truncate(marker);
    }
}

impl Index<HalfedgeId> for HalfedgeList {
    type Output = Halfedge;

    fn index(&self, id: HalfedgeId) -> &Halfedge {
        &self.items[id.index()]
    }
}

impl IndexMut<HalfedgeId> for HalfedgeList {
    fn index_mut(&mut self, id: HalfedgeId) -> &mut Halfedge {
        &mut self.items[id.index()]
    }
}
