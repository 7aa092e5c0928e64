//! Ordered vertex-id chains: contours and surface paths.
//!
//! A [`Contour`] is a closed cycle tracing one boundary loop (a hole rim or
//! the outer rim). A [`SurfacePath`] is an open chain crossing the surface
//! between two landmarks, acting as a dividing line. Both are produced by
//! upstream extraction and consumed here by id; consecutive ids are expected
//! to be mesh-edge-adjacent.

use super::halfedge::HalfEdgeMesh;
use super::index::VertexId;

/// An ordered, cyclic sequence of vertex ids tracing one boundary loop.
///
/// The traversal direction is whatever the upstream extraction produced; the
/// partitioner re-orients contours into its canonical convention on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    ids: Vec<VertexId>,
}

impl Contour {
    /// Create a contour from an ordered id cycle.
    pub fn new(ids: Vec<VertexId>) -> Self {
        Self { ids }
    }

    /// Get the number of points on the contour.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if the contour is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Get the ordered ids.
    #[inline]
    pub fn ids(&self) -> &[VertexId] {
        &self.ids
    }

    /// Get the id at a cyclic position.
    #[inline]
    pub fn id_at(&self, pos: usize) -> VertexId {
        self.ids[pos % self.ids.len()]
    }

    /// Find the position of a vertex id on the contour.
    pub fn position_of(&self, id: VertexId) -> Option<usize> {
        self.ids.iter().position(|&v| v == id)
    }

    /// Check whether a vertex id lies on the contour.
    pub fn contains(&self, id: VertexId) -> bool {
        self.ids.contains(&id)
    }

    /// Rotate the cycle in place so `id` becomes the first element.
    ///
    /// Returns `false` (leaving the contour untouched) if `id` is not on the
    /// contour.
    pub fn rotate_to(&mut self, id: VertexId) -> bool {
        match self.position_of(id) {
            Some(pos) => {
                self.ids.rotate_left(pos);
                true
            }
            None => false,
        }
    }

    /// Reverse the traversal direction, keeping the first element first.
    ///
    /// For a cycle `[a, b, c, d]` this yields `[a, d, c, b]`: the same loop
    /// walked the other way, anchored at the same start.
    pub fn reverse_keeping_first(&mut self) {
        if self.ids.len() > 2 {
            self.ids[1..].reverse();
        }
    }

    /// Iterate over the ids in order.
    pub fn iter(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.ids.iter().copied()
    }

    /// Check that consecutive ids (including the closing pair) share a mesh edge.
    pub fn is_edge_connected(&self, mesh: &HalfEdgeMesh) -> bool {
        if self.ids.len() < 2 {
            return true;
        }
        (0..self.ids.len()).all(|i| mesh.are_adjacent(self.id_at(i), self.id_at(i + 1)))
    }
}

/// An ordered, acyclic chain of vertex ids between two landmarks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfacePath {
    ids: Vec<VertexId>,
}

impl SurfacePath {
    /// Create a path from an ordered id chain.
    pub fn new(ids: Vec<VertexId>) -> Self {
        Self { ids }
    }

    /// Get the number of points on the path.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if the path is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Get the ordered ids.
    #[inline]
    pub fn ids(&self) -> &[VertexId] {
        &self.ids
    }

    /// Get the first id, if any.
    pub fn first(&self) -> Option<VertexId> {
        self.ids.first().copied()
    }

    /// Get the last id, if any.
    pub fn last(&self) -> Option<VertexId> {
        self.ids.last().copied()
    }

    /// Iterate over the ids in order.
    pub fn iter(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.ids.iter().copied()
    }

    /// Check that consecutive ids share a mesh edge.
    pub fn is_edge_connected(&self, mesh: &HalfEdgeMesh) -> bool {
        self.ids
            .windows(2)
            .all(|w| mesh.are_adjacent(w[0], w[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[usize]) -> Vec<VertexId> {
        raw.iter().map(|&i| VertexId::new(i)).collect()
    }

    #[test]
    fn test_rotate_to() {
        let mut c = Contour::new(ids(&[3, 5, 7, 9]));
        assert!(c.rotate_to(VertexId::new(7)));
        assert_eq!(c.ids(), ids(&[7, 9, 3, 5]).as_slice());

        // Missing id: untouched
        assert!(!c.rotate_to(VertexId::new(100)));
        assert_eq!(c.ids(), ids(&[7, 9, 3, 5]).as_slice());
    }

    #[test]
    fn test_reverse_keeping_first() {
        let mut c = Contour::new(ids(&[1, 2, 3, 4, 5]));
        c.reverse_keeping_first();
        assert_eq!(c.ids(), ids(&[1, 5, 4, 3, 2]).as_slice());

        // Reversing twice restores the original
        c.reverse_keeping_first();
        assert_eq!(c.ids(), ids(&[1, 2, 3, 4, 5]).as_slice());
    }

    #[test]
    fn test_cyclic_indexing() {
        let c = Contour::new(ids(&[10, 11, 12]));
        assert_eq!(c.id_at(0), VertexId::new(10));
        assert_eq!(c.id_at(3), VertexId::new(10));
        assert_eq!(c.id_at(5), VertexId::new(12));
    }

    #[test]
    fn test_path_endpoints() {
        let p = SurfacePath::new(ids(&[4, 8, 15, 16]));
        assert_eq!(p.first(), Some(VertexId::new(4)));
        assert_eq!(p.last(), Some(VertexId::new(16)));

        let empty = SurfacePath::new(Vec::new());
        assert_eq!(empty.first(), None);
        assert_eq!(empty.last(), None);
    }
}
