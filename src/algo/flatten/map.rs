//! Flat coordinate storage.
//!
//! This module provides the [`FlatMap`] type for storing the 2D coordinates
//! computed for mesh vertices. The input mesh is never mutated; the flat
//! coordinates live in this side-channel structure.

use nalgebra::Point2;

use crate::mesh::VertexId;

/// Flattened 2D coordinates for mesh vertices.
///
/// Stores one `Point2<f64>` per vertex, indexed by vertex id. After a solve
/// the coordinate is defined for every vertex: pinned vertices sit exactly on
/// their targets, free vertices satisfy the smoothness relation.
///
/// # Example
///
/// ```
/// use laflat::algo::flatten::FlatMap;
/// use laflat::mesh::VertexId;
/// use nalgebra::Point2;
///
/// let map = FlatMap::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.5)]);
/// assert_eq!(map.get(VertexId::new(1)), Point2::new(1.0, 0.5));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FlatMap {
    /// Coordinates indexed by vertex id.
    coords: Vec<Point2<f64>>,
}

impl FlatMap {
    /// Create a flat map from per-vertex coordinates.
    ///
    /// The coordinates are indexed by vertex id (index 0 corresponds to
    /// vertex 0, etc.).
    pub fn new(coords: Vec<Point2<f64>>) -> Self {
        Self { coords }
    }

    /// Create a flat map of `n` vertices at the origin.
    pub fn zeros(n: usize) -> Self {
        Self {
            coords: vec![Point2::origin(); n],
        }
    }

    /// Get the coordinates for a vertex.
    #[inline]
    pub fn get(&self, v: VertexId) -> Point2<f64> {
        self.coords[v.index()]
    }

    /// Set the coordinates for a vertex.
    #[inline]
    pub fn set(&mut self, v: VertexId, position: Point2<f64>) {
        self.coords[v.index()] = position;
    }

    /// Get the number of coordinates.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Iterate over all coordinates with their vertex ids.
    pub fn iter(&self) -> impl Iterator<Item = (VertexId, Point2<f64>)> + '_ {
        self.coords
            .iter()
            .enumerate()
            .map(|(i, &p)| (VertexId::new(i), p))
    }

    /// Get the raw coordinates slice.
    pub fn as_slice(&self) -> &[Point2<f64>] {
        &self.coords
    }

    /// Compute the bounding box of the coordinates.
    ///
    /// Returns `None` if the map is empty.
    pub fn bounding_box(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        if self.coords.is_empty() {
            return None;
        }

        let mut min = self.coords[0];
        let mut max = self.coords[0];

        for p in &self.coords {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }

        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_map_basic() {
        let coords = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.5, 1.0),
        ];
        let map = FlatMap::new(coords);

        assert_eq!(map.len(), 3);
        assert!(!map.is_empty());
        assert_eq!(map.get(VertexId::new(0)), Point2::new(0.0, 0.0));
        assert_eq!(map.get(VertexId::new(2)), Point2::new(0.5, 1.0));
    }

    #[test]
    fn test_flat_map_set() {
        let mut map = FlatMap::zeros(4);
        map.set(VertexId::new(2), Point2::new(-1.5, 2.0));

        assert_eq!(map.get(VertexId::new(2)), Point2::new(-1.5, 2.0));
        assert_eq!(map.get(VertexId::new(3)), Point2::origin());
    }

    #[test]
    fn test_flat_map_bounding_box() {
        let coords = vec![
            Point2::new(-1.0, 0.5),
            Point2::new(2.0, -0.5),
            Point2::new(0.5, 3.0),
        ];
        let map = FlatMap::new(coords);

        let (min, max) = map.bounding_box().unwrap();
        assert_eq!(min, Point2::new(-1.0, -0.5));
        assert_eq!(max, Point2::new(2.0, 3.0));

        assert!(FlatMap::zeros(0).bounding_box().is_none());
    }
}
