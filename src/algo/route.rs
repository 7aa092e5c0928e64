//! Shortest-path re-routing of dividing paths.
//!
//! Dividing paths supplied with the input were traced on a different
//! tessellation of the same anatomy, so their interior ids cannot be trusted
//! on this mesh. Each path is replaced by the shortest walk along mesh edges
//! between its two (displaced) endpoints, computed with Dijkstra's algorithm.
//! The replacement guarantees that every path id is a valid vertex of this
//! mesh and that consecutive ids share an edge.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{FlattenError, Result};
use crate::mesh::{HalfEdgeMesh, SurfacePath, VertexId};

/// Entry in the shortest-path priority queue.
#[derive(Debug, Clone)]
struct RouteEntry {
    /// The vertex index.
    vertex: usize,
    /// Distance from the start vertex.
    distance: f64,
}

impl RouteEntry {
    fn new(vertex: usize, distance: f64) -> Self {
        Self { vertex, distance }
    }
}

// Implement ordering for min-heap (BinaryHeap is a max-heap by default)
impl PartialEq for RouteEntry {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for RouteEntry {}

impl PartialOrd for RouteEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RouteEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
    }
}

/// Compute the shortest edge walk between two vertices.
///
/// Runs Dijkstra's algorithm on the edge graph with early termination once
/// `to` is settled, then reconstructs the walk from the predecessor chain.
/// The returned path starts at `from`, ends at `to`, and every consecutive
/// pair of ids shares a mesh edge. When `from == to` the path is the single
/// vertex.
///
/// Returns [`FlattenError::Unreachable`] if no walk exists, which happens
/// when the two vertices lie in different connected components.
pub fn route_between(
    mesh: &HalfEdgeMesh,
    from: VertexId,
    to: VertexId,
) -> Result<SurfacePath> {
    let n = mesh.num_vertices();
    if n == 0 {
        return Err(FlattenError::EmptyMesh);
    }
    if from.index() >= n || to.index() >= n {
        return Err(FlattenError::Unreachable {
            from: from.index(),
            to: to.index(),
        });
    }
    if from == to {
        return Ok(SurfacePath::new(vec![from]));
    }

    let mut distances = vec![f64::INFINITY; n];
    let mut predecessors: Vec<Option<usize>> = vec![None; n];
    let mut heap = BinaryHeap::new();

    distances[from.index()] = 0.0;
    heap.push(RouteEntry::new(from.index(), 0.0));

    while let Some(entry) = heap.pop() {
        let u = entry.vertex;

        // Skip if this is a stale entry (we found a shorter path already)
        if entry.distance > distances[u] {
            continue;
        }

        // The target is settled once popped; everything past it is wasted work
        if u == to.index() {
            break;
        }

        for he in mesh.vertex_halfedges(VertexId::new(u)) {
            let v = mesh.dest(he).index();
            let new_dist = entry.distance + mesh.edge_length(he);

            if new_dist < distances[v] {
                distances[v] = new_dist;
                predecessors[v] = Some(u);
                // May create duplicate entries, but that's OK
                heap.push(RouteEntry::new(v, new_dist));
            }
        }
    }

    if !distances[to.index()].is_finite() {
        return Err(FlattenError::Unreachable {
            from: from.index(),
            to: to.index(),
        });
    }

    // Walk the predecessor chain back from the target
    let mut walk = vec![to.index()];
    let mut current = to.index();
    while let Some(prev) = predecessors[current] {
        walk.push(prev);
        current = prev;
    }
    walk.reverse();
    debug_assert_eq!(walk[0], from.index());

    Ok(SurfacePath::new(
        walk.into_iter().map(VertexId::new).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_triangles;
    use nalgebra::Point3;

    fn create_single_triangle() -> HalfEdgeMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2]];
        build_from_triangles(&vertices, &faces).unwrap()
    }

    fn create_grid_mesh(n: usize) -> HalfEdgeMesh {
        let mut vertices = Vec::new();
        let mut faces = Vec::new();

        for j in 0..=n {
            for i in 0..=n {
                vertices.push(Point3::new(i as f64, j as f64, 0.0));
            }
        }

        for j in 0..n {
            for i in 0..n {
                let v00 = j * (n + 1) + i;
                let v10 = j * (n + 1) + i + 1;
                let v01 = (j + 1) * (n + 1) + i;
                let v11 = (j + 1) * (n + 1) + i + 1;

                faces.push([v00, v10, v11]);
                faces.push([v00, v11, v01]);
            }
        }

        build_from_triangles(&vertices, &faces).unwrap()
    }

    #[test]
    fn test_route_single_edge() {
        let mesh = create_single_triangle();
        let path = route_between(&mesh, VertexId::new(0), VertexId::new(1)).unwrap();

        assert_eq!(path.ids(), &[VertexId::new(0), VertexId::new(1)]);
    }

    #[test]
    fn test_route_follows_shortest_walk() {
        // On the grid, 0 -> 1 -> 2 (length 2) beats any detour through the
        // diagonal edges (1 + sqrt(2) at best)
        let mesh = create_grid_mesh(2);
        let path = route_between(&mesh, VertexId::new(0), VertexId::new(2)).unwrap();

        assert_eq!(
            path.ids(),
            &[VertexId::new(0), VertexId::new(1), VertexId::new(2)]
        );
    }

    #[test]
    fn test_route_is_edge_connected() {
        let mesh = create_grid_mesh(4);
        let from = VertexId::new(0);
        let to = VertexId::new(24); // opposite corner
        let path = route_between(&mesh, from, to).unwrap();

        assert_eq!(path.first(), Some(from));
        assert_eq!(path.last(), Some(to));
        assert!(path.is_edge_connected(&mesh));
    }

    #[test]
    fn test_route_to_self() {
        let mesh = create_single_triangle();
        let path = route_between(&mesh, VertexId::new(2), VertexId::new(2)).unwrap();

        assert_eq!(path.len(), 1);
        assert_eq!(path.first(), Some(VertexId::new(2)));
    }

    #[test]
    fn test_route_unreachable_across_components() {
        // Two triangles that do not share any vertex
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(11.0, 0.0, 0.0),
            Point3::new(10.5, 1.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [3, 4, 5]];
        let mesh = build_from_triangles(&vertices, &faces).unwrap();

        let result = route_between(&mesh, VertexId::new(0), VertexId::new(4));
        assert!(matches!(
            result,
            Err(FlattenError::Unreachable { from: 0, to: 4 })
        ));
    }

    #[test]
    fn test_route_empty_mesh() {
        let mesh = HalfEdgeMesh::new();
        let result = route_between(&mesh, VertexId::new(0), VertexId::new(1));
        assert!(matches!(result, Err(FlattenError::EmptyMesh)));
    }
}
