//! Nearest-vertex spatial queries.
//!
//! Seed landmarks are picked on the closed companion mesh and arrive as raw
//! 3D positions; they are translated into this mesh's id space by
//! nearest-vertex search. The same query backs the landmark fallback in the
//! outer-rim splitting. A uniform grid over the vertex positions keeps those
//! queries cheap: vertices hash into cells of a fixed size, and lookup scans
//! cells in expanding shells around the query point.

use std::collections::HashMap;

use nalgebra::Point3;

use super::halfedge::HalfEdgeMesh;
use super::index::VertexId;

/// Key of a grid cell (floor-divided coordinates).
type CellKey = (i64, i64, i64);

/// A uniform-grid point locator over mesh vertex positions.
///
/// Construction is O(n); `nearest` is close to O(1) for meshes with roughly
/// uniform sampling, degrading gracefully to a shell scan otherwise.
#[derive(Debug, Clone)]
pub struct PointLocator {
    /// Edge length of a grid cell.
    cellsize: f64,
    /// Vertices bucketed by cell.
    cells: HashMap<CellKey, Vec<VertexId>>,
    /// Componentwise min/max occupied cell key.
    bounds: Option<(CellKey, CellKey)>,
    /// Total number of indexed vertices.
    len: usize,
}

impl PointLocator {
    /// Build a locator over all vertices of a mesh.
    ///
    /// The cell size is derived from the mean edge length, which keeps the
    /// expected bucket occupancy small for surface meshes.
    pub fn build(mesh: &HalfEdgeMesh) -> Self {
        let mean_edge = mesh.mean_edge_length();
        let cellsize = if mean_edge > 0.0 { mean_edge * 2.0 } else { 1.0 };
        Self::with_cellsize(mesh, cellsize)
    }

    /// Build a locator with an explicit cell size.
    pub fn with_cellsize(mesh: &HalfEdgeMesh, cellsize: f64) -> Self {
        assert!(cellsize > 0.0, "cell size must be positive");

        let mut cells: HashMap<CellKey, Vec<VertexId>> = HashMap::new();
        let mut bounds: Option<(CellKey, CellKey)> = None;
        for (vid, vertex) in mesh.vertices() {
            let key = cell_key(&vertex.position, cellsize);
            cells.entry(key).or_default().push(vid);

            bounds = Some(match bounds {
                None => (key, key),
                Some((lo, hi)) => (
                    (lo.0.min(key.0), lo.1.min(key.1), lo.2.min(key.2)),
                    (hi.0.max(key.0), hi.1.max(key.1), hi.2.max(key.2)),
                ),
            });
        }

        Self {
            cellsize,
            cells,
            bounds,
            len: mesh.num_vertices(),
        }
    }

    /// Get the number of indexed vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the locator is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Find the vertex nearest to a query point.
    ///
    /// Returns `None` only for an empty mesh. Ties resolve to the lowest
    /// vertex id, making the query deterministic.
    pub fn nearest(&self, query: &Point3<f64>, mesh: &HalfEdgeMesh) -> Option<VertexId> {
        if self.len == 0 {
            return None;
        }

        let (cx, cy, cz) = cell_key(query, self.cellsize);

        // Beyond this shell every occupied cell has been visited
        let limit = self.max_shell(&(cx, cy, cz));

        let mut best: Option<(f64, VertexId)> = None;
        let mut shell: i64 = 0;

        while shell <= limit {
            // Scan all cells at Chebyshev distance == shell from the center cell
            for dx in -shell..=shell {
                for dy in -shell..=shell {
                    for dz in -shell..=shell {
                        if dx.abs().max(dy.abs()).max(dz.abs()) != shell {
                            continue;
                        }
                        if let Some(bucket) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) {
                            for &vid in bucket {
                                let d2 = (mesh.position(vid) - query).norm_squared();
                                let better = match best {
                                    None => true,
                                    Some((bd2, bv)) => {
                                        d2 < bd2 || (d2 == bd2 && vid < bv)
                                    }
                                };
                                if better {
                                    best = Some((d2, vid));
                                }
                            }
                        }
                    }
                }
            }

            // A vertex in a farther shell s is at least (s - 1) * cellsize away
            // from the query, so once the current best beats that bound the
            // search is exact. Strict comparison: an unvisited vertex at
            // exactly the bound could still win the lowest-id tie-break.
            if let Some((best_d2, _)) = best {
                let safe = shell as f64 * self.cellsize;
                if best_d2.sqrt() < safe {
                    break;
                }
            }

            shell += 1;
        }

        best.map(|(_, vid)| vid)
    }

    /// Largest Chebyshev distance from `center` to any occupied cell.
    fn max_shell(&self, center: &CellKey) -> i64 {
        match self.bounds {
            None => 0,
            Some((lo, hi)) => {
                let dx = (center.0 - lo.0).abs().max((hi.0 - center.0).abs());
                let dy = (center.1 - lo.1).abs().max((hi.1 - center.1).abs());
                let dz = (center.2 - lo.2).abs().max((hi.2 - center.2).abs());
                dx.max(dy).max(dz)
            }
        }
    }
}

#[inline]
fn cell_key(p: &Point3<f64>, cellsize: f64) -> CellKey {
    (
        (p.x / cellsize).floor() as i64,
        (p.y / cellsize).floor() as i64,
        (p.z / cellsize).floor() as i64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_triangles;

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
                let v10 = v00 + 1;
                let v01 = v00 + (n + 1);
                let v11 = v01 + 1;

                faces.push([v00, v10, v11]);
                faces.push([v00, v11, v01]);
            }
        }

        build_from_triangles(&vertices, &faces).unwrap()
    }

    fn brute_force_nearest(mesh: &HalfEdgeMesh, query: &Point3<f64>) -> VertexId {
        mesh.vertex_ids()
            .min_by(|&a, &b| {
                let da = (mesh.position(a) - query).norm_squared();
                let db = (mesh.position(b) - query).norm_squared();
                da.partial_cmp(&db).unwrap().then(a.cmp(&b))
            })
            .unwrap()
    }

    #[test]
    fn test_nearest_exact_hit() {
        let mesh = create_grid_mesh(4);
        let locator = PointLocator::build(&mesh);

        for v in mesh.vertex_ids() {
            let pos = *mesh.position(v);
            assert_eq!(locator.nearest(&pos, &mesh), Some(v));
        }
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let mesh = create_grid_mesh(6);
        let locator = PointLocator::build(&mesh);

        // Deterministic pseudo-random query points (LCG)
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 33) as f64 / (1u64 << 31) as f64) * 8.0 - 1.0
        };

        for _ in 0..50 {
            let q = Point3::new(next(), next(), next() * 0.1);
            let expected = brute_force_nearest(&mesh, &q);
            assert_eq!(locator.nearest(&q, &mesh), Some(expected));
        }
    }

    #[test]
    fn test_nearest_far_query() {
        let mesh = create_grid_mesh(3);
        let locator = PointLocator::build(&mesh);

        // Far outside the grid: the nearest vertex is the (3,3) corner
        let q = Point3::new(100.0, 100.0, 0.0);
        let expected = brute_force_nearest(&mesh, &q);
        assert_eq!(locator.nearest(&q, &mesh), Some(expected));
    }

    #[test]
    fn test_empty_locator() {
        let mesh = HalfEdgeMesh::new();
        let locator = PointLocator::with_cellsize(&mesh, 1.0);
        assert!(locator.is_empty());
        assert_eq!(locator.nearest(&Point3::origin(), &mesh), None);
    }
}
