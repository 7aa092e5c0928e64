//! Constrained harmonic flattening.
//!
//! Computes a 2D embedding of an open surface mesh by solving the discrete
//! Laplace equation with Dirichlet constraints: selected vertices are pinned
//! to prescribed 2D targets and every free vertex comes to rest at the
//! weighted average of its neighbors. With cotangent weights the embedding is
//! as angle-preserving as the pin layout allows.
//!
//! Pinned vertices are eliminated from the system rather than kept as
//! identity rows: each free vertex yields one equation, pinned neighbors move
//! to the right-hand side. The reduced matrix is symmetric positive definite
//! (negative cotangent weights are clamped), so both axes are solved with
//! conjugate gradients over the same matrix.
//!
//! # Reference
//!
//! - Tutte, W. T. (1963). "How to draw a graph." Proc. London Math. Society.

use log::{debug, warn};
use nalgebra::{DVector, Point2, Point3};

use crate::error::{FlattenError, Result};
use crate::mesh::{HalfEdgeId, HalfEdgeMesh, VertexId};

use super::map::FlatMap;
use super::sparse::{conjugate_gradient, CsrMatrix};

/// Edge weighting scheme for the flattening Laplacian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightScheme {
    /// Cotangent weights `(cot α + cot β) / 2`, clamped at zero (angle-aware).
    Cotangent,
    /// Uniform weight 1 per edge (graph Laplacian).
    Uniform,
}

/// Options for the constrained flattening solver.
#[derive(Debug, Clone)]
pub struct FlattenOptions {
    /// Edge weighting scheme.
    pub weights: WeightScheme,

    /// Maximum conjugate gradient iterations per axis.
    pub max_iterations: usize,

    /// Convergence tolerance (relative residual norm).
    pub tolerance: f64,

    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            weights: WeightScheme::Cotangent,
            max_iterations: 5000,
            tolerance: 1e-10,
            parallel: true,
        }
    }
}

impl FlattenOptions {
    /// Set the edge weighting scheme.
    pub fn with_weights(mut self, weights: WeightScheme) -> Self {
        self.weights = weights;
        self
    }

    /// Set the maximum number of solver iterations per axis.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// A vertex pinned to a fixed position in the flattened plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinnedVertex {
    /// The vertex to pin.
    pub vertex: VertexId,
    /// Target position in the plane.
    pub target: Point2<f64>,
}

impl PinnedVertex {
    /// Create a pinned vertex.
    pub fn new(vertex: VertexId, target: Point2<f64>) -> Self {
        Self { vertex, target }
    }
}

/// An aligned list of pinned vertices and their targets.
#[derive(Debug, Clone, Default)]
pub struct Pins {
    entries: Vec<PinnedVertex>,
}

impl Pins {
    /// Create an empty pin list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pin.
    pub fn push(&mut self, vertex: VertexId, target: Point2<f64>) {
        self.entries.push(PinnedVertex::new(vertex, target));
    }

    /// Get the number of pins.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no pins.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the pins.
    pub fn iter(&self) -> impl Iterator<Item = &PinnedVertex> {
        self.entries.iter()
    }

    /// Iterate over the pinned vertex ids.
    pub fn ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.entries.iter().map(|p| p.vertex)
    }

    /// Get the pins as a slice.
    pub fn as_slice(&self) -> &[PinnedVertex] {
        &self.entries
    }
}

/// The two pin groups driving one flattening run.
///
/// `constraints` holds the interior dividing-path pins, `contour` everything
/// on the outer disk rim or a hole rim. The split matters for the refinement
/// pass, which re-solves with the contour group only. The union of the two
/// groups must not contain a duplicate vertex; [`flatten`] rejects one as a
/// singular system.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    /// Pins on interior dividing paths.
    pub constraints: Pins,
    /// Pins on hole rims and the outer disk rim.
    pub contour: Pins,
}

impl ConstraintSet {
    /// Total number of pins across both groups.
    pub fn total_pins(&self) -> usize {
        self.constraints.len() + self.contour.len()
    }

    /// Iterate over all pins, constraints first.
    pub fn iter_all(&self) -> impl Iterator<Item = &PinnedVertex> {
        self.constraints.iter().chain(self.contour.iter())
    }
}

/// Flatten a mesh by solving the pin-constrained Laplace equation.
///
/// Every vertex receives a 2D coordinate: pinned vertices take their targets
/// exactly, free vertices solve the weighted smoothness relation. The mesh is
/// read-only; the result is returned as a [`FlatMap`].
///
/// Fails with [`FlattenError::SingularSystem`] on a duplicate pinned vertex,
/// fewer than 3 pins, an out-of-range pin, solver non-convergence, or a
/// non-finite result.
pub fn flatten(
    mesh: &HalfEdgeMesh,
    set: &ConstraintSet,
    options: &FlattenOptions,
) -> Result<FlatMap> {
    let positions: Vec<Point3<f64>> = mesh.vertices().map(|(_, v)| v.position).collect();
    let pins: Vec<PinnedVertex> = set.iter_all().copied().collect();
    solve_harmonic(mesh, &positions, &pins, options, None)
}

/// Refine a flattened mesh by re-solving with only the contour pinned.
///
/// The first solve pins many interior vertices exactly, which can leave the
/// region around the dividing paths irregular. This pass repeats the solve
/// over the first-pass flat geometry (each vertex lifted to `(x, y, 0)`)
/// holding only contour ids fixed, so previously constrained interior
/// vertices relax into the smoothness relation. Contour vertices keep their
/// targets exactly; the first-pass coordinates seed the iteration.
pub fn refine_boundary(
    mesh: &HalfEdgeMesh,
    first_pass: &FlatMap,
    contour: &Pins,
    options: &FlattenOptions,
) -> Result<FlatMap> {
    debug_assert_eq!(first_pass.len(), mesh.num_vertices());

    let lifted: Vec<Point3<f64>> = first_pass
        .as_slice()
        .iter()
        .map(|p| Point3::new(p.x, p.y, 0.0))
        .collect();

    solve_harmonic(mesh, &lifted, contour.as_slice(), options, Some(first_pass))
}

/// Solve the pin-constrained Laplace equation over the given geometry.
fn solve_harmonic(
    mesh: &HalfEdgeMesh,
    positions: &[Point3<f64>],
    pins: &[PinnedVertex],
    options: &FlattenOptions,
    warm_start: Option<&FlatMap>,
) -> Result<FlatMap> {
    let n = mesh.num_vertices();
    if mesh.num_faces() == 0 {
        return Err(FlattenError::EmptyMesh);
    }
    debug_assert_eq!(positions.len(), n);

    if pins.len() < 3 {
        return Err(FlattenError::singular(format!(
            "{} pinned vertices, need at least 3",
            pins.len()
        )));
    }

    let mut pinned: Vec<Option<Point2<f64>>> = vec![None; n];
    for pin in pins {
        let idx = pin.vertex.index();
        if idx >= n {
            return Err(FlattenError::singular(format!(
                "pinned vertex {:?} out of range ({} mesh vertices)",
                pin.vertex, n
            )));
        }
        if !pin.target.x.is_finite() || !pin.target.y.is_finite() {
            return Err(FlattenError::singular(format!(
                "non-finite target for pinned vertex {:?}",
                pin.vertex
            )));
        }
        if pinned[idx].replace(pin.target).is_some() {
            return Err(FlattenError::singular(format!(
                "duplicate pinned vertex {:?}",
                pin.vertex
            )));
        }
    }

    // Number the free vertices consecutively
    let mut free_index = vec![usize::MAX; n];
    let mut free_ids = Vec::new();
    for (i, target) in pinned.iter().enumerate() {
        if target.is_none() {
            free_index[i] = free_ids.len();
            free_ids.push(VertexId::new(i));
        }
    }
    let m = free_ids.len();

    debug!(
        "harmonic solve: {} vertices, {} pinned, {} free",
        n,
        pins.len(),
        m
    );

    if m == 0 {
        let mut map = FlatMap::zeros(n);
        for (i, target) in pinned.iter().enumerate() {
            if let Some(t) = target {
                map.set(VertexId::new(i), *t);
            }
        }
        return Ok(map);
    }

    let mut weights = build_edge_weights(mesh, positions, options.weights);

    // A free row whose incident weights all clamped to zero would be
    // singular; per-row repair would break symmetry, so the whole system
    // downgrades to uniform weights.
    if options.weights == WeightScheme::Cotangent
        && has_zero_weight_row(mesh, &free_ids, &weights)
    {
        warn!("degenerate cotangent weights, falling back to uniform weights");
        for w in &mut weights {
            *w = 1.0;
        }
    }

    // Assemble the reduced system: one row per free vertex, pinned neighbors
    // on the right-hand side
    let mut triplets = Vec::new();
    let mut bx = DVector::zeros(m);
    let mut by = DVector::zeros(m);

    for (row, &v) in free_ids.iter().enumerate() {
        let mut diagonal = 0.0;

        for he in mesh.vertex_halfedges(v) {
            let w = weights[he.index()];
            if w == 0.0 {
                continue;
            }
            let j = mesh.dest(he).index();
            diagonal += w;

            match pinned[j] {
                Some(target) => {
                    bx[row] += w * target.x;
                    by[row] += w * target.y;
                }
                None => triplets.push((row, free_index[j], -w)),
            }
        }

        if diagonal <= 0.0 {
            return Err(FlattenError::singular(format!(
                "free vertex {:?} has no usable neighbors",
                v
            )));
        }
        triplets.push((row, row, diagonal));
    }

    let a = CsrMatrix::from_triplets(m, m, triplets);

    let (x0x, x0y) = match warm_start {
        Some(map) => (
            Some(DVector::from_iterator(
                m,
                free_ids.iter().map(|&v| map.get(v).x),
            )),
            Some(DVector::from_iterator(
                m,
                free_ids.iter().map(|&v| map.get(v).y),
            )),
        ),
        None => (None, None),
    };

    let ux = conjugate_gradient(
        &a,
        &bx,
        x0x.as_ref(),
        options.max_iterations,
        options.tolerance,
        options.parallel,
    )?;
    let uy = conjugate_gradient(
        &a,
        &by,
        x0y.as_ref(),
        options.max_iterations,
        options.tolerance,
        options.parallel,
    )?;

    // Scatter: pinned vertices are assigned their targets exactly
    let mut map = FlatMap::zeros(n);
    for (i, target) in pinned.iter().enumerate() {
        let p = match target {
            Some(t) => *t,
            None => Point2::new(ux[free_index[i]], uy[free_index[i]]),
        };
        if !p.x.is_finite() || !p.y.is_finite() {
            return Err(FlattenError::singular(format!(
                "non-finite solution at vertex V({})",
                i
            )));
        }
        map.set(VertexId::new(i), p);
    }

    Ok(map)
}

/// Compute one weight per half-edge over the given geometry.
///
/// The weight of a half-edge equals the weight of its twin, which keeps the
/// assembled system symmetric.
fn build_edge_weights(
    mesh: &HalfEdgeMesh,
    positions: &[Point3<f64>],
    scheme: WeightScheme,
) -> Vec<f64> {
    match scheme {
        WeightScheme::Uniform => vec![1.0; mesh.num_halfedges()],
        WeightScheme::Cotangent => mesh
            .halfedge_ids()
            // Clamp: a negative weight would break positive definiteness
            .map(|he| edge_cotangent_weight(mesh, positions, he).max(0.0))
            .collect(),
    }
}

/// Check whether any free vertex has edges but only zero weights.
fn has_zero_weight_row(mesh: &HalfEdgeMesh, free_ids: &[VertexId], weights: &[f64]) -> bool {
    free_ids.iter().any(|&v| {
        let mut total = 0.0;
        let mut any_edge = false;
        for he in mesh.vertex_halfedges(v) {
            any_edge = true;
            total += weights[he.index()];
        }
        any_edge && total <= 0.0
    })
}

/// Compute the cotangent weight for an edge.
///
/// The weight is (cot(α) + cot(β)) / 2 where α and β are the angles
/// opposite to the edge in the two adjacent triangles. Geometry comes from
/// the `positions` slice, not the mesh, so the same topology can be weighted
/// over first-pass flat coordinates.
fn edge_cotangent_weight(
    mesh: &HalfEdgeMesh,
    positions: &[Point3<f64>],
    he: HalfEdgeId,
) -> f64 {
    let mut weight = 0.0;

    let p0 = &positions[mesh.origin(he).index()];
    let p1 = &positions[mesh.dest(he).index()];

    // Face on one side (if not boundary)
    if !mesh.is_boundary_halfedge(he) {
        let opp = &positions[mesh.dest(mesh.next(he)).index()];
        weight += cotangent_angle(opp, p0, p1);
    }

    // Face on the other side (via twin)
    let twin = mesh.twin(he);
    if !mesh.is_boundary_halfedge(twin) {
        let opp = &positions[mesh.dest(mesh.next(twin)).index()];
        weight += cotangent_angle(opp, p1, p0);
    }

    weight * 0.5
}

/// Compute the cotangent of the angle at vertex `a` in triangle (a, b, c).
fn cotangent_angle(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    let ab = b - a;
    let ac = c - a;

    let dot = ab.dot(&ac);
    let cross_norm = ab.cross(&ac).norm();

    if cross_norm < 1e-10 {
        return 0.0; // Degenerate triangle
    }

    dot / cross_norm
}
