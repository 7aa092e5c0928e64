//! Pin assembly: turning segmented contours and dividing paths into the
//! pinned-vertex lists driving the harmonic solve.
//!
//! Two groups of pins are built. The contour group covers every boundary
//! vertex: each hole segment is spread over its template arc and each rim arc
//! over its clockwise span, anchors landing exactly on their template points.
//! The constraint group covers the interior dividing paths, spread evenly
//! along the straight line between the template anchors they connect, with
//! ids already pinned by a neighboring segment stripped out first.
//!
//! Landmarks arrive as vertex ids detected on the original closed surface,
//! so they may miss the contours of the opened mesh; [`locate_on_contour`]
//! resolves each one to a contour id and tags how it matched.

use std::collections::HashSet;

use log::warn;
use nalgebra::{Point2, Point3};

use crate::error::{FlattenError, Result};
use crate::mesh::{Contour, HalfEdgeMesh, SurfacePath, VertexId};

use super::flatten::{ConstraintSet, Pins};
use super::segment::ContourPartition;
use super::template::{HoleTemplate, RimTemplate};

/// How a landmark id was resolved onto a contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkMatch {
    /// The id itself lies on the contour.
    Exact(VertexId),
    /// The id is absent; the contour point nearest the landmark's 3D
    /// position was substituted.
    Nearest(VertexId),
    /// The contour is empty, nothing to resolve against.
    NotFound,
}

impl LandmarkMatch {
    /// The resolved contour id, if any.
    pub fn resolved(&self) -> Option<VertexId> {
        match *self {
            LandmarkMatch::Exact(id) | LandmarkMatch::Nearest(id) => Some(id),
            LandmarkMatch::NotFound => None,
        }
    }

    /// Whether the landmark was resolved by nearest-point fallback.
    pub fn is_fallback(&self) -> bool {
        matches!(self, LandmarkMatch::Nearest(_))
    }
}

/// Resolve a landmark id onto a contour.
///
/// Ids detected on the closed surface can vanish when the mesh is opened
/// (hole filling removed, vertices renumbered). If `landmark` is not on the
/// contour, the contour point closest to `seed_position` stands in for it
/// and a warning is logged.
pub fn locate_on_contour(
    contour: &Contour,
    landmark: VertexId,
    seed_position: &Point3<f64>,
    mesh: &HalfEdgeMesh,
    contour_label: &str,
) -> LandmarkMatch {
    if contour.is_empty() {
        return LandmarkMatch::NotFound;
    }
    if contour.contains(landmark) {
        return LandmarkMatch::Exact(landmark);
    }

    let mut best = contour.id_at(0);
    let mut best_d2 = f64::INFINITY;
    for id in contour.iter() {
        let d2 = (mesh.position(id) - seed_position).norm_squared();
        if d2 < best_d2 {
            best_d2 = d2;
            best = id;
        }
    }
    warn!(
        "landmark {:?} is not on the {} contour, substituting nearest contour point {:?}",
        landmark, contour_label, best
    );
    LandmarkMatch::Nearest(best)
}

/// The outer rim split at its four landmarks.
#[derive(Debug, Clone)]
pub struct RimSplit {
    /// The four arcs `v5→v6`, `v6→v7`, `v7→v8`, `v8→v5`, in rim order
    /// starting at `v5`.
    pub arcs: [Vec<VertexId>; 4],
    /// How each landmark v5..v8 resolved onto the rim.
    pub lookups: [LandmarkMatch; 4],
}

impl RimSplit {
    /// Total number of rim ids across all four arcs.
    pub fn total_len(&self) -> usize {
        self.arcs.iter().map(Vec::len).sum()
    }

    /// Iterate over all rim ids in arc order.
    pub fn iter_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.arcs.iter().flat_map(|a| a.iter().copied())
    }
}

/// Split the outer rim contour into its four landmark-to-landmark arcs.
///
/// The cycle is rotated to start at v5 and re-oriented so that v6 comes
/// before v8; landmarks missing from the contour are resolved by
/// [`locate_on_contour`] using the matching seed position. The middle two
/// arcs tolerate landmarks observed out of order by swapping their cut
/// positions, mirroring the upstream extraction's tolerance for noisy
/// landmark detections.
pub fn split_rim(
    contour: &Contour,
    landmarks: &[VertexId; 4],
    seed_positions: &[Point3<f64>; 4],
    mesh: &HalfEdgeMesh,
) -> Result<RimSplit> {
    let mut lookups = [LandmarkMatch::NotFound; 4];
    let mut resolved = [VertexId::invalid(); 4];
    for k in 0..4 {
        lookups[k] =
            locate_on_contour(contour, landmarks[k], &seed_positions[k], mesh, "rim");
        resolved[k] =
            lookups[k]
                .resolved()
                .ok_or_else(|| FlattenError::BoundaryMismatch {
                    landmark: landmarks[k].index(),
                    contour: "rim".into(),
                })?;
    }

    let mut cycle = contour.clone();
    if !cycle.rotate_to(resolved[0]) {
        return Err(FlattenError::BoundaryMismatch {
            landmark: landmarks[0].index(),
            contour: "rim".into(),
        });
    }

    // v6 before v8 is the canonical direction; otherwise walk the other way
    let p6 = rim_position(&cycle, resolved[1], landmarks[1])?;
    let p8 = rim_position(&cycle, resolved[3], landmarks[3])?;
    if p6 >= p8 {
        cycle.reverse_keeping_first();
    }

    let p6 = rim_position(&cycle, resolved[1], landmarks[1])?;
    let p7 = rim_position(&cycle, resolved[2], landmarks[2])?;
    let p8 = rim_position(&cycle, resolved[3], landmarks[3])?;

    let ids = cycle.ids();
    let arcs = [
        ids[..p6].to_vec(),
        arc_between(ids, p6, p7),
        arc_between(ids, p7, p8),
        ids[p8..].to_vec(),
    ];

    Ok(RimSplit { arcs, lookups })
}

fn rim_position(cycle: &Contour, id: VertexId, landmark: VertexId) -> Result<usize> {
    cycle
        .position_of(id)
        .ok_or_else(|| FlattenError::BoundaryMismatch {
            landmark: landmark.index(),
            contour: "rim".into(),
        })
}

/// The half-open id range between two cut positions, whichever order the
/// cuts were observed in.
fn arc_between(ids: &[VertexId], a: usize, b: usize) -> Vec<VertexId> {
    if a <= b {
        ids[a..b].to_vec()
    } else {
        ids[b..a].to_vec()
    }
}

/// Drop from a path every id already claimed by a contour segment.
///
/// Order is preserved; the survivors are the ids the path alone pins.
pub fn strip_path(path: &SurfacePath, excluded: &HashSet<VertexId>) -> Vec<VertexId> {
    path.iter().filter(|id| !excluded.contains(id)).collect()
}

/// Evenly spaced targets strictly between two endpoints.
///
/// The `count` targets sit at parameters `(k+1)/(count+1)` along the segment
/// from `start` to `end`, so neither endpoint is ever produced. The path
/// extremes themselves are pinned by the contours they lie on.
pub fn interior_targets(
    count: usize,
    start: Point2<f64>,
    end: Point2<f64>,
) -> Vec<Point2<f64>> {
    (0..count)
        .map(|k| {
            let t = (k + 1) as f64 / (count + 1) as f64;
            start + (end - start) * t
        })
        .collect()
}

/// `count` points spread uniformly over a circular arc, start inclusive and
/// end exclusive.
///
/// Works for both windings: hole arcs pass `end_angle > start_angle`
/// (counter-clockwise), rim arcs the reverse. The excluded end angle is the
/// next arc's start, which pins it instead.
pub fn sample_arc(
    center: Point2<f64>,
    radius: f64,
    start_angle: f64,
    end_angle: f64,
    count: usize,
) -> Vec<Point2<f64>> {
    (0..count)
        .map(|j| {
            let theta = start_angle + (end_angle - start_angle) * j as f64 / count as f64;
            Point2::new(
                center.x + radius * theta.cos(),
                center.y + radius * theta.sin(),
            )
        })
        .collect()
}

/// Incremental builder for a [`ConstraintSet`].
///
/// Contour pins are appended per structure in whatever order the caller
/// walks them; interior path pins accumulate in the constraint group.
/// [`finish`](Assembler::finish) hands the set over after rejecting any
/// vertex pinned twice.
#[derive(Debug, Default)]
pub struct Assembler {
    set: ConstraintSet,
}

impl Assembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a partitioned hole contour onto its template circle.
    ///
    /// Segment `k` is spread over template arc `k`; the first id of each
    /// non-empty segment lands exactly on its anchor point. Returns the
    /// number of pins added.
    pub fn add_hole_contour(
        &mut self,
        template: &HoleTemplate,
        partition: &ContourPartition,
    ) -> usize {
        debug_assert_eq!(partition.len(), template.anchors.len());

        let mut added = 0;
        for k in 0..partition.len() {
            let segment = partition.segment(k);
            let (start, end) = template.arc(k);
            let targets =
                sample_arc(template.center, template.radius, start, end, segment.len());
            for (&id, target) in segment.ids().iter().zip(targets) {
                self.set.contour.push(id, target);
                added += 1;
            }
        }
        added
    }

    /// Pin the split outer rim onto the disk circle, clockwise.
    ///
    /// Arc `k` of the split is spread over the template's clockwise arc `k`,
    /// landmark ids landing exactly on their rim anchor points. Returns the
    /// number of pins added.
    pub fn add_rim_contour(&mut self, template: &RimTemplate, split: &RimSplit) -> usize {
        let spans = template.clockwise_arcs();

        let mut added = 0;
        for (arc, &(start, end)) in split.arcs.iter().zip(spans.iter()) {
            let targets =
                sample_arc(Point2::origin(), template.disk_radius, start, end, arc.len());
            for (&id, target) in arc.iter().zip(targets) {
                self.set.contour.push(id, target);
                added += 1;
            }
        }
        added
    }

    /// Pin a dividing path onto the straight line between two template
    /// anchors.
    ///
    /// Ids in `excluded` (typically the segments flanking the path's two
    /// extremes) are stripped first; the survivors receive evenly spaced
    /// interior targets from `start` to `end`. Returns the number of pins
    /// added.
    pub fn add_interior_path(
        &mut self,
        path: &SurfacePath,
        excluded: &HashSet<VertexId>,
        start: Point2<f64>,
        end: Point2<f64>,
    ) -> usize {
        let kept = strip_path(path, excluded);
        let targets = interior_targets(kept.len(), start, end);
        for (&id, target) in kept.iter().zip(targets) {
            self.set.constraints.push(id, target);
        }
        kept.len()
    }

    /// The constraint pins accumulated so far.
    pub fn constraints(&self) -> &Pins {
        &self.set.constraints
    }

    /// The contour pins accumulated so far.
    pub fn contour(&self) -> &Pins {
        &self.set.contour
    }

    /// Validate and hand over the assembled set.
    ///
    /// Fails if any vertex appears twice across the union of both groups; a
    /// duplicate would give the solver two targets for one vertex.
    pub fn finish(self) -> Result<ConstraintSet> {
        let mut seen = HashSet::with_capacity(self.set.total_pins());
        for pin in self.set.iter_all() {
            if !seen.insert(pin.vertex) {
                return Err(FlattenError::singular(format!(
                    "vertex {:?} is pinned more than once across the constraint and contour lists",
                    pin.vertex
                )));
            }
        }
        Ok(self.set)
    }
}
