//! End-to-end flattening pipeline.
//!
//! [`FlattenPipeline`] turns an open atrial surface plus its detected
//! anatomy (hole contours, rim seed points, dividing paths) into a flat
//! disk parameterization. The stages run in a fixed order:
//!
//! 1. validate the inputs against the configured topology,
//! 2. generate the disk template from the configuration,
//! 3. translate the four rim seed points to mesh vertices,
//! 4. identify each dividing path's extreme on its hole contours and
//!    partition every hole contour into per-anchor segments,
//! 5. re-route the dividing paths between the partition extremes so path
//!    endpoints and contour cut points coincide,
//! 6. split the outer rim at the four seed vertices,
//! 7. scatter all contours and paths onto their template targets as pins,
//! 8. solve the constrained harmonic system, then re-solve with boundary
//!    refinement to relax the interior path pins.
//!
//! Inputs are borrowed; the pipeline never mutates the mesh. All stage
//! failures surface as [`FlattenError`](crate::error::FlattenError) values
//! naming the offending structure.

use std::collections::HashSet;

use log::debug;
use nalgebra::Point3;

use crate::algo::assemble::{split_rim, Assembler, LandmarkMatch, RimSplit};
use crate::algo::flatten::{
    flatten, refine_boundary, ConstraintSet, FlatMap, FlattenOptions,
};
use crate::algo::route::route_between;
use crate::algo::segment::{partition_proportional, partition_two_way, ContourPartition};
use crate::algo::template::{
    AnchorTarget, DiskTemplate, HoleLabel, HoleTemplate, RimLandmark, TemplateConfig, Topology,
};
use crate::error::{FlattenError, Result};
use crate::mesh::{Contour, HalfEdgeMesh, PointLocator, SurfacePath, VertexId};

/// The four outer-rim seed points, given as 3D positions.
///
/// Each point is translated to its nearest mesh vertex before use, so seeds
/// picked on a different tessellation of the same anatomy still resolve.
/// `v5` marks the start of the rim cycle; `v6`..`v8` follow it around.
#[derive(Debug, Clone, Copy)]
pub struct RimSeeds {
    /// Seed for the first rim landmark.
    pub v5: Point3<f64>,
    /// Seed for the second rim landmark.
    pub v6: Point3<f64>,
    /// Seed for the third rim landmark.
    pub v7: Point3<f64>,
    /// Seed for the fourth rim landmark.
    pub v8: Point3<f64>,
}

impl RimSeeds {
    /// Bundle four seed positions in rim order.
    pub fn new(v5: Point3<f64>, v6: Point3<f64>, v7: Point3<f64>, v8: Point3<f64>) -> Self {
        Self { v5, v6, v7, v8 }
    }

    /// The seeds as an array indexed like [`RimLandmark::index`].
    pub fn points(&self) -> [Point3<f64>; 4] {
        [self.v5, self.v6, self.v7, self.v8]
    }
}

/// The detected boundary contours of the opened surface.
///
/// The four vein contours and the rim are always required. The appendage
/// contour is required for [`Topology::FiveHole`] and ignored otherwise.
#[derive(Debug, Clone)]
pub struct Contours {
    /// Right superior pulmonary vein contour.
    pub rspv: Contour,
    /// Right inferior pulmonary vein contour.
    pub ripv: Contour,
    /// Left inferior pulmonary vein contour.
    pub lipv: Contour,
    /// Left superior pulmonary vein contour.
    pub lspv: Contour,
    /// Outer rim contour.
    pub rim: Contour,
    /// Appendage contour, five-hole topology only.
    pub laa: Option<Contour>,
}

/// The dividing paths traced on the surface between anatomical structures.
///
/// Only the endpoints of each path matter on input: the pipeline snaps them
/// onto the structures they connect and re-routes the interior as a shortest
/// edge walk. Fields that exist in one topology only are optional; see each
/// field's note.
#[derive(Debug, Clone)]
pub struct DividingPaths {
    /// Path across the right carina, joining the two right vein contours.
    pub right_carina: SurfacePath,
    /// Path along the posterior floor, joining the two inferior vein
    /// contours.
    pub posterior_floor: SurfacePath,
    /// Path across the left carina, joining the two left vein contours.
    pub left_carina: SurfacePath,
    /// Path over the roof, joining the two superior vein contours.
    pub roof: SurfacePath,
    /// Gate path from the first rim seed to the rspv contour.
    pub rspv_gate: SurfacePath,
    /// Gate path from the second rim seed to the ripv contour.
    pub ripv_gate: SurfacePath,
    /// Gate path from the third rim seed to the lipv contour.
    pub lipv_gate: SurfacePath,
    /// Gate path from the fourth rim seed to the lspv contour. Required for
    /// [`Topology::FourHole`]; unused in five-hole inputs.
    pub lspv_gate: Option<SurfacePath>,
    /// Path over the lateral ridge, joining the appendage and lspv
    /// contours. Required for [`Topology::FiveHole`].
    pub lateral_ridge: Option<SurfacePath>,
    /// Gate path from the fourth rim seed to the appendage contour.
    /// Required for [`Topology::FiveHole`].
    pub appendage_gate: Option<SurfacePath>,
    /// Witness path touching the appendage contour on its far side. Five-hole
    /// only; it orients the appendage cut and is not itself pinned.
    pub appendage_witness: Option<SurfacePath>,
}

/// Everything the pipeline needs for one run.
#[derive(Debug)]
pub struct FlattenInput<'a> {
    /// The opened surface to flatten.
    pub mesh: &'a HalfEdgeMesh,
    /// The four rim seed points.
    pub seeds: RimSeeds,
    /// Detected boundary contours.
    pub contours: Contours,
    /// Detected dividing paths.
    pub paths: DividingPaths,
}

/// Output of a pipeline run.
#[derive(Debug, Clone)]
pub struct FlattenResult {
    /// The final parameterization, after boundary refinement.
    pub map: FlatMap,
    /// The first-pass parameterization, with the dividing paths still
    /// pinned to their template lines.
    pub first_pass: FlatMap,
    /// The re-routed dividing paths actually pinned. Endpoints are the
    /// displaced partition extremes; the witness path is consumed during
    /// partitioning and comes back as `None`.
    pub paths: DividingPaths,
    /// How each rim seed vertex resolved onto the rim contour, indexed like
    /// [`RimLandmark::index`].
    pub rim_lookups: [LandmarkMatch; 4],
}

/// The constrained flattening pipeline.
///
/// Holds the template configuration and solver options; [`run`] borrows the
/// input and produces a [`FlattenResult`]. The pipeline itself is stateless
/// across runs and can be reused.
///
/// [`run`]: FlattenPipeline::run
#[derive(Debug, Clone)]
pub struct FlattenPipeline {
    config: TemplateConfig,
    options: FlattenOptions,
}

impl FlattenPipeline {
    /// Create a pipeline for the given template configuration with default
    /// solver options.
    pub fn new(config: TemplateConfig) -> Self {
        Self {
            config,
            options: FlattenOptions::default(),
        }
    }

    /// Replace the solver options.
    pub fn with_options(mut self, options: FlattenOptions) -> Self {
        self.options = options;
        self
    }

    /// The template configuration this pipeline runs with.
    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    /// The solver options this pipeline runs with.
    pub fn options(&self) -> &FlattenOptions {
        &self.options
    }

    /// Flatten one surface.
    ///
    /// Runs every stage in order and returns the final and first-pass maps
    /// together with the re-routed paths. See the module docs for the stage
    /// list.
    pub fn run(&self, input: &FlattenInput<'_>) -> Result<FlattenResult> {
        validate(self.config.topology, input)?;
        let mesh = input.mesh;

        let template = DiskTemplate::generate(&self.config);
        debug!(
            "generated {:?} template: {} holes, disk radius {}",
            template.topology,
            template.holes.len(),
            template.disk_radius
        );

        let locator = PointLocator::build(mesh);
        let seed_points = input.seeds.points();
        let mut rim_ids = [VertexId::invalid(); 4];
        for (slot, point) in seed_points.iter().enumerate() {
            rim_ids[slot] = locator
                .nearest(point, mesh)
                .ok_or(FlattenError::EmptyMesh)?;
        }
        debug!("rim seeds resolved to vertices {:?}", rim_ids);

        let partitions = partition_holes(mesh, &template, &input.contours, &input.paths)?;
        debug!(
            "partitioned {} hole contours",
            4 + usize::from(partitions.laa.is_some())
        );

        let paths = reroute(mesh, &template, &partitions, &rim_ids)?;
        debug!("re-routed dividing paths between partition extremes");

        let split = split_rim(&input.contours.rim, &rim_ids, &seed_points, mesh)?;
        let set = assemble_pins(&template, &partitions, &split, &paths)?;
        debug!(
            "assembled {} contour pins and {} constraint pins",
            set.contour.len(),
            set.constraints.len()
        );

        let first_pass = flatten(mesh, &set, &self.options)?;
        let map = refine_boundary(mesh, &first_pass, &set.contour, &self.options)?;
        debug!("solved both passes over {} vertices", map.len());

        Ok(FlattenResult {
            map,
            first_pass,
            paths,
            rim_lookups: split.lookups,
        })
    }
}

/// Per-hole contour partitions, keyed by hole label.
struct HolePartitions {
    rspv: ContourPartition,
    ripv: ContourPartition,
    lipv: ContourPartition,
    lspv: ContourPartition,
    laa: Option<ContourPartition>,
}

impl HolePartitions {
    fn get(&self, label: HoleLabel) -> Result<&ContourPartition> {
        match label {
            HoleLabel::Rspv => Ok(&self.rspv),
            HoleLabel::Ripv => Ok(&self.ripv),
            HoleLabel::Lipv => Ok(&self.lipv),
            HoleLabel::Lspv => Ok(&self.lspv),
            HoleLabel::Laa => self.laa.as_ref().ok_or(FlattenError::InputMissing {
                structure: "laa contour",
            }),
        }
    }
}

/// Check that every structure the topology needs is present and non-empty.
fn validate(topology: Topology, input: &FlattenInput<'_>) -> Result<()> {
    let c = &input.contours;
    require_contour(&c.rspv, "rspv contour")?;
    require_contour(&c.ripv, "ripv contour")?;
    require_contour(&c.lipv, "lipv contour")?;
    require_contour(&c.lspv, "lspv contour")?;
    require_contour(&c.rim, "rim contour")?;

    let p = &input.paths;
    require_path(Some(&p.right_carina), "right carina path")?;
    require_path(Some(&p.posterior_floor), "posterior floor path")?;
    require_path(Some(&p.left_carina), "left carina path")?;
    require_path(Some(&p.roof), "roof path")?;
    require_path(Some(&p.rspv_gate), "rspv rim gate")?;
    require_path(Some(&p.ripv_gate), "ripv rim gate")?;
    require_path(Some(&p.lipv_gate), "lipv rim gate")?;

    match topology {
        Topology::FourHole => {
            require_path(p.lspv_gate.as_ref(), "lspv rim gate")?;
        }
        Topology::FiveHole => {
            match &c.laa {
                Some(laa) if !laa.is_empty() => {}
                _ => {
                    return Err(FlattenError::InputMissing {
                        structure: "laa contour",
                    })
                }
            }
            require_path(p.lateral_ridge.as_ref(), "lateral ridge path")?;
            require_path(p.appendage_gate.as_ref(), "appendage rim gate")?;
            require_path(p.appendage_witness.as_ref(), "appendage witness path")?;
        }
    }
    Ok(())
}

fn require_contour(contour: &Contour, label: &'static str) -> Result<()> {
    if contour.is_empty() {
        return Err(FlattenError::InputMissing { structure: label });
    }
    Ok(())
}

fn require_path(path: Option<&SurfacePath>, label: &'static str) -> Result<()> {
    match path {
        Some(p) if !p.is_empty() => Ok(()),
        _ => Err(FlattenError::InputMissing { structure: label }),
    }
}

fn required<'a>(path: &'a Option<SurfacePath>, label: &'static str) -> Result<&'a SurfacePath> {
    path.as_ref()
        .ok_or(FlattenError::InputMissing { structure: label })
}

/// The contour vertex closest to `point`, with its squared distance.
fn nearest_on_contour(
    mesh: &HalfEdgeMesh,
    contour: &Contour,
    point: &Point3<f64>,
) -> (VertexId, f64) {
    let mut best = contour.id_at(0);
    let mut best_d2 = f64::INFINITY;
    for id in contour.iter() {
        let d2 = (mesh.position(id) - point).norm_squared();
        if d2 < best_d2 {
            best_d2 = d2;
            best = id;
        }
    }
    (best, best_d2)
}

/// The extreme of a dividing path on one of its incident contours.
///
/// Of the two path endpoints, the one closer to the contour is taken, then
/// snapped to the nearest contour id. Only the endpoints of the path are
/// consulted; the interior is re-routed later anyway.
fn extreme_on(
    mesh: &HalfEdgeMesh,
    path: &SurfacePath,
    contour: &Contour,
    path_label: &'static str,
    contour_label: &str,
) -> Result<VertexId> {
    let (head, tail) = match (path.first(), path.last()) {
        (Some(head), Some(tail)) => (head, tail),
        _ => {
            return Err(FlattenError::InputMissing {
                structure: path_label,
            })
        }
    };
    if contour.is_empty() {
        return Err(FlattenError::BoundaryMismatch {
            landmark: head.index(),
            contour: contour_label.to_string(),
        });
    }

    let (head_id, head_d2) = nearest_on_contour(mesh, contour, mesh.position(head));
    let (tail_id, tail_d2) = nearest_on_contour(mesh, contour, mesh.position(tail));
    Ok(if head_d2 <= tail_d2 { head_id } else { tail_id })
}

fn hole_template(template: &DiskTemplate, label: HoleLabel) -> Result<&HoleTemplate> {
    template.hole(label).ok_or(FlattenError::InputMissing {
        structure: "laa contour",
    })
}

fn anchor_slot(hole: &HoleTemplate, target: AnchorTarget) -> Result<usize> {
    hole.anchors
        .iter()
        .position(|a| a.target == target)
        .ok_or_else(|| {
            FlattenError::singular(format!(
                "{} template has no anchor toward {:?}",
                hole.label.name(),
                target
            ))
        })
}

/// The dividing path incident to `hole` at the anchor facing `target`.
fn incident_path<'a>(
    paths: &'a DividingPaths,
    hole: HoleLabel,
    target: AnchorTarget,
) -> Result<(&'a SurfacePath, &'static str)> {
    use AnchorTarget::{Hole, Rim};
    use HoleLabel::{Laa, Lipv, Lspv, Ripv, Rspv};

    match (hole, target) {
        (Rspv, Hole(Ripv)) | (Ripv, Hole(Rspv)) => Ok((&paths.right_carina, "right carina path")),
        (Ripv, Hole(Lipv)) | (Lipv, Hole(Ripv)) => {
            Ok((&paths.posterior_floor, "posterior floor path"))
        }
        (Lipv, Hole(Lspv)) | (Lspv, Hole(Lipv)) => Ok((&paths.left_carina, "left carina path")),
        (Lspv, Hole(Rspv)) | (Rspv, Hole(Lspv)) => Ok((&paths.roof, "roof path")),
        (Rspv, Rim(RimLandmark::V5)) => Ok((&paths.rspv_gate, "rspv rim gate")),
        (Ripv, Rim(RimLandmark::V6)) => Ok((&paths.ripv_gate, "ripv rim gate")),
        (Lipv, Rim(RimLandmark::V7)) => Ok((&paths.lipv_gate, "lipv rim gate")),
        (Lspv, Rim(RimLandmark::V8)) => {
            Ok((required(&paths.lspv_gate, "lspv rim gate")?, "lspv rim gate"))
        }
        (Lspv, Hole(Laa)) | (Laa, Hole(Lspv)) => Ok((
            required(&paths.lateral_ridge, "lateral ridge path")?,
            "lateral ridge path",
        )),
        (Laa, Rim(RimLandmark::V8)) => Ok((
            required(&paths.appendage_gate, "appendage rim gate")?,
            "appendage rim gate",
        )),
        _ => Err(FlattenError::singular(format!(
            "no dividing path joins {} to {:?}",
            hole.name(),
            target
        ))),
    }
}

/// Partition a vein contour into three segments sized by the template arcs.
///
/// The landmark for each anchor slot is the extreme of that slot's incident
/// dividing path, so the partition always starts at the canonical anchor and
/// walks the contour counter-clockwise.
fn partition_three_way(
    mesh: &HalfEdgeMesh,
    paths: &DividingPaths,
    hole: &HoleTemplate,
    contour: &Contour,
) -> Result<ContourPartition> {
    if hole.anchors.len() != 3 {
        return Err(FlattenError::singular(format!(
            "{} template lists {} anchors, expected 3",
            hole.label.name(),
            hole.anchors.len()
        )));
    }

    let mut landmarks = [VertexId::invalid(); 3];
    for (slot, anchor) in hole.anchors.iter().enumerate() {
        let (path, path_label) = incident_path(paths, hole.label, anchor.target)?;
        landmarks[slot] = extreme_on(mesh, path, contour, path_label, hole.label.name())?;
    }

    let proportions = [
        hole.proportions[0],
        hole.proportions[1],
        hole.proportions[2],
    ];
    partition_proportional(contour, landmarks, proportions, hole.label.name())
}

/// Partition the appendage contour at its two observed extremes.
///
/// No proportional redistribution: the appendage keeps the cut points where
/// the paths actually touch it. The witness path orients the cycle.
fn partition_appendage(
    mesh: &HalfEdgeMesh,
    paths: &DividingPaths,
    hole: &HoleTemplate,
    contour: &Contour,
) -> Result<ContourPartition> {
    if hole.anchors.len() != 2 {
        return Err(FlattenError::singular(format!(
            "{} template lists {} anchors, expected 2",
            hole.label.name(),
            hole.anchors.len()
        )));
    }

    let mut extremes = [VertexId::invalid(); 2];
    for (slot, anchor) in hole.anchors.iter().enumerate() {
        let (path, path_label) = incident_path(paths, hole.label, anchor.target)?;
        extremes[slot] = extreme_on(mesh, path, contour, path_label, hole.label.name())?;
    }

    let witness_path = required(&paths.appendage_witness, "appendage witness path")?;
    let witness = extreme_on(
        mesh,
        witness_path,
        contour,
        "appendage witness path",
        hole.label.name(),
    )?;

    partition_two_way(contour, extremes[0], extremes[1], witness, hole.label.name())
}

fn partition_holes(
    mesh: &HalfEdgeMesh,
    template: &DiskTemplate,
    contours: &Contours,
    paths: &DividingPaths,
) -> Result<HolePartitions> {
    let three_way = |label: HoleLabel, contour: &Contour| -> Result<ContourPartition> {
        partition_three_way(mesh, paths, hole_template(template, label)?, contour)
    };

    let rspv = three_way(HoleLabel::Rspv, &contours.rspv)?;
    let ripv = three_way(HoleLabel::Ripv, &contours.ripv)?;
    let lipv = three_way(HoleLabel::Lipv, &contours.lipv)?;
    let lspv = three_way(HoleLabel::Lspv, &contours.lspv)?;

    let laa = match template.topology {
        Topology::FourHole => None,
        Topology::FiveHole => {
            let contour = contours.laa.as_ref().ok_or(FlattenError::InputMissing {
                structure: "laa contour",
            })?;
            Some(partition_appendage(
                mesh,
                paths,
                hole_template(template, HoleLabel::Laa)?,
                contour,
            )?)
        }
    };

    Ok(HolePartitions {
        rspv,
        ripv,
        lipv,
        lspv,
        laa,
    })
}

/// The partition extreme sitting at a hole's anchor slot for `target`.
fn anchor_extreme(
    template: &DiskTemplate,
    partitions: &HolePartitions,
    label: HoleLabel,
    target: AnchorTarget,
) -> Result<VertexId> {
    let hole = hole_template(template, label)?;
    let slot = anchor_slot(hole, target)?;
    let extremes = partitions.get(label)?.extremes();
    extremes.get(slot).copied().ok_or_else(|| {
        FlattenError::singular(format!(
            "{} partition has no segment for anchor slot {}",
            label.name(),
            slot
        ))
    })
}

/// Re-route every dividing path as a shortest edge walk between the
/// partition extremes it must join.
///
/// The original traced paths are discarded past their endpoints; routing
/// from the displaced extremes guarantees each path meets its contours
/// exactly at the cut points the partition chose.
fn reroute(
    mesh: &HalfEdgeMesh,
    template: &DiskTemplate,
    partitions: &HolePartitions,
    rim_ids: &[VertexId; 4],
) -> Result<DividingPaths> {
    use AnchorTarget::{Hole, Rim};
    use HoleLabel::{Laa, Lipv, Lspv, Ripv, Rspv};
    use RimLandmark::{V5, V6, V7, V8};

    let ext = |label, target| anchor_extreme(template, partitions, label, target);

    let right_carina = route_between(mesh, ext(Ripv, Hole(Rspv))?, ext(Rspv, Hole(Ripv))?)?;
    let posterior_floor = route_between(mesh, ext(Lipv, Hole(Ripv))?, ext(Ripv, Hole(Lipv))?)?;
    let left_carina = route_between(mesh, ext(Lspv, Hole(Lipv))?, ext(Lipv, Hole(Lspv))?)?;
    let roof = route_between(mesh, ext(Rspv, Hole(Lspv))?, ext(Lspv, Hole(Rspv))?)?;

    let rspv_gate = route_between(mesh, rim_ids[0], ext(Rspv, Rim(V5))?)?;
    let ripv_gate = route_between(mesh, rim_ids[1], ext(Ripv, Rim(V6))?)?;
    let lipv_gate = route_between(mesh, rim_ids[2], ext(Lipv, Rim(V7))?)?;

    let (lspv_gate, lateral_ridge, appendage_gate) = match template.topology {
        Topology::FourHole => {
            let gate = route_between(mesh, rim_ids[3], ext(Lspv, Rim(V8))?)?;
            (Some(gate), None, None)
        }
        Topology::FiveHole => {
            let ridge = route_between(mesh, ext(Laa, Hole(Lspv))?, ext(Lspv, Hole(Laa))?)?;
            let gate = route_between(mesh, rim_ids[3], ext(Laa, Rim(V8))?)?;
            (None, Some(ridge), Some(gate))
        }
    };

    Ok(DividingPaths {
        right_carina,
        posterior_floor,
        left_carina,
        roof,
        rspv_gate,
        ripv_gate,
        lipv_gate,
        lspv_gate,
        lateral_ridge,
        appendage_gate,
        appendage_witness: None,
    })
}

/// A hole's attachment point for one dividing path: the template hole, the
/// anchor slot, and the contour partition behind it.
fn attachment<'a>(
    template: &'a DiskTemplate,
    partitions: &'a HolePartitions,
    label: HoleLabel,
    target: AnchorTarget,
) -> Result<(&'a HoleTemplate, usize, &'a ContourPartition)> {
    let hole = hole_template(template, label)?;
    let slot = anchor_slot(hole, target)?;
    let partition = partitions.get(label)?;
    Ok((hole, slot, partition))
}

/// Insert the two partition segments flanking an anchor slot into the
/// exclusion set. These ids are already pinned as contour points.
fn extend_flanking(excluded: &mut HashSet<VertexId>, partition: &ContourPartition, slot: usize) {
    let n = partition.len();
    if n == 0 {
        return;
    }
    for k in [(slot + n - 1) % n, slot] {
        for &id in partition.segment(k).ids() {
            excluded.insert(id);
        }
    }
}

/// Pin a hole-to-hole path onto the straight template line between its two
/// anchor points.
fn pin_link(
    assembler: &mut Assembler,
    template: &DiskTemplate,
    partitions: &HolePartitions,
    path: &SurfacePath,
    from: (HoleLabel, AnchorTarget),
    to: (HoleLabel, AnchorTarget),
) -> Result<()> {
    let (from_hole, from_slot, from_partition) = attachment(template, partitions, from.0, from.1)?;
    let (to_hole, to_slot, to_partition) = attachment(template, partitions, to.0, to.1)?;

    let mut excluded = HashSet::new();
    extend_flanking(&mut excluded, from_partition, from_slot);
    extend_flanking(&mut excluded, to_partition, to_slot);

    assembler.add_interior_path(
        path,
        &excluded,
        from_hole.anchors[from_slot].position,
        to_hole.anchors[to_slot].position,
    );
    Ok(())
}

/// Pin a rim gate path onto the straight template line from its rim anchor
/// to its hole anchor.
fn pin_gate(
    assembler: &mut Assembler,
    template: &DiskTemplate,
    partitions: &HolePartitions,
    rim_ids: &HashSet<VertexId>,
    path: &SurfacePath,
    landmark: RimLandmark,
    to: (HoleLabel, AnchorTarget),
) -> Result<()> {
    let (hole, slot, partition) = attachment(template, partitions, to.0, to.1)?;

    let mut excluded = rim_ids.clone();
    extend_flanking(&mut excluded, partition, slot);

    assembler.add_interior_path(
        path,
        &excluded,
        template.rim.anchors[landmark.index()],
        hole.anchors[slot].position,
    );
    Ok(())
}

/// Scatter every contour segment and dividing path onto the template.
///
/// Contour pins come first (rim, then the holes in anatomical order), then
/// the dividing paths in their canonical order. Ids pinned by a contour are
/// stripped from path interiors so no vertex is pinned twice.
fn assemble_pins(
    template: &DiskTemplate,
    partitions: &HolePartitions,
    split: &RimSplit,
    paths: &DividingPaths,
) -> Result<ConstraintSet> {
    use AnchorTarget::{Hole, Rim};
    use HoleLabel::{Laa, Lipv, Lspv, Ripv, Rspv};
    use RimLandmark::{V5, V6, V7, V8};

    let mut assembler = Assembler::new();

    assembler.add_rim_contour(&template.rim, split);
    for label in [Rspv, Ripv, Lipv, Lspv] {
        assembler.add_hole_contour(hole_template(template, label)?, partitions.get(label)?);
    }
    if let Some(partition) = &partitions.laa {
        assembler.add_hole_contour(hole_template(template, Laa)?, partition);
    }

    let rim_ids: HashSet<VertexId> = split.iter_ids().collect();

    pin_link(
        &mut assembler,
        template,
        partitions,
        &paths.right_carina,
        (Ripv, Hole(Rspv)),
        (Rspv, Hole(Ripv)),
    )?;
    pin_link(
        &mut assembler,
        template,
        partitions,
        &paths.posterior_floor,
        (Lipv, Hole(Ripv)),
        (Ripv, Hole(Lipv)),
    )?;
    pin_link(
        &mut assembler,
        template,
        partitions,
        &paths.left_carina,
        (Lspv, Hole(Lipv)),
        (Lipv, Hole(Lspv)),
    )?;
    pin_link(
        &mut assembler,
        template,
        partitions,
        &paths.roof,
        (Rspv, Hole(Lspv)),
        (Lspv, Hole(Rspv)),
    )?;

    pin_gate(
        &mut assembler,
        template,
        partitions,
        &rim_ids,
        &paths.rspv_gate,
        V5,
        (Rspv, Rim(V5)),
    )?;
    pin_gate(
        &mut assembler,
        template,
        partitions,
        &rim_ids,
        &paths.ripv_gate,
        V6,
        (Ripv, Rim(V6)),
    )?;
    pin_gate(
        &mut assembler,
        template,
        partitions,
        &rim_ids,
        &paths.lipv_gate,
        V7,
        (Lipv, Rim(V7)),
    )?;

    match template.topology {
        Topology::FourHole => {
            let gate = required(&paths.lspv_gate, "lspv rim gate")?;
            pin_gate(
                &mut assembler,
                template,
                partitions,
                &rim_ids,
                gate,
                V8,
                (Lspv, Rim(V8)),
            )?;
        }
        Topology::FiveHole => {
            let ridge = required(&paths.lateral_ridge, "lateral ridge path")?;
            pin_link(
                &mut assembler,
                template,
                partitions,
                ridge,
                (Laa, Hole(Lspv)),
                (Lspv, Hole(Laa)),
            )?;
            let gate = required(&paths.appendage_gate, "appendage rim gate")?;
            pin_gate(
                &mut assembler,
                template,
                partitions,
                &rim_ids,
                gate,
                V8,
                (Laa, Rim(V8)),
            )?;
        }
    }

    assembler.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_triangles;

    fn v(index: usize) -> VertexId {
        VertexId::new(index)
    }

    /// A flat square grid with `side` vertices per side, some cells left
    /// unfilled as holes. Vertex (i, j) has index `j * side + i` and sits
    /// at (i, j, 0).
    fn punched_grid(side: usize, punched: &[(usize, usize)]) -> HalfEdgeMesh {
        let mut vertices = Vec::with_capacity(side * side);
        for j in 0..side {
            for i in 0..side {
                vertices.push(Point3::new(i as f64, j as f64, 0.0));
            }
        }
        let at = |i: usize, j: usize| j * side + i;
        let mut faces = Vec::new();
        for cj in 0..side - 1 {
            for ci in 0..side - 1 {
                if punched.contains(&(ci, cj)) {
                    continue;
                }
                faces.push([at(ci, cj), at(ci + 1, cj), at(ci + 1, cj + 1)]);
                faces.push([at(ci, cj), at(ci + 1, cj + 1), at(ci, cj + 1)]);
            }
        }
        build_from_triangles(&vertices, &faces).unwrap()
    }

    /// The counter-clockwise contour of one punched cell.
    fn cell_contour(side: usize, ci: usize, cj: usize) -> Contour {
        let at = |i: usize, j: usize| v(j * side + i);
        Contour::new(vec![
            at(ci, cj),
            at(ci + 1, cj),
            at(ci + 1, cj + 1),
            at(ci, cj + 1),
        ])
    }

    /// The counter-clockwise outer rim of the grid.
    fn grid_rim(side: usize) -> Contour {
        let at = |i: usize, j: usize| v(j * side + i);
        let mut ids = Vec::new();
        for i in 0..side - 1 {
            ids.push(at(i, 0));
        }
        for j in 0..side - 1 {
            ids.push(at(side - 1, j));
        }
        for i in (1..side).rev() {
            ids.push(at(i, side - 1));
        }
        for j in (1..side).rev() {
            ids.push(at(0, j));
        }
        Contour::new(ids)
    }

    fn pair(a: usize, b: usize) -> SurfacePath {
        SurfacePath::new(vec![v(a), v(b)])
    }

    fn seed(i: usize, j: usize) -> Point3<f64> {
        Point3::new(i as f64, j as f64, 0.0)
    }

    /// A 10x10 grid with the four vein cells punched out. Landmarks are
    /// placed so the proportional partition reproduces the observed
    /// extremes exactly, making every re-routed corridor predictable.
    fn four_hole_parts() -> (HalfEdgeMesh, RimSeeds, Contours, DividingPaths) {
        let side = 10;
        let mesh = punched_grid(side, &[(6, 6), (6, 2), (2, 2), (2, 6)]);
        let seeds = RimSeeds::new(seed(9, 7), seed(9, 2), seed(0, 2), seed(0, 7));
        let contours = Contours {
            rspv: cell_contour(side, 6, 6),
            ripv: cell_contour(side, 6, 2),
            lipv: cell_contour(side, 2, 2),
            lspv: cell_contour(side, 2, 6),
            rim: grid_rim(side),
            laa: None,
        };
        let paths = DividingPaths {
            right_carina: pair(36, 66),
            posterior_floor: pair(23, 26),
            left_carina: pair(33, 63),
            roof: pair(76, 73),
            rspv_gate: pair(79, 67),
            ripv_gate: pair(29, 37),
            lipv_gate: pair(20, 32),
            lspv_gate: Some(pair(70, 72)),
            lateral_ridge: None,
            appendage_gate: None,
            appendage_witness: None,
        };
        (mesh, seeds, contours, paths)
    }

    /// A 13x13 grid with five punched cells, appendage included.
    fn five_hole_parts() -> (HalfEdgeMesh, RimSeeds, Contours, DividingPaths) {
        let side = 13;
        let mesh = punched_grid(side, &[(9, 8), (9, 2), (2, 2), (2, 8), (4, 10)]);
        let seeds = RimSeeds::new(seed(12, 9), seed(12, 2), seed(0, 2), seed(0, 11));
        let contours = Contours {
            rspv: cell_contour(side, 9, 8),
            ripv: cell_contour(side, 9, 2),
            lipv: cell_contour(side, 2, 2),
            lspv: cell_contour(side, 2, 8),
            rim: grid_rim(side),
            laa: Some(cell_contour(side, 4, 10)),
        };
        let paths = DividingPaths {
            right_carina: pair(48, 113),
            posterior_floor: pair(29, 35),
            left_carina: pair(42, 107),
            roof: pair(126, 120),
            rspv_gate: pair(129, 114),
            ripv_gate: pair(38, 49),
            lipv_gate: pair(26, 41),
            lspv_gate: None,
            lateral_ridge: Some(pair(134, 119)),
            appendage_gate: Some(pair(143, 147)),
            appendage_witness: Some(pair(135, 127)),
        };
        (mesh, seeds, contours, paths)
    }

    fn path_ids(path: &SurfacePath) -> Vec<usize> {
        path.ids().iter().map(|id| id.index()).collect()
    }

    #[test]
    fn test_extreme_snaps_nearer_endpoint() {
        let (mesh, _, contours, _) = four_hole_parts();
        // 47 sits one row above the ripv contour, 66 is on the rspv contour
        let path = pair(47, 66);
        let id = extreme_on(&mesh, &path, &contours.ripv, "path", "ripv").unwrap();
        assert_eq!(id, v(37));
    }

    #[test]
    fn test_extreme_on_empty_path() {
        let (mesh, _, contours, _) = four_hole_parts();
        let path = SurfacePath::new(Vec::new());
        let err = extreme_on(&mesh, &path, &contours.ripv, "roof path", "ripv").unwrap_err();
        assert!(matches!(
            err,
            FlattenError::InputMissing {
                structure: "roof path"
            }
        ));
    }

    #[test]
    fn test_run_four_hole() {
        let (mesh, seeds, contours, paths) = four_hole_parts();
        let input = FlattenInput {
            mesh: &mesh,
            seeds,
            contours: contours.clone(),
            paths,
        };
        let config = TemplateConfig::standard(Topology::FourHole);
        let pipeline = FlattenPipeline::new(config.clone());
        let result = pipeline.run(&input).unwrap();

        assert_eq!(result.map.len(), mesh.num_vertices());
        for (_, p) in result.map.iter() {
            assert!(p.x.is_finite() && p.y.is_finite());
        }

        // Rim vertices land on the outer circle and survive refinement
        // untouched.
        for id in contours.rim.iter() {
            let p = result.map.get(id);
            assert!((p.coords.norm() - config.disk_radius).abs() < 1e-9);
            assert_eq!(p, result.first_pass.get(id));
        }

        // Every hole contour lands on its template circle.
        let template = DiskTemplate::generate(&config);
        let holes = [
            (HoleLabel::Rspv, &contours.rspv),
            (HoleLabel::Ripv, &contours.ripv),
            (HoleLabel::Lipv, &contours.lipv),
            (HoleLabel::Lspv, &contours.lspv),
        ];
        for (label, contour) in holes {
            let hole = template.hole(label).unwrap();
            for id in contour.iter() {
                let p = result.map.get(id);
                assert!(((p - hole.center).norm() - hole.radius).abs() < 1e-9);
                assert_eq!(p, result.first_pass.get(id));
            }
        }

        // All four seeds resolve exactly on the rim.
        for lookup in &result.rim_lookups {
            assert!(matches!(lookup, LandmarkMatch::Exact(_)));
        }

        // Re-routed paths run between the partition extremes. The four
        // structural paths have unique shortest walks on this grid.
        assert_eq!(path_ids(&result.paths.right_carina), vec![36, 46, 56, 66]);
        assert_eq!(path_ids(&result.paths.posterior_floor), vec![23, 24, 25, 26]);
        assert_eq!(path_ids(&result.paths.left_carina), vec![63, 53, 43, 33]);
        assert_eq!(path_ids(&result.paths.roof), vec![76, 75, 74, 73]);
        let lspv_gate = result.paths.lspv_gate.as_ref().unwrap();
        assert_eq!(path_ids(lspv_gate), vec![70, 71, 72]);

        // Rim gates admit equal-cost ties; check endpoints and length only.
        // The ripv gate crosses against the cell diagonals and needs one
        // extra step.
        for (gate, from, to, len) in [
            (&result.paths.rspv_gate, 79, 67, 3),
            (&result.paths.ripv_gate, 29, 37, 4),
            (&result.paths.lipv_gate, 20, 32, 3),
        ] {
            assert_eq!(gate.first(), Some(v(from)));
            assert_eq!(gate.last(), Some(v(to)));
            assert_eq!(gate.len(), len);
            assert!(gate.is_edge_connected(&mesh));
        }

        assert!(result.paths.lateral_ridge.is_none());
        assert!(result.paths.appendage_gate.is_none());
        assert!(result.paths.appendage_witness.is_none());

        // Refinement released the dividing-path pins, so something moved.
        let moved = result
            .map
            .iter()
            .any(|(id, p)| (p - result.first_pass.get(id)).norm() > 1e-6);
        assert!(moved);
    }

    #[test]
    fn test_run_is_deterministic() {
        let (mesh, seeds, contours, paths) = four_hole_parts();
        let input = FlattenInput {
            mesh: &mesh,
            seeds,
            contours,
            paths,
        };
        let pipeline = FlattenPipeline::new(TemplateConfig::standard(Topology::FourHole));
        let first = pipeline.run(&input).unwrap();
        let second = pipeline.run(&input).unwrap();
        assert_eq!(first.map, second.map);
        assert_eq!(first.first_pass, second.first_pass);
    }

    #[test]
    fn test_run_five_hole() {
        let (mesh, seeds, contours, paths) = five_hole_parts();
        let input = FlattenInput {
            mesh: &mesh,
            seeds,
            contours: contours.clone(),
            paths,
        };
        let config = TemplateConfig::standard(Topology::FiveHole);
        let pipeline = FlattenPipeline::new(config.clone());
        let result = pipeline.run(&input).unwrap();

        for (_, p) in result.map.iter() {
            assert!(p.x.is_finite() && p.y.is_finite());
        }

        // The appendage contour lands on its circle, and its two observed
        // cut points land exactly on the template anchors.
        let template = DiskTemplate::generate(&config);
        let laa = template.hole(HoleLabel::Laa).unwrap();
        for id in contours.laa.as_ref().unwrap().iter() {
            let p = result.map.get(id);
            assert!(((p - laa.center).norm() - laa.radius).abs() < 1e-9);
        }
        assert!((result.map.get(v(147)) - laa.anchors[0].position).norm() < 1e-12);
        assert!((result.map.get(v(134)) - laa.anchors[1].position).norm() < 1e-12);

        // Appendage paths replace the lspv gate in this topology.
        assert!(result.paths.lspv_gate.is_none());
        assert!(result.paths.appendage_witness.is_none());
        let ridge = result.paths.lateral_ridge.as_ref().unwrap();
        assert_eq!(ridge.first(), Some(v(134)));
        assert_eq!(ridge.last(), Some(v(119)));
        assert!(ridge.is_edge_connected(&mesh));
        let gate = result.paths.appendage_gate.as_ref().unwrap();
        assert_eq!(path_ids(gate), vec![143, 144, 145, 146, 147]);

        for lookup in &result.rim_lookups {
            assert!(matches!(lookup, LandmarkMatch::Exact(_)));
        }
    }

    #[test]
    fn test_five_hole_requires_laa_contour() {
        let (mesh, seeds, mut contours, paths) = five_hole_parts();
        contours.laa = None;
        let input = FlattenInput {
            mesh: &mesh,
            seeds,
            contours,
            paths,
        };
        let pipeline = FlattenPipeline::new(TemplateConfig::standard(Topology::FiveHole));
        let err = pipeline.run(&input).unwrap_err();
        assert!(matches!(
            err,
            FlattenError::InputMissing {
                structure: "laa contour"
            }
        ));
    }

    #[test]
    fn test_four_hole_requires_lspv_gate() {
        let (mesh, seeds, contours, mut paths) = four_hole_parts();
        paths.lspv_gate = None;
        let input = FlattenInput {
            mesh: &mesh,
            seeds,
            contours,
            paths,
        };
        let pipeline = FlattenPipeline::new(TemplateConfig::standard(Topology::FourHole));
        let err = pipeline.run(&input).unwrap_err();
        assert!(matches!(
            err,
            FlattenError::InputMissing {
                structure: "lspv rim gate"
            }
        ));
    }

    #[test]
    fn test_empty_contour_rejected() {
        let (mesh, seeds, mut contours, paths) = four_hole_parts();
        contours.ripv = Contour::new(Vec::new());
        let input = FlattenInput {
            mesh: &mesh,
            seeds,
            contours,
            paths,
        };
        let pipeline = FlattenPipeline::new(TemplateConfig::standard(Topology::FourHole));
        let err = pipeline.run(&input).unwrap_err();
        assert!(matches!(
            err,
            FlattenError::InputMissing {
                structure: "ripv contour"
            }
        ));
    }
}
