//! Geometric template generation.
//!
//! The template fixes the 2D layout every flattened mesh is registered to:
//! a unit disk carrying one circular hole per vein (plus one for the
//! appendage in the five-hole variant), four landmark points on the outer
//! rim, and per-hole anchor points that the dividing lines terminate at.
//! Everything is a pure function of the scalar configuration; the mesh is
//! never consulted.
//!
//! Anchor placement follows one rule: each anchor sits on its hole circle at
//! the angle facing its peer structure (the neighboring hole's center, or the
//! rim point it is gated to). Facing anchors of adjacent holes therefore lie
//! on the straight line between the hole centers, which keeps the dividing
//! lines straight and the facing segments compatible in length.

use std::f64::consts::{PI, TAU};

use nalgebra::Point2;

/// Boundary topology of the flattened disk.
///
/// The five-hole variant keeps the appendage as its own hole; the four-hole
/// variant merges it into the main opening, leaving only the four vein holes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Four vein holes, appendage merged into the outer opening.
    FourHole,
    /// Four vein holes plus a separate appendage hole.
    FiveHole,
}

/// Labels for the template holes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoleLabel {
    /// Right superior pulmonary vein hole.
    Rspv,
    /// Right inferior pulmonary vein hole.
    Ripv,
    /// Left inferior pulmonary vein hole.
    Lipv,
    /// Left superior pulmonary vein hole.
    Lspv,
    /// Appendage hole (five-hole topology only).
    Laa,
}

impl HoleLabel {
    /// Short lowercase name, used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            HoleLabel::Rspv => "rspv",
            HoleLabel::Ripv => "ripv",
            HoleLabel::Lipv => "lipv",
            HoleLabel::Lspv => "lspv",
            HoleLabel::Laa => "laa",
        }
    }
}

/// Labels for the four outer-rim landmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RimLandmark {
    /// First rim landmark; the rim cycle is rotated to start here.
    V5,
    /// Second rim landmark.
    V6,
    /// Third rim landmark.
    V7,
    /// Fourth rim landmark.
    V8,
}

impl RimLandmark {
    /// All four landmarks in rim order.
    pub const ALL: [RimLandmark; 4] = [
        RimLandmark::V5,
        RimLandmark::V6,
        RimLandmark::V7,
        RimLandmark::V8,
    ];

    /// Short name, used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            RimLandmark::V5 => "v5",
            RimLandmark::V6 => "v6",
            RimLandmark::V7 => "v7",
            RimLandmark::V8 => "v8",
        }
    }

    /// Index into rim angle/anchor arrays.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            RimLandmark::V5 => 0,
            RimLandmark::V6 => 1,
            RimLandmark::V7 => 2,
            RimLandmark::V8 => 3,
        }
    }
}

/// The peer structure a hole anchor faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorTarget {
    /// Faces the center of another hole.
    Hole(HoleLabel),
    /// Faces an outer-rim landmark point.
    Rim(RimLandmark),
}

/// Scalar configuration for template generation.
///
/// All values are supplied by run configuration; nothing is discovered from
/// the mesh. Hole non-overlap is a caller precondition.
#[derive(Debug, Clone)]
pub struct TemplateConfig {
    /// Which boundary topology to generate.
    pub topology: Topology,
    /// Radius of the outer disk.
    pub disk_radius: f64,
    /// Radius of the right superior vein hole.
    pub rspv_radius: f64,
    /// Radius of the right inferior vein hole.
    pub ripv_radius: f64,
    /// Radius of the left inferior vein hole.
    pub lipv_radius: f64,
    /// Radius of the left superior vein hole.
    pub lspv_radius: f64,
    /// Radius of the appendage hole (five-hole topology).
    pub laa_radius: f64,
    /// Center of the right superior vein hole.
    pub rspv_center: Point2<f64>,
    /// Center of the right inferior vein hole.
    pub ripv_center: Point2<f64>,
    /// Center of the left inferior vein hole.
    pub lipv_center: Point2<f64>,
    /// Center of the left superior vein hole.
    pub lspv_center: Point2<f64>,
    /// Center of the appendage hole (five-hole topology).
    pub laa_center: Point2<f64>,
    /// Angles (radians) of the four rim landmarks v5..v8 on the outer circle.
    pub rim_angles: [f64; 4],
}

impl TemplateConfig {
    /// The standard reference layout.
    ///
    /// Reproduces the published atrial template: a disk of radius 0.5 with
    /// the two left veins stacked on the left, the two right veins across the
    /// posterior wall, and the appendage above the left superior vein, offset
    /// slightly leftwards.
    pub fn standard(topology: Topology) -> Self {
        let r_min = 0.03;

        let x_ref = -0.25;
        let y_ref = -0.10;
        let left_carina = 0.175;
        let right_carina = 1.5 * left_carina;
        let posterior_width = 2.6 * left_carina;
        let laa_separation = 1.2;
        let laa_offset_x = 0.03;

        let carina_shift = (right_carina - left_carina) / 2.0;

        Self {
            topology,
            disk_radius: 0.5,
            rspv_radius: 1.35 * r_min,
            ripv_radius: 1.1 * r_min,
            lipv_radius: r_min,
            lspv_radius: 1.1 * r_min,
            laa_radius: 1.35 * r_min,
            rspv_center: Point2::new(
                x_ref + posterior_width,
                y_ref + left_carina + carina_shift,
            ),
            ripv_center: Point2::new(x_ref + posterior_width, y_ref - carina_shift),
            lipv_center: Point2::new(x_ref, y_ref),
            lspv_center: Point2::new(x_ref, y_ref + left_carina),
            laa_center: Point2::new(
                x_ref - laa_offset_x,
                y_ref + left_carina + left_carina * laa_separation,
            ),
            rim_angles: [
                PI / 8.0,
                TAU - PI / 6.0,
                PI + PI / 6.0,
                3.0 * PI / 4.0 - PI / 40.0,
            ],
        }
    }

    /// Set the topology variant.
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Set the outer disk radius.
    pub fn with_disk_radius(mut self, radius: f64) -> Self {
        self.disk_radius = radius;
        self
    }

    /// Get a hole's center by label.
    pub fn hole_center(&self, label: HoleLabel) -> Point2<f64> {
        match label {
            HoleLabel::Rspv => self.rspv_center,
            HoleLabel::Ripv => self.ripv_center,
            HoleLabel::Lipv => self.lipv_center,
            HoleLabel::Lspv => self.lspv_center,
            HoleLabel::Laa => self.laa_center,
        }
    }

    /// Get a hole's radius by label.
    pub fn hole_radius(&self, label: HoleLabel) -> f64 {
        match label {
            HoleLabel::Rspv => self.rspv_radius,
            HoleLabel::Ripv => self.ripv_radius,
            HoleLabel::Lipv => self.lipv_radius,
            HoleLabel::Lspv => self.lspv_radius,
            HoleLabel::Laa => self.laa_radius,
        }
    }

    /// Get the rim anchor point for a landmark.
    pub fn rim_point(&self, landmark: RimLandmark) -> Point2<f64> {
        let t = self.rim_angles[landmark.index()];
        Point2::new(self.disk_radius * t.cos(), self.disk_radius * t.sin())
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self::standard(Topology::FiveHole)
    }
}

/// A target point on a hole circle, facing a peer structure.
#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    /// The peer structure this anchor faces.
    pub target: AnchorTarget,
    /// Angle of the anchor on its hole circle, in `[0, 2π)`.
    pub angle: f64,
    /// 2D position of the anchor.
    pub position: Point2<f64>,
}

/// The generated template for one hole.
#[derive(Debug, Clone)]
pub struct HoleTemplate {
    /// Which hole this is.
    pub label: HoleLabel,
    /// Center of the hole circle.
    pub center: Point2<f64>,
    /// Radius of the hole circle.
    pub radius: f64,
    /// Anchors in contour-walk order: canonical start first, then
    /// counter-clockwise around the circle.
    pub anchors: Vec<Anchor>,
    /// Arc-length fraction of each segment, indexed like `anchors`
    /// (segment `k` runs from anchor `k` counter-clockwise to anchor `k+1`).
    /// Sums to 1.
    pub proportions: Vec<f64>,
}

impl HoleTemplate {
    /// Look up the anchor facing a given peer.
    pub fn anchor(&self, target: AnchorTarget) -> Option<&Anchor> {
        self.anchors.iter().find(|a| a.target == target)
    }

    /// The point on the hole circle at a given angle.
    pub fn point_at(&self, angle: f64) -> Point2<f64> {
        Point2::new(
            self.center.x + self.radius * angle.cos(),
            self.center.y + self.radius * angle.sin(),
        )
    }

    /// The counter-clockwise arc of segment `k`: `(start_angle, end_angle)`
    /// with `end_angle > start_angle`.
    pub fn arc(&self, k: usize) -> (f64, f64) {
        let start = self.anchors[k].angle;
        (start, start + TAU * self.proportions[k])
    }
}

/// The generated template for the outer rim.
#[derive(Debug, Clone)]
pub struct RimTemplate {
    /// Radius of the outer disk.
    pub disk_radius: f64,
    /// Rim landmark angles v5..v8, in `[0, 2π)`.
    pub angles: [f64; 4],
    /// Rim anchor points v5..v8.
    pub anchors: [Point2<f64>; 4],
}

impl RimTemplate {
    /// The point on the outer circle at a given angle.
    pub fn point_at(&self, angle: f64) -> Point2<f64> {
        Point2::new(
            self.disk_radius * angle.cos(),
            self.disk_radius * angle.sin(),
        )
    }

    /// The four clockwise arcs `v5→v6→v7→v8→v5` as `(start, end)` angle
    /// pairs with `end < start` (angles decrease along each arc).
    ///
    /// The rim is traversed clockwise in template coordinates, matching the
    /// counter-clockwise hole convention with opposite winding for the outer
    /// boundary of the region.
    pub fn clockwise_arcs(&self) -> [(f64, f64); 4] {
        // Unwrap the angle sequence downwards from v5
        let mut unwrapped = [0.0f64; 5];
        unwrapped[0] = self.angles[0];
        for k in 1..4 {
            let mut a = self.angles[k];
            while a >= unwrapped[k - 1] {
                a -= TAU;
            }
            unwrapped[k] = a;
        }
        unwrapped[4] = self.angles[0] - TAU;

        [
            (unwrapped[0], unwrapped[1]),
            (unwrapped[1], unwrapped[2]),
            (unwrapped[2], unwrapped[3]),
            (unwrapped[3], unwrapped[4]),
        ]
    }
}

/// The complete generated template: holes, rim, and their target geometry.
#[derive(Debug, Clone)]
pub struct DiskTemplate {
    /// The topology this template was generated for.
    pub topology: Topology,
    /// Radius of the outer disk.
    pub disk_radius: f64,
    /// Per-hole templates. Four entries for [`Topology::FourHole`], five for
    /// [`Topology::FiveHole`].
    pub holes: Vec<HoleTemplate>,
    /// Outer rim template.
    pub rim: RimTemplate,
}

impl DiskTemplate {
    /// Generate the template from a configuration.
    pub fn generate(config: &TemplateConfig) -> Self {
        let rim = RimTemplate {
            disk_radius: config.disk_radius,
            angles: [
                wrap_angle(config.rim_angles[0]),
                wrap_angle(config.rim_angles[1]),
                wrap_angle(config.rim_angles[2]),
                wrap_angle(config.rim_angles[3]),
            ],
            anchors: [
                config.rim_point(RimLandmark::V5),
                config.rim_point(RimLandmark::V6),
                config.rim_point(RimLandmark::V7),
                config.rim_point(RimLandmark::V8),
            ],
        };

        let holes = hole_links(config.topology)
            .iter()
            .map(|(label, targets)| generate_hole(config, *label, targets))
            .collect();

        Self {
            topology: config.topology,
            disk_radius: config.disk_radius,
            holes,
            rim,
        }
    }

    /// Look up a hole template by label.
    pub fn hole(&self, label: HoleLabel) -> Option<&HoleTemplate> {
        self.holes.iter().find(|h| h.label == label)
    }
}

/// The anchor link table: which peers each hole faces, per topology.
fn hole_links(topology: Topology) -> Vec<(HoleLabel, Vec<AnchorTarget>)> {
    use AnchorTarget::{Hole, Rim};
    use HoleLabel::*;
    use RimLandmark::*;

    let mut links = vec![
        (Rspv, vec![Hole(Lspv), Hole(Ripv), Rim(V5)]),
        (Ripv, vec![Hole(Lipv), Rim(V6), Hole(Rspv)]),
        (Lipv, vec![Hole(Ripv), Hole(Lspv), Rim(V7)]),
    ];

    match topology {
        Topology::FourHole => {
            links.push((Lspv, vec![Hole(Rspv), Rim(V8), Hole(Lipv)]));
        }
        Topology::FiveHole => {
            links.push((Lspv, vec![Hole(Rspv), Hole(Laa), Hole(Lipv)]));
            links.push((Laa, vec![Hole(Lspv), Rim(V8)]));
        }
    }

    links
}

/// Generate one hole template from its link-table targets.
fn generate_hole(
    config: &TemplateConfig,
    label: HoleLabel,
    targets: &[AnchorTarget],
) -> HoleTemplate {
    let center = config.hole_center(label);
    let radius = config.hole_radius(label);

    // Place each anchor at the angle facing its peer
    let mut anchors: Vec<Anchor> = targets
        .iter()
        .map(|&target| {
            let peer = match target {
                AnchorTarget::Hole(peer_label) => config.hole_center(peer_label),
                AnchorTarget::Rim(landmark) => config.rim_point(landmark),
            };
            let angle = wrap_angle((peer.y - center.y).atan2(peer.x - center.x));
            Anchor {
                target,
                angle,
                position: Point2::new(
                    center.x + radius * angle.cos(),
                    center.y + radius * angle.sin(),
                ),
            }
        })
        .collect();

    // Canonical start: the anchor circularly closest to angle 0 or π,
    // remaining anchors counter-clockwise from there
    let start = anchors
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            axis_distance(a.angle)
                .partial_cmp(&axis_distance(b.angle))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);
    let start_angle = anchors[start].angle;
    anchors.sort_by(|a, b| {
        let oa = wrap_angle(a.angle - start_angle);
        let ob = wrap_angle(b.angle - start_angle);
        oa.partial_cmp(&ob).unwrap_or(std::cmp::Ordering::Equal)
    });

    // Segment proportions: normalized counter-clockwise gaps between
    // consecutive anchors. Using offsets keeps the sum at exactly one turn.
    let offsets: Vec<f64> = anchors
        .iter()
        .map(|a| wrap_angle(a.angle - start_angle))
        .collect();
    let n = anchors.len();
    let proportions: Vec<f64> = (0..n)
        .map(|k| {
            let gap = if k + 1 < n {
                offsets[k + 1] - offsets[k]
            } else {
                TAU - offsets[k]
            };
            gap / TAU
        })
        .collect();

    HoleTemplate {
        label,
        center,
        radius,
        anchors,
        proportions,
    }
}

/// Wrap an angle into `[0, 2π)`.
fn wrap_angle(a: f64) -> f64 {
    let mut a = a % TAU;
    if a < 0.0 {
        a += TAU;
    }
    a
}

/// Circular distance from an angle to the nearest of 0 and π.
fn axis_distance(a: f64) -> f64 {
    let to_zero = {
        let d = wrap_angle(a);
        d.min(TAU - d)
    };
    let to_pi = {
        let d = wrap_angle(a - PI);
        d.min(TAU - d)
    };
    to_zero.min(to_pi)
}
