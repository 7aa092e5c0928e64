//! # Laflat
//!
//! Constrained flattening of open atrial surfaces onto a standardized disk.
//!
//! Laflat computes a two-dimensional parameterization of a left-atrial
//! surface mesh in which every anatomical boundary lands at a fixed,
//! patient-independent location: the outer rim on the disk boundary, each
//! pulmonary vein (and optionally the appendage) on its own interior
//! circle, and the dividing paths between them on straight template lines.
//! Positions in the flat disk are therefore directly comparable across
//! subjects.
//!
//! ## Features
//!
//! - **Half-edge surface meshes**: O(1) adjacency queries with type-safe
//!   indices
//! - **Disk template generation**: four- and five-hole layouts with
//!   configurable hole radii and rim landmark angles
//! - **Contour partitioning**: proportional cuts for the veins, observed
//!   cuts for the appendage
//! - **Shortest-path re-routing**: dividing paths regenerated between the
//!   partition cut points
//! - **Constrained harmonic solver**: cotangent or uniform weights, with a
//!   boundary refinement pass that relaxes the interior path pins
//!
//! ## Quick Start
//!
//! ```no_run
//! use laflat::prelude::*;
//! use nalgebra::Point3;
//!
//! # fn detected_surface() -> (Vec<Point3<f64>>, Vec<[usize; 3]>) { unimplemented!() }
//! # fn detected_anatomy(mesh: &HalfEdgeMesh) -> (RimSeeds, Contours, DividingPaths) {
//! #     unimplemented!()
//! # }
//! // The opened surface and its detected anatomy come from upstream
//! // segmentation; contours and paths reference mesh vertex ids.
//! let (vertices, faces) = detected_surface();
//! let mesh = build_from_triangles(&vertices, &faces).unwrap();
//! let (seeds, contours, paths) = detected_anatomy(&mesh);
//!
//! let pipeline = FlattenPipeline::new(TemplateConfig::standard(Topology::FiveHole));
//! let result = pipeline
//!     .run(&FlattenInput { mesh: &mesh, seeds, contours, paths })
//!     .unwrap();
//!
//! for (vertex, position) in result.map.iter() {
//!     println!("{:?} -> ({:.4}, {:.4})", vertex, position.x, position.y);
//! }
//! ```
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use laflat::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2], [0, 2, 3]];
//!
//! let mesh = build_from_triangles(&vertices, &faces).unwrap();
//! assert_eq!(mesh.num_vertices(), 4);
//! assert_eq!(mesh.num_faces(), 2);
//!
//! // Every vertex of an open square lies on the boundary
//! for v in mesh.vertex_ids() {
//!     assert!(mesh.is_boundary_vertex(v));
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod mesh;
pub mod pipeline;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use laflat::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::flatten::{FlatMap, FlattenOptions, WeightScheme};
    pub use crate::algo::template::{TemplateConfig, Topology};
    pub use crate::error::{FlattenError, Result};
    pub use crate::mesh::{
        build_from_triangles, Contour, Face, FaceId, HalfEdge, HalfEdgeId, HalfEdgeMesh,
        PointLocator, SurfacePath, Vertex, VertexId,
    };
    pub use crate::pipeline::{
        Contours, DividingPaths, FlattenInput, FlattenPipeline, FlattenResult, RimSeeds,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
