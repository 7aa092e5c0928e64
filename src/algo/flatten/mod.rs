//! Constrained flattening solver.
//!
//! This module computes 2D coordinates for every vertex of an open surface
//! mesh, pinning selected vertices to prescribed targets and solving the
//! weighted Laplace equation for the rest. Two passes are exposed:
//!
//! - [`flatten`]: the constrained solve over the 3D mesh geometry, pinning
//!   both interior dividing paths and boundary contours.
//! - [`refine_boundary`]: the relaxation pass over the first-pass flat
//!   geometry, pinning only the contours.
//!
//! # Example
//!
//! ```
//! use laflat::prelude::*;
//! use laflat::algo::flatten::{flatten, ConstraintSet, FlattenOptions, Pins};
//! use nalgebra::{Point2, Point3};
//!
//! // A hexagonal disk around a central vertex
//! let mut vertices = vec![Point3::new(0.0, 0.0, 0.0)];
//! for k in 0..6 {
//!     let a = k as f64 * std::f64::consts::PI / 3.0;
//!     vertices.push(Point3::new(a.cos(), a.sin(), 0.0));
//! }
//! let faces: Vec<[usize; 3]> = (0..6).map(|k| [0, 1 + k, 1 + (k + 1) % 6]).collect();
//! let mesh = build_from_triangles(&vertices, &faces).unwrap();
//!
//! // Pin the ring to a circle and solve for the center
//! let mut contour = Pins::new();
//! for k in 0..6 {
//!     let a = k as f64 * std::f64::consts::PI / 3.0;
//!     contour.push(VertexId::new(1 + k), Point2::new(a.cos(), a.sin()));
//! }
//! let set = ConstraintSet { constraints: Pins::new(), contour };
//! let map = flatten(&mesh, &set, &FlattenOptions::default()).unwrap();
//! assert!(map.get(VertexId::new(0)).coords.norm() < 1e-8);
//! ```

mod harmonic;
mod map;
mod sparse;

pub use harmonic::{
    flatten, refine_boundary, ConstraintSet, FlattenOptions, PinnedVertex, Pins, WeightScheme,
};
pub use map::FlatMap;
