//! Core mesh data structures.
//!
//! This module provides the half-edge mesh representation and the id-chain
//! types (contours, surface paths) the flattening pipeline operates on.
//!
//! # Overview
//!
//! The primary type is [`HalfEdgeMesh`], which represents a triangle mesh
//! using a half-edge (doubly-connected edge list) data structure with O(1)
//! adjacency queries. Meshes enter the pipeline fully built and are never
//! resized or mutated afterwards; flattening results are returned separately.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`HalfEdgeId`] - Identifies a half-edge
//! - [`FaceId`] - Identifies a face
//!
//! # Construction
//!
//! Meshes are constructed from face-vertex lists:
//!
//! ```
//! use laflat::mesh::build_from_triangles;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//!
//! let mesh = build_from_triangles(&vertices, &faces).unwrap();
//! ```

mod builder;
mod chain;
mod halfedge;
mod index;
mod locator;

pub use builder::build_from_triangles;
pub use chain::{Contour, SurfacePath};
pub use halfedge::{Face, HalfEdge, HalfEdgeMesh, Vertex, VertexHalfEdgeIter};
pub use index::{FaceId, HalfEdgeId, VertexId};
pub use locator::PointLocator;
