//! Flattening algorithms.
//!
//! This module contains the algorithmic stages of the pipeline:
//!
//! - **Template**: the target disk layout with hole circles, rim landmarks
//!   and anchor points
//! - **Segmentation**: proportional partitioning of boundary contours
//! - **Routing**: shortest vertex-to-vertex paths across the surface
//! - **Assembly**: turning segments, paths and template geometry into
//!   pinned-vertex lists
//! - **Flattening**: the pin-constrained harmonic solve and its boundary
//!   refinement pass
//!
//! The stages are usable on their own; [`crate::pipeline`] wires them into
//! the full atrial flattening sequence.

pub mod assemble;
pub mod flatten;
pub mod route;
pub mod segment;
pub mod template;
