//! Error types for laflat.
//!
//! Every failure in this crate is fatal for the run: the pipeline is a
//! deterministic batch computation, so a violated precondition means the
//! upstream contour/landmark data is wrong and must be fixed before rerunning.
//! Errors carry enough context to name the structure that triggered them.

use thiserror::Error;

/// Result type alias using [`FlattenError`].
pub type Result<T> = std::result::Result<T, FlattenError>;

/// Errors that can occur while building a mesh or running the flattening pipeline.
#[derive(Error, Debug)]
pub enum FlattenError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has duplicate vertex indices (degenerate triangle).
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// A required input structure (contour, path, or seed) was not supplied.
    #[error("required input structure missing: {structure}")]
    InputMissing {
        /// Name of the absent structure.
        structure: &'static str,
    },

    /// A landmark vertex was not found on the contour it is supposed to lie on.
    #[error("landmark vertex {landmark} not found on contour '{contour}'")]
    BoundaryMismatch {
        /// The landmark vertex index.
        landmark: usize,
        /// Label of the contour that was searched.
        contour: String,
    },

    /// No surface path exists between two vertices.
    #[error("no surface path from vertex {from} to vertex {to}")]
    Unreachable {
        /// The start vertex index.
        from: usize,
        /// The end vertex index.
        to: usize,
    },

    /// The constrained linear system is singular or the solve failed.
    #[error("singular system: {details}")]
    SingularSystem {
        /// Description of the singularity (duplicate pin, non-convergence, ...).
        details: String,
    },
}

impl FlattenError {
    /// Create a [`FlattenError::SingularSystem`] from anything displayable.
    pub fn singular<T: std::fmt::Display>(details: T) -> Self {
        FlattenError::SingularSystem {
            details: details.to_string(),
        }
    }
}
