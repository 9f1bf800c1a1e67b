//! Error types for mesh building.

use thiserror::Error;

/// Errors that can occur while building a mesh.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// No strategy found a single vertex.
    #[error("no vertices found in STEP data")]
    EmptyGeometry,
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
