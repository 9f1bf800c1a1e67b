//! Conversion errors.

use std::io;
use std::path::PathBuf;

use stepoff_mesh::MeshError;
use stepoff_step::StepError;
use thiserror::Error;

/// Errors that abort a conversion.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The input file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Input path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: StepError,
    },

    /// The output file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Output path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// No vertices could be extracted by any strategy.
    #[error("no vertices found in STEP data")]
    EmptyGeometry,
}

impl From<MeshError> for ConvertError {
    fn from(err: MeshError) -> Self {
        match err {
            MeshError::EmptyGeometry => Self::EmptyGeometry,
        }
    }
}
