mod parser;
mod properties;

pub use parser::*;
pub use properties::*;

use crate::parallel::ParallelError;

/// Error types for the PLY module.
#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    /// Failed to read PLY file
    #[error("Failed to read PLY file. {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or incomplete PLY header
    #[error("Invalid PLY header: {0}")]
    InvalidHeader(String),

    /// Unsupported PLY property
    #[error("Unsupported PLY property: {0}")]
    UnsupportedProperty(String),

    /// A required Gaussian vertex property is not declared
    #[error("Missing PLY vertex property: {0}")]
    MissingProperty(String),

    /// A value in the body cannot be parsed
    #[error("Invalid PLY value: {0}")]
    InvalidValue(String),

    /// The body holds fewer records than the header declares
    #[error("PLY body is shorter than declared in the header")]
    Truncated,

    /// Failed to schedule the vertex decoding
    #[error("Failed to schedule PLY decoding. {0}")]
    Parallel(#[from] ParallelError),
}
