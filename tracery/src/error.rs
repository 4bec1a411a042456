//! Error types used by the crate.

use thiserror::Error;

/// Tracery error type.
///
/// Per-feature faults never surface here; they are logged and the affected
/// feature is dropped. This type covers structural failures: unresolvable
/// configuration references, unreadable sources and output errors.
#[derive(Debug, Error)]
pub enum TraceryError {
    /// A named configuration entity is referenced but not defined.
    #[error("{kind} {name:?} is not defined")]
    MissingReference {
        /// Kind of the missing entity (pipeline, layer, reader, ...).
        kind: &'static str,
        /// Name the configuration referenced.
        name: String,
    },
    /// Configuration is structurally invalid.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// Source data could not be read.
    #[error("failed to read source data: {0}")]
    Source(String),
    /// A CRS transformation failed.
    #[error("projection failed: {0}")]
    Projection(String),
    /// Error reading/writing data to the FS.
    #[error("failed to access file")]
    FsIo(#[from] std::io::Error),
    /// Generic error - details are inside.
    #[error("{0}")]
    Generic(String),
}
