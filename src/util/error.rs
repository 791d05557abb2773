//! Error types for scene persistence.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::CodecError;

/// Main error type for store and restore operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Stream event received in a state that does not permit it.
    ///
    /// Always fatal: the stream is corrupt or from an incompatible writer.
    #[error("Protocol violation: {event} received in state {state}")]
    Protocol { event: String, state: String },

    /// Attribute value could not be encoded or decoded
    #[error("Attribute codec error: {0}")]
    Codec(#[from] CodecError),

    /// Required struct (Transform, mesh payload, ...) is absent
    #[error("Missing struct: {0}")]
    MissingStruct(String),

    /// Mesh buffers are inconsistent
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Triangle would create an edge with more than two incident triangles
    #[error("Non-manifold edge ({0}, {1})")]
    NonManifold(i32, i32),

    /// Referenced mesh file could not be located
    #[error("Mesh reference not found: {0}")]
    ReferenceNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid mesh error.
    pub fn invalid_mesh(msg: impl Into<String>) -> Self {
        Self::InvalidMesh(msg.into())
    }

    /// Create a protocol violation error.
    pub fn protocol(event: impl Into<String>, state: impl Into<String>) -> Self {
        Self::Protocol { event: event.into(), state: state.into() }
    }

    /// True for errors that must abort a whole restore.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }
}

/// Result type alias for scene operations.
pub type Result<T> = std::result::Result<T, Error>;
