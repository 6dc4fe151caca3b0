//! Error types for the stow-blob crate

use thiserror::Error;

/// Result type alias using `BlobError`
pub type Result<T> = std::result::Result<T, BlobError>;

/// Errors that can occur while moving bytes to or from the backend
#[derive(Error, Debug)]
pub enum BlobError {
    /// The referenced blob is not stored in the backend
    #[error("blob does not exist")]
    NotExist,

    /// Any other backend failure, tagged with the operation it came from
    #[error("{op}: {message}")]
    Backend { op: &'static str, message: String },

    /// IO error while draining the caller's stream
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlobError {
    /// Tag a backend failure with operation context.
    pub fn backend(op: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Backend {
            op,
            message: err.to_string(),
        }
    }
}
