//! Error types for the stow-fs crate

use stow_blob::BlobError;
use thiserror::Error;

/// Result type alias using `FsError`
pub type Result<T> = std::result::Result<T, FsError>;

/// Errors that can occur while operating on files and folders
#[derive(Error, Debug)]
pub enum FsError {
    /// No entry for the given id
    #[error("entry does not exist")]
    NotExist,

    /// The (name, parent) pair is already taken
    #[error("file name taken")]
    AlreadyExists,

    /// A version-conditioned update matched no row for an entry that
    /// does exist, the caller's version token is stale
    #[error("version mismatch")]
    Conflict,

    /// The proposed name fails validation
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// A malformed caller-supplied value such as a cursor token
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Blob adapter failure, passed through unmodified
    #[error(transparent)]
    Blob(#[from] BlobError),

    /// Any other database failure
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for FsError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => FsError::NotExist,
            // 23505 is the unique-constraint violation class
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                FsError::AlreadyExists
            }
            other => FsError::Database(other.to_string()),
        }
    }
}
