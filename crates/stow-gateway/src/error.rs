//! Error types and HTTP status mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use stow_blob::BlobError;
use stow_fs::FsError;
use thiserror::Error;

/// API error type. Domain errors flow in through `From` impls; errors
/// classified at the HTTP boundary (decode limits, content negotiation,
/// throttling) arrive pre-assigned a status.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{reason}")]
    Status { code: StatusCode, reason: String },

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Create an error carrying an explicit status and reason
    pub fn status(code: StatusCode, reason: impl Into<String>) -> Self {
        Self::Status {
            code,
            reason: reason.into(),
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Status { code, .. } => *code,
            Self::Fs(FsError::NotExist) | Self::Blob(BlobError::NotExist) => StatusCode::NOT_FOUND,
            Self::Fs(FsError::Blob(BlobError::NotExist)) => StatusCode::NOT_FOUND,
            Self::Fs(FsError::AlreadyExists) | Self::Fs(FsError::Conflict) => StatusCode::CONFLICT,
            Self::Fs(FsError::InvalidName(_)) | Self::Fs(FsError::InvalidArgument(_)) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        let body = if code.is_server_error() {
            // internal detail stays in the logs, never on the wire
            tracing::error!(error = %self, "request failed");
            code.canonical_reason().unwrap_or("Internal Server Error").to_owned()
        } else {
            self.to_string()
        };
        (code, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_expected_statuses() {
        let cases = [
            (ApiError::from(FsError::NotExist), StatusCode::NOT_FOUND),
            (ApiError::from(FsError::AlreadyExists), StatusCode::CONFLICT),
            (ApiError::from(FsError::Conflict), StatusCode::CONFLICT),
            (
                ApiError::from(FsError::InvalidName("bad".into())),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::from(BlobError::NotExist), StatusCode::NOT_FOUND),
            (
                ApiError::from(FsError::Database("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, want) in cases {
            assert_eq!(err.status_code(), want, "{err}");
        }
    }

    #[test]
    fn server_errors_hide_detail() {
        let response = ApiError::Internal("connection string leaked".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
