//! Error types for the depot server
//!
//! `ApiError` is the caller-visible taxonomy: every variant carries a stable
//! machine-readable code, a human-readable title, and an HTTP status.
//! `StorageError` covers faults in the object-store backends and is wrapped
//! into `ApiError` where it reaches a handler.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::version::VersionError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, ApiError>;

/// Caller-visible error taxonomy
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid file id {0:?}: expected lower-case hex, optionally hyphenated")]
    InvalidFileId(String),

    #[error(transparent)]
    InvalidVersion(#[from] VersionError),

    #[error("Unsupported source scheme in {0:?}: expected s3://bucket/key")]
    UnsupportedSourceScheme(String),

    #[error("Staged source is missing mandatory checksum {0:?}")]
    MissingChecksum(String),

    #[error("Copied blob {0} failed checksum verification")]
    CopyVerificationFailed(String),

    #[error("File with id {file_id} and version {version} already exists")]
    FileAlreadyExists { file_id: String, version: String },

    #[error("Cannot find file: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Metadata record error: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Storage backend errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Object already exists: {0}")]
    ObjectAlreadyExists(String),

    #[error("S3 SDK error: {0}")]
    SdkError(String),
}

impl ApiError {
    /// Stable machine-readable code automated clients can branch on.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidFileId(_) => "invalid_file_id",
            ApiError::InvalidVersion(VersionError::InvalidFormat(_)) => "invalid_version_format",
            ApiError::InvalidVersion(VersionError::NotNormalized { .. }) => "version_not_normalized",
            ApiError::UnsupportedSourceScheme(_) => "unsupported_source_scheme",
            ApiError::MissingChecksum(_) => "missing_checksum",
            ApiError::CopyVerificationFailed(_) => "copy_verification_failed",
            ApiError::FileAlreadyExists { .. } => "file_already_exists",
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal(_) => "internal_error",
            ApiError::Storage(_) => "storage_error",
            ApiError::Metadata(_) => "metadata_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidFileId(_)
            | ApiError::InvalidVersion(_)
            | ApiError::UnsupportedSourceScheme(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingChecksum(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::FileAlreadyExists { .. } => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::CopyVerificationFailed(_)
            | ApiError::Internal(_)
            | ApiError::Storage(_)
            | ApiError::Metadata(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    code: String,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Server-class faults are logged in full and redacted on the wire.
        let title = if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
            match &self {
                ApiError::CopyVerificationFailed(_) => self.to_string(),
                ApiError::Storage(_) => "Storage error".to_string(),
                _ => "An internal error occurred".to_string(),
            }
        } else {
            self.to_string()
        };

        let body = Json(ErrorResponse {
            code: self.code().to_string(),
            title,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
