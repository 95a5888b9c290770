//! File registration and retrieval routes
//!
//! `PUT /:file_id?version=...` registers a staged payload under a (file id,
//! version) pair. `GET` redirects to the payload's content address; `HEAD`
//! answers with the metadata headers alone. Payload bytes never pass through
//! this service.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, response::Builder, StatusCode},
    response::Response,
    routing::put,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::files::{RegisterFileRequest, RegistrationOutcome, ResolvedFile};
use crate::state::AppState;

/// Create the files router
pub fn router() -> Router<AppState> {
    Router::new().route("/:file_id", put(put_file).get(get_file).head(head_file))
}

#[derive(Debug, Deserialize)]
pub struct PutFileQuery {
    version: String,
}

#[derive(Debug, Deserialize)]
pub struct GetFileQuery {
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PutFileBody {
    creator_uid: u32,
    source_url: String,
}

#[derive(Debug, Serialize)]
pub struct PutFileResponse {
    version: String,
}

/// Register a file version from a staged payload
async fn put_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<PutFileQuery>,
    Json(body): Json<PutFileBody>,
) -> Result<(StatusCode, Json<PutFileResponse>)> {
    let outcome = state
        .registration()
        .register(RegisterFileRequest {
            file_id,
            version: query.version,
            creator_uid: body.creator_uid,
            source_url: body.source_url,
        })
        .await?;

    let status = match outcome {
        RegistrationOutcome::Created(_) => StatusCode::CREATED,
        RegistrationOutcome::Unchanged(_) => StatusCode::OK,
    };
    Ok((
        status,
        Json(PutFileResponse {
            version: outcome.version().encode(),
        }),
    ))
}

/// Redirect to the payload of a registered file version
async fn get_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<GetFileQuery>,
) -> Result<Response> {
    let resolved = state
        .resolution()
        .resolve(&file_id, query.version.as_deref())
        .await?;

    let builder = Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, resolved.location.as_str());
    metadata_headers(builder, &resolved)
        .body(Body::empty())
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Describe a registered file version without redirecting
async fn head_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<GetFileQuery>,
) -> Result<Response> {
    let resolved = state
        .resolution()
        .resolve(&file_id, query.version.as_deref())
        .await?;

    metadata_headers(Response::builder().status(StatusCode::OK), &resolved)
        .body(Body::empty())
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Metadata headers shared by the GET and HEAD responses
fn metadata_headers(builder: Builder, resolved: &ResolvedFile) -> Builder {
    let metadata = &resolved.metadata;
    builder
        .header("X-DEPOT-CREATOR-UID", metadata.creator_uid)
        .header("X-DEPOT-VERSION", metadata.version.encode())
        .header("X-DEPOT-CONTENT-TYPE", metadata.content_type.as_str())
        .header("X-DEPOT-SIZE", metadata.size)
        .header("X-DEPOT-CRC32C", metadata.checksums.crc32c.as_str())
        .header("X-DEPOT-S3-ETAG", metadata.checksums.s3_etag.as_str())
        .header("X-DEPOT-SHA1", metadata.checksums.sha1.as_str())
        .header("X-DEPOT-SHA256", metadata.checksums.sha256.as_str())
}

// ============================================================================
// Tests
// ============================================================================
