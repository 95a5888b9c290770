//! File registration
//!
//! The write path: validate the request, read the staged payload's checksum
//! set, dedup against content-addressed storage, copy when needed, and
//! write the metadata record create-only.

use std::sync::Arc;

use crate::config::StorageConfig;
use crate::error::{ApiError, Result, StorageError};
use crate::storage::BlobStore;
use crate::version::Version;

use super::metadata::{
    metadata_key, Checksums, FileId, FileMetadata, FILE_METADATA_FORMAT_VERSION,
};

/// The single staging scheme registrations may reference.
pub const SUPPORTED_SOURCE_SCHEME: &str = "s3";

// ============================================================================
// Inputs and outcomes
// ============================================================================

/// A registration request, already decoded from the wire.
#[derive(Debug, Clone)]
pub struct RegisterFileRequest {
    pub file_id: String,
    pub version: String,
    pub creator_uid: u32,
    pub source_url: String,
}

/// How a successful registration concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A new metadata record was written.
    Created(Version),
    /// An identical record already existed; the replay is a no-op success.
    Unchanged(Version),
}

impl RegistrationOutcome {
    pub fn version(&self) -> &Version {
        match self {
            RegistrationOutcome::Created(version)
            | RegistrationOutcome::Unchanged(version) => version,
        }
    }
}

/// A parsed `scheme://bucket/key` source reference.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceUrl {
    bucket: String,
    key: String,
}

impl SourceUrl {
    /// Parse and check the scheme. Anything that is not `s3://bucket/key`
    /// with a non-empty bucket and key is rejected.
    fn parse(raw: &str) -> Result<Self> {
        let reject = || ApiError::UnsupportedSourceScheme(raw.to_string());
        let (scheme, rest) = raw.split_once("://").ok_or_else(reject)?;
        if scheme != SUPPORTED_SOURCE_SCHEME {
            return Err(reject());
        }
        let (bucket, key) = rest.split_once('/').ok_or_else(reject)?;
        if bucket.is_empty() || key.is_empty() {
            return Err(reject());
        }
        Ok(SourceUrl {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

/// What registration needs to know about a staged payload.
struct StagedSource {
    checksums: Checksums,
    size: u64,
    content_type: String,
}

// ============================================================================
// Registration service
// ============================================================================

/// Implements the registration protocol against a blob store.
#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn BlobStore>,
    content_bucket: String,
    metadata_bucket: String,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn BlobStore>, config: &StorageConfig) -> Self {
        Self {
            store,
            content_bucket: config.content_bucket.clone(),
            metadata_bucket: config.metadata_bucket.clone(),
        }
    }

    /// Register a file version.
    ///
    /// Validation runs before any store access, so a request that fails it
    /// has no side effects. A copy interrupted by a disconnecting caller
    /// completes or fails on its own; content blobs are never rolled back.
    /// Replaying an identical registration yields `Unchanged`; a different
    /// payload under an existing (file id, version) is `FileAlreadyExists`.
    pub async fn register(&self, request: RegisterFileRequest) -> Result<RegistrationOutcome> {
        let file_id = FileId::parse(&request.file_id)?;
        let version: Version = request.version.parse()?;
        let source = SourceUrl::parse(&request.source_url)?;

        let staged = self.staged_source(&source).await?;
        let blob_key = staged.checksums.blob_key();

        let needs_copy = if self.store.exists(&self.content_bucket, &blob_key).await? {
            if self.verify_content(&blob_key, &staged.checksums).await? {
                tracing::debug!(blob = %blob_key, "Content already present, skipping copy");
                false
            } else {
                tracing::warn!(blob = %blob_key, "Present content blob does not verify, re-copying");
                true
            }
        } else {
            true
        };

        if needs_copy {
            self.store
                .copy(&source.bucket, &source.key, &self.content_bucket, &blob_key)
                .await?;
            if !self.verify_content(&blob_key, &staged.checksums).await? {
                return Err(ApiError::CopyVerificationFailed(blob_key));
            }
        }

        let record = FileMetadata {
            format_version: FILE_METADATA_FORMAT_VERSION,
            creator_uid: request.creator_uid,
            version,
            content_type: staged.content_type,
            size: staged.size,
            checksums: staged.checksums,
        };

        self.write_record(&file_id, &version, &record).await
    }

    /// Fetch the checksum set, size, and content type of a staged payload.
    async fn staged_source(&self, source: &SourceUrl) -> Result<StagedSource> {
        let metadata = self.store.user_metadata(&source.bucket, &source.key).await?;
        let checksums = Checksums::from_user_metadata(&metadata)?;
        let size = self.store.size(&source.bucket, &source.key).await?;
        let content_type = self.store.content_type(&source.bucket, &source.key).await?;
        Ok(StagedSource {
            checksums,
            size,
            content_type,
        })
    }

    /// Compare the checksum set stored on a content blob against the
    /// expected set. A blob without the full set counts as unverified.
    async fn verify_content(&self, blob_key: &str, expected: &Checksums) -> Result<bool> {
        let metadata = self
            .store
            .user_metadata(&self.content_bucket, blob_key)
            .await?;
        Ok(Checksums::from_user_metadata(&metadata)
            .map(|found| found == *expected)
            .unwrap_or(false))
    }

    /// Create-only write of the record, resolving replays and conflicts.
    async fn write_record(
        &self,
        file_id: &FileId,
        version: &Version,
        record: &FileMetadata,
    ) -> Result<RegistrationOutcome> {
        let key = metadata_key(file_id, version);
        let body = serde_json::to_vec(record)?;

        match self
            .store
            .put_create_only(&self.metadata_bucket, &key, body, "application/json")
            .await
        {
            Ok(()) => {
                tracing::info!(
                    file_id = %file_id,
                    version = %version,
                    size = record.size,
                    "Registered file"
                );
                Ok(RegistrationOutcome::Created(*version))
            }
            Err(StorageError::ObjectAlreadyExists(_)) => {
                let existing_bytes = self.store.get(&self.metadata_bucket, &key).await?;
                let existing: FileMetadata = serde_json::from_slice(&existing_bytes)?;
                if existing == *record {
                    tracing::debug!(
                        file_id = %file_id,
                        version = %version,
                        "Identical record already registered"
                    );
                    Ok(RegistrationOutcome::Unchanged(*version))
                } else {
                    Err(ApiError::FileAlreadyExists {
                        file_id: file_id.to_string(),
                        version: version.to_string(),
                    })
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
