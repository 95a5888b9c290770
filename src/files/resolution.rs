//! File resolution
//!
//! The read path: look up the metadata record for a (file id, version)
//! pair, or for the latest registered version of a file id, and turn it
//! into a redirect target.

use std::sync::Arc;

use crate::config::StorageConfig;
use crate::error::{ApiError, Result, StorageError};
use crate::storage::BlobStore;
use crate::version::Version;

use super::metadata::{metadata_key, metadata_prefix, FileId, FileMetadata};

/// A resolved file: the metadata record plus the URL its payload can be
/// fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub metadata: FileMetadata,
    pub location: String,
}

/// Implements version resolution against the metadata bucket.
#[derive(Clone)]
pub struct ResolutionService {
    store: Arc<dyn BlobStore>,
    content_bucket: String,
    metadata_bucket: String,
    public_base: String,
}

impl ResolutionService {
    pub fn new(store: Arc<dyn BlobStore>, config: &StorageConfig) -> Self {
        Self {
            store,
            content_bucket: config.content_bucket.clone(),
            metadata_bucket: config.metadata_bucket.clone(),
            public_base: config.public_base(),
        }
    }

    /// Resolve a file id to a concrete registered version.
    ///
    /// With `version` given, only that exact version is considered. Without
    /// it, the greatest well-formed version under the file's key prefix
    /// wins; keys with suffixes that do not parse canonically are ignored.
    pub async fn resolve(&self, file_id: &str, version: Option<&str>) -> Result<ResolvedFile> {
        let file_id = FileId::parse(file_id)?;
        let version = match version {
            Some(raw) => raw.parse()?,
            None => self.latest_version(&file_id).await?,
        };

        let record = self.fetch_record(&file_id, &version).await?;
        tracing::debug!(file_id = %file_id, version = %version, "Resolved file");
        Ok(ResolvedFile {
            location: self.location(&record),
            metadata: record,
        })
    }

    /// Pick the latest version of a file from the metadata listing.
    ///
    /// Canonical encoding keeps lexicographic and chronological order in
    /// agreement, so the maximum over parsed versions matches the maximum
    /// over their key suffixes.
    async fn latest_version(&self, file_id: &FileId) -> Result<Version> {
        let prefix = metadata_prefix(file_id);
        let keys = self
            .store
            .list_by_prefix(&self.metadata_bucket, &prefix)
            .await?;
        keys.iter()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|suffix| suffix.parse::<Version>().ok())
            .max()
            .ok_or_else(|| ApiError::NotFound(file_id.to_string()))
    }

    async fn fetch_record(&self, file_id: &FileId, version: &Version) -> Result<FileMetadata> {
        let key = metadata_key(file_id, version);
        match self.store.get(&self.metadata_bucket, &key).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(StorageError::ObjectNotFound(_)) => Err(ApiError::NotFound(file_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn location(&self, record: &FileMetadata) -> String {
        format!(
            "{}/{}/{}",
            self.public_base,
            self.content_bucket,
            record.checksums.blob_key()
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::config::Config;
    use crate::storage::MemoryBlobStore;
    use crate::version::VersionError;

    use super::super::metadata::{Checksums, FILE_METADATA_FORMAT_VERSION};

    const V1: &str = "2023-01-01T000000.000000Z";
    const V2: &str = "2023-01-02T000000.000000Z";
    const V3: &str = "2023-06-15T123045.999999Z";

    fn service(store: &MemoryBlobStore) -> ResolutionService {
        ResolutionService::new(Arc::new(store.clone()), &Config::default().storage)
    }

    fn sample_record(version: &str) -> FileMetadata {
        FileMetadata {
            format_version: FILE_METADATA_FORMAT_VERSION,
            creator_uid: 42,
            version: version.parse().unwrap(),
            content_type: "application/pdf".to_string(),
            size: 1024,
            checksums: Checksums::compute(b"payload"),
        }
    }

    async fn put_record(store: &MemoryBlobStore, file_id: &str, version: &str) {
        store
            .put(
                "depot",
                &format!("files/{file_id}.{version}"),
                serde_json::to_vec(&sample_record(version)).unwrap(),
                "application/json",
                &HashMap::new(),
            )
            .await
            .unwrap();
    }

    async fn put_junk(store: &MemoryBlobStore, key: &str) {
        store
            .put("depot", key, b"junk".to_vec(), "text/plain", &HashMap::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_resolve_explicit_version() {
        let store = MemoryBlobStore::new();
        put_record(&store, "a1b2", V1).await;
        put_record(&store, "a1b2", V2).await;

        let resolved = service(&store).resolve("a1b2", Some(V1)).await.unwrap();
        assert_eq!(resolved.metadata, sample_record(V1));
        assert_eq!(
            resolved.location,
            format!(
                "http://localhost:9000/depot/{}",
                Checksums::compute(b"payload").blob_key()
            )
        );
    }

    #[tokio::test]
    async fn test_resolve_latest_version() {
        let store = MemoryBlobStore::new();
        put_record(&store, "a1b2", V1).await;
        put_record(&store, "a1b2", V3).await;
        put_record(&store, "a1b2", V2).await;

        let resolved = service(&store).resolve("a1b2", None).await.unwrap();
        assert_eq!(resolved.metadata.version.encode(), V3);
    }

    #[tokio::test]
    async fn test_latest_ignores_foreign_keys() {
        let store = MemoryBlobStore::new();
        put_record(&store, "a1b2", V1).await;
        // Non-canonical or unparseable suffixes under the same prefix
        put_junk(&store, "files/a1b2.not-a-version").await;
        put_junk(&store, "files/a1b2.2023-09-09T000000Z").await;
        put_junk(&store, "files/a1b2.2023-13-01T000000.000000Z").await;
        // A different file id that shares the leading characters
        put_record(&store, "a1b2c3", V2).await;

        let resolved = service(&store).resolve("a1b2", None).await.unwrap();
        assert_eq!(resolved.metadata.version.encode(), V1);
    }

    #[tokio::test]
    async fn test_resolve_unknown_file() {
        let store = MemoryBlobStore::new();
        let svc = service(&store);

        let latest = svc.resolve("a1b2", None).await;
        assert!(matches!(latest, Err(ApiError::NotFound(_))));

        let explicit = svc.resolve("a1b2", Some(V1)).await;
        assert!(matches!(explicit, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_resolve_unregistered_version() {
        let store = MemoryBlobStore::new();
        put_record(&store, "a1b2", V1).await;

        let result = service(&store).resolve("a1b2", Some(V2)).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_resolve_rejects_bad_inputs() {
        let store = MemoryBlobStore::new();
        put_record(&store, "a1b2", V1).await;
        let svc = service(&store);

        let bad_id = svc.resolve("ABCD", None).await;
        assert!(matches!(bad_id, Err(ApiError::InvalidFileId(_))));

        let bad_version = svc.resolve("a1b2", Some("garbage")).await;
        assert!(matches!(
            bad_version,
            Err(ApiError::InvalidVersion(VersionError::InvalidFormat(_)))
        ));

        let denormal = svc.resolve("a1b2", Some("2023-01-01T000000Z")).await;
        assert!(matches!(
            denormal,
            Err(ApiError::InvalidVersion(VersionError::NotNormalized { .. }))
        ));
    }

    #[tokio::test]
    async fn test_location_uses_public_url_override() {
        let store = MemoryBlobStore::new();
        put_record(&store, "a1b2", V1).await;

        let mut config = Config::default();
        config.storage.public_url = Some("https://cdn.example.com/".to_string());
        let svc = ResolutionService::new(Arc::new(store.clone()), &config.storage);

        let resolved = svc.resolve("a1b2", None).await.unwrap();
        assert!(resolved
            .location
            .starts_with("https://cdn.example.com/depot/blobs/"));
    }
}
