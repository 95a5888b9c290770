//! In-memory object store backend
//!
//! Backs tests and local development. Observable behavior mirrors the S3
//! backend: listings come back sorted, copies carry content type and user
//! metadata along, and create-only puts are atomic under the store lock.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::BlobStore;
use crate::error::StorageError;

#[derive(Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
    metadata: HashMap<String, String>,
}

/// Object store holding everything in process memory.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    buckets: Arc<RwLock<HashMap<String, BTreeMap<String, StoredObject>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn missing(bucket: &str, key: &str) -> StorageError {
        StorageError::ObjectNotFound(format!("{bucket}/{key}"))
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.data.clone())
            .ok_or_else(|| Self::missing(bucket, key))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<(), StorageError> {
        let mut buckets = self.buckets.write().await;
        buckets.entry(bucket.to_string()).or_default().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
            },
        );
        Ok(())
    }

    async fn put_create_only(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let mut buckets = self.buckets.write().await;
        match buckets.entry(bucket.to_string()).or_default().entry(key.to_string()) {
            Entry::Occupied(_) => Err(StorageError::ObjectAlreadyExists(format!(
                "{bucket}/{key}"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(StoredObject {
                    data,
                    content_type: content_type.to_string(),
                    metadata: HashMap::new(),
                });
                Ok(())
            }
        }
    }

    async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<(), StorageError> {
        let mut buckets = self.buckets.write().await;
        let source = buckets
            .get(src_bucket)
            .and_then(|objects| objects.get(src_key))
            .cloned()
            .ok_or_else(|| Self::missing(src_bucket, src_key))?;
        buckets
            .entry(dst_bucket.to_string())
            .or_default()
            .insert(dst_key.to_string(), source);
        Ok(())
    }

    async fn list_by_prefix(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<String>, StorageError> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .get(bucket)
            .map(|objects| {
                objects
                    .keys()
                    .filter(|key| key.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(key)))
    }

    async fn size(&self, bucket: &str, key: &str) -> Result<u64, StorageError> {
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.data.len() as u64)
            .ok_or_else(|| Self::missing(bucket, key))
    }

    async fn content_type(&self, bucket: &str, key: &str) -> Result<String, StorageError> {
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.content_type.clone())
            .ok_or_else(|| Self::missing(bucket, key))
    }

    async fn user_metadata(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<HashMap<String, String>, StorageError> {
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.metadata.clone())
            .ok_or_else(|| Self::missing(bucket, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = MemoryBlobStore::new();
        let metadata = HashMap::from([("depot-sha256".to_string(), "abc".to_string())]);

        store
            .put("staging", "payload.bin", b"hello".to_vec(), "text/plain", &metadata)
            .await
            .unwrap();

        assert_eq!(store.get("staging", "payload.bin").await.unwrap(), b"hello");
        assert_eq!(store.size("staging", "payload.bin").await.unwrap(), 5);
        assert_eq!(
            store.content_type("staging", "payload.bin").await.unwrap(),
            "text/plain"
        );
        assert_eq!(
            store.user_metadata("staging", "payload.bin").await.unwrap(),
            metadata
        );
    }

    #[tokio::test]
    async fn test_get_missing_object() {
        let store = MemoryBlobStore::new();
        let result = store.get("staging", "nope").await;
        assert!(matches!(result, Err(StorageError::ObjectNotFound(_))));
        assert!(!store.exists("staging", "nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_create_only_rejects_existing() {
        let store = MemoryBlobStore::new();
        store
            .put_create_only("meta", "files/a.1", b"{}".to_vec(), "application/json")
            .await
            .unwrap();

        let second = store
            .put_create_only("meta", "files/a.1", b"{...}".to_vec(), "application/json")
            .await;
        assert!(matches!(second, Err(StorageError::ObjectAlreadyExists(_))));

        // First write is untouched
        assert_eq!(store.get("meta", "files/a.1").await.unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_copy_preserves_type_and_metadata() {
        let store = MemoryBlobStore::new();
        let metadata = HashMap::from([("depot-crc32c".to_string(), "0000abcd".to_string())]);
        store
            .put("staging", "src", b"payload".to_vec(), "application/pdf", &metadata)
            .await
            .unwrap();

        store.copy("staging", "src", "content", "blobs/x").await.unwrap();

        assert_eq!(store.get("content", "blobs/x").await.unwrap(), b"payload");
        assert_eq!(
            store.content_type("content", "blobs/x").await.unwrap(),
            "application/pdf"
        );
        assert_eq!(
            store.user_metadata("content", "blobs/x").await.unwrap(),
            metadata
        );
    }

    #[tokio::test]
    async fn test_copy_missing_source() {
        let store = MemoryBlobStore::new();
        let result = store.copy("staging", "ghost", "content", "blobs/x").await;
        assert!(matches!(result, Err(StorageError::ObjectNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_by_prefix_sorted() {
        let store = MemoryBlobStore::new();
        let none = HashMap::new();
        for key in ["files/b.2", "files/a.2", "files/a.1", "blobs/zzz"] {
            store
                .put("meta", key, Vec::new(), "application/json", &none)
                .await
                .unwrap();
        }

        let listed = store.list_by_prefix("meta", "files/a.").await.unwrap();
        assert_eq!(listed, vec!["files/a.1", "files/a.2"]);

        let empty = store.list_by_prefix("meta", "files/c.").await.unwrap();
        assert!(empty.is_empty());
    }
}
