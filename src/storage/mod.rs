//! Object store capability and backends
//!
//! The engines talk to storage only through the `BlobStore` trait. Two
//! backends ship: `S3BlobStore` for production and `MemoryBlobStore` for
//! tests and local development.

pub mod memory;
pub mod s3;

pub use memory::MemoryBlobStore;
pub use s3::S3BlobStore;

use std::collections::HashMap;

use crate::error::StorageError;

/// Capability interface over an external object store.
///
/// Buckets are passed per call: registration reads from caller-chosen
/// staging buckets, not just the service's own.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Read an object in full.
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Write an object unconditionally, with content type and user metadata.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<(), StorageError>;

    /// Write an object only if the key is currently vacant.
    ///
    /// Fails with `StorageError::ObjectAlreadyExists` when something is
    /// already stored at the key. Both shipped backends enforce this
    /// atomically; a backend without a conditional-write primitive can only
    /// approximate it with check-then-put, and callers racing on the same
    /// key may then see a nondeterministic winner.
    async fn put_create_only(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Server-side copy, preserving content type and user metadata.
    async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<(), StorageError>;

    /// All keys under a prefix, in lexicographic order.
    async fn list_by_prefix(&self, bucket: &str, prefix: &str)
        -> Result<Vec<String>, StorageError>;

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    /// Object size in bytes.
    async fn size(&self, bucket: &str, key: &str) -> Result<u64, StorageError>;

    /// Stored MIME type; `application/octet-stream` when the backend has none.
    async fn content_type(&self, bucket: &str, key: &str) -> Result<String, StorageError>;

    /// User metadata key/value pairs stored with the object.
    async fn user_metadata(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<HashMap<String, String>, StorageError>;
}
