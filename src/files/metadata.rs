//! File data model
//!
//! Identifiers, checksum sets, content addressing, and the metadata record
//! persisted per registered (file id, version) pair.
//!
//! Key layout:
//! - metadata records live at `files/{file_id}.{version}`
//! - content blobs live at `blobs/{sha256}.{sha1}.{s3_etag}.{crc32c}`
//!
//! The two prefixes keep the namespaces apart even inside one bucket.

use std::collections::HashMap;
use std::fmt;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::ApiError;
use crate::version::Version;

/// Record schema tag, bumped on incompatible layout changes.
pub const FILE_METADATA_FORMAT_VERSION: u32 = 1;

const FILE_PREFIX: &str = "files/";
const BLOB_PREFIX: &str = "blobs/";

/// User-metadata keys carrying checksums on staged objects.
pub const STAGED_CRC32C: &str = "depot-crc32c";
pub const STAGED_S3_ETAG: &str = "depot-s3_etag";
pub const STAGED_SHA1: &str = "depot-sha1";
pub const STAGED_SHA256: &str = "depot-sha256";

/// Part size for S3-style multipart ETags (64 MiB).
pub const DEFAULT_ETAG_CHUNK_SIZE: usize = 64 * 1024 * 1024;

// ============================================================================
// File identifiers
// ============================================================================

/// Caller-supplied file identifier.
///
/// Grammar: one or more lower-case hex characters with optional single
/// interior hyphens, so bare hex ids (`a1b2`) and lower-case RFC-4122 UUIDs
/// both fit. Identifiers are stored verbatim in metadata keys; case
/// variants are rejected rather than folded so one file never answers to
/// two spellings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileId(String);

impl FileId {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let well_formed = !raw.is_empty()
            && !raw.starts_with('-')
            && !raw.ends_with('-')
            && !raw.contains("--")
            && raw
                .chars()
                .all(|c| matches!(c, '0'..='9' | 'a'..='f' | '-'));
        if well_formed {
            Ok(FileId(raw.to_string()))
        } else {
            Err(ApiError::InvalidFileId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Checksums and content addressing
// ============================================================================

/// The four mandatory payload checksums, normalized to lower-case hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksums {
    pub crc32c: String,
    pub s3_etag: String,
    pub sha1: String,
    pub sha256: String,
}

impl Checksums {
    /// Extract checksums from a staged object's user metadata, lower-casing
    /// each value. The first absent mandatory key fails with
    /// `MissingChecksum` naming it.
    pub fn from_user_metadata(metadata: &HashMap<String, String>) -> Result<Self, ApiError> {
        let fetch = |key: &'static str| -> Result<String, ApiError> {
            metadata
                .get(key)
                .map(|value| value.to_lowercase())
                .ok_or_else(|| ApiError::MissingChecksum(key.to_string()))
        };
        Ok(Checksums {
            crc32c: fetch(STAGED_CRC32C)?,
            s3_etag: fetch(STAGED_S3_ETAG)?,
            sha1: fetch(STAGED_SHA1)?,
            sha256: fetch(STAGED_SHA256)?,
        })
    }

    /// Compute all four checksums of a payload.
    pub fn compute(data: &[u8]) -> Self {
        Self::compute_with_chunk_size(data, DEFAULT_ETAG_CHUNK_SIZE)
    }

    /// Compute all four checksums, using `chunk_size` as the multipart part
    /// size for the S3-style ETag.
    pub fn compute_with_chunk_size(data: &[u8], chunk_size: usize) -> Self {
        Checksums {
            crc32c: format!("{:08x}", crc32c::crc32c(data)),
            s3_etag: s3_etag(data, chunk_size),
            sha1: hex::encode(Sha1::digest(data)),
            sha256: hex::encode(Sha256::digest(data)),
        }
    }

    /// Derive the content-addressed storage key for this checksum set.
    ///
    /// Deterministic in the four values with a fixed field order; the final
    /// lower-casing makes the derivation case-insensitive.
    pub fn blob_key(&self) -> String {
        format!(
            "{BLOB_PREFIX}{}.{}.{}.{}",
            self.sha256, self.sha1, self.s3_etag, self.crc32c
        )
        .to_lowercase()
    }

    /// User-metadata map for staging a payload ahead of registration.
    pub fn to_user_metadata(&self) -> HashMap<String, String> {
        HashMap::from([
            (STAGED_CRC32C.to_string(), self.crc32c.clone()),
            (STAGED_S3_ETAG.to_string(), self.s3_etag.clone()),
            (STAGED_SHA1.to_string(), self.sha1.clone()),
            (STAGED_SHA256.to_string(), self.sha256.clone()),
        ])
    }
}

/// S3-style ETag: plain MD5 for payloads within one part, otherwise the
/// MD5 of the part MD5s with a `-{parts}` suffix.
fn s3_etag(data: &[u8], chunk_size: usize) -> String {
    let chunk_size = chunk_size.max(1);
    if data.len() <= chunk_size {
        return hex::encode(Md5::digest(data));
    }
    let mut combined = Md5::new();
    let mut parts = 0usize;
    for chunk in data.chunks(chunk_size) {
        combined.update(Md5::digest(chunk));
        parts += 1;
    }
    format!("{}-{}", hex::encode(combined.finalize()), parts)
}

// ============================================================================
// Metadata records
// ============================================================================

/// The record persisted for one registered (file id, version) pair.
///
/// Written create-only at registration and never mutated afterwards; a
/// newer version supersedes it under the same file id. The file id itself
/// is not a field: it lives in the storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub format_version: u32,
    pub creator_uid: u32,
    pub version: Version,
    pub content_type: String,
    pub size: u64,
    #[serde(flatten)]
    pub checksums: Checksums,
}

/// Storage key of the metadata record for a FQID.
pub fn metadata_key(file_id: &FileId, version: &Version) -> String {
    format!("{FILE_PREFIX}{file_id}.{version}")
}

/// Listing prefix covering every version registered under a file id.
pub fn metadata_prefix(file_id: &FileId) -> String {
    format!("{FILE_PREFIX}{file_id}.")
}
