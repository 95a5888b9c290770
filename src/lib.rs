//! Depot Server Library
//!
//! A content-addressed file registration and retrieval service over
//! S3-compatible object storage. Callers stage payloads out of band and
//! annotate them with checksums; the service copies each payload to a
//! checksum-derived content address, keeps one immutable metadata record
//! per (file id, version), and answers retrievals with a redirect to the
//! payload's location.
//!
//! # Modules
//!
//! - `files`: registration and resolution protocol
//! - `storage`: blob store trait with S3 and in-memory backends
//! - `routes`: HTTP surface
//! - `version`: canonical timestamp version codec

pub mod config;
pub mod error;
pub mod files;
pub mod routes;
pub mod state;
pub mod storage;
pub mod version;
