//! File Registration and Resolution Module
//!
//! Implements the content-addressed file lifecycle:
//! - Checksum-based content addresses for deduplicated payload storage
//! - Immutable per-version metadata records written create-only
//! - Version resolution, exact or latest, for redirect-style retrieval
//!
//! Protocol Flow:
//! 1. Client stages a payload out of band and annotates it with checksums
//! 2. Registration copies the payload to its content address and records it
//! 3. Retrieval resolves (file id, version) to the content address

pub mod metadata;
pub mod registration;
pub mod resolution;

pub use metadata::{Checksums, FileId, FileMetadata};
pub use registration::{RegisterFileRequest, RegistrationOutcome, RegistrationService};
pub use resolution::{ResolutionService, ResolvedFile};
