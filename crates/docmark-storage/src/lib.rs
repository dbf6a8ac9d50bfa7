//! Docmark Storage Library
//!
//! This crate provides the storage abstraction used by the watermarking
//! service, its S3 and local filesystem backends, and the [`DocumentStore`]
//! that owns the on-storage layout of documents.
//!
//! # Storage key format
//!
//! Every document owns exactly two objects:
//!
//! - **Asset**: `documents/{id}/{file_name}`
//! - **Metadata record**: `documents/{id}/metadata.json`
//!
//! Direct-upload grants stage objects under `uploads/{uuid}/{file_name}`.
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod documents;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use docmark_core::StorageBackend;
pub use documents::{generate_document_id, is_valid_document_id, DocumentStore, DocumentStoreError};
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
