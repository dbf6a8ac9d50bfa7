//! Docmark Core Library
//!
//! This crate provides the domain models, error taxonomy and configuration
//! shared by the storage, processing and API crates.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BaseConfig, Config, DocmarkConfig, WatermarkSettings};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
// Note: Storage, StorageError and DocumentStore live in docmark-storage
