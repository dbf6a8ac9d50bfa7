//! Data models for the application
//!
//! Each sub-module represents a specific feature area of the watermarking
//! pipeline.

mod document;
mod media;
mod upload;
mod watermark;

// Re-export all models for convenient imports
pub use document::*;
pub use media::*;
pub use upload::*;
pub use watermark::*;
