//! HTTP handlers

pub mod documents;
pub mod files;
pub mod upload;
pub mod upload_token;
pub mod watermark;
