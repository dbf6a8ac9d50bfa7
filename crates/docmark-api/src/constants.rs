//! API constants

/// Versioned prefix for every API route
pub const API_PREFIX: &str = "/api/v0";

/// Route prefix for locally stored objects; matches the default
/// `LOCAL_STORAGE_BASE_URL`.
pub const FILES_PREFIX: &str = "/files";

/// Headroom above the maximum asset size for multipart framing and form fields
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;
