//! Shared key layout for storage backends.
//!
//! Document objects live under `documents/{id}/`; staged direct uploads under
//! `uploads/{uuid}/`.

use uuid::Uuid;

pub const DOCUMENTS_ROOT: &str = "documents";
pub const UPLOADS_ROOT: &str = "uploads";
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Prefix owning every object of one document, trailing slash included.
pub fn document_prefix(id: &str) -> String {
    format!("{}/{}/", DOCUMENTS_ROOT, id)
}

pub fn document_asset_key(id: &str, file_name: &str) -> String {
    format!("{}{}", document_prefix(id), file_name)
}

pub fn document_metadata_key(id: &str) -> String {
    format!("{}{}", document_prefix(id), METADATA_FILE_NAME)
}

/// Key for a client-side direct upload.
pub fn upload_staging_key(upload_id: Uuid, file_name: &str) -> String {
    format!("{}/{}/{}", UPLOADS_ROOT, upload_id, file_name)
}

/// A single path segment usable inside a key: non-empty, no separators,
/// no parent references.
pub fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains('/')
        && !segment.contains('\\')
        && !segment.chars().any(|c| c.is_control())
}
