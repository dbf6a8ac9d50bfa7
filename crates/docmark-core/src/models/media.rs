use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_PNG: &str = "image/png";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

/// Media types accepted as watermarking input.
pub const ACCEPTED_CONTENT_TYPES: &[&str] = &[MIME_PDF, MIME_PNG, MIME_JPEG, "image/jpg"];

/// The two input families the watermark engines handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Paged documents (PDF)
    Paged,
    /// Raster images, always re-encoded as PNG
    Raster,
}

impl AssetKind {
    /// Classify a declared media type. Returns `None` for anything the
    /// engines do not accept.
    pub fn from_mime_type(content_type: &str) -> Option<Self> {
        let normalized = normalize_mime_type(content_type);
        if normalized == MIME_PDF {
            Some(AssetKind::Paged)
        } else if normalized.starts_with("image/") {
            Some(AssetKind::Raster)
        } else {
            None
        }
    }

    /// Media type of the watermarked output.
    pub fn output_mime_type(&self) -> &'static str {
        match self {
            AssetKind::Paged => MIME_PDF,
            AssetKind::Raster => MIME_PNG,
        }
    }
}

/// Normalize a MIME type: strip parameters, lowercase, and fold the
/// `image/jpg` alias into `image/jpeg`.
pub fn normalize_mime_type(content_type: &str) -> String {
    let essence = content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
        .to_lowercase();

    if essence == "image/jpg" {
        MIME_JPEG.to_string()
    } else {
        essence
    }
}

/// File name of the watermarked output. Raster outputs get a `.png`
/// extension; paged outputs keep their name.
pub fn output_file_name(file_name: &str, kind: AssetKind) -> String {
    match kind {
        AssetKind::Paged => file_name.to_string(),
        AssetKind::Raster => match file_name.rfind('.') {
            Some(idx) if idx > 0 => format!("{}.png", &file_name[..idx]),
            _ => format!("{}.png", file_name),
        },
    }
}
