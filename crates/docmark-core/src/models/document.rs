use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A watermarked, persisted document. Immutable once stored.
///
/// Serialized with camelCase keys; this is both the metadata record written
/// next to the asset and the `document` object of API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub client_name: String,
    #[serde(rename = "docTitle")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub file_name: String,
    pub mime_type: String,
    pub file_url: String,
    /// RFC 3339 UTC timestamp
    pub upload_date: String,
    /// Public view link, `{base}?id={id}`
    pub link: String,
}

impl Document {
    pub fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.upload_date)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Render a timestamp the way metadata records carry it.
pub fn format_upload_date(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build the shareable view link for a document id.
pub fn view_link(base_url: &str, id: &str) -> String {
    format!("{}?id={}", base_url, id)
}

/// Success envelope for document endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub success: bool,
    pub document: Document,
}

impl From<Document> for DocumentResponse {
    fn from(document: Document) -> Self {
        DocumentResponse {
            success: true,
            document,
        }
    }
}
