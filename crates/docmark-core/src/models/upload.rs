use std::collections::BTreeMap;

/// Form field carrying the client name.
pub const FIELD_CLIENT_NAME: &str = "clientName";
/// Form field carrying the document title.
pub const FIELD_DOC_TITLE: &str = "docTitle";
/// Optional free-text description.
pub const FIELD_DESCRIPTION: &str = "description";

/// An asset received in a single request, before watermarking.
///
/// Never persisted; consumed by the watermark pipeline.
#[derive(Debug, Clone, Default)]
pub struct UploadedAsset {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
    pub fields: BTreeMap<String, String>,
}

impl UploadedAsset {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|v| v.as_str())
    }

    /// Field value as sent, or `None` when missing or blank.
    pub fn required_field(&self, name: &str) -> Option<&str> {
        self.field(name).filter(|v| !v.trim().is_empty())
    }

    pub fn client_name(&self) -> Option<&str> {
        self.required_field(FIELD_CLIENT_NAME)
    }

    pub fn title(&self) -> Option<&str> {
        self.required_field(FIELD_DOC_TITLE)
    }

    pub fn description(&self) -> &str {
        self.field(FIELD_DESCRIPTION).unwrap_or("")
    }
}

/// Output of the watermark pipeline, ready to hand to the document store.
#[derive(Debug, Clone)]
pub struct WatermarkedAsset {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}
