use super::upload::missing_field;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use crate::utils::ssrf_validation::validate_url_for_ssrf;
use crate::utils::upload::{content_type, filename_from_url, sanitize_filename};
use axum::{extract::State, Json};
use docmark_core::models::{
    DocumentResponse, UploadedAsset, FIELD_CLIENT_NAME, FIELD_DESCRIPTION, FIELD_DOC_TITLE,
    MIME_OCTET_STREAM,
};
use docmark_core::AppError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Watermark an asset that was already uploaded elsewhere (for example with
/// a direct-upload grant).
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkRequest {
    /// Publicly readable URL of the source asset
    #[validate(url)]
    pub blob_url: String,
    /// Defaults to the last path segment of `blobUrl`
    #[serde(default)]
    pub file_name: Option<String>,
    /// Defaults to the `Content-Type` of the fetched asset
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub doc_title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl WatermarkRequest {
    fn fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert(FIELD_CLIENT_NAME.to_string(), self.client_name.clone());
        fields.insert(FIELD_DOC_TITLE.to_string(), self.doc_title.clone());
        if let Some(description) = &self.description {
            fields.insert(FIELD_DESCRIPTION.to_string(), description.clone());
        }
        fields
    }
}

#[utoipa::path(
    post,
    path = "/api/v0/watermark",
    tag = "documents",
    request_body = WatermarkRequest,
    responses(
        (status = 200, description = "Document watermarked and stored", body = DocumentResponse),
        (status = 400, description = "Malformed request, rejected URL or unsupported media type", body = ErrorResponse),
        (status = 413, description = "Source asset too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(url = %request.blob_url, operation = "watermark_from_url")
)]
pub async fn watermark_from_url(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<WatermarkRequest>,
) -> Result<Json<DocumentResponse>, HttpAppError> {
    let mut asset = UploadedAsset {
        fields: request.fields(),
        ..Default::default()
    };
    let client_name = asset
        .client_name()
        .map(String::from)
        .ok_or_else(|| missing_field(FIELD_CLIENT_NAME))?;
    let title = asset
        .title()
        .map(String::from)
        .ok_or_else(|| missing_field(FIELD_DOC_TITLE))?;
    let description = asset.description().to_string();

    let declared_type = request.mime_type.filter(|m| !m.trim().is_empty());
    if let Some(mime_type) = &declared_type {
        state.pipeline.validator().validate_content_type(mime_type)?;
    }

    let url = validate_url_for_ssrf(&request.blob_url, state.config.url_fetch_allowlist())
        .await
        .map_err(|e| {
            tracing::warn!(url = %request.blob_url, error = %e, "SSRF validation failed");
            AppError::from(e)
        })?;

    let (bytes, fetched_type) = fetch_source(&state, url.clone()).await?;

    asset.bytes = bytes;
    asset.mime_type = declared_type
        .or(fetched_type)
        .unwrap_or_else(|| MIME_OCTET_STREAM.to_string());
    let file_name = request
        .file_name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| filename_from_url(&url))
        .unwrap_or_default();
    asset.file_name = sanitize_filename(&file_name)?;

    let watermarked = state.pipeline.process_blocking(asset).await?;
    let document = state
        .documents
        .store(watermarked, &client_name, &title, &description)
        .await?;

    tracing::info!(
        document_id = %document.id,
        file_name = %document.file_name,
        "Document watermarked from URL"
    );

    Ok(Json(DocumentResponse::from(document)))
}

/// Download the source asset, refusing anything over the upload limit.
async fn fetch_source(
    state: &AppState,
    url: reqwest::Url,
) -> Result<(Vec<u8>, Option<String>), AppError> {
    let max_size = state.config.max_upload_size_bytes();
    let too_large = || {
        AppError::PayloadTooLarge(format!(
            "Source asset exceeds maximum allowed size of {} bytes",
            max_size
        ))
    };

    let mut response = state.http_client.get(url.clone()).send().await.map_err(|e| {
        tracing::error!(error = %e, url = %url, "Failed to download from URL");
        AppError::MalformedRequest(format!("Failed to download from URL: {}", e))
    })?;

    if !response.status().is_success() {
        return Err(AppError::MalformedRequest(format!(
            "URL returned status code: {}",
            response.status()
        )));
    }

    if response
        .content_length()
        .is_some_and(|len| len > max_size as u64)
    {
        return Err(too_large());
    }

    let fetched_type = content_type(response.headers()).map(String::from);

    let mut data = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| AppError::MalformedRequest(format!("Failed to read response body: {}", e)))?
    {
        if data.len() + chunk.len() > max_size {
            return Err(too_large());
        }
        data.extend_from_slice(&chunk);
    }

    tracing::debug!(url = %url, size_bytes = data.len(), "Source asset downloaded");
    Ok((data, fetched_type))
}
