use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::{content_type, sanitize_filename};
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use docmark_core::models::{DocumentResponse, FIELD_CLIENT_NAME, FIELD_DOC_TITLE};
use docmark_core::AppError;
use docmark_processing::{boundary_from_content_type, decode_form};
use std::sync::Arc;

pub(crate) fn missing_field(name: &str) -> AppError {
    AppError::MalformedRequest(format!("Missing required field: {}", name))
}

/// Watermark and store a document sent as `multipart/form-data`.
///
/// The body is decoded by hand so binary payloads are never reinterpreted.
#[utoipa::path(
    post,
    path = "/api/v0/upload",
    tag = "documents",
    request_body(
        content = inline(Object),
        content_type = "multipart/form-data",
        description = "Fields `clientName`, `docTitle`, optional `description`, and one file part (PDF, PNG or JPEG)"
    ),
    responses(
        (status = 200, description = "Document watermarked and stored", body = DocumentResponse),
        (status = 400, description = "Malformed request or unsupported media type", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, headers, body),
    fields(body_bytes = body.len(), operation = "upload_document")
)]
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DocumentResponse>, HttpAppError> {
    let content_type = content_type(&headers).ok_or_else(|| {
        AppError::MalformedRequest("Missing Content-Type header".to_string())
    })?;
    let boundary = boundary_from_content_type(content_type)?;
    let mut asset = decode_form(&body, &boundary)?.into_asset()?;

    // Required fields are checked before any rendering or storage work
    let client_name = asset
        .client_name()
        .map(String::from)
        .ok_or_else(|| missing_field(FIELD_CLIENT_NAME))?;
    let title = asset
        .title()
        .map(String::from)
        .ok_or_else(|| missing_field(FIELD_DOC_TITLE))?;
    let description = asset.description().to_string();
    asset.file_name = sanitize_filename(&asset.file_name)?;

    tracing::info!(
        file_name = %asset.file_name,
        mime_type = %asset.mime_type,
        file_size = asset.bytes.len(),
        "Processing document upload"
    );

    let watermarked = state.pipeline.process_blocking(asset).await?;
    let document = state
        .documents
        .store(watermarked, &client_name, &title, &description)
        .await?;

    tracing::info!(
        document_id = %document.id,
        file_name = %document.file_name,
        "Document uploaded"
    );

    Ok(Json(DocumentResponse::from(document)))
}
