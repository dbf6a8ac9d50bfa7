//! Direct-upload grants: the client PUTs the source asset straight to the
//! object store, then calls the watermark endpoint with its URL.

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use crate::utils::upload::sanitize_filename;
use axum::{extract::State, Json};
use docmark_core::models::{normalize_mime_type, ACCEPTED_CONTENT_TYPES};
use docmark_storage::keys::upload_staging_key;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadTokenRequest {
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    pub content_type: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadTokenResponse {
    /// Presigned URL accepting a single HTTP PUT
    pub upload_url: String,
    /// Where the object will be readable once uploaded; pass it as `blobUrl`
    pub blob_url: String,
    pub key: String,
    pub allowed_content_types: Vec<String>,
    pub maximum_size_in_bytes: usize,
    pub expires_in_secs: u64,
}

#[utoipa::path(
    post,
    path = "/api/v0/upload-token",
    tag = "uploads",
    request_body = UploadTokenRequest,
    responses(
        (status = 200, description = "Direct-upload grant issued", body = UploadTokenResponse),
        (status = 400, description = "Unsupported content type or backend without presigning", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(content_type = %request.content_type, operation = "create_upload_token")
)]
pub async fn create_upload_token(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<UploadTokenRequest>,
) -> Result<Json<UploadTokenResponse>, HttpAppError> {
    state
        .pipeline
        .validator()
        .validate_content_type(&request.content_type)?;

    let file_name = sanitize_filename(&request.file_name)?;
    let key = upload_staging_key(Uuid::new_v4(), &file_name);
    let ttl = state.config.upload_token_ttl_secs();

    let upload_url = state
        .storage
        .presigned_put_url(
            &key,
            &normalize_mime_type(&request.content_type),
            Duration::from_secs(ttl),
        )
        .await?;

    tracing::info!(key = %key, expires_in_secs = ttl, "Upload token issued");

    Ok(Json(UploadTokenResponse {
        upload_url,
        blob_url: state.storage.public_url(&key),
        key,
        allowed_content_types: ACCEPTED_CONTENT_TYPES.iter().map(|s| s.to_string()).collect(),
        maximum_size_in_bytes: state.config.max_upload_size_bytes(),
        expires_in_secs: ttl,
    }))
}
