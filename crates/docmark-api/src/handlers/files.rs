//! Serves objects from the local backend so `fileUrl` locators resolve.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use docmark_core::models::{MIME_JPEG, MIME_OCTET_STREAM, MIME_PDF, MIME_PNG};
use docmark_core::AppError;
use futures::StreamExt;
use std::sync::Arc;

fn content_type_for_key(key: &str) -> &'static str {
    let extension = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => MIME_PDF,
        "png" => MIME_PNG,
        "jpg" | "jpeg" => MIME_JPEG,
        "json" => "application/json",
        _ => MIME_OCTET_STREAM,
    }
}

#[tracing::instrument(skip(state), fields(operation = "get_file"))]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, HttpAppError> {
    let stream = state.storage.download_stream(&key).await?;

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for_key(&key))
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(Body::from_stream(body_stream))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            HttpAppError::from(AppError::Internal(e.to_string()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for_key() {
        assert_eq!(content_type_for_key("documents/1-a/scan.PDF"), MIME_PDF);
        assert_eq!(content_type_for_key("documents/1-a/photo.png"), MIME_PNG);
        assert_eq!(content_type_for_key("documents/1-a/metadata.json"), "application/json");
        assert_eq!(content_type_for_key("documents/1-a/README"), MIME_OCTET_STREAM);
    }
}
