use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use docmark_core::models::DocumentResponse;
use docmark_core::AppError;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct DocumentQuery {
    /// Document identifier
    pub id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v0/documents",
    tag = "documents",
    params(DocumentQuery),
    responses(
        (status = 200, description = "Document metadata", body = DocumentResponse),
        (status = 400, description = "Missing document ID", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_document_by_query(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DocumentQuery>,
) -> Result<Json<DocumentResponse>, HttpAppError> {
    let id = query
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::MalformedRequest("Document ID is required".to_string()))?;

    retrieve(&state, id).await
}

#[utoipa::path(
    get,
    path = "/api/v0/documents/{id}",
    tag = "documents",
    params(
        ("id" = String, Path, description = "Document identifier")
    ),
    responses(
        (status = 200, description = "Document metadata", body = DocumentResponse),
        (status = 404, description = "Document not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, HttpAppError> {
    retrieve(&state, &id).await
}

#[tracing::instrument(skip(state), fields(operation = "get_document"))]
async fn retrieve(state: &AppState, id: &str) -> Result<Json<DocumentResponse>, HttpAppError> {
    let document = state.documents.retrieve(id).await?;
    Ok(Json(DocumentResponse::from(document)))
}
