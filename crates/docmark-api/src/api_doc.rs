//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use docmark_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Docmark API",
        version = "0.1.0",
        description = "Document watermarking service (v0). Accepts PDFs and raster images, overlays a translucent brand mark and stores the result with its metadata. All endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::upload::upload_document,
        handlers::watermark::watermark_from_url,
        handlers::documents::get_document_by_query,
        handlers::documents::get_document,
        handlers::upload_token::create_upload_token,
    ),
    components(
        schemas(
            models::Document,
            models::DocumentResponse,
            handlers::watermark::WatermarkRequest,
            handlers::upload_token::UploadTokenRequest,
            handlers::upload_token::UploadTokenResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "documents", description = "Watermark, store and retrieve documents"),
        (name = "uploads", description = "Direct-upload grants")
    )
)]
pub struct ApiDoc;
