//! Route configuration and setup.
//!
//! Health checks live in [health](health).

mod health;

use crate::constants::{API_PREFIX, FILES_PREFIX, MULTIPART_OVERHEAD_BYTES};
use crate::error::HttpAppError;
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docmark_core::{AppError, Config, StorageBackend};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;
    let body_limit = config.max_upload_size_bytes() + MULTIPART_OVERHEAD_BYTES;
    tracing::info!(body_limit_bytes = body_limit, "Request body limit enabled");

    let app = api_routes(config)
        .merge(health::health_routes())
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(axum::middleware::map_response(json_error_body))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn api_routes(config: &Config) -> Router<Arc<AppState>> {
    let router = Router::new()
        .route(
            &format!("{}/upload", API_PREFIX),
            post(handlers::upload::upload_document),
        )
        .route(
            &format!("{}/watermark", API_PREFIX),
            post(handlers::watermark::watermark_from_url),
        )
        .route(
            &format!("{}/documents", API_PREFIX),
            get(handlers::documents::get_document_by_query),
        )
        .route(
            &format!("{}/documents/{{id}}", API_PREFIX),
            get(handlers::documents::get_document),
        )
        .route(
            &format!("{}/upload-token", API_PREFIX),
            post(handlers::upload_token::create_upload_token),
        );

    // Local objects are only reachable through the service itself
    if config.storage_backend() == StorageBackend::Local {
        router.route(
            &format!("{}/{{*key}}", FILES_PREFIX),
            get(handlers::files::get_file),
        )
    } else {
        router
    }
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}

async fn not_found() -> HttpAppError {
    AppError::NotFound("Route not found".to_string()).into()
}

/// The router (wrong method) and the body limit (oversized request) answer
/// with plain-text errors; give them the same JSON body as every other error.
async fn json_error_body(response: Response) -> Response {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if is_json {
        return response;
    }

    let error = match response.status() {
        StatusCode::METHOD_NOT_ALLOWED => {
            AppError::MethodNotAllowed("Method not allowed".to_string())
        }
        StatusCode::PAYLOAD_TOO_LARGE => {
            AppError::PayloadTooLarge("Request body exceeds the upload size limit".to_string())
        }
        _ => return response,
    };

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut json = HttpAppError::from(error).into_response();
    if let Some(allow) = allow {
        json.headers_mut().insert(header::ALLOW, allow);
    }
    json
}
