//! Application setup and initialization
//!
//! Everything `main` needs to go from a validated [`Config`] to a router:
//! storage, watermark logo, HTTP client, state and routes.

pub mod routes;
pub mod server;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use docmark_core::Config;
use docmark_processing::{AssetValidator, WatermarkLogo, WatermarkPipeline};
use std::sync::Arc;
use std::time::Duration;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Configuration validation failed")?;
    tracing::info!("Configuration loaded and validated successfully");

    let storage = storage::setup_storage(&config).await?;

    let logo = WatermarkLogo::load(config.watermark_logo_path())
        .await
        .with_context(|| {
            format!(
                "Failed to load watermark logo from {}",
                config.watermark_logo_path()
            )
        })?;
    let pipeline = build_pipeline(&config, Arc::new(logo));
    let http_client = build_http_client(&config)?;

    let state = Arc::new(AppState::new(config.clone(), storage, pipeline, http_client));
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

/// Watermark pipeline using the configured raster and paged specs.
pub fn build_pipeline(config: &Config, logo: Arc<WatermarkLogo>) -> Arc<WatermarkPipeline> {
    let watermark = config.watermark();
    Arc::new(WatermarkPipeline::new(
        logo,
        watermark.raster,
        watermark.paged,
        AssetValidator::new(config.max_upload_size_bytes()),
    ))
}

/// Client for fetching source assets. Redirects are not followed so a
/// validated public URL cannot bounce to an internal one.
pub fn build_http_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.url_fetch_timeout_secs()))
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Failed to create HTTP client")
}
