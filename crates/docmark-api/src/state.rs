//! Application state shared by every handler.
//!
//! Everything here is built once at startup and injected; handlers never
//! construct clients or reload the logo.

use docmark_core::Config;
use docmark_processing::WatermarkPipeline;
use docmark_storage::{DocumentStore, Storage};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub documents: DocumentStore,
    pub pipeline: Arc<WatermarkPipeline>,
    /// Client used to fetch source assets by URL
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        pipeline: Arc<WatermarkPipeline>,
        http_client: reqwest::Client,
    ) -> Self {
        let documents = DocumentStore::new(storage.clone(), config.document_view_base_url());
        Self {
            config,
            storage,
            documents,
            pipeline,
            http_client,
        }
    }
}
