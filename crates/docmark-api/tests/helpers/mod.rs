//! Test helpers: build AppState and router for integration tests.
//!
//! Every app gets its own temporary local storage root; nothing touches the
//! network.

#![allow(dead_code)]

pub mod fixtures;
pub mod storage;

use axum_test::TestServer;
use docmark_api::constants;
use docmark_api::setup::{self, routes};
use docmark_api::state::AppState;
use docmark_core::{Config, DocmarkConfig};
use docmark_processing::WatermarkLogo;
use docmark_storage::{create_storage, Storage};
use std::sync::Arc;
use storage::TestStorage;

pub const VIEW_BASE_URL: &str = "https://docs.example.test/view";

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server, storage handle and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<dyn Storage>,
    pub _storage_dir: TestStorage,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Every object key currently under `documents/`.
    pub async fn document_keys(&self) -> Vec<String> {
        self.storage
            .list("documents/")
            .await
            .expect("Failed to list storage")
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Setup a test app, letting the caller adjust the configuration first.
pub async fn setup_test_app_with(configure: impl FnOnce(&mut DocmarkConfig)) -> TestApp {
    let storage_dir = TestStorage::new();

    let mut inner = DocmarkConfig::local(storage_dir.base_path_str(), storage_dir.base_url.clone());
    inner.document_view_base_url = VIEW_BASE_URL.to_string();
    configure(&mut inner);
    let config = Config(Box::new(inner));
    config.validate().expect("Test configuration is invalid");

    let storage = create_storage(&config)
        .await
        .expect("Failed to create local storage");
    let logo = WatermarkLogo::from_image(fixtures::logo_image()).expect("Failed to build logo");
    let pipeline = setup::build_pipeline(&config, Arc::new(logo));
    let http_client = setup::build_http_client(&config).expect("Failed to build HTTP client");

    let state = Arc::new(AppState::new(
        config.clone(),
        storage.clone(),
        pipeline,
        http_client,
    ));
    let app = routes::setup_routes(&config, state).expect("Failed to setup routes");

    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        storage,
        _storage_dir: storage_dir,
    }
}
