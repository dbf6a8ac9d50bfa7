//! Document retrieval integration tests.
//!
//! Run with: `cargo test -p docmark-api --test documents_test`

mod helpers;

use helpers::fixtures::{create_test_png, MultipartBody};
use helpers::{api_path, setup_test_app};
use serde_json::Value;

async fn upload_png(app: &helpers::TestApp) -> Value {
    let body = MultipartBody::new()
        .text("clientName", "Acme Farms")
        .text("docTitle", "Label artwork")
        .text("description", "Second revision")
        .file("file", "label.png", "image/png", &create_test_png(80, 60))
        .build();
    let response = app
        .client()
        .post(&api_path("/upload"))
        .add_header("Content-Type", MultipartBody::content_type())
        .bytes(body.into())
        .await;
    assert_eq!(response.status_code(), 200, "upload png");
    let json: Value = response.json();
    json["document"].clone()
}

#[tokio::test]
async fn test_retrieve_returns_stored_document() {
    let app = setup_test_app().await;
    let stored = upload_png(&app).await;
    let id = stored["id"].as_str().expect("id is a string");

    let by_query = app
        .client()
        .get(&api_path("/documents"))
        .add_query_param("id", id)
        .await;
    assert_eq!(by_query.status_code(), 200);
    let by_query: Value = by_query.json();
    assert_eq!(by_query["success"], true);
    assert_eq!(by_query["document"], stored);

    // Retrieval is repeatable and both route forms agree
    let by_path = app
        .client()
        .get(&api_path(&format!("/documents/{}", id)))
        .await;
    assert_eq!(by_path.status_code(), 200);
    let by_path: Value = by_path.json();
    assert_eq!(by_path["document"], stored);
}

#[tokio::test]
async fn test_retrieve_unknown_id_is_not_found() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(&api_path("/documents"))
        .add_query_param("id", "1700000000000-zzzzzzzz")
        .await;

    assert_eq!(response.status_code(), 404);
    let json: Value = response.json();
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_retrieve_without_metadata_is_not_found() {
    let app = setup_test_app().await;
    let id = "1700000000000-abcdefgh";
    app.storage
        .upload_with_key(
            &format!("documents/{}/orphan.pdf", id),
            b"%PDF-1.4".to_vec(),
            "application/pdf",
        )
        .await
        .expect("Failed to write orphan asset");

    let response = app
        .client()
        .get(&api_path(&format!("/documents/{}", id)))
        .await;

    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_retrieve_without_id_is_malformed() {
    let app = setup_test_app().await;

    let response = app.client().get(&api_path("/documents")).await;

    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert_eq!(json["code"], "MALFORMED_REQUEST");
}

#[tokio::test]
async fn test_retrieve_rejects_path_like_ids() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(&api_path("/documents"))
        .add_query_param("id", "../documents")
        .await;

    assert_eq!(response.status_code(), 404);
}
