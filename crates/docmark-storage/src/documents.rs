//! Document store
//!
//! Owns the mapping from document id to its two objects. The asset is written
//! first and `metadata.json` last; a document exists only once its metadata
//! record is readable and names an asset that is present.

use crate::keys::{self, document_asset_key, document_metadata_key, document_prefix};
use crate::traits::{Storage, StorageError};
use chrono::Utc;
use docmark_core::models::{format_upload_date, view_link, Document, WatermarkedAsset};
use docmark_core::AppError;
use rand::Rng;
use std::sync::Arc;
use thiserror::Error;

const ID_SUFFIX_LEN: usize = 8;
const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MAX_ID_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum DocumentStoreError {
    #[error("Invalid document: {0}")]
    InvalidInput(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Unreadable metadata for document {id}: {reason}")]
    CorruptMetadata { id: String, reason: String },

    #[error("Could not allocate a unique document id after {0} attempts")]
    IdExhausted(usize),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<DocumentStoreError> for AppError {
    fn from(err: DocumentStoreError) -> Self {
        match err {
            DocumentStoreError::InvalidInput(msg) => AppError::MalformedRequest(msg),
            DocumentStoreError::NotFound(id) => {
                AppError::NotFound(format!("Document not found: {}", id))
            }
            DocumentStoreError::Storage(e) => AppError::from(e),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Generate a document id: `{unix_millis}-{8 lowercase base36 chars}`.
pub fn generate_document_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

/// Ids are used as a single key segment and must not escape it.
pub fn is_valid_document_id(id: &str) -> bool {
    keys::is_safe_segment(id)
}

/// Persists watermarked assets with their metadata and answers lookups.
#[derive(Clone)]
pub struct DocumentStore {
    storage: Arc<dyn Storage>,
    view_base_url: String,
}

impl DocumentStore {
    pub fn new(storage: Arc<dyn Storage>, view_base_url: impl Into<String>) -> Self {
        DocumentStore {
            storage,
            view_base_url: view_base_url.into(),
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Store a watermarked asset and its metadata under a fresh id.
    pub async fn store(
        &self,
        asset: WatermarkedAsset,
        client_name: &str,
        title: &str,
        description: &str,
    ) -> Result<Document, DocumentStoreError> {
        // Blank values are rejected; anything else is stored exactly as given
        if client_name.trim().is_empty() {
            return Err(DocumentStoreError::InvalidInput(
                "clientName is required".to_string(),
            ));
        }
        if title.trim().is_empty() {
            return Err(DocumentStoreError::InvalidInput(
                "docTitle is required".to_string(),
            ));
        }
        if !keys::is_safe_segment(&asset.file_name) || asset.file_name == keys::METADATA_FILE_NAME
        {
            return Err(DocumentStoreError::InvalidInput(format!(
                "Invalid file name: {}",
                asset.file_name
            )));
        }

        let start = std::time::Instant::now();
        let id = self.allocate_id(generate_document_id).await?;
        let asset_key = document_asset_key(&id, &asset.file_name);
        let size = asset.bytes.len();

        let file_url = self
            .storage
            .upload_with_key(&asset_key, asset.bytes, &asset.mime_type)
            .await?;

        let document = Document {
            link: view_link(&self.view_base_url, &id),
            id: id.clone(),
            client_name: client_name.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            file_name: asset.file_name,
            mime_type: asset.mime_type,
            file_url,
            upload_date: format_upload_date(Utc::now()),
        };

        if let Err(e) = self.write_metadata(&document).await {
            tracing::error!(
                error = %e,
                document_id = %id,
                "Metadata write failed, removing orphaned asset"
            );
            if let Err(cleanup) = self.storage.delete(&asset_key).await {
                tracing::warn!(
                    error = %cleanup,
                    key = %asset_key,
                    "Failed to remove orphaned asset"
                );
            }
            return Err(e);
        }

        tracing::info!(
            document_id = %id,
            file_name = %document.file_name,
            mime_type = %document.mime_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Document stored"
        );

        Ok(document)
    }

    /// Look up a stored document by id.
    pub async fn retrieve(&self, id: &str) -> Result<Document, DocumentStoreError> {
        if !is_valid_document_id(id) {
            return Err(DocumentStoreError::NotFound(id.to_string()));
        }

        let keys = self.storage.list(&document_prefix(id)).await?;
        if keys.is_empty() {
            return Err(DocumentStoreError::NotFound(id.to_string()));
        }

        let metadata_key = document_metadata_key(id);
        if !keys.iter().any(|k| k == &metadata_key) {
            tracing::warn!(document_id = %id, "Document has objects but no metadata record");
            return Err(DocumentStoreError::NotFound(id.to_string()));
        }

        let raw = match self.storage.download(&metadata_key).await {
            Ok(raw) => raw,
            Err(StorageError::NotFound(_)) => {
                return Err(DocumentStoreError::NotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let document: Document =
            serde_json::from_slice(&raw).map_err(|e| DocumentStoreError::CorruptMetadata {
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        let asset_key = document_asset_key(id, &document.file_name);
        if !keys.iter().any(|k| k == &asset_key) {
            tracing::warn!(
                document_id = %id,
                key = %asset_key,
                "Metadata names an asset that is not present"
            );
            return Err(DocumentStoreError::NotFound(id.to_string()));
        }

        Ok(document)
    }

    async fn write_metadata(&self, document: &Document) -> Result<(), DocumentStoreError> {
        let body = serde_json::to_vec_pretty(document).map_err(|e| {
            DocumentStoreError::CorruptMetadata {
                id: document.id.clone(),
                reason: e.to_string(),
            }
        })?;
        self.storage
            .upload_with_key(&document_metadata_key(&document.id), body, "application/json")
            .await?;
        Ok(())
    }

    /// Draw ids from `next` until one has no objects under its prefix.
    async fn allocate_id<F>(&self, mut next: F) -> Result<String, DocumentStoreError>
    where
        F: FnMut() -> String,
    {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = next();
            if self.storage.list(&document_prefix(&id)).await?.is_empty() {
                return Ok(id);
            }
            tracing::warn!(document_id = %id, attempt, "Document id collision, regenerating");
        }
        Err(DocumentStoreError::IdExhausted(MAX_ID_ATTEMPTS))
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use crate::{LocalStorage, StorageBackend, StorageResult};
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::Stream;
    use std::pin::Pin;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    const VIEW_BASE: &str = "https://docs.example.com/view";

    async fn local(dir: &TempDir) -> Arc<LocalStorage> {
        Arc::new(
            LocalStorage::new(dir.path(), "http://localhost:3000/files".to_string())
                .await
                .unwrap(),
        )
    }

    fn pdf_asset() -> WatermarkedAsset {
        WatermarkedAsset {
            bytes: b"%PDF-1.5 fake".to_vec(),
            mime_type: "application/pdf".to_string(),
            file_name: "report.pdf".to_string(),
        }
    }

    fn id_pattern_ok(id: &str) -> bool {
        let Some((millis, suffix)) = id.split_once('-') else {
            return false;
        };
        millis.len() == 13
            && millis.chars().all(|c| c.is_ascii_digit())
            && suffix.len() == 8
            && suffix
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
    }

    /// Delegates to local storage but refuses to write metadata records.
    struct FailingMetadata(Arc<LocalStorage>);

    #[async_trait]
    impl Storage for FailingMetadata {
        async fn upload_with_key(
            &self,
            storage_key: &str,
            data: Vec<u8>,
            content_type: &str,
        ) -> StorageResult<String> {
            if storage_key.ends_with(keys::METADATA_FILE_NAME) {
                return Err(StorageError::UploadFailed("disk full".to_string()));
            }
            self.0.upload_with_key(storage_key, data, content_type).await
        }
        async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
            self.0.download(storage_key).await
        }
        async fn delete(&self, storage_key: &str) -> StorageResult<()> {
            self.0.delete(storage_key).await
        }
        async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
            self.0.exists(storage_key).await
        }
        async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
            self.0.list(prefix).await
        }
        fn public_url(&self, storage_key: &str) -> String {
            self.0.public_url(storage_key)
        }
        async fn presigned_put_url(
            &self,
            storage_key: &str,
            content_type: &str,
            expires_in: Duration,
        ) -> StorageResult<String> {
            self.0
                .presigned_put_url(storage_key, content_type, expires_in)
                .await
        }
        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Local
        }
        async fn download_stream(
            &self,
            storage_key: &str,
        ) -> StorageResult<Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>>
        {
            self.0.download_stream(storage_key).await
        }
    }

    #[test]
    fn test_generate_document_id_shape() {
        for _ in 0..50 {
            let id = generate_document_id();
            assert!(id_pattern_ok(&id), "bad id {}", id);
        }
    }

    #[test]
    fn test_is_valid_document_id() {
        assert!(is_valid_document_id("1718000000000-abcd1234"));
        assert!(!is_valid_document_id(""));
        assert!(!is_valid_document_id("../secrets"));
        assert!(!is_valid_document_id("a/b"));
    }

    #[tokio::test]
    async fn test_store_then_retrieve_round_trips() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::new(local(&dir).await, VIEW_BASE);

        let stored = store
            .store(pdf_asset(), "Acme Corp", "Quarterly report", "Q3 numbers")
            .await
            .unwrap();

        assert!(id_pattern_ok(&stored.id));
        assert_eq!(stored.link, format!("{}?id={}", VIEW_BASE, stored.id));
        assert_eq!(
            stored.file_url,
            format!(
                "http://localhost:3000/files/documents/{}/report.pdf",
                stored.id
            )
        );
        assert!(stored.uploaded_at().is_some());

        let first = store.retrieve(&stored.id).await.unwrap();
        let second = store.retrieve(&stored.id).await.unwrap();
        assert_eq!(first, stored);
        assert_eq!(first, second);
        assert_eq!(first.client_name, "Acme Corp");
        assert_eq!(first.title, "Quarterly report");
        assert_eq!(first.description, "Q3 numbers");
        assert_eq!(first.file_name, "report.pdf");
    }

    #[tokio::test]
    async fn test_text_fields_are_stored_verbatim() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::new(local(&dir).await, VIEW_BASE);

        let stored = store
            .store(pdf_asset(), "  Acme Farms ", " Title\n", " notes ")
            .await
            .unwrap();
        let retrieved = store.retrieve(&stored.id).await.unwrap();

        assert_eq!(retrieved.client_name, "  Acme Farms ");
        assert_eq!(retrieved.title, " Title\n");
        assert_eq!(retrieved.description, " notes ");
    }

    #[tokio::test]
    async fn test_store_rejects_missing_fields_without_writing() {
        let dir = tempdir().unwrap();
        let storage = local(&dir).await;
        let store = DocumentStore::new(storage.clone(), VIEW_BASE);

        let err = store.store(pdf_asset(), "  ", "Title", "").await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidInput(_)));

        let err = store.store(pdf_asset(), "Acme", "", "").await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidInput(_)));

        let mut asset = pdf_asset();
        asset.file_name = "metadata.json".to_string();
        let err = store.store(asset, "Acme", "Title", "").await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidInput(_)));

        assert!(storage.list("documents/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_unknown_id_is_not_found() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::new(local(&dir).await, VIEW_BASE);

        let err = store.retrieve("1718000000000-zzzzzzzz").await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::NotFound(_)));

        let err = store.retrieve("../etc").await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_retrieve_asset_without_metadata_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = local(&dir).await;
        storage
            .upload_with_key("documents/orphan/report.pdf", b"x".to_vec(), "application/pdf")
            .await
            .unwrap();

        let store = DocumentStore::new(storage, VIEW_BASE);
        let err = store.retrieve("orphan").await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_retrieve_metadata_without_asset_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = local(&dir).await;
        let store = DocumentStore::new(storage.clone(), VIEW_BASE);

        let stored = store
            .store(pdf_asset(), "Acme", "Title", "")
            .await
            .unwrap();
        storage
            .delete(&document_asset_key(&stored.id, "report.pdf"))
            .await
            .unwrap();

        let err = store.retrieve(&stored.id).await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_retrieve_unparseable_metadata_is_storage_error() {
        let dir = tempdir().unwrap();
        let storage = local(&dir).await;
        storage
            .upload_with_key("documents/bad/metadata.json", b"{not json".to_vec(), "application/json")
            .await
            .unwrap();

        let store = DocumentStore::new(storage, VIEW_BASE);
        let err = store.retrieve("bad").await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::CorruptMetadata { .. }));
        assert_eq!(
            docmark_core::ErrorMetadata::error_code(&AppError::from(err)),
            "STORAGE_ERROR"
        );
    }

    #[tokio::test]
    async fn test_failed_metadata_write_removes_asset() {
        let dir = tempdir().unwrap();
        let inner = local(&dir).await;
        let store = DocumentStore::new(Arc::new(FailingMetadata(inner.clone())), VIEW_BASE);

        let err = store
            .store(pdf_asset(), "Acme", "Title", "")
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::Storage(_)));
        assert!(inner.list("documents/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_allocate_id_skips_taken_ids() {
        let dir = tempdir().unwrap();
        let storage = local(&dir).await;
        storage
            .upload_with_key("documents/taken/metadata.json", b"{}".to_vec(), "application/json")
            .await
            .unwrap();
        let store = DocumentStore::new(storage, VIEW_BASE);

        let mut candidates = vec!["fresh".to_string(), "taken".to_string()];
        let id = store
            .allocate_id(|| candidates.pop().unwrap_or_default())
            .await
            .unwrap();
        assert_eq!(id, "fresh");

        let err = store
            .allocate_id(|| "taken".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::IdExhausted(_)));
    }
}
