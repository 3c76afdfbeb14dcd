//! Backend abstraction traits
//!
//! This module defines the `DocumentStore` and `FileStore` traits that all
//! provider backends must implement, together with their error taxonomies.
//! Provider errors pass through typed; a backend never translates a failure
//! into a generic success.

use async_trait::async_trait;
use permitseal_core::{BucketKind, Document, DocumentPatch, NewDocument};
use thiserror::Error;

use crate::changes::Subscription;

/// Document-metadata operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Write rejected by the store (permissions, schema, or transient).
    #[error("Database error: {0}")]
    Db(String),

    /// Read/update/delete on an unknown id.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Duplicate id on create. Should not occur given `generate_id`'s
    /// contract, but is handled, not assumed impossible.
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Result type for document-metadata operations
pub type StoreResult<T> = Result<T, StoreError>;

/// File operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for file operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Reference to a stored file: the key it was written under and a URL it
/// can be fetched from.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub key: String,
    pub url: String,
}

/// Document-metadata store.
///
/// One implementation per provider; the pipeline and API only ever see
/// `Arc<dyn DocumentStore>`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return a fresh globally-unique permit id. Ids are issued atomically:
    /// two concurrent callers never receive the same id.
    async fn generate_id(&self) -> StoreResult<String>;

    /// Insert a new document record with status `uploaded`.
    async fn create(&self, new: NewDocument) -> StoreResult<Document>;

    /// Fetch a single record by id.
    async fn get(&self, id: &str) -> StoreResult<Document>;

    /// List records, newest-first by creation time, optionally filtered by
    /// owner.
    async fn list(&self, owner: Option<&str>) -> StoreResult<Vec<Document>>;

    /// Merge fields into an existing record. The id cannot change. All
    /// fields of the patch are written in a single store write.
    async fn update(&self, id: &str, patch: DocumentPatch) -> StoreResult<Document>;

    /// Remove the metadata record. Callers are responsible for separately
    /// removing associated files; no cascading delete is guaranteed.
    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// Subscribe to change events on the documents collection.
    ///
    /// Delivery is at-least-once with no ordering guarantee across
    /// concurrent writers, and events may be missed during a network
    /// partition (the feed silently resumes on reconnect). Consumers must
    /// treat events as a hint to re-list, not as an authoritative log.
    async fn subscribe(&self) -> StoreResult<Subscription>;
}

/// File-bytes store over the two logical document buckets.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Upload bytes under a key; returns the key and a fetchable URL.
    async fn upload(
        &self,
        bucket: BucketKind,
        key: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<StoredFile>;

    /// Download a file's bytes.
    async fn download(&self, bucket: BucketKind, key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a file. Deleting a missing file is not an error.
    async fn delete(&self, bucket: BucketKind, key: &str) -> StorageResult<()>;

    /// Check whether a file exists.
    async fn exists(&self, bucket: BucketKind, key: &str) -> StorageResult<bool>;

    /// Public URL for a stored file.
    fn file_url(&self, bucket: BucketKind, key: &str) -> String;
}
