//! Local fallback backend.
//!
//! Used when no persistent provider is configured. Metadata lives in an
//! in-process map backed by one JSON file per document id (the durable KV);
//! file bytes live under a plain directory tree. `get` after `create`
//! always succeeds within a process; across restarts only the persisted
//! metadata survives. The store is scoped to a single process: documents
//! created in one process are invisible to another.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use permitseal_core::{BucketKind, Document, DocumentPatch, DocumentStatus, NewDocument};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;

use crate::changes::{ChangeKind, DocumentChange, Subscription, CHANGE_CHANNEL_CAPACITY};
use crate::keys::format_permit_id;
use crate::traits::{
    DocumentStore, FileStore, StorageError, StorageResult, StoreError, StoreResult, StoredFile,
};

/// Parse the numeric suffix of a permit id (`PERMIT-042` → 42).
fn id_number(id: &str) -> Option<u64> {
    id.rsplit('-').next()?.parse().ok()
}

fn valid_record_id(id: &str) -> bool {
    !id.is_empty() && !id.contains('/') && !id.contains("..")
}

/// In-process document store with a JSON-file KV for durability.
pub struct LocalDocumentStore {
    data_dir: PathBuf,
    docs: RwLock<HashMap<String, Document>>,
    next_number: AtomicU64,
    id_prefix: String,
    changes: broadcast::Sender<DocumentChange>,
}

impl LocalDocumentStore {
    /// Open the store, loading any records persisted by earlier processes
    /// and seeding the id counter past the highest number seen.
    pub async fn open(data_dir: impl Into<PathBuf>, id_prefix: String) -> StoreResult<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| StoreError::Db(format!("failed to create data dir: {}", e)))?;

        let mut docs = HashMap::new();
        let mut max_number = 0u64;

        let mut entries = fs::read_dir(&data_dir)
            .await
            .map_err(|e| StoreError::Db(format!("failed to read data dir: {}", e)))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Db(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = match fs::read(&path).await {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable record");
                    continue;
                }
            };
            match serde_json::from_slice::<Document>(&raw) {
                Ok(doc) => {
                    if let Some(n) = id_number(&doc.id) {
                        max_number = max_number.max(n);
                    }
                    docs.insert(doc.id.clone(), doc);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unparseable record");
                }
            }
        }

        tracing::info!(
            data_dir = %data_dir.display(),
            loaded = docs.len(),
            "local document store opened"
        );

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(LocalDocumentStore {
            data_dir,
            docs: RwLock::new(docs),
            next_number: AtomicU64::new(max_number + 1),
            id_prefix,
            changes,
        })
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", id))
    }

    async fn persist(&self, doc: &Document) -> StoreResult<()> {
        let raw = serde_json::to_vec_pretty(doc).map_err(|e| StoreError::Db(e.to_string()))?;
        fs::write(self.record_path(&doc.id), raw)
            .await
            .map_err(|e| StoreError::Db(format!("failed to persist record: {}", e)))
    }

    fn notify(&self, kind: ChangeKind, id: &str) {
        // Returns Err only when nobody is subscribed, which is fine.
        let _ = self.changes.send(DocumentChange {
            kind,
            id: id.to_string(),
        });
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn generate_id(&self) -> StoreResult<String> {
        let n = self.next_number.fetch_add(1, Ordering::SeqCst);
        Ok(format_permit_id(&self.id_prefix, n as i64))
    }

    async fn create(&self, new: NewDocument) -> StoreResult<Document> {
        if !valid_record_id(&new.id) {
            return Err(StoreError::Db(format!("invalid document id: {}", new.id)));
        }
        let now = Utc::now();
        let doc = Document {
            id: new.id.clone(),
            name: new.name,
            size_mb: new.size_mb,
            status: DocumentStatus::Uploaded,
            upload_date: now,
            processed_date: None,
            owner_user_id: new.owner_user_id,
            original_file_path: None,
            processed_file_path: None,
            shareable_url: None,
            created_at: now,
            updated_at: now,
        };

        {
            let mut docs = self
                .docs
                .write()
                .map_err(|_| StoreError::Db("document map poisoned".to_string()))?;
            if docs.contains_key(&doc.id) {
                return Err(StoreError::Conflict(format!(
                    "document {} already exists",
                    doc.id
                )));
            }
            docs.insert(doc.id.clone(), doc.clone());
        }

        self.persist(&doc).await?;
        self.notify(ChangeKind::Created, &doc.id);
        Ok(doc)
    }

    async fn get(&self, id: &str) -> StoreResult<Document> {
        let docs = self
            .docs
            .read()
            .map_err(|_| StoreError::Db("document map poisoned".to_string()))?;
        docs.get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list(&self, owner: Option<&str>) -> StoreResult<Vec<Document>> {
        let docs = self
            .docs
            .read()
            .map_err(|_| StoreError::Db("document map poisoned".to_string()))?;
        let mut out: Vec<Document> = docs
            .values()
            .filter(|d| owner.map_or(true, |o| d.owner_user_id.as_deref() == Some(o)))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(out)
    }

    async fn update(&self, id: &str, patch: DocumentPatch) -> StoreResult<Document> {
        let doc = {
            let mut docs = self
                .docs
                .write()
                .map_err(|_| StoreError::Db("document map poisoned".to_string()))?;
            let doc = docs
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            patch.apply(doc, Utc::now());
            doc.clone()
        };

        self.persist(&doc).await?;
        self.notify(ChangeKind::Updated, id);
        Ok(doc)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let removed = {
            let mut docs = self
                .docs
                .write()
                .map_err(|_| StoreError::Db("document map poisoned".to_string()))?;
            docs.remove(id)
        };
        if removed.is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }

        if valid_record_id(id) {
            if let Err(e) = fs::remove_file(self.record_path(id)).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(id, error = %e, "failed to remove persisted record");
                }
            }
        }
        self.notify(ChangeKind::Deleted, id);
        Ok(())
    }

    async fn subscribe(&self) -> StoreResult<Subscription> {
        Ok(Subscription::new(self.changes.subscribe()))
    }
}

/// Local filesystem file store.
#[derive(Clone)]
pub struct LocalFileStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalFileStore {
    /// Create a new store rooted at `base_path`, serving files under
    /// `base_url`.
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalFileStore {
            base_path,
            base_url,
        })
    }

    /// Convert a bucket + key to a filesystem path, rejecting traversal.
    fn key_to_path(&self, bucket: BucketKind, key: &str) -> StorageResult<PathBuf> {
        if key.contains("..") || key.starts_with('/') || key.is_empty() {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }
        Ok(self.base_path.join(bucket.bucket_name()).join(key))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn upload(
        &self,
        bucket: BucketKind,
        key: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<StoredFile> {
        let path = self.key_to_path(bucket, key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let url = self.file_url(bucket, key);

        tracing::info!(
            bucket = bucket.bucket_name(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "local storage upload successful"
        );

        Ok(StoredFile {
            key: key.to_string(),
            url,
        })
    }

    async fn download(&self, bucket: BucketKind, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(bucket, key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })
    }

    async fn delete(&self, bucket: BucketKind, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(bucket, key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(bucket = bucket.bucket_name(), key = %key, "local storage delete successful");
        Ok(())
    }

    async fn exists(&self, bucket: BucketKind, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(bucket, key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    fn file_url(&self, bucket: BucketKind, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            bucket.bucket_name(),
            key
        )
    }
}
