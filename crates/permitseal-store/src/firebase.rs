//! Firebase-backed stores over the Firestore and Firebase Storage REST APIs.
//!
//! Metadata lives in the `documents` Firestore collection; files live in a
//! single Firebase Storage bucket with the logical bucket name as the
//! object-name prefix. Authentication uses a deployment-provided bearer
//! token; the provider itself is treated as opaque.
//!
//! Permit id allocation uses a `counters/permits` document updated under a
//! `currentDocument` precondition with bounded retry, so two concurrent
//! creators can never be handed the same id.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use permitseal_core::{BucketKind, Document, DocumentPatch, DocumentStatus, NewDocument};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::sync::OnceCell;

use crate::changes::{ChangeKind, DocumentChange, Subscription, CHANGE_CHANNEL_CAPACITY};
use crate::keys::format_permit_id;
use crate::traits::{
    DocumentStore, FileStore, StorageError, StorageResult, StoreError, StoreResult, StoredFile,
};

const FIRESTORE_BASE: &str = "https://firestore.googleapis.com/v1";
const STORAGE_BASE: &str = "https://firebasestorage.googleapis.com/v0";
const COLLECTION: &str = "documents";
const COUNTER_COLLECTION: &str = "counters";
const COUNTER_DOC: &str = "permits";
const ID_ALLOC_MAX_ATTEMPTS: u32 = 5;

// ----- Firestore value helpers -----

fn string_value(s: &str) -> Value {
    json!({ "stringValue": s })
}

fn double_value(f: f64) -> Value {
    json!({ "doubleValue": f })
}

fn integer_value(i: i64) -> Value {
    // Firestore encodes 64-bit integers as strings.
    json!({ "integerValue": i.to_string() })
}

fn timestamp_value(t: DateTime<Utc>) -> Value {
    json!({ "timestampValue": t.to_rfc3339_opts(SecondsFormat::Micros, true) })
}

fn get_string(fields: &Value, key: &str) -> Option<String> {
    fields
        .get(key)?
        .get("stringValue")?
        .as_str()
        .map(String::from)
}

fn get_double(fields: &Value, key: &str) -> Option<f64> {
    let value = fields.get(key)?;
    if let Some(f) = value.get("doubleValue").and_then(Value::as_f64) {
        return Some(f);
    }
    value
        .get("integerValue")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
}

fn get_integer(fields: &Value, key: &str) -> Option<i64> {
    fields
        .get(key)?
        .get("integerValue")?
        .as_str()?
        .parse()
        .ok()
}

fn get_timestamp(fields: &Value, key: &str) -> Option<DateTime<Utc>> {
    let raw = fields.get(key)?.get("timestampValue")?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Id of a Firestore document from its resource name
/// (`projects/../documents/documents/PERMIT-001` → `PERMIT-001`).
fn id_from_resource_name(name: &str) -> Option<&str> {
    name.rsplit('/').next().filter(|s| !s.is_empty())
}

/// Decode a Firestore document resource into a [`Document`].
fn parse_firestore_document(doc: &Value) -> StoreResult<Document> {
    let name = doc
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Db("Firestore document missing resource name".to_string()))?;
    let id = id_from_resource_name(name)
        .ok_or_else(|| StoreError::Db(format!("bad Firestore resource name: {}", name)))?
        .to_string();

    let fields = doc
        .get("fields")
        .cloned()
        .unwrap_or_else(|| json!({}));

    let missing = |key: &str| StoreError::Db(format!("document {} missing field {}", id, key));

    let status: DocumentStatus = get_string(&fields, "status")
        .ok_or_else(|| missing("status"))?
        .parse()
        .map_err(StoreError::Db)?;

    Ok(Document {
        name: get_string(&fields, "name").ok_or_else(|| missing("name"))?,
        size_mb: get_double(&fields, "size_mb").ok_or_else(|| missing("size_mb"))?,
        status,
        upload_date: get_timestamp(&fields, "upload_date").ok_or_else(|| missing("upload_date"))?,
        processed_date: get_timestamp(&fields, "processed_date"),
        owner_user_id: get_string(&fields, "owner_user_id"),
        original_file_path: get_string(&fields, "original_file_path"),
        processed_file_path: get_string(&fields, "processed_file_path"),
        shareable_url: get_string(&fields, "shareable_url"),
        created_at: get_timestamp(&fields, "created_at").ok_or_else(|| missing("created_at"))?,
        updated_at: get_timestamp(&fields, "updated_at").ok_or_else(|| missing("updated_at"))?,
        id,
    })
}

/// Encode the patched fields (plus `updated_at`) and the matching
/// `updateMask` field paths.
fn encode_patch(patch: &DocumentPatch, now: DateTime<Utc>) -> (Value, Vec<&'static str>) {
    let mut fields = serde_json::Map::new();
    let mut mask = Vec::new();

    if let Some(status) = patch.status {
        fields.insert("status".to_string(), string_value(status.as_str()));
        mask.push("status");
    }
    if let Some(ref path) = patch.original_file_path {
        fields.insert("original_file_path".to_string(), string_value(path));
        mask.push("original_file_path");
    }
    if let Some(ref path) = patch.processed_file_path {
        fields.insert("processed_file_path".to_string(), string_value(path));
        mask.push("processed_file_path");
    }
    if let Some(ref url) = patch.shareable_url {
        fields.insert("shareable_url".to_string(), string_value(url));
        mask.push("shareable_url");
    }
    if let Some(date) = patch.processed_date {
        fields.insert("processed_date".to_string(), timestamp_value(date));
        mask.push("processed_date");
    }
    fields.insert("updated_at".to_string(), timestamp_value(now));
    mask.push("updated_at");

    (json!({ "fields": Value::Object(fields) }), mask)
}

// ----- Firestore client -----

/// Thin Firestore REST client shared by the store and its change poller.
#[derive(Clone)]
struct FirestoreClient {
    http: reqwest::Client,
    base: String,
    project_id: String,
    auth_token: Option<String>,
}

impl FirestoreClient {
    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.base, self.project_id
        )
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.documents_root(), collection)
    }

    fn doc_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.documents_root(), collection, id)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> StoreResult<(StatusCode, Value)> {
        let response = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| StoreError::Db(format!("Firestore request failed: {}", e)))?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    async fn list_documents(&self, owner: Option<&str>) -> StoreResult<Vec<Document>> {
        let mut query = json!({
            "from": [{ "collectionId": COLLECTION }],
            "orderBy": [{
                "field": { "fieldPath": "created_at" },
                "direction": "DESCENDING"
            }]
        });
        if let Some(owner) = owner {
            query["where"] = json!({
                "fieldFilter": {
                    "field": { "fieldPath": "owner_user_id" },
                    "op": "EQUAL",
                    "value": string_value(owner)
                }
            });
        }

        let url = format!("{}:runQuery", self.documents_root());
        let (status, body) = self
            .send(self.http.post(&url).json(&json!({ "structuredQuery": query })))
            .await?;
        if !status.is_success() {
            return Err(StoreError::Db(format!(
                "Firestore query failed with {}: {}",
                status, body
            )));
        }

        let mut out = Vec::new();
        for entry in body.as_array().into_iter().flatten() {
            if let Some(doc) = entry.get("document") {
                out.push(parse_firestore_document(doc)?);
            }
        }
        Ok(out)
    }
}

/// Firestore-backed `DocumentStore`.
pub struct FirebaseDocumentStore {
    client: FirestoreClient,
    id_prefix: String,
    changes: broadcast::Sender<DocumentChange>,
    poll_interval: Duration,
    poller_started: OnceCell<()>,
}

impl FirebaseDocumentStore {
    pub fn new(
        project_id: String,
        auth_token: Option<String>,
        id_prefix: String,
        poll_interval: Duration,
    ) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        FirebaseDocumentStore {
            client: FirestoreClient {
                http: reqwest::Client::new(),
                base: FIRESTORE_BASE.to_string(),
                project_id,
                auth_token,
            },
            id_prefix,
            changes,
            poll_interval,
            poller_started: OnceCell::new(),
        }
    }

    /// Allocate the next permit number through the counter document,
    /// guarded by a `currentDocument` precondition and bounded retry.
    async fn allocate_number(&self) -> StoreResult<i64> {
        let counter_url = self.client.doc_url(COUNTER_COLLECTION, COUNTER_DOC);

        for attempt in 1..=ID_ALLOC_MAX_ATTEMPTS {
            let (status, body) = self.client.send(self.client.http.get(&counter_url)).await?;

            if status == StatusCode::NOT_FOUND {
                // First allocation ever: create the counter with next=2 and
                // claim number 1. The create itself races safely because
                // Firestore rejects a second create with ALREADY_EXISTS.
                let create_url = self.client.collection_url(COUNTER_COLLECTION);
                let (status, body) = self
                    .client
                    .send(
                        self.client
                            .http
                            .post(&create_url)
                            .query(&[("documentId", COUNTER_DOC)])
                            .json(&json!({ "fields": { "next": integer_value(2) } })),
                    )
                    .await?;
                if status.is_success() {
                    return Ok(1);
                }
                if status == StatusCode::CONFLICT {
                    tracing::debug!(attempt, "counter creation raced, retrying");
                    continue;
                }
                return Err(StoreError::Db(format!(
                    "counter creation failed with {}: {}",
                    status, body
                )));
            }

            if !status.is_success() {
                return Err(StoreError::Db(format!(
                    "counter read failed with {}: {}",
                    status, body
                )));
            }

            let fields = body.get("fields").cloned().unwrap_or_else(|| json!({}));
            let next = get_integer(&fields, "next")
                .ok_or_else(|| StoreError::Db("counter document missing next".to_string()))?;
            let update_time = body
                .get("updateTime")
                .and_then(Value::as_str)
                .ok_or_else(|| StoreError::Db("counter document missing updateTime".to_string()))?
                .to_string();

            let (status, body) = self
                .client
                .send(
                    self.client
                        .http
                        .patch(&counter_url)
                        .query(&[
                            ("updateMask.fieldPaths", "next"),
                            ("currentDocument.updateTime", update_time.as_str()),
                        ])
                        .json(&json!({ "fields": { "next": integer_value(next + 1) } })),
                )
                .await?;

            if status.is_success() {
                return Ok(next);
            }
            if status == StatusCode::CONFLICT || status == StatusCode::PRECONDITION_FAILED {
                tracing::debug!(attempt, "counter update raced, retrying");
                continue;
            }
            return Err(StoreError::Db(format!(
                "counter update failed with {}: {}",
                status, body
            )));
        }

        Err(StoreError::Conflict(
            "permit id allocation kept racing, try again".to_string(),
        ))
    }

    /// Spawn the change poller once, on first subscription. The poller
    /// re-lists the collection and diffs `updated_at` snapshots, which
    /// satisfies the at-least-once, events-as-hint contract.
    async fn ensure_poller(&self) {
        self.poller_started
            .get_or_init(|| async {
                let client = self.client.clone();
                let tx = self.changes.clone();
                let interval = self.poll_interval;
                tokio::spawn(async move {
                    let mut known: Option<HashMap<String, DateTime<Utc>>> = None;
                    let mut ticker = tokio::time::interval(interval);
                    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                    loop {
                        ticker.tick().await;
                        let docs = match client.list_documents(None).await {
                            Ok(docs) => docs,
                            Err(e) => {
                                tracing::warn!(error = %e, "change poll failed");
                                continue;
                            }
                        };
                        let snapshot: HashMap<String, DateTime<Utc>> = docs
                            .iter()
                            .map(|d| (d.id.clone(), d.updated_at))
                            .collect();

                        if let Some(prev) = &known {
                            for (id, updated_at) in &snapshot {
                                match prev.get(id) {
                                    None => {
                                        let _ = tx.send(DocumentChange {
                                            kind: ChangeKind::Created,
                                            id: id.clone(),
                                        });
                                    }
                                    Some(seen) if seen != updated_at => {
                                        let _ = tx.send(DocumentChange {
                                            kind: ChangeKind::Updated,
                                            id: id.clone(),
                                        });
                                    }
                                    Some(_) => {}
                                }
                            }
                            for id in prev.keys() {
                                if !snapshot.contains_key(id) {
                                    let _ = tx.send(DocumentChange {
                                        kind: ChangeKind::Deleted,
                                        id: id.clone(),
                                    });
                                }
                            }
                        }
                        known = Some(snapshot);
                    }
                });
            })
            .await;
    }
}

#[async_trait]
impl DocumentStore for FirebaseDocumentStore {
    async fn generate_id(&self) -> StoreResult<String> {
        let number = self.allocate_number().await?;
        Ok(format_permit_id(&self.id_prefix, number))
    }

    async fn create(&self, new: NewDocument) -> StoreResult<Document> {
        let now = Utc::now();
        let mut fields = serde_json::Map::new();
        fields.insert("name".to_string(), string_value(&new.name));
        fields.insert("size_mb".to_string(), double_value(new.size_mb));
        fields.insert(
            "status".to_string(),
            string_value(DocumentStatus::Uploaded.as_str()),
        );
        fields.insert("upload_date".to_string(), timestamp_value(now));
        fields.insert("created_at".to_string(), timestamp_value(now));
        fields.insert("updated_at".to_string(), timestamp_value(now));
        if let Some(ref owner) = new.owner_user_id {
            fields.insert("owner_user_id".to_string(), string_value(owner));
        }

        let url = self.client.collection_url(COLLECTION);
        let (status, body) = self
            .client
            .send(
                self.client
                    .http
                    .post(&url)
                    .query(&[("documentId", new.id.as_str())])
                    .json(&json!({ "fields": Value::Object(fields) })),
            )
            .await?;

        if status == StatusCode::CONFLICT {
            return Err(StoreError::Conflict(format!(
                "document {} already exists",
                new.id
            )));
        }
        if !status.is_success() {
            return Err(StoreError::Db(format!(
                "document create failed with {}: {}",
                status, body
            )));
        }

        parse_firestore_document(&body)
    }

    async fn get(&self, id: &str) -> StoreResult<Document> {
        let url = self.client.doc_url(COLLECTION, id);
        let (status, body) = self.client.send(self.client.http.get(&url)).await?;

        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            return Err(StoreError::Db(format!(
                "document read failed with {}: {}",
                status, body
            )));
        }

        parse_firestore_document(&body)
    }

    async fn list(&self, owner: Option<&str>) -> StoreResult<Vec<Document>> {
        self.client.list_documents(owner).await
    }

    async fn update(&self, id: &str, patch: DocumentPatch) -> StoreResult<Document> {
        let (body, mask) = encode_patch(&patch, Utc::now());

        let mut params: Vec<(&str, &str)> = mask
            .iter()
            .map(|field| ("updateMask.fieldPaths", *field))
            .collect();
        // Without this precondition a PATCH on a missing id would create it.
        params.push(("currentDocument.exists", "true"));

        let url = self.client.doc_url(COLLECTION, id);
        let (status, response) = self
            .client
            .send(self.client.http.patch(&url).query(&params).json(&body))
            .await?;

        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            return Err(StoreError::Db(format!(
                "document update failed with {}: {}",
                status, response
            )));
        }

        parse_firestore_document(&response)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        // Firestore deletes are idempotent; read first so unknown ids
        // surface as NotFound per the store contract.
        self.get(id).await?;

        let url = self.client.doc_url(COLLECTION, id);
        let (status, body) = self.client.send(self.client.http.delete(&url)).await?;
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(StoreError::Db(format!(
                "document delete failed with {}: {}",
                status, body
            )));
        }
        Ok(())
    }

    async fn subscribe(&self) -> StoreResult<Subscription> {
        self.ensure_poller().await;
        Ok(Subscription::new(self.changes.subscribe()))
    }
}

// ----- Firebase Storage -----

/// Firebase Storage implementation of [`FileStore`].
///
/// Both logical buckets live in one provider bucket; the logical bucket
/// name prefixes the object name, matching the `<bucket>/<key>` layout.
#[derive(Clone)]
pub struct FirebaseFileStore {
    http: reqwest::Client,
    base: String,
    bucket: String,
    auth_token: Option<String>,
}

impl FirebaseFileStore {
    pub fn new(bucket: String, auth_token: Option<String>) -> Self {
        FirebaseFileStore {
            http: reqwest::Client::new(),
            base: STORAGE_BASE.to_string(),
            bucket,
            auth_token,
        }
    }

    fn object_name(bucket: BucketKind, key: &str) -> String {
        format!("{}/{}", bucket.bucket_name(), key)
    }

    fn object_url(&self, bucket: BucketKind, key: &str) -> String {
        format!(
            "{}/b/{}/o/{}",
            self.base,
            self.bucket,
            urlencoding::encode(&Self::object_name(bucket, key))
        )
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn validate_key(key: &str) -> StorageResult<()> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl FileStore for FirebaseFileStore {
    async fn upload(
        &self,
        bucket: BucketKind,
        key: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<StoredFile> {
        Self::validate_key(key)?;
        let size = data.len();
        let url = format!("{}/b/{}/o", self.base, self.bucket);
        let name = Self::object_name(bucket, key);

        let start = std::time::Instant::now();

        let response = self
            .authorize(
                self.http
                    .post(&url)
                    .query(&[("uploadType", "media"), ("name", name.as_str())])
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .body(data),
            )
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(
                bucket = bucket.bucket_name(),
                key = %key,
                status = %status,
                "Firebase upload failed"
            );
            return Err(StorageError::UploadFailed(format!(
                "Firebase upload failed with {}",
                status
            )));
        }

        tracing::info!(
            bucket = bucket.bucket_name(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Firebase upload successful"
        );

        Ok(StoredFile {
            key: key.to_string(),
            url: self.file_url(bucket, key),
        })
    }

    async fn download(&self, bucket: BucketKind, key: &str) -> StorageResult<Vec<u8>> {
        Self::validate_key(key)?;
        let url = self.object_url(bucket, key);

        let response = self
            .authorize(self.http.get(&url).query(&[("alt", "media")]))
            .send()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(key.to_string()));
        }
        if !response.status().is_success() {
            return Err(StorageError::DownloadFailed(format!(
                "Firebase download failed with {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, bucket: BucketKind, key: &str) -> StorageResult<()> {
        Self::validate_key(key)?;
        let url = self.object_url(bucket, key);

        let response = self
            .authorize(self.http.delete(&url))
            .send()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND || response.status().is_success() {
            return Ok(());
        }
        Err(StorageError::DeleteFailed(format!(
            "Firebase delete failed with {}",
            response.status()
        )))
    }

    async fn exists(&self, bucket: BucketKind, key: &str) -> StorageResult<bool> {
        Self::validate_key(key)?;
        let url = self.object_url(bucket, key);

        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(StorageError::BackendError(format!(
                "Firebase metadata read failed with {}",
                status
            ))),
        }
    }

    fn file_url(&self, bucket: BucketKind, key: &str) -> String {
        format!("{}?alt=media", self.object_url(bucket, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_helpers_round_trip() {
        let now = Utc::now();
        let fields = json!({
            "name": string_value("permit.pdf"),
            "size_mb": double_value(1.2),
            "next": integer_value(42),
            "upload_date": timestamp_value(now),
        });

        assert_eq!(get_string(&fields, "name").as_deref(), Some("permit.pdf"));
        assert_eq!(get_double(&fields, "size_mb"), Some(1.2));
        assert_eq!(get_integer(&fields, "next"), Some(42));
        // Micro-second formatting keeps enough precision for equality
        let parsed = get_timestamp(&fields, "upload_date").unwrap();
        assert!((parsed - now).num_milliseconds().abs() < 1);
        assert_eq!(get_string(&fields, "missing"), None);
    }

    #[test]
    fn test_double_accepts_integer_encoding() {
        // Whole-number sizes may come back as integerValue.
        let fields = json!({ "size_mb": integer_value(2) });
        assert_eq!(get_double(&fields, "size_mb"), Some(2.0));
    }

    #[test]
    fn test_parse_firestore_document() {
        let now = Utc::now();
        let doc = json!({
            "name": "projects/p/databases/(default)/documents/documents/PERMIT-007",
            "fields": {
                "name": string_value("permit.pdf"),
                "size_mb": double_value(1.2),
                "status": string_value("uploaded"),
                "upload_date": timestamp_value(now),
                "created_at": timestamp_value(now),
                "updated_at": timestamp_value(now),
            }
        });

        let parsed = parse_firestore_document(&doc).unwrap();
        assert_eq!(parsed.id, "PERMIT-007");
        assert_eq!(parsed.name, "permit.pdf");
        assert_eq!(parsed.status, DocumentStatus::Uploaded);
        assert!(parsed.owner_user_id.is_none());
        assert!(parsed.shareable_url.is_none());
    }

    #[test]
    fn test_parse_firestore_document_missing_field() {
        let doc = json!({
            "name": "projects/p/databases/(default)/documents/documents/PERMIT-001",
            "fields": { "name": string_value("permit.pdf") }
        });
        assert!(matches!(
            parse_firestore_document(&doc),
            Err(StoreError::Db(_))
        ));
    }

    #[test]
    fn test_encode_patch_masks_only_set_fields() {
        let now = Utc::now();
        let patch = DocumentPatch {
            status: Some(DocumentStatus::Processed),
            processed_file_path: Some("anonymous/x".to_string()),
            shareable_url: Some("https://x.test/document/PERMIT-001".to_string()),
            processed_date: Some(now),
            ..Default::default()
        };

        let (body, mask) = encode_patch(&patch, now);
        assert!(mask.contains(&"status"));
        assert!(mask.contains(&"processed_file_path"));
        assert!(mask.contains(&"shareable_url"));
        assert!(mask.contains(&"processed_date"));
        assert!(mask.contains(&"updated_at"));
        assert!(!mask.contains(&"original_file_path"));
        assert_eq!(
            body["fields"]["status"]["stringValue"].as_str(),
            Some("processed")
        );
    }

    #[test]
    fn test_storage_object_name_encoding() {
        let store = FirebaseFileStore::new("demo.appspot.com".to_string(), None);
        let url = store.file_url(BucketKind::Processed, "anonymous/PERMIT-001_processed_a.pdf");
        // Slashes inside the object name must be percent-encoded.
        assert!(url.contains("documents-processed%2Fanonymous%2FPERMIT-001_processed_a.pdf"));
        assert!(url.ends_with("?alt=media"));
    }

    #[test]
    fn test_id_from_resource_name() {
        assert_eq!(
            id_from_resource_name("projects/p/databases/(default)/documents/documents/PERMIT-001"),
            Some("PERMIT-001")
        );
        assert_eq!(id_from_resource_name(""), None);
    }
}
