//! Supabase-backed document store.
//!
//! Supabase is Postgres underneath, so metadata goes through sqlx against
//! the `documents` table. Permit ids come from a dedicated sequence
//! (`permit_id_seq`), which makes id issuance atomic across concurrent
//! creators. The change feed rides Postgres LISTEN/NOTIFY, fed by an
//! `AFTER INSERT OR UPDATE OR DELETE` trigger on the table; the listener
//! reconnects on connection loss and consumers re-list to catch up.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use permitseal_core::{Document, DocumentPatch, DocumentStatus, NewDocument};
use sqlx::postgres::{PgListener, PgPoolOptions};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio::sync::OnceCell;

use crate::changes::{DocumentChange, Subscription, CHANGE_CHANNEL_CAPACITY};
use crate::keys::format_permit_id;
use crate::traits::{DocumentStore, StoreError, StoreResult};

const NOTIFY_CHANNEL: &str = "documents_changed";
const LISTENER_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Parse a `pg_notify` payload (`{"op": "...", "id": "..."}`) into a change.
pub(crate) fn parse_change_payload(payload: &str) -> Option<DocumentChange> {
    let value: serde_json::Value = serde_json::from_str(payload).ok()?;
    let kind = value.get("op")?.as_str()?.parse().ok()?;
    let id = value.get("id")?.as_str()?.to_string();
    Some(DocumentChange { kind, id })
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    name: String,
    size_mb: f64,
    status: String,
    upload_date: DateTime<Utc>,
    processed_date: Option<DateTime<Utc>>,
    owner_user_id: Option<String>,
    original_file_path: Option<String>,
    processed_file_path: Option<String>,
    shareable_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DocumentRow {
    fn into_document(self) -> StoreResult<Document> {
        let status: DocumentStatus = self
            .status
            .parse()
            .map_err(|e: String| StoreError::Db(e))?;
        Ok(Document {
            id: self.id,
            name: self.name,
            size_mb: self.size_mb,
            status,
            upload_date: self.upload_date,
            processed_date: self.processed_date,
            owner_user_id: self.owner_user_id,
            original_file_path: self.original_file_path,
            processed_file_path: self.processed_file_path,
            shareable_url: self.shareable_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

/// Postgres-backed `DocumentStore`.
pub struct SupabaseDocumentStore {
    pool: PgPool,
    database_url: String,
    id_prefix: String,
    changes: broadcast::Sender<DocumentChange>,
    listener_started: OnceCell<()>,
}

impl SupabaseDocumentStore {
    /// Connect to the database and run pending migrations.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        id_prefix: String,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Db(format!("failed to connect: {}", e)))?;

        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Db(format!("migration failed: {}", e)))?;

        tracing::info!(max_connections, "connected to document database");

        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(SupabaseDocumentStore {
            pool,
            database_url: database_url.to_string(),
            id_prefix,
            changes,
            listener_started: OnceCell::new(),
        })
    }

    /// Spawn the LISTEN/NOTIFY relay once, on first subscription.
    async fn ensure_listener(&self) {
        self.listener_started
            .get_or_init(|| async {
                let url = self.database_url.clone();
                let tx = self.changes.clone();
                tokio::spawn(async move {
                    loop {
                        let mut listener = match PgListener::connect(&url).await {
                            Ok(listener) => listener,
                            Err(e) => {
                                tracing::warn!(error = %e, "change listener connect failed");
                                tokio::time::sleep(LISTENER_RETRY_DELAY).await;
                                continue;
                            }
                        };
                        if let Err(e) = listener.listen(NOTIFY_CHANNEL).await {
                            tracing::warn!(error = %e, "LISTEN failed");
                            tokio::time::sleep(LISTENER_RETRY_DELAY).await;
                            continue;
                        }
                        tracing::info!(channel = NOTIFY_CHANNEL, "change listener connected");

                        loop {
                            match listener.recv().await {
                                Ok(notification) => {
                                    match parse_change_payload(notification.payload()) {
                                        Some(change) => {
                                            let _ = tx.send(change);
                                        }
                                        None => {
                                            tracing::warn!(
                                                payload = notification.payload(),
                                                "unparseable change notification"
                                            );
                                        }
                                    }
                                }
                                Err(e) => {
                                    // Events during the gap are lost; consumers re-list.
                                    tracing::warn!(error = %e, "change listener lost, reconnecting");
                                    break;
                                }
                            }
                        }
                        tokio::time::sleep(LISTENER_RETRY_DELAY).await;
                    }
                });
            })
            .await;
    }
}

#[async_trait]
impl DocumentStore for SupabaseDocumentStore {
    async fn generate_id(&self) -> StoreResult<String> {
        let number: i64 = sqlx::query_scalar("SELECT nextval('permit_id_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Db(format!("failed to generate id: {}", e)))?;
        Ok(format_permit_id(&self.id_prefix, number))
    }

    async fn create(&self, new: NewDocument) -> StoreResult<Document> {
        let row: DocumentRow = sqlx::query_as(
            r#"
            INSERT INTO documents (id, name, size_mb, owner_user_id, status)
            VALUES ($1, $2, $3, $4, 'uploaded')
            RETURNING id, name, size_mb, status, upload_date, processed_date,
                      owner_user_id, original_file_path, processed_file_path,
                      shareable_url, created_at, updated_at
            "#,
        )
        .bind(&new.id)
        .bind(&new.name)
        .bind(new.size_mb)
        .bind(&new.owner_user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("document {} already exists", new.id))
            } else {
                StoreError::Db(e.to_string())
            }
        })?;

        row.into_document()
    }

    async fn get(&self, id: &str) -> StoreResult<Document> {
        let row: Option<DocumentRow> = sqlx::query_as(
            r#"
            SELECT id, name, size_mb, status, upload_date, processed_date,
                   owner_user_id, original_file_path, processed_file_path,
                   shareable_url, created_at, updated_at
            FROM documents
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Db(e.to_string()))?;

        row.ok_or_else(|| StoreError::NotFound(id.to_string()))?
            .into_document()
    }

    async fn list(&self, owner: Option<&str>) -> StoreResult<Vec<Document>> {
        let rows: Vec<DocumentRow> = match owner {
            Some(owner) => {
                sqlx::query_as(
                    r#"
                    SELECT id, name, size_mb, status, upload_date, processed_date,
                           owner_user_id, original_file_path, processed_file_path,
                           shareable_url, created_at, updated_at
                    FROM documents
                    WHERE owner_user_id = $1
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(owner)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT id, name, size_mb, status, upload_date, processed_date,
                           owner_user_id, original_file_path, processed_file_path,
                           shareable_url, created_at, updated_at
                    FROM documents
                    ORDER BY created_at DESC
                    "#,
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| StoreError::Db(e.to_string()))?;

        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    async fn update(&self, id: &str, patch: DocumentPatch) -> StoreResult<Document> {
        // All patch fields land in one UPDATE so finalize is atomic from the
        // caller's perspective.
        let row: Option<DocumentRow> = sqlx::query_as(
            r#"
            UPDATE documents
            SET status = COALESCE($2, status),
                original_file_path = COALESCE($3, original_file_path),
                processed_file_path = COALESCE($4, processed_file_path),
                shareable_url = COALESCE($5, shareable_url),
                processed_date = COALESCE($6, processed_date),
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, size_mb, status, upload_date, processed_date,
                      owner_user_id, original_file_path, processed_file_path,
                      shareable_url, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(&patch.original_file_path)
        .bind(&patch.processed_file_path)
        .bind(&patch.shareable_url)
        .bind(patch.processed_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Db(e.to_string()))?;

        row.ok_or_else(|| StoreError::NotFound(id.to_string()))?
            .into_document()
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Db(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn subscribe(&self) -> StoreResult<Subscription> {
        self.ensure_listener().await;
        Ok(Subscription::new(self.changes.subscribe()))
    }
}
