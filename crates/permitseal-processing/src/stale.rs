//! Stale `processing` detection.
//!
//! A crash between marking `processing` and the stamp-stage rollback can
//! leave a record in `processing` with nothing driving it forward. Records
//! whose `updated_at` is older than a threshold are surfaced to operators;
//! recovery stays an explicit retry, never an automatic requeue.

use chrono::{Duration, Utc};
use permitseal_core::{Document, DocumentStatus};
use permitseal_store::{DocumentStore, StoreError};

/// Find records stuck in `processing` for longer than `threshold`.
pub async fn find_stale_processing(
    store: &dyn DocumentStore,
    threshold: Duration,
) -> Result<Vec<Document>, StoreError> {
    let cutoff = Utc::now() - threshold;
    let documents = store.list(None).await?;
    let stale: Vec<Document> = documents
        .into_iter()
        .filter(|d| d.status == DocumentStatus::Processing && d.updated_at < cutoff)
        .collect();

    if !stale.is_empty() {
        tracing::warn!(count = stale.len(), "documents stuck in processing");
    }
    Ok(stale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use permitseal_core::{DocumentPatch, NewDocument};
    use permitseal_store::LocalDocumentStore;
    use tempfile::tempdir;

    async fn seed(store: &LocalDocumentStore, status: DocumentStatus) -> String {
        let id = store.generate_id().await.unwrap();
        store
            .create(NewDocument {
                id: id.clone(),
                name: "permit.pdf".to_string(),
                size_mb: 1.0,
                owner_user_id: None,
            })
            .await
            .unwrap();
        if status != DocumentStatus::Uploaded {
            store
                .update(
                    &id,
                    DocumentPatch {
                        status: Some(status),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }
        id
    }

    #[tokio::test]
    async fn test_only_old_processing_records_flagged() {
        let dir = tempdir().unwrap();
        let store = LocalDocumentStore::open(dir.path(), "PERMIT".to_string())
            .await
            .unwrap();

        let processing_id = seed(&store, DocumentStatus::Processing).await;
        seed(&store, DocumentStatus::Uploaded).await;
        seed(&store, DocumentStatus::Processed).await;

        // A cutoff in the future makes every processing record "old".
        let stale = find_stale_processing(&store, Duration::seconds(-1))
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, processing_id);

        // A generous threshold flags nothing.
        let stale = find_stale_processing(&store, Duration::hours(1))
            .await
            .unwrap();
        assert!(stale.is_empty());
    }
}
