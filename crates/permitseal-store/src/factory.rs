//! Backend construction from configuration.
//!
//! The provider pair is built exactly once at startup and injected into the
//! pipeline and API as trait objects. There is no runtime switching and no
//! provider branching at call sites.

use std::sync::Arc;
use std::time::Duration;

use permitseal_core::{AppConfig, BackendProvider};

use crate::firebase::{FirebaseDocumentStore, FirebaseFileStore};
use crate::local::{LocalDocumentStore, LocalFileStore};
use crate::s3::S3FileStore;
use crate::supabase::SupabaseDocumentStore;
use crate::traits::{DocumentStore, FileStore, StorageError};

/// The constructed backend pair.
#[derive(Clone)]
pub struct Backend {
    pub documents: Arc<dyn DocumentStore>,
    pub files: Arc<dyn FileStore>,
}

/// Build the document and file stores selected by the configuration.
pub async fn create_backend(config: &AppConfig) -> Result<Backend, anyhow::Error> {
    match config.backend {
        BackendProvider::Supabase => {
            let database_url = config.database_url.as_deref().ok_or_else(|| {
                anyhow::anyhow!("DATABASE_URL not configured for the supabase backend")
            })?;
            let documents = SupabaseDocumentStore::connect(
                database_url,
                config.db_max_connections,
                config.permit_id_prefix.clone(),
            )
            .await?;

            let region = config
                .storage_region
                .clone()
                .unwrap_or_else(|| "us-east-1".to_string());
            let files = S3FileStore::new(region, config.storage_endpoint.clone())?;

            tracing::info!(backend = "supabase", "backend constructed");
            Ok(Backend {
                documents: Arc::new(documents),
                files: Arc::new(files),
            })
        }
        BackendProvider::Firebase => {
            let project_id = config.firebase_project_id.clone().ok_or_else(|| {
                anyhow::anyhow!("FIREBASE_PROJECT_ID not configured for the firebase backend")
            })?;
            let bucket = config.firebase_storage_bucket.clone().ok_or_else(|| {
                anyhow::anyhow!("FIREBASE_STORAGE_BUCKET not configured for the firebase backend")
            })?;

            let documents = FirebaseDocumentStore::new(
                project_id,
                config.firebase_auth_token.clone(),
                config.permit_id_prefix.clone(),
                Duration::from_secs(config.firebase_poll_interval_secs),
            );
            let files = FirebaseFileStore::new(bucket, config.firebase_auth_token.clone());

            tracing::info!(backend = "firebase", "backend constructed");
            Ok(Backend {
                documents: Arc::new(documents),
                files: Arc::new(files),
            })
        }
        BackendProvider::Local => {
            let data_path = config
                .local_data_path
                .clone()
                .unwrap_or_else(|| "data/documents".to_string());
            let storage_path = config
                .local_storage_path
                .clone()
                .unwrap_or_else(|| "data/files".to_string());
            let base_url = config
                .local_storage_base_url
                .clone()
                .unwrap_or_else(|| format!("{}/files", config.public_origin.trim_end_matches('/')));

            let documents =
                LocalDocumentStore::open(data_path, config.permit_id_prefix.clone()).await?;
            let files = LocalFileStore::new(storage_path, base_url)
                .await
                .map_err(|e: StorageError| anyhow::anyhow!(e))?;

            tracing::info!(backend = "local", "backend constructed");
            Ok(Backend {
                documents: Arc::new(documents),
                files: Arc::new(files),
            })
        }
    }
}
