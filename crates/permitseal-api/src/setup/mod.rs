//! Application wiring: backend construction, pipeline, and routes.

pub mod routes;
pub mod server;

use std::sync::Arc;

use axum::Router;
use permitseal_core::AppConfig;
use permitseal_processing::{DocumentPipeline, PipelineOptions};
use permitseal_store::create_backend;

use crate::state::AppState;

/// Build the backend pair, the pipeline, and the router.
///
/// The provider is chosen exactly once here from the configuration; nothing
/// downstream branches on it.
pub async fn initialize_app(config: AppConfig) -> Result<(Arc<AppState>, Router), anyhow::Error> {
    let backend = create_backend(&config).await?;

    let pipeline = Arc::new(DocumentPipeline::new(
        backend.documents.clone(),
        backend.files.clone(),
        PipelineOptions {
            public_origin: config.public_origin.clone(),
            max_file_size: config.max_document_size_bytes,
            allowed_extensions: config.allowed_extensions.clone(),
            allowed_content_types: config.allowed_content_types.clone(),
        },
    ));

    let state = Arc::new(AppState {
        documents: backend.documents,
        files: backend.files,
        pipeline,
        config,
    });

    let router = routes::build_router(state.clone())?;
    Ok((state, router))
}
