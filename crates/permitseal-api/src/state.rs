//! Application state.
//!
//! Everything handlers need is constructed once at startup and injected
//! here; handlers never build stores or branch on the provider.

use std::sync::Arc;

use permitseal_core::AppConfig;
use permitseal_processing::DocumentPipeline;
use permitseal_store::{DocumentStore, FileStore};

pub struct AppState {
    pub config: AppConfig,
    pub documents: Arc<dyn DocumentStore>,
    pub files: Arc<dyn FileStore>,
    pub pipeline: Arc<DocumentPipeline>,
}
