//! PermitSeal Core Library
//!
//! This crate provides the domain models, error types, configuration, and
//! URL helpers shared across all PermitSeal components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod share_url;

// Re-export commonly used types
pub use config::{AppConfig, BackendProvider};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    BucketKind, Document, DocumentPatch, DocumentResponse, DocumentStatus, NewDocument,
};
pub use share_url::{document_id_from_path, shareable_url};
