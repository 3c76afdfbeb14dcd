//! PermitSeal Store Library
//!
//! This crate provides the backend abstraction for document metadata and
//! file storage, and the concrete provider implementations.
//!
//! # Providers
//!
//! - **supabase**: Postgres via sqlx for metadata, S3-compatible object
//!   storage for files (Supabase Storage exposes the S3 protocol).
//! - **firebase**: Firestore and Firebase Storage over their REST APIs.
//! - **local**: in-process fallback with a JSON-file KV for metadata and a
//!   filesystem directory for files, scoped to a single process.
//!
//! The provider pair is constructed exactly once at startup by
//! [`factory::create_backend`] and injected into callers as trait objects;
//! no call site branches on the provider.
//!
//! # Storage key format
//!
//! File keys are `{owner_folder}/{id}_{kind}_{filename}` inside the logical
//! buckets `documents-original` and `documents-processed`. Keys must not
//! contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod changes;
pub mod factory;
pub mod firebase;
pub mod keys;
pub mod local;
pub mod s3;
pub mod supabase;
pub mod traits;

// Re-export commonly used types
pub use changes::{ChangeKind, DocumentChange, Subscription};
pub use factory::{create_backend, Backend};
pub use firebase::{FirebaseDocumentStore, FirebaseFileStore};
pub use local::{LocalDocumentStore, LocalFileStore};
pub use s3::S3FileStore;
pub use supabase::SupabaseDocumentStore;
pub use traits::{
    DocumentStore, FileStore, StorageError, StorageResult, StoreError, StoreResult, StoredFile,
};
