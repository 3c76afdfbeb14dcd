pub mod document;

pub use document::{
    size_mb_from_bytes, BucketKind, Document, DocumentPatch, DocumentResponse, DocumentStatus,
    NewDocument,
};
