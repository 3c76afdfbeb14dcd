use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{BUCKET_ORIGINAL, BUCKET_PROCESSED};

/// Processing lifecycle of a document.
///
/// `Uploaded` → `Processing` → `Processed`. Status never regresses except
/// for the pipeline's explicit error-recovery reset back to `Uploaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Processing,
    Processed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Processed => "processed",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(DocumentStatus::Uploaded),
            "processing" => Ok(DocumentStatus::Processing),
            "processed" => Ok(DocumentStatus::Processed),
            other => Err(format!("unknown document status: {}", other)),
        }
    }
}

/// The two logical buckets used for document files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketKind {
    Original,
    Processed,
}

impl BucketKind {
    /// Provider-side bucket name.
    pub fn bucket_name(&self) -> &'static str {
        match self {
            BucketKind::Original => BUCKET_ORIGINAL,
            BucketKind::Processed => BUCKET_PROCESSED,
        }
    }

    /// Short tag used inside storage keys.
    pub fn key_tag(&self) -> &'static str {
        match self {
            BucketKind::Original => "original",
            BucketKind::Processed => "processed",
        }
    }
}

impl FromStr for BucketKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(BucketKind::Original),
            "processed" => Ok(BucketKind::Processed),
            other => Err(format!("unknown bucket kind: {}", other)),
        }
    }
}

/// A permit document record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub size_mb: f64,
    pub status: DocumentStatus,
    pub upload_date: DateTime<Utc>,
    pub processed_date: Option<DateTime<Utc>>,
    pub owner_user_id: Option<String>,
    pub original_file_path: Option<String>,
    pub processed_file_path: Option<String>,
    pub shareable_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Owner folder used in storage keys (`anonymous` when unowned).
    pub fn owner_folder(&self) -> &str {
        self.owner_user_id
            .as_deref()
            .unwrap_or(crate::constants::ANONYMOUS_FOLDER)
    }
}

/// Fields for creating a document record. The id is generated by the store
/// before any file upload begins and is immutable afterwards.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: String,
    pub name: String,
    pub size_mb: f64,
    pub owner_user_id: Option<String>,
}

/// Partial update applied to an existing record. `id`, `name`, `size_mb`,
/// and `upload_date` are immutable by construction: the patch has no such
/// fields.
#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    pub status: Option<DocumentStatus>,
    pub original_file_path: Option<String>,
    pub processed_file_path: Option<String>,
    pub shareable_url: Option<String>,
    pub processed_date: Option<DateTime<Utc>>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.original_file_path.is_none()
            && self.processed_file_path.is_none()
            && self.shareable_url.is_none()
            && self.processed_date.is_none()
    }

    /// Apply the patch to a document in place, refreshing `updated_at`.
    pub fn apply(&self, doc: &mut Document, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            doc.status = status;
        }
        if let Some(ref path) = self.original_file_path {
            doc.original_file_path = Some(path.clone());
        }
        if let Some(ref path) = self.processed_file_path {
            doc.processed_file_path = Some(path.clone());
        }
        if let Some(ref url) = self.shareable_url {
            doc.shareable_url = Some(url.clone());
        }
        if let Some(date) = self.processed_date {
            doc.processed_date = Some(date);
        }
        doc.updated_at = now;
    }
}

/// API response shape for a document.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: String,
    pub name: String,
    pub size_mb: f64,
    pub status: DocumentStatus,
    pub upload_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shareable_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        DocumentResponse {
            id: doc.id,
            name: doc.name,
            size_mb: doc.size_mb,
            status: doc.status,
            upload_date: doc.upload_date,
            processed_date: doc.processed_date,
            owner_user_id: doc.owner_user_id,
            original_file_path: doc.original_file_path,
            processed_file_path: doc.processed_file_path,
            shareable_url: doc.shareable_url,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

/// Compute `size_mb` from a byte length, rounded to 2 decimals.
pub fn size_mb_from_bytes(len: usize) -> f64 {
    let mb = len as f64 / 1024.0 / 1024.0;
    (mb * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_document(id: &str) -> Document {
        let now = Utc::now();
        Document {
            id: id.to_string(),
            name: "permit.pdf".to_string(),
            size_mb: 1.2,
            status: DocumentStatus::Uploaded,
            upload_date: now,
            processed_date: None,
            owner_user_id: None,
            original_file_path: None,
            processed_file_path: None,
            shareable_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            DocumentStatus::Uploaded,
            DocumentStatus::Processing,
            DocumentStatus::Processed,
        ] {
            assert_eq!(status.as_str().parse::<DocumentStatus>().unwrap(), status);
        }
        assert!("finished".parse::<DocumentStatus>().is_err());
    }

    #[test]
    fn test_status_serde_lowercase() {
        let json = serde_json::to_string(&DocumentStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }

    #[test]
    fn test_patch_apply_merges_fields() {
        let mut doc = test_document("PERMIT-001");
        let created = doc.created_at;
        let now = Utc::now();

        let patch = DocumentPatch {
            status: Some(DocumentStatus::Processing),
            original_file_path: Some("anonymous/PERMIT-001_original_permit.pdf".to_string()),
            ..Default::default()
        };
        patch.apply(&mut doc, now);

        assert_eq!(doc.status, DocumentStatus::Processing);
        assert_eq!(
            doc.original_file_path.as_deref(),
            Some("anonymous/PERMIT-001_original_permit.pdf")
        );
        assert_eq!(doc.updated_at, now);
        // Immutable fields untouched
        assert_eq!(doc.id, "PERMIT-001");
        assert_eq!(doc.name, "permit.pdf");
        assert_eq!(doc.created_at, created);
    }

    #[test]
    fn test_empty_patch() {
        assert!(DocumentPatch::default().is_empty());
        let patch = DocumentPatch {
            status: Some(DocumentStatus::Processed),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_size_mb_rounding() {
        // 1.2 MB file reports exactly 1.2
        let len = (1.2 * 1024.0 * 1024.0) as usize;
        assert_eq!(size_mb_from_bytes(len), 1.2);
        assert_eq!(size_mb_from_bytes(1024 * 1024), 1.0);
        assert_eq!(size_mb_from_bytes(0), 0.0);
    }

    #[test]
    fn test_owner_folder() {
        let mut doc = test_document("PERMIT-002");
        assert_eq!(doc.owner_folder(), "anonymous");
        doc.owner_user_id = Some("user-42".to_string());
        assert_eq!(doc.owner_folder(), "user-42");
    }

    #[test]
    fn test_response_skips_absent_fields() {
        let doc = test_document("PERMIT-003");
        let value = serde_json::to_value(DocumentResponse::from(doc)).unwrap();
        assert!(value.get("processed_date").is_none());
        assert!(value.get("shareable_url").is_none());
        assert_eq!(value["status"], "uploaded");
    }
}
