//! Shared storage-key generation.
//!
//! Key format: `{owner_folder}/{id}_{kind}_{filename}`, unique per
//! document + kind. All backends must use this format for consistency.

use permitseal_core::constants::{ANONYMOUS_FOLDER, ID_NUMBER_WIDTH};
use permitseal_core::BucketKind;

/// Format a permit id from the configured prefix and a sequence number.
/// All providers use this format so ids stay interchangeable.
pub fn format_permit_id(prefix: &str, number: i64) -> String {
    format!("{}-{:0width$}", prefix, number, width = ID_NUMBER_WIDTH)
}

/// Replace filename characters that storage providers reject.
pub fn sanitize_filename(filename: &str) -> String {
    const MAX: usize = 255;
    let path = std::path::Path::new(filename);
    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    if base.contains("..") {
        return "invalid_filename".to_string();
    }
    let s: String = base
        .chars()
        .take(MAX)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim().is_empty() {
        "file".to_string()
    } else {
        s
    }
}

/// Generate the storage key for a document's file of the given kind.
pub fn document_key(owner: Option<&str>, id: &str, kind: BucketKind, filename: &str) -> String {
    let folder = owner.filter(|o| !o.is_empty()).unwrap_or(ANONYMOUS_FOLDER);
    format!(
        "{}/{}_{}_{}",
        folder,
        id,
        kind.key_tag(),
        sanitize_filename(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_permit_id() {
        assert_eq!(format_permit_id("PERMIT", 7), "PERMIT-007");
        assert_eq!(format_permit_id("PERMIT", 123), "PERMIT-123");
        assert_eq!(format_permit_id("PERMIT", 4321), "PERMIT-4321");
    }

    #[test]
    fn test_document_key_layout() {
        assert_eq!(
            document_key(None, "PERMIT-001", BucketKind::Original, "permit.pdf"),
            "anonymous/PERMIT-001_original_permit.pdf"
        );
        assert_eq!(
            document_key(
                Some("user-42"),
                "PERMIT-001",
                BucketKind::Processed,
                "permit.pdf"
            ),
            "user-42/PERMIT-001_processed_permit.pdf"
        );
    }

    #[test]
    fn test_keys_unique_per_kind() {
        let a = document_key(None, "PERMIT-001", BucketKind::Original, "permit.pdf");
        let b = document_key(None, "PERMIT-001", BucketKind::Processed, "permit.pdf");
        assert_ne!(a, b);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("permit (1).pdf"), "permit__1_.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "invalid_filename");
        assert_eq!(sanitize_filename("  "), "file");
        // Deterministic so retries produce the same key
        assert_eq!(sanitize_filename("mój plik.pdf"), sanitize_filename("mój plik.pdf"));
    }
}
