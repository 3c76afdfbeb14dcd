//! Shareable viewer URLs.
//!
//! A document's shareable URL is a pure function of the configured public
//! origin and its id: `<origin>/document/<id>`. It is computed once by the
//! pipeline and persisted; viewers parse the id back out of the path.

/// Build the shareable viewer URL for a document id.
pub fn shareable_url(origin: &str, id: &str) -> String {
    format!("{}/document/{}", origin.trim_end_matches('/'), id)
}

/// Extract the document id from a viewer URL or path, if it is one.
pub fn document_id_from_path(path: &str) -> Option<&str> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let idx = path.find("/document/")?;
    let id = &path[idx + "/document/".len()..];
    let id = id.trim_end_matches('/');
    if id.is_empty() || id.contains('/') {
        None
    } else {
        Some(id)
    }
}
