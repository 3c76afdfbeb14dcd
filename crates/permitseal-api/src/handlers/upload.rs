//! Document upload handler.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use permitseal_core::{AppError, DocumentResponse};
use permitseal_processing::{Progress, UploadRequest};

use crate::error::HttpAppError;
use crate::state::AppState;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// `POST /api/v0/documents`: multipart upload (`file` plus an optional
/// `owner_user_id` text field), processed synchronously through the
/// pipeline. Validation rejections come back 400 before anything persists.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<DocumentResponse>, HttpAppError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut owner_user_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(String::from)
                    .ok_or_else(|| AppError::InvalidInput("file field needs a filename".into()))?;
                let content_type = field
                    .content_type()
                    .unwrap_or(FALLBACK_CONTENT_TYPE)
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("failed to read file: {}", e)))?
                    .to_vec();
                file = Some((filename, content_type, data));
            }
            Some("owner_user_id") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("bad owner field: {}", e)))?;
                if !value.is_empty() {
                    owner_user_id = Some(value);
                }
            }
            _ => {}
        }
    }

    let (filename, content_type, data) =
        file.ok_or_else(|| AppError::InvalidInput("missing file field".to_string()))?;

    tracing::info!(
        filename = %filename,
        size_bytes = data.len(),
        owner = owner_user_id.as_deref().unwrap_or("anonymous"),
        "document upload received"
    );

    let document = state
        .pipeline
        .process(
            UploadRequest {
                filename,
                content_type,
                data,
                owner_user_id,
            },
            Progress::none(),
        )
        .await?;

    Ok(Json(DocumentResponse::from(document)))
}
