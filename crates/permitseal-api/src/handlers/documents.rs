//! Document CRUD, download, retry, and stale-record handlers.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Duration;
use permitseal_core::{AppError, BucketKind, DocumentResponse, DocumentStatus};
use permitseal_processing::{find_stale_processing, Progress};
use serde::Deserialize;

use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub owner_user_id: Option<String>,
}

/// `GET /api/v0/documents`: newest-first, optionally filtered by owner.
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DocumentResponse>>, HttpAppError> {
    let documents = state
        .documents
        .list(query.owner_user_id.as_deref())
        .await?;
    Ok(Json(documents.into_iter().map(Into::into).collect()))
}

/// `GET /api/v0/documents/{id}`: also serves the shareable viewer path
/// `/document/{id}`. Unknown ids get the distinct not-found shape.
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, HttpAppError> {
    let document = state.documents.get(&id).await?;
    Ok(Json(DocumentResponse::from(document)))
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub kind: Option<String>,
}

/// `GET /api/v0/documents/{id}/file?kind=original|processed`: byte
/// passthrough of a stored file (processed by default).
pub async fn download_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, HttpAppError> {
    let kind = match query.kind.as_deref() {
        None => BucketKind::Processed,
        Some(raw) => BucketKind::from_str(raw).map_err(AppError::InvalidInput)?,
    };

    let document = state.documents.get(&id).await?;
    let path = match kind {
        BucketKind::Original => document.original_file_path.as_deref(),
        BucketKind::Processed => document.processed_file_path.as_deref(),
    }
    .ok_or_else(|| {
        AppError::NotFound(format!("document {} has no {} file", id, kind.key_tag()))
    })?;

    let bytes = state.files.download(kind, path).await?;

    let disposition = format!("attachment; filename=\"{}\"", document.name);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// `DELETE /api/v0/documents/{id}`: removes both stored files, then the
/// record. Providers do not cascade, so the cascade lives here; a missing
/// file is not an error.
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, HttpAppError> {
    let document = state.documents.get(&id).await?;

    if let Some(path) = document.original_file_path.as_deref() {
        state.files.delete(BucketKind::Original, path).await?;
    }
    if let Some(path) = document.processed_file_path.as_deref() {
        state.files.delete(BucketKind::Processed, path).await?;
    }

    state.documents.delete(&id).await?;

    tracing::info!(id = %id, "document deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/v0/documents/{id}/retry`: the explicit "try again" action.
/// Re-runs the pipeline from stage 2 using the stored original bytes; a
/// document whose original never uploaded must be re-submitted instead.
pub async fn retry_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, HttpAppError> {
    let document = state.documents.get(&id).await?;

    if document.status == DocumentStatus::Processed {
        return Ok(Json(DocumentResponse::from(document)));
    }

    let original_path = document.original_file_path.as_deref().ok_or_else(|| {
        AppError::InvalidInput(format!(
            "document {} has no stored original, re-upload it instead",
            id
        ))
    })?;
    let data = state
        .files
        .download(BucketKind::Original, original_path)
        .await?;

    let document = state.pipeline.resume(&id, data, Progress::none()).await?;
    Ok(Json(DocumentResponse::from(document)))
}

#[derive(Debug, Deserialize)]
pub struct StaleQuery {
    pub threshold_secs: Option<i64>,
}

/// `GET /api/v0/admin/stale`: records stuck in `processing` longer than
/// the threshold (configured default when unspecified).
pub async fn stale_documents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StaleQuery>,
) -> Result<Json<Vec<DocumentResponse>>, HttpAppError> {
    let threshold = Duration::seconds(
        query
            .threshold_secs
            .unwrap_or(state.config.stale_threshold_secs),
    );
    let stale = find_stale_processing(state.documents.as_ref(), threshold).await?;
    Ok(Json(stale.into_iter().map(Into::into).collect()))
}
