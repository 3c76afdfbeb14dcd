//! The document processing pipeline.
//!
//! Six stages per document, strictly ordered, no skipping:
//!
//! 1. init: generate an id, create the record (status `uploaded`)
//! 2. original upload: raw bytes under `<owner>/<id>_original_<name>`
//! 3. mark processing: record the original path, status `processing`
//! 4. stamp: shareable URL, QR, stamp page one; on failure the status
//!    rolls back to `uploaded` so a retry is visibly safe
//! 5. processed upload: stamped bytes under `<owner>/<id>_processed_<name>`
//! 6. finalize: processed path, shareable URL, status `processed`, and
//!    processed date in a single store write
//!
//! Stage writes are keyed by the document id, which makes a retry from
//! stage 2 converge to the same final record ([`DocumentPipeline::resume`]).
//! The pipeline never retries by itself; retries are a caller concern so
//! provider-side quota or permission failures stay visible.
//!
//! Runs for different documents interleave freely; the only shared mutable
//! state is the backend store, which serializes writes per record id.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use permitseal_core::models::size_mb_from_bytes;
use permitseal_core::share_url::shareable_url;
use permitseal_core::{BucketKind, Document, DocumentPatch, DocumentStatus, NewDocument};
use permitseal_store::keys::document_key;
use permitseal_store::{DocumentStore, FileStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::progress::Progress;
use crate::qr::generate_qr;
use crate::stamp::stamp_first_page;
use crate::validator::{UploadValidator, ValidationError};

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    OriginalUpload,
    MarkProcessing,
    Stamp,
    ProcessedUpload,
    Finalize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::OriginalUpload => "original_upload",
            Stage::MarkProcessing => "mark_processing",
            Stage::Stamp => "stamp",
            Stage::ProcessedUpload => "processed_upload",
            Stage::Finalize => "finalize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage failure with the stage it happened in.
#[derive(Debug, thiserror::Error)]
#[error("pipeline failed at stage {stage}: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: anyhow::Error,
}

impl PipelineError {
    fn new(stage: Stage, source: impl Into<anyhow::Error>) -> Self {
        PipelineError {
            stage,
            source: source.into(),
        }
    }
}

/// Why a submitted upload did not produce a processed document.
///
/// Validation rejections happen before stage 1 (no record is created) and
/// are distinct from pipeline failures, which always carry a stage.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// An incoming upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub owner_user_id: Option<String>,
}

/// Pipeline construction options.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub public_origin: String,
    pub max_file_size: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
}

/// Orchestrates the six-stage flow against injected stores.
pub struct DocumentPipeline {
    documents: Arc<dyn DocumentStore>,
    files: Arc<dyn FileStore>,
    validator: UploadValidator,
    public_origin: String,
}

impl DocumentPipeline {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        files: Arc<dyn FileStore>,
        options: PipelineOptions,
    ) -> Self {
        DocumentPipeline {
            documents,
            files,
            validator: UploadValidator::new(
                options.max_file_size,
                options.allowed_extensions,
                options.allowed_content_types,
            ),
            public_origin: options.public_origin,
        }
    }

    /// Process an upload end to end.
    pub async fn process(
        &self,
        request: UploadRequest,
        progress: Progress,
    ) -> Result<Document, ProcessError> {
        // Rejections happen before anything is persisted.
        self.validator
            .validate_all(&request.filename, &request.content_type, request.data.len())?;
        progress.report(10);

        // Stage 1: the id exists before any file touches storage and is
        // never reused, even if a later stage fails.
        let id = self
            .documents
            .generate_id()
            .await
            .map_err(|e| PipelineError::new(Stage::Init, e))?;
        let record = self
            .documents
            .create(NewDocument {
                id: id.clone(),
                name: request.filename.clone(),
                size_mb: size_mb_from_bytes(request.data.len()),
                owner_user_id: request.owner_user_id.clone(),
            })
            .await
            .map_err(|e| PipelineError::new(Stage::Init, e))?;
        progress.report(20);

        tracing::info!(id = %record.id, name = %record.name, "document record created");

        let document = self
            .run_from_original_upload(record, request.data, progress)
            .await?;
        Ok(document)
    }

    /// Retry processing for an existing record.
    ///
    /// Returns the record as-is when it is already `processed`; otherwise
    /// re-runs from stage 2 with the same id. Stage writes are keyed by the
    /// id, so the retry converges to the same final record as a clean run.
    pub async fn resume(
        &self,
        id: &str,
        data: Vec<u8>,
        progress: Progress,
    ) -> Result<Document, ProcessError> {
        let record = self
            .documents
            .get(id)
            .await
            .map_err(|e| PipelineError::new(Stage::Init, e))?;

        if record.status == DocumentStatus::Processed {
            progress.report(100);
            return Ok(record);
        }

        progress.report(20);
        let document = self.run_from_original_upload(record, data, progress).await?;
        Ok(document)
    }

    /// Run the pipeline in a background task with an observable progress
    /// channel. The task can be aborted; an abandoned document stays in
    /// whatever status its last completed stage produced and is resumable.
    pub fn spawn(self: &Arc<Self>, request: UploadRequest) -> ProcessingTask {
        let (progress, rx) = Progress::channel();
        let pipeline = Arc::clone(self);
        let handle = tokio::spawn(async move { pipeline.process(request, progress).await });
        ProcessingTask {
            handle,
            progress: rx,
        }
    }

    /// Stages 2–6 for an existing record.
    async fn run_from_original_upload(
        &self,
        record: Document,
        data: Vec<u8>,
        progress: Progress,
    ) -> Result<Document, PipelineError> {
        let id = record.id.clone();
        let owner = record.owner_user_id.clone();

        // Stage 2
        let original_key =
            document_key(owner.as_deref(), &id, BucketKind::Original, &record.name);
        self.files
            .upload(
                BucketKind::Original,
                &original_key,
                PDF_CONTENT_TYPE,
                data.clone(),
            )
            .await
            .map_err(|e| PipelineError::new(Stage::OriginalUpload, e))?;
        progress.report(40);

        // Stage 3
        self.documents
            .update(
                &id,
                DocumentPatch {
                    status: Some(DocumentStatus::Processing),
                    original_file_path: Some(original_key),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| PipelineError::new(Stage::MarkProcessing, e))?;
        progress.report(50);

        // Stage 4: the URL is a pure function of the id and cannot fail.
        let url = shareable_url(&self.public_origin, &id);
        progress.report(60);

        let stamped = {
            let qr_and_stamp = || -> anyhow::Result<Vec<u8>> {
                let png = generate_qr(&url)?;
                progress.report(70);
                Ok(stamp_first_page(&data, &png)?)
            };
            match qr_and_stamp() {
                Ok(stamped) => stamped,
                Err(e) => {
                    // Roll back so the record is not left stuck in
                    // `processing`; a retry is then visibly safe.
                    if let Err(rollback) = self
                        .documents
                        .update(
                            &id,
                            DocumentPatch {
                                status: Some(DocumentStatus::Uploaded),
                                ..Default::default()
                            },
                        )
                        .await
                    {
                        tracing::warn!(id = %id, error = %rollback, "status rollback failed");
                    }
                    return Err(PipelineError::new(Stage::Stamp, e));
                }
            }
        };
        progress.report(80);

        // Stage 5
        let processed_key =
            document_key(owner.as_deref(), &id, BucketKind::Processed, &record.name);
        self.files
            .upload(
                BucketKind::Processed,
                &processed_key,
                PDF_CONTENT_TYPE,
                stamped,
            )
            .await
            .map_err(|e| PipelineError::new(Stage::ProcessedUpload, e))?;
        progress.report(90);

        // Stage 6: path, URL, status, and date land in one update so the
        // record can never read `processed` with either missing. A crash
        // before this write leaves `processing` plus an invisible orphan
        // upload, which a retry overwrites.
        let record = self
            .documents
            .update(
                &id,
                DocumentPatch {
                    status: Some(DocumentStatus::Processed),
                    processed_file_path: Some(processed_key),
                    shareable_url: Some(url),
                    processed_date: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| PipelineError::new(Stage::Finalize, e))?;
        progress.report(100);

        tracing::info!(
            id = %record.id,
            shareable_url = record.shareable_url.as_deref().unwrap_or(""),
            "document processed"
        );
        Ok(record)
    }
}

/// A spawned pipeline run: abortable, with observable progress.
pub struct ProcessingTask {
    handle: JoinHandle<Result<Document, ProcessError>>,
    pub progress: watch::Receiver<u8>,
}

impl ProcessingTask {
    /// Stop the run. The document stays at its last completed stage.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Wait for the run to finish. `None` means the task was aborted.
    pub async fn join(self) -> Option<Result<Document, ProcessError>> {
        self.handle.await.ok()
    }
}
