//! PermitSeal Processing Library
//!
//! The document pipeline and its leaves: QR generation, PDF stamping,
//! upload validation, progress reporting, and stale-record detection.

pub mod pipeline;
pub mod progress;
pub mod qr;
pub mod stale;
pub mod stamp;
pub mod validator;

// Re-export commonly used types
pub use pipeline::{
    DocumentPipeline, PipelineError, PipelineOptions, ProcessError, ProcessingTask, Stage,
    UploadRequest,
};
pub use progress::Progress;
pub use qr::{generate_qr, QrError};
pub use stale::find_stale_processing;
pub use stamp::{stamp_first_page, StampError};
pub use validator::{UploadValidator, ValidationError};
