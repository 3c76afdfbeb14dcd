//! Shared constants for document processing and storage layout.

/// Square footprint of the QR stamp on the PDF page, in points.
pub const QR_STAMP_SIZE_PT: f32 = 82.5;

/// Inset of the QR stamp from the page's top and right edges, in points.
pub const QR_STAMP_INSET_PT: f32 = 15.0;

/// Quiet-zone width around the QR symbol, in modules.
pub const QR_QUIET_ZONE_MODULES: u32 = 4;

/// Pixel scale per QR module in the rendered PNG.
pub const QR_MODULE_SCALE: u32 = 4;

/// Logical bucket holding raw uploads.
pub const BUCKET_ORIGINAL: &str = "documents-original";

/// Logical bucket holding stamped outputs.
pub const BUCKET_PROCESSED: &str = "documents-processed";

/// Default human-readable prefix for generated permit ids.
pub const DEFAULT_ID_PREFIX: &str = "PERMIT";

/// Minimum zero-padded width of the numeric part of a permit id.
pub const ID_NUMBER_WIDTH: usize = 3;

/// Owner folder used for anonymous uploads in storage keys.
pub const ANONYMOUS_FOLDER: &str = "anonymous";

/// Default threshold after which a `processing` record is considered stale.
pub const DEFAULT_STALE_THRESHOLD_SECS: i64 = 900;
