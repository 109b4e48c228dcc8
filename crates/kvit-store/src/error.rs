//! Error types for the kvit-store library.

use thiserror::Error;

use kvit_core::{ExtractionError, OcrError};

/// Errors from entity storage and the services built on it.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No live entity at the requested key.
    #[error("entity not found")]
    NotFound,

    /// The entity at the key is of a different kind than requested.
    #[error("entity kind mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: u8 },

    /// A key failed to encode or decode.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Underlying database error.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Entity payload failed to encode or decode.
    #[error("entity codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The connection mutex was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Lock,

    /// Batch operations require a batch id.
    #[error("failed to get receipts, empty batch ID")]
    EmptyBatchId,

    /// A date string did not match any accepted short-date layout.
    #[error("failed to parse time string {0}: unknown format")]
    DateFormat(String),
}

/// Errors from key encoding and decoding.
///
/// Keys are path-like byte strings; every error names the segment that
/// was empty or missing so a bad key can be traced back to its caller.
#[derive(Error, Debug)]
pub enum KeyError {
    /// An encode-side segment was empty.
    #[error("{key} key error: empty {segment}")]
    EmptySegment {
        key: &'static str,
        segment: &'static str,
    },

    /// A decode-side segment was absent from the raw key.
    #[error("{key} key missing {segment}: {raw}")]
    MissingSegment {
        key: &'static str,
        segment: &'static str,
        raw: String,
    },

    /// The raw key did not split into tag/value pairs.
    #[error("malformed key: {0}")]
    Malformed(String),
}

/// Errors from the parallel processing pipeline.
///
/// A per-task error terminates that task only; the pool logs it and
/// moves on.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Text recognition failed for the task image.
    #[error("recognition failed: {0}")]
    Ocr(#[from] OcrError),

    /// Field extraction failed hard.
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// Persisting the receipt or its image failed.
    #[error("storage failed: {0}")]
    Store(#[from] StoreError),

    /// Re-encoding the processed image failed.
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// A hook's own I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A user hook returned an error.
    #[error("hook failed: {0}")]
    Hook(String),

    /// The queue disconnected because every worker already exited.
    #[error("processor already closed")]
    Closed,

    /// A worker thread panicked before draining its queue.
    #[error("worker thread panicked")]
    WorkerPanicked,
}

/// Result type for the kvit-store library.
pub type Result<T> = std::result::Result<T, StoreError>;
