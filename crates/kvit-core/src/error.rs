//! Error types for the kvit-core library.

use thiserror::Error;

/// Main error type for the kvit-core library.
#[derive(Error, Debug)]
pub enum KvitError {
    /// Text recognition error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Field extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Errors related to text recognition and image geometry.
#[derive(Error, Debug)]
pub enum OcrError {
    /// The external recognizer returned an error.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// The recognizer returned zero fragments. The pipeline treats this
    /// the same as a hard recognition failure.
    #[error("no text detected in image")]
    NoText,

    /// A corrective rotation was requested for an orientation that does
    /// not need one.
    #[error("unknown rotation")]
    InvalidOrientation,
}

/// Errors related to receipt field extraction.
///
/// A rule that simply finds no match is not an error; it records a
/// human-readable string in the extraction result instead. Hard errors
/// are reserved for exceptional conditions inside a rule.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A rule failed for a reason other than "no match".
    #[error("rule {rule} failed: {reason}")]
    Rule { rule: &'static str, reason: String },
}

/// Result type for the kvit-core library.
pub type Result<T> = std::result::Result<T, KvitError>;
