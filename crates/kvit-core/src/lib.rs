//! Core library for Estonian receipt OCR processing.
//!
//! This crate provides:
//! - Recognizer-output layout reconstruction (candidate-line superset)
//! - Page orientation detection and correction
//! - Rule-based fiscal field extraction (vendor, date, receipt number,
//!   tax/total, fuel excise)
//! - Text bounding-box cropping for stored receipt images

pub mod currency;
pub mod error;
pub mod extract;
pub mod ocr;

pub use currency::CurrencyPrecision;
pub use error::{ExtractionError, KvitError, OcrError, Result};
pub use extract::{Excise, Extraction, Extractor, Patch, Rule, RULES_VERSION};
pub use ocr::{
    auto_rotate, bounding_crop, candidate_lines, crop_image, detect_orientation, Crop, Fragment,
    Orientation, Point, RecognizedPage, Recognizer,
};
