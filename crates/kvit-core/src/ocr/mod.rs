//! Recognition contracts and spatial text reconstruction.
//!
//! The external recognizer turns an image into a flat list of positioned
//! text fragments. The modules here reconstruct a plausible logical
//! layout from that bag of fragments: candidate lines for the extraction
//! rules, the dominant reading orientation, and the tightest crop that
//! contains all recognized text.

mod crop;
mod layout;
mod orientation;

pub use crop::{Crop, bounding_crop, crop_image};
pub use layout::{LINE_DITHER, candidate_lines};
pub use orientation::{Orientation, auto_rotate, detect_orientation};

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// A 2-D point in pixel space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One recognizer-reported text span with its bounding polygon.
///
/// Vertices are reported clockwise starting from the top-left corner of
/// upright text; for rotated text the first vertex moves accordingly,
/// which is what orientation detection keys on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    /// Recognized text content.
    pub text: String,
    /// Corner points of the bounding polygon, normally exactly four.
    pub vertices: Vec<Point>,
}

impl Fragment {
    pub fn new(text: impl Into<String>, vertices: Vec<Point>) -> Self {
        Self {
            text: text.into(),
            vertices,
        }
    }

    /// Convenience constructor for an axis-aligned box.
    pub fn from_rect(text: impl Into<String>, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(
            text,
            vec![
                Point::new(left, top),
                Point::new(right, top),
                Point::new(right, bottom),
                Point::new(left, bottom),
            ],
        )
    }

    /// First vertex, the anchor used for line and column grouping.
    pub fn anchor(&self) -> Option<Point> {
        self.vertices.first().copied()
    }

    /// Width along the top edge, when at least two vertices are present.
    pub fn width(&self) -> Option<i32> {
        match (self.vertices.first(), self.vertices.get(1)) {
            (Some(a), Some(b)) => Some(b.x - a.x),
            _ => None,
        }
    }
}

/// Result of one recognition pass over an image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecognizedPage {
    /// Full recognized text, line breaks as reported by the recognizer.
    pub text: String,
    /// Individual word/span fragments with geometry.
    pub fragments: Vec<Fragment>,
}

impl RecognizedPage {
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Contract for the external text-recognition service.
///
/// Implementations may be called concurrently from multiple workers.
/// Returning a page with zero fragments is treated by callers as a hard
/// recognition failure.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> std::result::Result<RecognizedPage, OcrError>;
}
