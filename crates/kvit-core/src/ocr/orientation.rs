//! Reading-orientation detection from fragment geometry.
//!
//! For upright text the first vertex of a fragment's bounding polygon is
//! its top-left corner, which falls in the upper-left quadrant relative
//! to the polygon's centroid. Rotated text shifts that vertex into a
//! different quadrant, so tallying quadrant votes across all fragments
//! classifies the dominant page orientation.

use image::DynamicImage;
use tracing::debug;

use super::Fragment;
use crate::error::OcrError;

/// Dominant reading orientation of a page, in degrees clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Unknown,
    Deg0,
    Deg90,
    Deg270,
    Deg180,
}

impl Orientation {
    /// Whether a corrective rotation and second recognition pass is
    /// required before cropping.
    pub fn needs_rotation(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg180 | Self::Deg270)
    }
}

/// Classify the dominant orientation by quadrant-voting the first vertex
/// of every four-cornered fragment. Ties break in enumeration order
/// (0, 90, 270, 180); no votes at all yields `Unknown`.
pub fn detect_orientation(fragments: &[Fragment]) -> Orientation {
    let mut counts = [
        (Orientation::Deg0, 0usize),
        (Orientation::Deg90, 0),
        (Orientation::Deg270, 0),
        (Orientation::Deg180, 0),
    ];

    for fragment in fragments {
        if fragment.vertices.len() != 4 {
            continue;
        }
        let cx: i32 = fragment.vertices.iter().map(|p| p.x).sum::<i32>() / 4;
        let cy: i32 = fragment.vertices.iter().map(|p| p.y).sum::<i32>() / 4;
        let v0 = fragment.vertices[0];

        let slot = match (v0.x < cx, v0.y < cy) {
            (true, true) => 0,
            (false, true) => 1,
            (true, false) => 2,
            (false, false) => 3,
        };
        counts[slot].1 += 1;
    }

    let mut best = Orientation::Unknown;
    let mut best_count = 0;
    for (orientation, count) in counts {
        if count > best_count {
            best = orientation;
            best_count = count;
        }
    }
    debug!(?best, votes = best_count, "detected orientation");
    best
}

/// Rotate the source image so that text detected at `orientation` reads
/// upright. Fails for orientations that need no rotation.
pub fn auto_rotate(image: &DynamicImage, orientation: Orientation) -> Result<DynamicImage, OcrError> {
    match orientation {
        Orientation::Deg90 => Ok(image.rotate270()),
        Orientation::Deg180 => Ok(image.rotate180()),
        Orientation::Deg270 => Ok(image.rotate90()),
        _ => Err(OcrError::InvalidOrientation),
    }
}
