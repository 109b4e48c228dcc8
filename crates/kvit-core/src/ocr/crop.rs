//! Minimum bounding box over recognized text, for cropping the stored
//! receipt image.

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use super::Fragment;

/// Pixel location of the tightest crop that contains all recognized text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crop {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

/// Compute the minimum axis-aligned bounding box over every vertex of
/// every fragment. An empty fragment list yields the zero crop.
pub fn bounding_crop(fragments: &[Fragment]) -> Crop {
    let mut crop = Crop {
        top: i32::MAX,
        bottom: 0,
        left: i32::MAX,
        right: 0,
    };

    for fragment in fragments {
        for v in &fragment.vertices {
            if v.y < crop.top {
                crop.top = v.y;
            }
            if v.y > crop.bottom {
                crop.bottom = v.y;
            }
            if v.x < crop.left {
                crop.left = v.x;
            }
            if v.x > crop.right {
                crop.right = v.x;
            }
        }
    }

    if crop.top == i32::MAX {
        Crop::default()
    } else {
        crop
    }
}

/// Apply a crop to an image, clamping the box to the image bounds.
/// Degenerate boxes return the image unchanged.
pub fn crop_image(image: &DynamicImage, crop: &Crop) -> DynamicImage {
    let (width, height) = image.dimensions();
    let left = crop.left.max(0) as u32;
    let top = crop.top.max(0) as u32;
    let right = (crop.right.max(0) as u32).min(width);
    let bottom = (crop.bottom.max(0) as u32).min(height);

    if right <= left || bottom <= top {
        return image.clone();
    }
    image.crop_imm(left, top, right - left, bottom - top)
}
