//! Convenience helpers for loading images via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::OwnedImage;
use crate::util::{PrintMatchError, PrintMatchResult};
use std::path::Path;

/// Creates an owned grayscale image from a dynamic image of any color type.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> PrintMatchResult<OwnedImage> {
    let gray = img.to_luma8();
    let width = gray.width() as usize;
    let height = gray.height() as usize;
    OwnedImage::new(gray.into_raw(), width, height)
}

/// Loads an image from disk and converts it to grayscale.
///
/// A missing file maps to [`PrintMatchError::NotFound`]; anything else the
/// decoder rejects maps to [`PrintMatchError::Decode`].
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> PrintMatchResult<OwnedImage> {
    let path = path.as_ref();
    let id = path.display().to_string();
    if !path.is_file() {
        return Err(PrintMatchError::NotFound { id, tried: 1 });
    }
    let img = image::open(path).map_err(|err| PrintMatchError::Decode {
        id,
        reason: err.to_string(),
    })?;
    owned_from_dynamic_image(&img)
}

/// Saves a grayscale image as PNG (used by tooling and tests).
pub fn save_gray_png<P: AsRef<Path>>(img: &OwnedImage, path: P) -> PrintMatchResult<()> {
    let buffer = image::GrayImage::from_raw(
        img.width() as u32,
        img.height() as u32,
        img.data().to_vec(),
    )
    .ok_or(PrintMatchError::InvalidDimensions {
        width: img.width(),
        height: img.height(),
    })?;
    let path = path.as_ref();
    buffer.save(path).map_err(|err| PrintMatchError::Encode {
        id: path.display().to_string(),
        reason: err.to_string(),
    })
}
