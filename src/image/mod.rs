//! Image views and owned buffers.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit stride.
//! The stride counts elements between the starts of consecutive rows, so a
//! stride larger than the width represents padded rows. `OwnedImage` is the
//! contiguous 8-bit grayscale buffer every comparison starts from; multi-channel
//! input is reduced to luma on construction.

use crate::util::{PrintMatchError, PrintMatchResult};

pub(crate) mod float;
#[cfg(feature = "image-io")]
pub mod io;
pub mod rotate;

pub use float::FloatImage;

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> PrintMatchResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(
        data: &'a [T],
        width: usize,
        height: usize,
        stride: usize,
    ) -> PrintMatchResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(PrintMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> PrintMatchResult<usize> {
    if width == 0 || height == 0 {
        return Err(PrintMatchError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(PrintMatchError::InvalidStride { width, stride });
    }
    let needed = (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(PrintMatchError::InvalidDimensions { width, height })?;
    Ok(needed)
}

/// Owned contiguous 8-bit grayscale image.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl OwnedImage {
    /// Creates an image from a contiguous grayscale buffer of exactly
    /// `width * height` bytes.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> PrintMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(PrintMatchError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .ok_or(PrintMatchError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(PrintMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(PrintMatchError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Reduces an interleaved 1-4 channel buffer to grayscale.
    ///
    /// Channels are interpreted as gray, gray+alpha, RGB or RGBA; alpha is
    /// ignored and color is weighted with the Rec. 601 luma coefficients.
    pub fn from_interleaved(
        data: &[u8],
        width: usize,
        height: usize,
        channels: usize,
    ) -> PrintMatchResult<Self> {
        if !(1..=4).contains(&channels) {
            return Err(PrintMatchError::InvalidConfig {
                field: "channels",
                reason: "must be between 1 and 4",
            });
        }
        let pixels = width
            .checked_mul(height)
            .ok_or(PrintMatchError::InvalidDimensions { width, height })?;
        let needed = pixels
            .checked_mul(channels)
            .ok_or(PrintMatchError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(PrintMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }

        let gray = data[..needed]
            .chunks_exact(channels)
            .map(|px| match channels {
                1 | 2 => px[0],
                _ => {
                    let luma = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
                    luma.round().clamp(0.0, 255.0) as u8
                }
            })
            .collect();
        Self::new(gray, width, height)
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the contiguous pixel buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }
}
