//! Single-channel `f32` images used by the scale space.
//!
//! Intensities are stored in `[0, 1]`. All filters use reflect-101 borders
//! so that gradients at the image edge do not see a synthetic step.

use crate::image::ImageView;
use crate::util::math::{gaussian_kernel, reflect_101};

/// Owned contiguous `f32` image.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatImage {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl FloatImage {
    pub(crate) fn from_vec(data: Vec<f32>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            data,
            width,
            height,
        }
    }

    /// Converts an 8-bit view to `[0, 1]` intensities.
    pub fn from_u8(view: ImageView<'_, u8>) -> Self {
        let width = view.width();
        let height = view.height();
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            let row = view.row(y).expect("row within view bounds");
            data.extend(row.iter().map(|&v| v as f32 / 255.0));
        }
        Self::from_vec(data, width, height)
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the contiguous sample buffer.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Sample at integer coordinates; callers guarantee bounds.
    #[inline]
    pub(crate) fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Separable Gaussian blur with reflect-101 borders.
    pub fn gaussian_blur(&self, sigma: f32) -> FloatImage {
        let kernel = gaussian_kernel(sigma);
        let radius = (kernel.len() / 2) as isize;
        let (w, h) = (self.width, self.height);

        let mut tmp = vec![0.0f32; w * h];
        for y in 0..h {
            let row = &self.data[y * w..(y + 1) * w];
            let out = &mut tmp[y * w..(y + 1) * w];
            for (x, dst) in out.iter_mut().enumerate() {
                let mut acc = 0.0f32;
                for (k, weight) in kernel.iter().enumerate() {
                    let sx = reflect_101(x as isize + k as isize - radius, w);
                    acc += weight * row[sx];
                }
                *dst = acc;
            }
        }

        let mut out = vec![0.0f32; w * h];
        for y in 0..h {
            for (k, weight) in kernel.iter().enumerate() {
                let sy = reflect_101(y as isize + k as isize - radius, h);
                let src = &tmp[sy * w..(sy + 1) * w];
                let dst = &mut out[y * w..(y + 1) * w];
                for (d, s) in dst.iter_mut().zip(src.iter()) {
                    *d += weight * s;
                }
            }
        }

        FloatImage::from_vec(out, w, h)
    }

    /// Upsamples by two with pixel-center aligned bilinear interpolation.
    pub fn upsample_x2(&self) -> FloatImage {
        let (w, h) = (self.width, self.height);
        let (dw, dh) = (w * 2, h * 2);
        let max_x = (w - 1) as f32;
        let max_y = (h - 1) as f32;
        let mut data = Vec::with_capacity(dw * dh);
        for y in 0..dh {
            let sy = ((y as f32 + 0.5) * 0.5 - 0.5).clamp(0.0, max_y);
            let y0 = sy.floor() as usize;
            let y1 = (y0 + 1).min(h - 1);
            let fy = sy - y0 as f32;
            for x in 0..dw {
                let sx = ((x as f32 + 0.5) * 0.5 - 0.5).clamp(0.0, max_x);
                let x0 = sx.floor() as usize;
                let x1 = (x0 + 1).min(w - 1);
                let fx = sx - x0 as f32;
                let top = self.at(x0, y0) * (1.0 - fx) + self.at(x1, y0) * fx;
                let bottom = self.at(x0, y1) * (1.0 - fx) + self.at(x1, y1) * fx;
                data.push(top * (1.0 - fy) + bottom * fy);
            }
        }
        FloatImage::from_vec(data, dw, dh)
    }

    /// Halves the resolution by keeping every second sample.
    pub fn downsample_half(&self) -> FloatImage {
        let dw = (self.width / 2).max(1);
        let dh = (self.height / 2).max(1);
        let mut data = Vec::with_capacity(dw * dh);
        for y in 0..dh {
            for x in 0..dw {
                data.push(self.at(x * 2, y * 2));
            }
        }
        FloatImage::from_vec(data, dw, dh)
    }

    /// Pixel-wise `self - other`; both images must share dimensions.
    pub fn difference(&self, other: &FloatImage) -> FloatImage {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a - b)
            .collect();
        FloatImage::from_vec(data, self.width, self.height)
    }
}
