//! Bilinear rotation of grayscale images about their center.

use crate::image::{ImageView, OwnedImage};
use crate::util::math::sin_cos_deg;

/// Rotates a grayscale image by `angle_deg` (counter-clockwise on screen)
/// about its center, keeping the original canvas size.
///
/// Each destination pixel is mapped back through the inverse rotation and
/// sampled bilinearly; samples falling outside the source are set to `fill`.
pub fn rotate_bilinear(src: ImageView<'_, u8>, angle_deg: f32, fill: u8) -> OwnedImage {
    let width = src.width();
    let height = src.height();
    let (sin_a, cos_a) = sin_cos_deg(angle_deg);
    let cx = (width as f32 - 1.0) * 0.5;
    let cy = (height as f32 - 1.0) * 0.5;

    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        let dy = y as f32 - cy;
        for x in 0..width {
            let dx = x as f32 - cx;
            let src_x = cos_a * dx - sin_a * dy + cx;
            let src_y = sin_a * dx + cos_a * dy + cy;
            let value = sample_bilinear(src, src_x, src_y).unwrap_or(fill as f32);
            out.push(value.round().clamp(0.0, 255.0) as u8);
        }
    }

    OwnedImage {
        data: out,
        width,
        height,
    }
}

/// Samples `src` at fractional coordinates, or `None` outside the image.
fn sample_bilinear(src: ImageView<'_, u8>, x: f32, y: f32) -> Option<f32> {
    let eps = 1e-4;
    let max_x = src.width() as f32 - 1.0;
    let max_y = src.height() as f32 - 1.0;
    if !x.is_finite() || !y.is_finite() || x < -eps || y < -eps || x > max_x + eps || y > max_y + eps
    {
        return None;
    }

    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(src.width() - 1);
    let y1 = (y0 + 1).min(src.height() - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let row0 = src.row(y0)?;
    let row1 = src.row(y1)?;
    let top = row0[x0] as f32 * (1.0 - fx) + row0[x1] as f32 * fx;
    let bottom = row1[x0] as f32 * (1.0 - fx) + row1[x1] as f32 * fx;
    Some(top * (1.0 - fy) + bottom * fy)
}
