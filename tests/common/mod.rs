#![allow(dead_code)]

use printmatch::lowlevel::rotate_bilinear;
use printmatch::OwnedImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const BACKGROUND: u8 = 40;

/// Deterministic texture of randomly placed, oriented elliptical blobs.
///
/// Blobs differ in size, elongation, orientation and polarity so that local
/// neighbourhoods are distinctive.
pub fn blob_image(width: usize, height: usize, seed: u64) -> OwnedImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut acc = vec![BACKGROUND as f32; width * height];
    let margin = 8.0f32;
    for _ in 0..48 {
        let cx = rng.random_range(margin..width as f32 - margin);
        let cy = rng.random_range(margin..height as f32 - margin);
        let sx = rng.random_range(1.5f32..5.0);
        let sy = rng.random_range(1.5f32..5.0);
        let theta = rng.random_range(0.0f32..std::f32::consts::PI);
        let mut amp = rng.random_range(60.0f32..170.0);
        if rng.random_bool(0.3) {
            amp *= -0.5;
        }
        let (s, c) = theta.sin_cos();
        let reach = (4.0 * sx.max(sy)).ceil() as isize;
        let (icx, icy) = (cx.round() as isize, cy.round() as isize);
        for y in (icy - reach).max(0)..(icy + reach + 1).min(height as isize) {
            for x in (icx - reach).max(0)..(icx + reach + 1).min(width as isize) {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let u = c * dx + s * dy;
                let v = -s * dx + c * dy;
                let e = u * u / (2.0 * sx * sx) + v * v / (2.0 * sy * sy);
                acc[y as usize * width + x as usize] += amp * (-e).exp();
            }
        }
    }
    let data = acc
        .into_iter()
        .map(|v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    OwnedImage::new(data, width, height).unwrap()
}

/// `img` rotated about its center, uncovered corners set to the background.
pub fn rotated(img: &OwnedImage, angle_deg: f32) -> OwnedImage {
    rotate_bilinear(img.view(), angle_deg, BACKGROUND)
}

pub fn flat_image(width: usize, height: usize) -> OwnedImage {
    OwnedImage::new(vec![BACKGROUND; width * height], width, height).unwrap()
}
