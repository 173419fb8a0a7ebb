//! Gaussian and difference-of-Gaussian pyramids.
//!
//! Each octave holds `layers + 3` Gaussian images whose blur grows
//! geometrically by `k = 2^(1/layers)`, and `layers + 2` DoG images. The first
//! image of octave `o > 0` is the Gaussian image at index `layers` of octave
//! `o - 1`, decimated by two.

use crate::features::ExtractorConfig;
use crate::image::FloatImage;

/// Blur the input is assumed to carry already.
const INPUT_SIGMA: f32 = 0.5;

pub(crate) struct ScaleSpace {
    pub(crate) gaussians: Vec<Vec<FloatImage>>,
    pub(crate) dogs: Vec<Vec<FloatImage>>,
    /// Factor mapping octave-0 coordinates back to input pixels.
    pub(crate) base_scale: f32,
}

impl ScaleSpace {
    /// Builds the pyramids, or returns `None` when the image is too small for
    /// a single octave.
    pub(crate) fn build(input: &FloatImage, cfg: &ExtractorConfig) -> Option<Self> {
        let min_dim = input.width().min(input.height()) as f32;
        let extra = usize::from(cfg.upsample);
        let n_octaves = (min_dim.log2() - 2.0).round() as isize + extra as isize;
        if n_octaves < 1 {
            return None;
        }

        let base = if cfg.upsample {
            let sig_diff = (cfg.sigma * cfg.sigma - 4.0 * INPUT_SIGMA * INPUT_SIGMA)
                .max(0.01)
                .sqrt();
            input.upsample_x2().gaussian_blur(sig_diff)
        } else {
            let sig_diff = (cfg.sigma * cfg.sigma - INPUT_SIGMA * INPUT_SIGMA)
                .max(0.01)
                .sqrt();
            input.gaussian_blur(sig_diff)
        };

        let layers = cfg.octave_layers;
        let sigmas = layer_sigmas(cfg.sigma, layers);
        let mut gaussians: Vec<Vec<FloatImage>> = Vec::with_capacity(n_octaves as usize);
        let mut first = base;
        for o in 0..n_octaves {
            let octave = blur_octave(first, &sigmas);
            let src = &octave[layers];
            let next = (o + 1 < n_octaves && src.width() >= 2 && src.height() >= 2)
                .then(|| src.downsample_half());
            gaussians.push(octave);
            match next {
                Some(img) => first = img,
                None => break,
            }
        }

        let dogs = gaussians
            .iter()
            .map(|octave| octave.windows(2).map(|w| w[1].difference(&w[0])).collect())
            .collect();

        Some(Self {
            gaussians,
            dogs,
            base_scale: if cfg.upsample { 0.5 } else { 1.0 },
        })
    }

    pub(crate) fn num_octaves(&self) -> usize {
        self.gaussians.len()
    }
}

fn blur_octave(first: FloatImage, sigmas: &[f32]) -> Vec<FloatImage> {
    let mut octave = Vec::with_capacity(sigmas.len());
    let mut current = first;
    for sigma in sigmas.iter().skip(1) {
        let next = current.gaussian_blur(*sigma);
        octave.push(current);
        current = next;
    }
    octave.push(current);
    octave
}

/// Incremental blur applied to reach each layer from the previous one.
fn layer_sigmas(sigma: f32, layers: usize) -> Vec<f32> {
    let k = 2f32.powf(1.0 / layers as f32);
    let mut sigmas = Vec::with_capacity(layers + 3);
    sigmas.push(sigma);
    for i in 1..layers + 3 {
        let prev = k.powi(i as i32 - 1) * sigma;
        let total = prev * k;
        sigmas.push((total * total - prev * prev).sqrt());
    }
    sigmas
}

#[cfg(test)]
mod tests {
    use super::{layer_sigmas, ScaleSpace};
    use crate::features::ExtractorConfig;
    use crate::image::FloatImage;

    #[test]
    fn incremental_sigmas_compose_to_geometric_series() {
        let sigma = 1.6f32;
        let layers = 3;
        let sigmas = layer_sigmas(sigma, layers);
        assert_eq!(sigmas.len(), layers + 3);
        let mut total_sq = sigma * sigma;
        let k = 2f32.powf(1.0 / layers as f32);
        for (i, s) in sigmas.iter().enumerate().skip(1) {
            total_sq += s * s;
            let expected = sigma * k.powi(i as i32);
            assert!((total_sq.sqrt() - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn octave_sizes_halve() {
        let img = FloatImage::from_vec(vec![0.5; 64 * 48], 64, 48);
        let cfg = ExtractorConfig::default();
        let space = ScaleSpace::build(&img, &cfg).unwrap();
        assert_eq!(space.num_octaves(), 5);
        assert_eq!(space.gaussians[0][0].width(), 128);
        assert_eq!(space.gaussians[1][0].width(), 64);
        assert_eq!(space.gaussians[0].len(), cfg.octave_layers + 3);
        assert_eq!(space.dogs[0].len(), cfg.octave_layers + 2);
    }

    #[test]
    fn tiny_image_has_no_octaves() {
        let img = FloatImage::from_vec(vec![0.5; 2 * 2], 2, 2);
        let cfg = ExtractorConfig {
            upsample: false,
            ..ExtractorConfig::default()
        };
        assert!(ScaleSpace::build(&img, &cfg).is_none());
    }
}
