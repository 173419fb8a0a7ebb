//! Scale-space extrema detection, sub-pixel refinement and orientation
//! assignment.

use crate::features::scale_space::ScaleSpace;
use crate::features::{ExtractorConfig, Keypoint};
use crate::image::FloatImage;
use crate::refine::quad1d::parabolic_offset;
use crate::refine::quad3d::Cube;
use crate::util::math::atan2_deg_360;

/// Pixels skipped at every octave border.
const IMG_BORDER: usize = 5;
/// Maximum number of refinement steps before a candidate is dropped.
const MAX_INTERP_STEPS: usize = 5;
const ORI_HIST_BINS: usize = 36;
const ORI_SIG_FCTR: f32 = 1.5;
const ORI_RADIUS: f32 = 3.0 * ORI_SIG_FCTR;
const ORI_PEAK_RATIO: f32 = 0.8;

/// A keypoint together with where it was found in the scale space.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Detection {
    pub(crate) keypoint: Keypoint,
    pub(crate) layer: usize,
    /// Refined position in octave pixels.
    pub(crate) octave_x: f32,
    pub(crate) octave_y: f32,
    /// Keypoint scale in octave pixels.
    pub(crate) octave_scale: f32,
}

/// Finds oriented keypoints in every octave of `space`.
pub(crate) fn detect(space: &ScaleSpace, cfg: &ExtractorConfig) -> Vec<Detection> {
    let layers = cfg.octave_layers;
    let threshold = (0.5 * cfg.contrast_threshold / layers as f32 * 255.0).floor() / 255.0;
    let mut out = Vec::new();

    for (octave, dogs) in space.dogs.iter().enumerate() {
        let width = dogs[0].width();
        let height = dogs[0].height();
        if width <= 2 * IMG_BORDER || height <= 2 * IMG_BORDER {
            continue;
        }
        for layer in 1..=layers {
            for r in IMG_BORDER..height - IMG_BORDER {
                for c in IMG_BORDER..width - IMG_BORDER {
                    if !is_extremum(dogs, layer, r, c, threshold) {
                        continue;
                    }
                    let Some(refined) = refine_extremum(dogs, layer, r, c, cfg) else {
                        continue;
                    };
                    emit_oriented(space, octave, &refined, cfg, &mut out);
                }
            }
        }
    }
    out
}

fn is_extremum(dogs: &[FloatImage], layer: usize, r: usize, c: usize, threshold: f32) -> bool {
    let val = dogs[layer].at(c, r);
    if val.abs() <= threshold {
        return false;
    }
    let maximum = val > 0.0;
    for img in &dogs[layer - 1..=layer + 1] {
        for y in r - 1..=r + 1 {
            for x in c - 1..=c + 1 {
                let n = img.at(x, y);
                if (maximum && val < n) || (!maximum && val > n) {
                    return false;
                }
            }
        }
    }
    true
}

fn cube_at(dogs: &[FloatImage], layer: usize, r: usize, c: usize) -> Cube {
    let mut s = [[[0.0f32; 3]; 3]; 3];
    for (ds, plane) in s.iter_mut().enumerate() {
        let img = &dogs[layer + ds - 1];
        for (dy, row) in plane.iter_mut().enumerate() {
            for (dx, v) in row.iter_mut().enumerate() {
                *v = img.at(c + dx - 1, r + dy - 1);
            }
        }
    }
    Cube(s)
}

struct Refined {
    layer: usize,
    r: usize,
    c: usize,
    offset: [f32; 3],
    contrast: f32,
}

/// Moves the candidate toward the interpolated extremum, then applies the
/// contrast and edge-response tests.
fn refine_extremum(
    dogs: &[FloatImage],
    layer: usize,
    r: usize,
    c: usize,
    cfg: &ExtractorConfig,
) -> Option<Refined> {
    let layers = cfg.octave_layers as isize;
    let width = dogs[0].width() as isize;
    let height = dogs[0].height() as isize;
    let border = IMG_BORDER as isize;

    let (mut layer, mut r, mut c) = (layer as isize, r as isize, c as isize);
    let mut converged = None;
    for _ in 0..MAX_INTERP_STEPS {
        let cube = cube_at(dogs, layer as usize, r as usize, c as usize);
        let offset = cube.vertex_offset()?;
        if offset.iter().all(|v| v.abs() < 0.5) {
            converged = Some((cube, offset));
            break;
        }
        if offset.iter().any(|v| v.abs() > (i32::MAX / 3) as f32) {
            return None;
        }
        c += offset[0].round() as isize;
        r += offset[1].round() as isize;
        layer += offset[2].round() as isize;
        if layer < 1
            || layer > layers
            || c < border
            || c >= width - border
            || r < border
            || r >= height - border
        {
            return None;
        }
    }
    let (cube, offset) = converged?;

    let contrast = cube.value_at(offset);
    if contrast.abs() * (layers as f32) < cfg.contrast_threshold {
        return None;
    }

    let (tr, det) = cube.spatial_trace_det();
    let edge = cfg.edge_threshold;
    if det <= 0.0 || tr * tr * edge >= (edge + 1.0) * (edge + 1.0) * det {
        return None;
    }

    Some(Refined {
        layer: layer as usize,
        r: r as usize,
        c: c as usize,
        offset,
        contrast,
    })
}

/// Builds the orientation histogram around a refined extremum and pushes one
/// detection per dominant peak.
fn emit_oriented(
    space: &ScaleSpace,
    octave: usize,
    refined: &Refined,
    cfg: &ExtractorConfig,
    out: &mut Vec<Detection>,
) {
    let layers = cfg.octave_layers as f32;
    let octave_scale = cfg.sigma * 2f32.powf((refined.layer as f32 + refined.offset[2]) / layers);
    let octave_x = refined.c as f32 + refined.offset[0];
    let octave_y = refined.r as f32 + refined.offset[1];
    let to_input = 2f32.powi(octave as i32) * space.base_scale;

    let gauss = &space.gaussians[octave][refined.layer];
    let radius = (ORI_RADIUS * octave_scale).round() as isize;
    let hist = orientation_histogram(
        gauss,
        refined.c as isize,
        refined.r as isize,
        radius,
        ORI_SIG_FCTR * octave_scale,
    );

    let max = hist.iter().copied().fold(0.0f32, f32::max);
    let peak_floor = max * ORI_PEAK_RATIO;
    let n = ORI_HIST_BINS;
    for j in 0..n {
        let left = hist[(j + n - 1) % n];
        let right = hist[(j + 1) % n];
        let center = hist[j];
        if !(center > left && center > right && center >= peak_floor) {
            continue;
        }
        let mut bin = j as f32 + parabolic_offset(left, center, right);
        if bin < 0.0 {
            bin += n as f32;
        } else if bin >= n as f32 {
            bin -= n as f32;
        }
        let mut angle = 360.0 - (360.0 / n as f32) * bin;
        if (angle - 360.0).abs() < f32::EPSILON {
            angle = 0.0;
        }

        out.push(Detection {
            keypoint: Keypoint {
                x: octave_x * to_input,
                y: octave_y * to_input,
                size: octave_scale * 2.0 * to_input,
                angle,
                response: refined.contrast.abs(),
                octave,
            },
            layer: refined.layer,
            octave_x,
            octave_y,
            octave_scale,
        });
    }
}

/// Gaussian-weighted, smoothed histogram of gradient orientations.
fn orientation_histogram(
    img: &FloatImage,
    cx: isize,
    cy: isize,
    radius: isize,
    sigma: f32,
) -> [f32; ORI_HIST_BINS] {
    let n = ORI_HIST_BINS;
    let mut raw = [0.0f32; ORI_HIST_BINS];
    let exp_scale = -1.0 / (2.0 * sigma * sigma);
    let width = img.width() as isize;
    let height = img.height() as isize;

    for i in -radius..=radius {
        let y = cy + i;
        if y <= 0 || y >= height - 1 {
            continue;
        }
        for j in -radius..=radius {
            let x = cx + j;
            if x <= 0 || x >= width - 1 {
                continue;
            }
            let (xu, yu) = (x as usize, y as usize);
            let dx = img.at(xu + 1, yu) - img.at(xu - 1, yu);
            let dy = img.at(xu, yu - 1) - img.at(xu, yu + 1);
            let weight = ((i * i + j * j) as f32 * exp_scale).exp();
            let magnitude = (dx * dx + dy * dy).sqrt();
            let ori = atan2_deg_360(dy, dx);
            let mut bin = (ori * n as f32 / 360.0).round() as usize;
            if bin >= n {
                bin -= n;
            }
            raw[bin] += weight * magnitude;
        }
    }

    let mut smoothed = [0.0f32; ORI_HIST_BINS];
    for (k, dst) in smoothed.iter_mut().enumerate() {
        let at = |d: isize| raw[(k as isize + d).rem_euclid(n as isize) as usize];
        *dst = (at(-2) + at(2)) * (1.0 / 16.0)
            + (at(-1) + at(1)) * (4.0 / 16.0)
            + at(0) * (6.0 / 16.0);
    }
    smoothed
}

#[cfg(test)]
mod tests {
    use super::{orientation_histogram, ORI_HIST_BINS};
    use crate::image::FloatImage;

    #[test]
    fn horizontal_ramp_peaks_at_zero_degrees() {
        let w = 21;
        let data: Vec<f32> = (0..w * w).map(|i| (i % w) as f32 / w as f32).collect();
        let img = FloatImage::from_vec(data, w, w);
        let hist = orientation_histogram(&img, 10, 10, 6, 3.0);
        let (argmax, _) = hist
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
        assert_eq!(argmax, 0);
        assert!(hist[ORI_HIST_BINS / 2] < 1e-6);
    }

    #[test]
    fn vertical_ramp_peaks_at_ninety_degrees() {
        let w = 21;
        // Intensity grows upward, so the gradient points toward +90 degrees.
        let data: Vec<f32> = (0..w * w).map(|i| (w - i / w) as f32 / w as f32).collect();
        let img = FloatImage::from_vec(data, w, w);
        let hist = orientation_histogram(&img, 10, 10, 6, 3.0);
        let (argmax, _) = hist
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
        assert_eq!(argmax, 9);
    }
}
