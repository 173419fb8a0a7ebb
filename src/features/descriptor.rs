//! 128-dimensional gradient-histogram descriptors.
//!
//! The patch around a keypoint is rotated into the keypoint's frame and split
//! into a 4x4 grid of cells, each holding an 8-bin orientation histogram.
//! Samples are distributed trilinearly over neighbouring cells and bins.

use crate::features::detect::Detection;
use crate::image::FloatImage;
use crate::util::math::{atan2_deg_360, sin_cos_deg};

/// Spatial cells per side.
const DESCR_WIDTH: usize = 4;
/// Orientation bins per cell.
const DESCR_HIST_BINS: usize = 8;
/// Cell width in keypoint scales.
const DESCR_SCL_FCTR: f32 = 3.0;
/// Clipping ratio applied before renormalization.
const DESCR_MAG_THR: f32 = 0.2;
const INT_DESCR_FCTR: f32 = 512.0;

/// Length of every descriptor produced by the extractor.
pub const DESCRIPTOR_LEN: usize = DESCR_WIDTH * DESCR_WIDTH * DESCR_HIST_BINS;

/// Computes the descriptor of `det` from the Gaussian image it was found in.
pub(crate) fn describe(img: &FloatImage, det: &Detection) -> [f32; DESCRIPTOR_LEN] {
    let d = DESCR_WIDTH;
    let n = DESCR_HIST_BINS;

    let mut ori = 360.0 - det.keypoint.angle;
    if (ori - 360.0).abs() < f32::EPSILON {
        ori = 0.0;
    }
    let px = det.octave_x.round() as isize;
    let py = det.octave_y.round() as isize;
    let (sin_t, cos_t) = sin_cos_deg(ori);
    let bins_per_deg = n as f32 / 360.0;
    let exp_scale = -1.0 / (d as f32 * d as f32 * 0.5);
    let hist_width = DESCR_SCL_FCTR * det.octave_scale;

    let width = img.width() as isize;
    let height = img.height() as isize;
    let diag = ((width * width + height * height) as f32).sqrt();
    let radius = (hist_width * std::f32::consts::SQRT_2 * (d as f32 + 1.0) * 0.5)
        .round()
        .min(diag) as isize;
    let cos_t = cos_t / hist_width;
    let sin_t = sin_t / hist_width;

    let stride_o = n + 2;
    let stride_c = (d + 2) * stride_o;
    let mut hist = vec![0.0f32; (d + 2) * stride_c];
    let half = d as f32 / 2.0 - 0.5;

    for i in -radius..=radius {
        for j in -radius..=radius {
            let c_rot = j as f32 * cos_t - i as f32 * sin_t;
            let r_rot = j as f32 * sin_t + i as f32 * cos_t;
            let rbin = r_rot + half;
            let cbin = c_rot + half;
            let y = py + i;
            let x = px + j;
            if !(rbin > -1.0 && rbin < d as f32 && cbin > -1.0 && cbin < d as f32) {
                continue;
            }
            if y <= 0 || y >= height - 1 || x <= 0 || x >= width - 1 {
                continue;
            }

            let (xu, yu) = (x as usize, y as usize);
            let dx = img.at(xu + 1, yu) - img.at(xu - 1, yu);
            let dy = img.at(xu, yu - 1) - img.at(xu, yu + 1);
            let weight = ((c_rot * c_rot + r_rot * r_rot) * exp_scale).exp();
            let magnitude = (dx * dx + dy * dy).sqrt() * weight;
            let obin = (atan2_deg_360(dy, dx) - ori) * bins_per_deg;

            let r0 = rbin.floor();
            let c0 = cbin.floor();
            let o0 = obin.floor();
            let (fr, fc, fo) = (rbin - r0, cbin - c0, obin - o0);
            let mut o0 = o0 as isize;
            if o0 < 0 {
                o0 += n as isize;
            }
            if o0 >= n as isize {
                o0 -= n as isize;
            }

            let v_r1 = magnitude * fr;
            let v_r0 = magnitude - v_r1;
            let v_rc11 = v_r1 * fc;
            let v_rc10 = v_r1 - v_rc11;
            let v_rc01 = v_r0 * fc;
            let v_rc00 = v_r0 - v_rc01;
            let v_rco111 = v_rc11 * fo;
            let v_rco110 = v_rc11 - v_rco111;
            let v_rco101 = v_rc10 * fo;
            let v_rco100 = v_rc10 - v_rco101;
            let v_rco011 = v_rc01 * fo;
            let v_rco010 = v_rc01 - v_rco011;
            let v_rco001 = v_rc00 * fo;
            let v_rco000 = v_rc00 - v_rco001;

            let idx = ((r0 as isize + 1) as usize * (d + 2) + (c0 as isize + 1) as usize) * stride_o
                + o0 as usize;
            hist[idx] += v_rco000;
            hist[idx + 1] += v_rco001;
            hist[idx + stride_o] += v_rco010;
            hist[idx + stride_o + 1] += v_rco011;
            hist[idx + stride_c] += v_rco100;
            hist[idx + stride_c + 1] += v_rco101;
            hist[idx + stride_c + stride_o] += v_rco110;
            hist[idx + stride_c + stride_o + 1] += v_rco111;
        }
    }

    let mut out = [0.0f32; DESCRIPTOR_LEN];
    for i in 0..d {
        for j in 0..d {
            let idx = ((i + 1) * (d + 2) + (j + 1)) * stride_o;
            hist[idx] += hist[idx + n];
            hist[idx + 1] += hist[idx + n + 1];
            let dst = &mut out[(i * d + j) * n..(i * d + j + 1) * n];
            dst.copy_from_slice(&hist[idx..idx + n]);
        }
    }
    normalize(&mut out);
    out
}

/// Clips large components, renormalizes and quantizes to `0..=255`.
fn normalize(values: &mut [f32]) {
    let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    let thr = norm * DESCR_MAG_THR;
    let mut nrm2 = 0.0f32;
    for v in values.iter_mut() {
        *v = v.min(thr);
        nrm2 += *v * *v;
    }
    let scale = INT_DESCR_FCTR / nrm2.sqrt().max(f32::EPSILON);
    for v in values.iter_mut() {
        *v = (*v * scale).round().clamp(0.0, 255.0);
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize, DESCRIPTOR_LEN};

    #[test]
    fn descriptor_length_is_128() {
        assert_eq!(DESCRIPTOR_LEN, 128);
    }

    #[test]
    fn normalize_clips_dominant_component() {
        let mut v = vec![0.0f32; 16];
        v[0] = 10.0;
        v[1] = 1.0;
        normalize(&mut v);
        // The dominant entry is clipped to 0.2 of the norm before scaling.
        assert!(v[0] <= 255.0);
        assert!(v[1] > 0.0);
        assert!(v[0] > v[1]);
        assert!(v.iter().all(|&x| x == x.round()));
    }

    #[test]
    fn normalize_handles_zero_vector() {
        let mut v = vec![0.0f32; 8];
        normalize(&mut v);
        assert!(v.iter().all(|&x| x == 0.0));
    }
}
