//! Mathematical helpers for scale-space construction and refinement.

/// Wraps an angle in degrees to the range [0, 360).
pub(crate) fn wrap_deg_360(angle_deg: f32) -> f32 {
    let mut wrapped = angle_deg % 360.0;
    if wrapped < 0.0 {
        wrapped += 360.0;
    }
    if wrapped >= 360.0 {
        wrapped -= 360.0;
    }
    wrapped
}

/// Computes sine and cosine for an angle in degrees.
pub(crate) fn sin_cos_deg(angle_deg: f32) -> (f32, f32) {
    angle_deg.to_radians().sin_cos()
}

/// Gradient orientation in degrees, mapped to [0, 360).
pub(crate) fn atan2_deg_360(dy: f32, dx: f32) -> f32 {
    wrap_deg_360(dy.atan2(dx).to_degrees())
}

/// Builds a normalized 1D Gaussian kernel for `sigma`.
///
/// The kernel size is `round(8 * sigma + 1) | 1`, so the support covers four
/// standard deviations on each side.
pub(crate) fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let size = ((sigma * 8.0 + 1.0).round() as usize) | 1;
    let radius = (size / 2) as isize;
    let scale = -0.5 / (sigma * sigma);
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|i| ((i * i) as f32 * scale).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for value in kernel.iter_mut() {
        *value /= sum;
    }
    kernel
}

/// Mirrors an index into `[0, len)` without repeating the edge sample
/// (`gfedcb|abcdefgh|gfedcba`).
pub(crate) fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let period = 2 * last;
    let mut i = index.rem_euclid(period);
    if i > last {
        i = period - i;
    }
    i as usize
}

/// Solves the symmetric 3x3 system `h * x = b`.
///
/// Returns `None` when the system is singular or the solution is not finite.
pub(crate) fn solve_3x3(h: [[f32; 3]; 3], b: [f32; 3]) -> Option<[f32; 3]> {
    let det = h[0][0] * (h[1][1] * h[2][2] - h[1][2] * h[2][1])
        - h[0][1] * (h[1][0] * h[2][2] - h[1][2] * h[2][0])
        + h[0][2] * (h[1][0] * h[2][1] - h[1][1] * h[2][0]);
    if !det.is_finite() || det == 0.0 {
        return None;
    }
    let inv_det = 1.0 / det;

    let inv = [
        [
            (h[1][1] * h[2][2] - h[1][2] * h[2][1]) * inv_det,
            (h[0][2] * h[2][1] - h[0][1] * h[2][2]) * inv_det,
            (h[0][1] * h[1][2] - h[0][2] * h[1][1]) * inv_det,
        ],
        [
            (h[1][2] * h[2][0] - h[1][0] * h[2][2]) * inv_det,
            (h[0][0] * h[2][2] - h[0][2] * h[2][0]) * inv_det,
            (h[0][2] * h[1][0] - h[0][0] * h[1][2]) * inv_det,
        ],
        [
            (h[1][0] * h[2][1] - h[1][1] * h[2][0]) * inv_det,
            (h[0][1] * h[2][0] - h[0][0] * h[2][1]) * inv_det,
            (h[0][0] * h[1][1] - h[0][1] * h[1][0]) * inv_det,
        ],
    ];

    let mut x = [0.0f32; 3];
    for (row, out) in inv.iter().zip(x.iter_mut()) {
        *out = row[0] * b[0] + row[1] * b[1] + row[2] * b[2];
    }
    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}
