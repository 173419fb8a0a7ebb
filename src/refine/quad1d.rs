//! Quadratic 1D fitting for histogram peak interpolation.

/// Offset of the vertex of the parabola through `(-1, left)`, `(0, center)`,
/// `(1, right)` relative to the center sample.
///
/// Callers pass a strict local maximum (`center > left` and
/// `center > right`), which keeps the curvature negative and the offset in
/// `(-0.5, 0.5)`. A flat triple yields `0.0`.
pub(crate) fn parabolic_offset(left: f32, center: f32, right: f32) -> f32 {
    let curvature = left - 2.0 * center + right;
    if curvature == 0.0 || !curvature.is_finite() {
        return 0.0;
    }
    0.5 * (left - right) / curvature
}
