//! SIMD-accelerated distance kernel using the `wide` crate.
//!
//! The component loop is vectorized to process 8 values at a time using
//! `f32x8`; a scalar tail handles lengths that are not a multiple of 8.

use crate::kernel::DistanceKernel;
use wide::f32x8;

const LANES: usize = 8;

/// Load 8 f32 values into f32x8.
#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

/// Horizontal sum of f32x8.
#[inline]
fn hsum(v: f32x8) -> f32 {
    let arr = v.to_array();
    arr[0] + arr[1] + arr[2] + arr[3] + arr[4] + arr[5] + arr[6] + arr[7]
}

/// SIMD squared-L2 kernel.
pub struct L2Simd;

impl DistanceKernel for L2Simd {
    #[inline]
    fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        let len = a.len().min(b.len());
        let simd_end = len / LANES * LANES;

        let mut acc = f32x8::ZERO;
        let mut i = 0;
        while i < simd_end {
            let d = load_f32x8(&a[i..i + LANES]) - load_f32x8(&b[i..i + LANES]);
            acc = acc + d * d;
            i += LANES;
        }

        let mut tail = 0.0f32;
        for j in simd_end..len {
            let d = a[j] - b[j];
            tail += d * d;
        }
        hsum(acc) + tail
    }
}

#[cfg(test)]
mod tests {
    use super::L2Simd;
    use crate::kernel::scalar::L2Scalar;
    use crate::kernel::DistanceKernel;

    #[test]
    fn simd_matches_scalar_on_integer_vectors() {
        let a: Vec<f32> = (0..131).map(|i| ((i * 37) % 256) as f32).collect();
        let b: Vec<f32> = (0..131).map(|i| ((i * 91 + 7) % 256) as f32).collect();
        assert_eq!(L2Simd::squared_l2(&a, &b), L2Scalar::squared_l2(&a, &b));
    }
}
