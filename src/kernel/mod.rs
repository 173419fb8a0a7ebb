//! Descriptor distance kernels.
//!
//! Descriptors are compared by squared Euclidean distance. The scalar kernel
//! is the reference; the `simd` feature swaps in an `f32x8` implementation.
//! Descriptor components are integers in `0..=255`, so the sums are exact in
//! `f32` and both kernels agree bit for bit on extractor output.

/// Distance kernel over equal-length `f32` vectors.
pub trait DistanceKernel {
    /// Squared Euclidean distance. Both slices must have the same length.
    fn squared_l2(a: &[f32], b: &[f32]) -> f32;
}

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

#[cfg(feature = "rayon")]
pub mod rayon;

#[cfg(not(feature = "simd"))]
pub(crate) use scalar::L2Scalar as ActiveL2;
#[cfg(feature = "simd")]
pub(crate) use simd::L2Simd as ActiveL2;

/// Squared Euclidean distance using the fastest enabled kernel.
#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    <ActiveL2 as DistanceKernel>::squared_l2(a, b)
}
