//! Scalar reference kernels.

use crate::index::knn::{KnnSet, Neighbor};
use crate::kernel::{squared_l2, DistanceKernel};

/// Scalar squared-L2 kernel.
pub struct L2Scalar;

impl DistanceKernel for L2Scalar {
    #[inline]
    fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| {
                let d = x - y;
                d * d
            })
            .sum()
    }
}

/// Exact `k` nearest rows of `train` (row-major, `dim` columns) to `query`.
pub fn knn_scan(query: &[f32], train: &[f32], dim: usize, k: usize) -> Vec<Neighbor> {
    let mut best = KnnSet::new(k);
    if dim == 0 {
        return Vec::new();
    }
    for (idx, row) in train.chunks_exact(dim).enumerate() {
        let d = squared_l2(query, row);
        if d < best.worst_dist_sq() || !best.is_full() {
            best.push(idx, d);
        }
    }
    best.into_sorted()
}

/// Exact `k` nearest neighbours for every row of `queries`.
pub fn knn_scan_batch(queries: &[f32], train: &[f32], dim: usize, k: usize) -> Vec<Vec<Neighbor>> {
    if dim == 0 {
        return Vec::new();
    }
    queries
        .chunks_exact(dim)
        .map(|q| knn_scan(q, train, dim, k))
        .collect()
}
