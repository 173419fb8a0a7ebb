//! Rayon-parallel batch queries (feature-gated).
//!
//! Queries are independent, so batches are split across threads and the
//! results collected back in query order.

use crate::index::knn::Neighbor;
use crate::index::NeighborSearch;
use crate::kernel::scalar::knn_scan;
use rayon::prelude::*;

/// Exact `k` nearest neighbours for every row of `queries`, in parallel.
pub fn knn_scan_batch_par(
    queries: &[f32],
    train: &[f32],
    dim: usize,
    k: usize,
) -> Vec<Vec<Neighbor>> {
    if dim == 0 {
        return Vec::new();
    }
    queries
        .par_chunks_exact(dim)
        .map(|q| knn_scan(q, train, dim, k))
        .collect()
}

/// Runs `index.knn` for every row of `queries`, in parallel.
pub fn knn_batch_par<S>(index: &S, queries: &[f32], dim: usize, k: usize) -> Vec<Vec<Neighbor>>
where
    S: NeighborSearch + Sync + ?Sized,
{
    if dim == 0 {
        return Vec::new();
    }
    queries
        .par_chunks_exact(dim)
        .map(|q| index.knn(q, k))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::knn_scan_batch_par;
    use crate::kernel::scalar::knn_scan_batch;

    #[test]
    fn parallel_scan_matches_sequential() {
        let train: Vec<f32> = (0..64).map(|i| ((i * 13) % 17) as f32).collect();
        let queries: Vec<f32> = (0..32).map(|i| ((i * 5) % 11) as f32).collect();
        assert_eq!(
            knn_scan_batch_par(&queries, &train, 4, 2),
            knn_scan_batch(&queries, &train, 4, 2)
        );
    }
}
