//! Two-nearest-neighbour correspondences between descriptor sets.

use crate::features::KeypointSet;
use crate::index::{IndexedKeypointSet, Neighbor, NeighborSearch};
#[cfg(feature = "rayon")]
use crate::kernel::rayon::knn_batch_par;
use crate::trace::trace_span;
use crate::util::{PrintMatchError, PrintMatchResult};

/// A retained match between keypoint `query_idx` of the source set and
/// keypoint `train_idx` of the target set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Correspondence {
    pub query_idx: usize,
    pub train_idx: usize,
    /// Euclidean descriptor distance.
    pub distance: f32,
}

/// Nearest and second-nearest target descriptors for one source descriptor.
///
/// `second` is `None` only when the target set holds a single descriptor.
/// When present, `first.distance <= second.distance`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NeighborPair {
    pub query_idx: usize,
    pub first: Neighbor,
    pub second: Option<Neighbor>,
}

impl NeighborPair {
    /// The correspondence to the nearest neighbour.
    pub fn nearest(&self) -> Correspondence {
        Correspondence {
            query_idx: self.query_idx,
            train_idx: self.first.index,
            distance: self.first.distance,
        }
    }
}

/// Finds the two nearest target descriptors for every descriptor of `query`.
///
/// Returns an empty list when either set is empty. Fails with
/// [`PrintMatchError::DescriptorMismatch`] when the descriptor lengths differ.
pub fn find_correspondences(
    query: &KeypointSet,
    train: &IndexedKeypointSet,
) -> PrintMatchResult<Vec<NeighborPair>> {
    let index = train.index();
    if query.dim() != index.dim() {
        return Err(PrintMatchError::DescriptorMismatch {
            left: query.dim(),
            right: index.dim(),
        });
    }
    if query.is_empty() || index.is_empty() {
        return Ok(Vec::new());
    }

    let _span = trace_span!("find_correspondences", query = query.len(), train = index.len()).entered();

    #[cfg(feature = "rayon")]
    let neighbors = knn_batch_par(index, query.descriptors(), query.dim(), 2);
    #[cfg(not(feature = "rayon"))]
    let neighbors: Vec<Vec<Neighbor>> = query
        .descriptors()
        .chunks_exact(query.dim())
        .map(|q| index.knn(q, 2))
        .collect();

    let pairs = neighbors
        .into_iter()
        .enumerate()
        .filter_map(|(query_idx, found)| {
            let mut it = found.into_iter();
            let first = it.next()?;
            Some(NeighborPair {
                query_idx,
                first,
                second: it.next(),
            })
        })
        .collect();
    Ok(pairs)
}
