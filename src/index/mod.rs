//! Nearest-neighbour indexes over descriptor sets.
//!
//! [`KdForest`] is the approximate index used by default; [`BruteForce`]
//! answers the same queries exactly. [`IndexedKeypointSet`] pairs a keypoint
//! set with the index built over its descriptors so the index can be reused
//! across many queries.

pub mod kdforest;
pub mod knn;

use crate::features::KeypointSet;
use crate::kernel::scalar::knn_scan;
use crate::util::{PrintMatchError, PrintMatchResult};

pub use kdforest::KdForest;
pub use knn::Neighbor;

/// Seed used for split selection unless overridden.
pub const DEFAULT_SEED: u64 = 0x5eed_f1a9;

/// Approximate index parameters.
#[derive(Clone, Debug)]
pub struct IndexConfig {
    /// Number of randomized trees.
    pub trees: usize,
    /// Stored vectors compared per query before the search stops.
    pub checks: usize,
    /// Maximum number of vectors in a leaf.
    pub leaf_size: usize,
    /// Seed for split-dimension selection.
    pub seed: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            trees: 5,
            checks: 50,
            leaf_size: 1,
            seed: DEFAULT_SEED,
        }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> PrintMatchResult<()> {
        if self.trees == 0 {
            return Err(PrintMatchError::InvalidConfig {
                field: "trees",
                reason: "must be > 0",
            });
        }
        if self.checks == 0 {
            return Err(PrintMatchError::InvalidConfig {
                field: "checks",
                reason: "must be > 0",
            });
        }
        if self.leaf_size == 0 {
            return Err(PrintMatchError::InvalidConfig {
                field: "leaf_size",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

/// k-nearest-neighbour queries against a fixed set of stored vectors.
pub trait NeighborSearch {
    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of every stored vector.
    fn dim(&self) -> usize;

    /// Up to `k` stored vectors ordered by ascending distance to `query`.
    fn knn(&self, query: &[f32], k: usize) -> Vec<Neighbor>;
}

/// Exact linear-scan search.
#[derive(Clone, Debug)]
pub struct BruteForce {
    data: Vec<f32>,
    dim: usize,
}

impl BruteForce {
    pub fn new(data: Vec<f32>, dim: usize) -> PrintMatchResult<Self> {
        if dim == 0 {
            return Err(PrintMatchError::InvalidConfig {
                field: "dim",
                reason: "descriptor dimensionality must be > 0",
            });
        }
        if data.len() % dim != 0 {
            return Err(PrintMatchError::BufferTooSmall {
                needed: (data.len() / dim + 1) * dim,
                got: data.len(),
            });
        }
        Ok(Self { data, dim })
    }

    /// Row-major stored vectors.
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

impl NeighborSearch for BruteForce {
    fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn knn(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        knn_scan(query, &self.data, self.dim, k)
    }
}

/// Index selected for a descriptor set.
#[derive(Clone, Debug)]
pub enum SearchIndex {
    Forest(KdForest),
    Exact(BruteForce),
}

impl NeighborSearch for SearchIndex {
    fn len(&self) -> usize {
        match self {
            SearchIndex::Forest(f) => f.len(),
            SearchIndex::Exact(b) => b.len(),
        }
    }

    fn dim(&self) -> usize {
        match self {
            SearchIndex::Forest(f) => f.dim(),
            SearchIndex::Exact(b) => b.dim(),
        }
    }

    fn knn(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        match self {
            SearchIndex::Forest(f) => f.knn(query, k),
            SearchIndex::Exact(b) => b.knn(query, k),
        }
    }
}

/// A keypoint set together with the index built over its descriptors.
///
/// The index is owned by, and dropped with, the set it was built from.
#[derive(Clone, Debug)]
pub struct IndexedKeypointSet {
    set: KeypointSet,
    index: SearchIndex,
}

impl IndexedKeypointSet {
    /// Builds a randomized k-d forest over `set`.
    pub fn new(set: KeypointSet, cfg: &IndexConfig) -> PrintMatchResult<Self> {
        let index = KdForest::build(set.descriptors().to_vec(), set.dim(), cfg)?;
        Ok(Self {
            set,
            index: SearchIndex::Forest(index),
        })
    }

    /// Uses an exact linear scan instead of a forest.
    pub fn exact(set: KeypointSet) -> PrintMatchResult<Self> {
        let index = BruteForce::new(set.descriptors().to_vec(), set.dim())?;
        Ok(Self {
            set,
            index: SearchIndex::Exact(index),
        })
    }

    pub fn set(&self) -> &KeypointSet {
        &self.set
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    /// Releases the index and returns the keypoint set.
    pub fn into_set(self) -> KeypointSet {
        self.set
    }
}
