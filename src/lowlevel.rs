//! Low-level building blocks for custom matching pipelines.
//!
//! These expose the individual stages behind [`Matcher`](crate::Matcher):
//! neighbour indexes, the correspondence finder, the ratio test, the scorer
//! and the distance kernels. Most users should prefer the top-level
//! `extract_features`, `match_features` and `Ranker` API.

pub use crate::features::DESCRIPTOR_LEN;
pub use crate::image::rotate::rotate_bilinear;
pub use crate::image::FloatImage;
pub use crate::index::{BruteForce, KdForest, Neighbor, NeighborSearch, SearchIndex};
pub use crate::kernel::scalar::{knn_scan, knn_scan_batch};
pub use crate::kernel::{squared_l2, DistanceKernel};
pub use crate::matching::{find_correspondences, ratio_test, similarity_score, NeighborPair};
