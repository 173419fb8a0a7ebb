//! PrintMatch compares fingerprint images by their local invariant features.
//!
//! Each image is reduced to a set of scale- and rotation-invariant keypoints
//! with 128-dimensional descriptors. Two sets are compared by looking up the
//! two nearest descriptors of every probe feature in a randomized k-d forest,
//! keeping only decisive matches (Lowe's ratio test) and reporting their share
//! of the larger set as a similarity percentage. The [`Ranker`] repeats this
//! against a candidate collection and returns the candidates above a
//! threshold, best first.
//!
//! ```no_run
//! use printmatch::{MemoryLoader, RankConfig, Ranker};
//!
//! # fn run(loader: &MemoryLoader) -> printmatch::PrintMatchResult<()> {
//! let ranker = Ranker::new(RankConfig::default())?;
//! let candidates = printmatch::sequential_ids("Suspect", 21);
//! let report = ranker.rank_against_collection("Attacker1", &candidates, loader)?;
//! for (id, score) in report.ranked() {
//!     println!("{id}: {score:.2}%");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Optional features: `rayon` (parallel candidates and queries), `simd`
//! (`f32x8` distance kernel), `image-io` (file loading), `tracing`
//! (structured events).

pub mod features;
pub mod image;
pub mod index;
pub mod kernel;
pub mod lowlevel;
pub mod matching;
pub mod rank;
mod refine;
mod trace;
pub mod util;

pub use features::{extract_features, ExtractorConfig, Keypoint, KeypointSet, SiftExtractor};
pub use image::{ImageView, OwnedImage};
pub use index::{IndexConfig, IndexedKeypointSet};
pub use matching::{
    match_features, Correspondence, MatchConfig, MatchResult, Matcher, SingleNeighborPolicy,
    Symmetry,
};
#[cfg(feature = "image-io")]
pub use rank::DirectoryLoader;
pub use rank::{
    sequential_ids, Gallery, ImageLoader, MatchSink, MatchView, MemoryLoader, RankConfig,
    RankReport, RankedResult, Ranker, SkippedCandidate, StopFlag,
};
pub use util::{PrintMatchError, PrintMatchResult};
