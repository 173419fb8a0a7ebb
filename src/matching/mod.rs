//! Pairwise comparison of keypoint sets.
//!
//! A comparison finds the two nearest target descriptors for every source
//! descriptor, keeps the decisive ones with the ratio test and reports the
//! share of retained correspondences as a percentage of the larger set.

pub mod correspond;
pub mod ratio;
pub mod score;

use crate::features::KeypointSet;
use crate::index::{IndexConfig, IndexedKeypointSet};
use crate::trace::{trace_event, trace_warn};
use crate::util::{PrintMatchError, PrintMatchResult};

pub use correspond::{find_correspondences, Correspondence, NeighborPair};
pub use ratio::{ratio_test, SingleNeighborPolicy};
pub use score::similarity_score;

/// How the two comparison directions are combined into one score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Symmetry {
    /// Source-to-target only; swapping the arguments may change the score.
    #[default]
    Directional,
    /// Mean of both directions.
    Average,
    /// Larger of both directions.
    Max,
}

/// Matching parameters.
#[derive(Clone, Debug)]
pub struct MatchConfig {
    /// Ratio-test threshold in `(0, 1]`.
    pub ratio: f32,
    /// Approximate index parameters.
    pub index: IndexConfig,
    pub single_neighbor: SingleNeighborPolicy,
    pub symmetry: Symmetry,
    /// Use an exact linear scan instead of the k-d forest.
    pub exact: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            ratio: 0.7,
            index: IndexConfig::default(),
            single_neighbor: SingleNeighborPolicy::Reject,
            symmetry: Symmetry::Directional,
            exact: false,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> PrintMatchResult<()> {
        if !self.ratio.is_finite() || self.ratio <= 0.0 || self.ratio > 1.0 {
            return Err(PrintMatchError::InvalidConfig {
                field: "ratio",
                reason: "must be in (0, 1]",
            });
        }
        if let SingleNeighborPolicy::AcceptBelow(max) = self.single_neighbor {
            if !max.is_finite() || max < 0.0 {
                return Err(PrintMatchError::InvalidConfig {
                    field: "single_neighbor",
                    reason: "distance cutoff must be finite and >= 0",
                });
            }
        }
        self.index.validate()
    }
}

/// Outcome of comparing two keypoint sets.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchResult {
    /// Similarity percentage in `[0, 100]`.
    pub score: f64,
    /// Correspondences kept by the ratio test (source-to-target direction).
    pub correspondences: Vec<Correspondence>,
    /// Number of source descriptors that had at least one neighbour.
    pub raw_count: usize,
    pub keypoints_a: usize,
    pub keypoints_b: usize,
}

impl MatchResult {
    /// True when either image produced no keypoints.
    pub fn is_degenerate(&self) -> bool {
        self.keypoints_a == 0 || self.keypoints_b == 0
    }

    /// Number of retained correspondences.
    pub fn good_count(&self) -> usize {
        self.correspondences.len()
    }
}

/// Compares keypoint sets with a validated configuration.
#[derive(Clone, Debug)]
pub struct Matcher {
    cfg: MatchConfig,
}

impl Matcher {
    /// Validates `cfg` and creates a matcher.
    pub fn new(cfg: MatchConfig) -> PrintMatchResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Builds the index this matcher searches (forest or exact scan).
    pub fn index(&self, set: KeypointSet) -> PrintMatchResult<IndexedKeypointSet> {
        if self.cfg.exact {
            IndexedKeypointSet::exact(set)
        } else {
            IndexedKeypointSet::new(set, &self.cfg.index)
        }
    }

    /// Compares `a` against `b`, building a fresh index over `b`.
    pub fn match_sets(&self, a: &KeypointSet, b: &KeypointSet) -> PrintMatchResult<MatchResult> {
        let indexed = self.index(b.clone())?;
        self.match_indexed(a, &indexed)
    }

    /// Compares `a` against an already indexed `b`.
    pub fn match_indexed(
        &self,
        a: &KeypointSet,
        b: &IndexedKeypointSet,
    ) -> PrintMatchResult<MatchResult> {
        let (forward, raw_count) = self.good_matches(a, b)?;
        let (len_a, len_b) = (a.len(), b.set().len());
        if len_a == 0 || len_b == 0 {
            trace_warn!("degenerate_input", keypoints_a = len_a, keypoints_b = len_b);
        }

        let forward_score = similarity_score(forward.len(), len_a, len_b);
        let score = match self.cfg.symmetry {
            Symmetry::Directional => forward_score,
            Symmetry::Average | Symmetry::Max => {
                let reverse_index = self.index(a.clone())?;
                let (reverse, _) = self.good_matches(b.set(), &reverse_index)?;
                let reverse_score = similarity_score(reverse.len(), len_b, len_a);
                if self.cfg.symmetry == Symmetry::Average {
                    0.5 * (forward_score + reverse_score)
                } else {
                    forward_score.max(reverse_score)
                }
            }
        };

        Ok(MatchResult {
            score,
            correspondences: forward,
            raw_count,
            keypoints_a: len_a,
            keypoints_b: len_b,
        })
    }

    fn good_matches(
        &self,
        query: &KeypointSet,
        train: &IndexedKeypointSet,
    ) -> PrintMatchResult<(Vec<Correspondence>, usize)> {
        let pairs = find_correspondences(query, train)?;
        let good = ratio_test(&pairs, self.cfg.ratio, self.cfg.single_neighbor);
        trace_event!("correspondences", raw = pairs.len(), good = good.len());
        Ok((good, pairs.len()))
    }
}

/// Compares two keypoint sets and returns the similarity result.
pub fn match_features(
    a: &KeypointSet,
    b: &KeypointSet,
    cfg: &MatchConfig,
) -> PrintMatchResult<MatchResult> {
    Matcher::new(cfg.clone())?.match_sets(a, b)
}

#[cfg(test)]
mod tests {
    use super::{match_features, MatchConfig, Symmetry};
    use crate::features::{Keypoint, KeypointSet};
    use crate::util::PrintMatchError;

    fn set(rows: &[[f32; 2]]) -> KeypointSet {
        let kp = Keypoint {
            x: 0.0,
            y: 0.0,
            size: 1.0,
            angle: 0.0,
            response: 1.0,
            octave: 0,
        };
        let descriptors = rows.iter().flatten().copied().collect();
        KeypointSet::new(vec![kp; rows.len()], descriptors, 2).unwrap()
    }

    #[test]
    fn empty_side_scores_zero_and_is_degenerate() {
        let a = set(&[[1.0, 2.0], [3.0, 4.0]]);
        let b = KeypointSet::empty(2);
        let result = match_features(&a, &b, &MatchConfig::default()).unwrap();
        assert_eq!(result.score, 0.0);
        assert!(result.is_degenerate());
        let result = match_features(&b, &b, &MatchConfig::default()).unwrap();
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn identical_well_separated_sets_score_full() {
        let rows = [[0.0, 0.0], [100.0, 0.0], [0.0, 100.0], [100.0, 100.0]];
        let a = set(&rows);
        let result = match_features(&a, &a, &MatchConfig::default()).unwrap();
        assert_eq!(result.good_count(), 4);
        assert_eq!(result.score, 100.0);
    }

    #[test]
    fn invalid_ratio_is_a_configuration_error() {
        let cfg = MatchConfig {
            ratio: 1.5,
            ..MatchConfig::default()
        };
        let a = set(&[[0.0, 0.0]]);
        let err = match_features(&a, &a, &cfg).unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, PrintMatchError::InvalidConfig { field: "ratio", .. }));
    }

    #[test]
    fn symmetric_modes_bound_directional() {
        let a = set(&[[0.0, 0.0], [50.0, 0.0], [0.0, 50.0]]);
        let b = set(&[[0.0, 1.0], [50.0, 1.0], [0.0, 51.0], [200.0, 200.0], [25.0, 25.0]]);
        let score = |symmetry| {
            let cfg = MatchConfig {
                symmetry,
                exact: true,
                ..MatchConfig::default()
            };
            match_features(&a, &b, &cfg).unwrap().score
        };
        let forward = score(Symmetry::Directional);
        let avg = score(Symmetry::Average);
        let max = score(Symmetry::Max);
        assert!(max >= forward);
        assert!(max >= avg);
        assert!((0.0..=100.0).contains(&avg));
    }
}
