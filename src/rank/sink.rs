//! Optional consumer of per-candidate match details.

use crate::features::KeypointSet;
use crate::image::ImageView;
use crate::matching::Correspondence;
use crate::util::PrintMatchResult;

/// Everything a sink needs to render one comparison.
#[derive(Clone, Copy)]
pub struct MatchView<'a> {
    pub probe_id: &'a str,
    pub candidate_id: &'a str,
    pub probe_image: ImageView<'a, u8>,
    pub candidate_image: ImageView<'a, u8>,
    pub probe: &'a KeypointSet,
    pub candidate: &'a KeypointSet,
    /// Retained correspondences, probe to candidate.
    pub correspondences: &'a [Correspondence],
    pub score: f64,
}

/// Receives comparisons when visualization is enabled.
///
/// Sink failures are logged by the ranker and never change scores or results.
pub trait MatchSink: Send + Sync {
    fn render(&self, view: &MatchView<'_>) -> PrintMatchResult<()>;
}
