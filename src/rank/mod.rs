//! Ranking one probe against a collection of candidates.
//!
//! Every candidate is loaded, described and compared with the probe. Load
//! failures skip the candidate and keep the reason; configuration errors end
//! the run. Candidates scoring at or above the threshold are returned in
//! descending score order, ties in candidate order. A run can be stopped
//! between candidates through a [`StopFlag`], and with the `rayon` feature
//! candidates can be compared in parallel without changing the result.

pub mod gallery;
pub mod loader;
pub mod sink;

use crate::features::{ExtractorConfig, KeypointSet, SiftExtractor};
use crate::image::ImageView;
use crate::index::IndexedKeypointSet;
use crate::matching::{MatchConfig, Matcher};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{PrintMatchError, PrintMatchResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use gallery::{Gallery, GalleryEntry};
#[cfg(feature = "image-io")]
pub use loader::DirectoryLoader;
pub use loader::{sequential_ids, ImageLoader, MemoryLoader, DEFAULT_EXTENSIONS};
pub use sink::{MatchSink, MatchView};

/// Label used for probes given as decoded images.
const ANONYMOUS_PROBE: &str = "probe";

/// Ranking parameters.
#[derive(Clone, Debug)]
pub struct RankConfig {
    /// Minimum score, in percent, for a candidate to be accepted.
    pub similarity_threshold: f64,
    /// Compare candidates in parallel (requires the `rayon` feature).
    pub parallel: bool,
    /// Pass every comparison to the attached [`MatchSink`].
    pub visualize: bool,
    pub extractor: ExtractorConfig,
    pub matching: MatchConfig,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 30.0,
            parallel: false,
            visualize: false,
            extractor: ExtractorConfig::default(),
            matching: MatchConfig::default(),
        }
    }
}

impl RankConfig {
    pub fn validate(&self) -> PrintMatchResult<()> {
        let t = self.similarity_threshold;
        if !t.is_finite() || !(0.0..=100.0).contains(&t) {
            return Err(PrintMatchError::InvalidConfig {
                field: "similarity_threshold",
                reason: "must be in [0, 100]",
            });
        }
        self.extractor.validate()?;
        self.matching.validate()
    }
}

/// Cooperative cancellation checked between candidates.
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that the run stop before the next candidate.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Score of one compared candidate.
#[derive(Clone, Debug, PartialEq)]
pub struct RankedResult {
    pub id: String,
    pub score: f64,
    /// Correspondences kept by the ratio test.
    pub good_matches: usize,
    pub candidate_keypoints: usize,
}

/// A candidate that could not be compared.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedCandidate {
    pub id: String,
    pub error: PrintMatchError,
}

/// Outcome of a ranking run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RankReport {
    /// Candidates at or above the threshold, by descending score.
    pub accepted: Vec<RankedResult>,
    /// Compared candidates below the threshold, by descending score.
    pub rejected: Vec<RankedResult>,
    /// Candidates that failed to load, in candidate order.
    pub skipped: Vec<SkippedCandidate>,
    /// Why the probe could not be loaded; no candidate is compared then.
    pub probe_error: Option<PrintMatchError>,
    /// True when a stop request ended the run early.
    pub stopped: bool,
    pub probe_keypoints: usize,
}

impl RankReport {
    fn probe_failed(error: PrintMatchError) -> Self {
        Self {
            probe_error: Some(error),
            ..Self::default()
        }
    }

    /// Accepted `(id, score)` pairs in rank order.
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        self.accepted
            .iter()
            .map(|r| (r.id.as_str(), r.score))
            .collect()
    }

    /// Number of candidates that were compared.
    pub fn compared(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }
}

enum Outcome {
    Scored(RankedResult),
    Skipped(SkippedCandidate),
}

struct Probe<'a> {
    id: &'a str,
    image: ImageView<'a, u8>,
    features: KeypointSet,
}

/// Ranks probes against candidate collections.
#[derive(Clone)]
pub struct Ranker {
    cfg: RankConfig,
    extractor: SiftExtractor,
    matcher: Matcher,
    stop: Option<StopFlag>,
    sink: Option<Arc<dyn MatchSink>>,
}

impl Ranker {
    /// Validates `cfg` and creates a ranker.
    pub fn new(cfg: RankConfig) -> PrintMatchResult<Self> {
        cfg.validate()?;
        let extractor = SiftExtractor::new(cfg.extractor.clone())?;
        let matcher = Matcher::new(cfg.matching.clone())?;
        Ok(Self {
            cfg,
            extractor,
            matcher,
            stop: None,
            sink: None,
        })
    }

    /// Checks `stop` before every candidate.
    pub fn with_stop(mut self, stop: StopFlag) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Attaches a visualization sink, used when `visualize` is set.
    pub fn with_sink(mut self, sink: Arc<dyn MatchSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &RankConfig {
        &self.cfg
    }

    pub fn extractor(&self) -> &SiftExtractor {
        &self.extractor
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Loads the probe through `loader` and ranks it against `candidates`.
    ///
    /// If the probe cannot be loaded the report carries `probe_error` and no
    /// candidate is attempted.
    pub fn rank_against_collection<S, L>(
        &self,
        probe_id: &str,
        candidates: &[S],
        loader: &L,
    ) -> PrintMatchResult<RankReport>
    where
        S: AsRef<str> + Sync,
        L: ImageLoader + ?Sized,
    {
        let probe_image = match loader.load(probe_id) {
            Ok(image) => image,
            Err(error) => {
                trace_warn!(
                    "probe_unavailable",
                    id = probe_id,
                    reason = error.to_string().as_str()
                );
                return Ok(RankReport::probe_failed(error));
            }
        };
        self.rank_labeled(probe_id, probe_image.view(), candidates, loader)
    }

    /// Ranks an already decoded probe against `candidates`.
    pub fn rank_image<S, L>(
        &self,
        probe: ImageView<'_, u8>,
        candidates: &[S],
        loader: &L,
    ) -> PrintMatchResult<RankReport>
    where
        S: AsRef<str> + Sync,
        L: ImageLoader + ?Sized,
    {
        self.rank_labeled(ANONYMOUS_PROBE, probe, candidates, loader)
    }

    /// Loads, extracts and indexes `candidates` once for repeated ranking.
    pub fn gallery<S, L>(&self, candidates: &[S], loader: &L) -> PrintMatchResult<Gallery>
    where
        S: AsRef<str> + Sync,
        L: ImageLoader + ?Sized,
    {
        Gallery::build(candidates, loader, &self.extractor, &self.matcher, self.cfg.parallel)
    }

    /// Ranks a decoded probe against a prepared gallery.
    ///
    /// Candidates the gallery could not load are reported as skipped.
    pub fn rank_gallery(
        &self,
        probe: ImageView<'_, u8>,
        gallery: &Gallery,
    ) -> PrintMatchResult<RankReport> {
        let probe = self.prepare_probe(ANONYMOUS_PROBE, probe);
        let mut report = self.run(gallery.entries(), |entry| {
            let result = self.compare(&probe, &entry.id, entry.image.view(), &entry.indexed)?;
            Ok(Outcome::Scored(result))
        })?;
        report.skipped = gallery.skipped().to_vec();
        report.probe_keypoints = probe.features.len();
        Ok(report)
    }

    fn rank_labeled<S, L>(
        &self,
        probe_id: &str,
        probe: ImageView<'_, u8>,
        candidates: &[S],
        loader: &L,
    ) -> PrintMatchResult<RankReport>
    where
        S: AsRef<str> + Sync,
        L: ImageLoader + ?Sized,
    {
        let probe = self.prepare_probe(probe_id, probe);
        let mut report = self.run(candidates, |id| {
            let id = id.as_ref();
            let image = match loader.load(id) {
                Ok(image) => image,
                Err(error) => {
                    trace_warn!(
                        "candidate_skipped",
                        id = id,
                        reason = error.to_string().as_str()
                    );
                    return Ok(Outcome::Skipped(SkippedCandidate {
                        id: id.to_string(),
                        error,
                    }));
                }
            };
            let features = self.extractor.extract(image.view());
            let indexed = self.matcher.index(features)?;
            let result = self.compare(&probe, id, image.view(), &indexed)?;
            Ok(Outcome::Scored(result))
        })?;
        report.probe_keypoints = probe.features.len();
        Ok(report)
    }

    fn prepare_probe<'a>(&self, id: &'a str, image: ImageView<'a, u8>) -> Probe<'a> {
        let features = self.extractor.extract(image);
        Probe {
            id,
            image,
            features,
        }
    }

    fn compare(
        &self,
        probe: &Probe<'_>,
        id: &str,
        image: ImageView<'_, u8>,
        candidate: &IndexedKeypointSet,
    ) -> PrintMatchResult<RankedResult> {
        let result = self.matcher.match_indexed(&probe.features, candidate)?;
        trace_event!("candidate_scored", id = id, score = result.score);

        if self.cfg.visualize && !result.is_degenerate() {
            if let Some(sink) = &self.sink {
                let view = MatchView {
                    probe_id: probe.id,
                    candidate_id: id,
                    probe_image: probe.image,
                    candidate_image: image,
                    probe: &probe.features,
                    candidate: candidate.set(),
                    correspondences: &result.correspondences,
                    score: result.score,
                };
                if let Err(err) = sink.render(&view) {
                    trace_warn!("sink_failed", id = id, reason = err.to_string().as_str());
                }
            }
        }

        Ok(RankedResult {
            id: id.to_string(),
            score: result.score,
            good_matches: result.good_count(),
            candidate_keypoints: result.keypoints_b,
        })
    }

    fn is_stopped(&self) -> bool {
        self.stop.as_ref().is_some_and(StopFlag::is_stopped)
    }

    /// Evaluates `items` in order (or in parallel) and merges the outcomes.
    fn run<T, F>(&self, items: &[T], evaluate: F) -> PrintMatchResult<RankReport>
    where
        T: Sync,
        F: Fn(&T) -> PrintMatchResult<Outcome> + Sync,
    {
        let _span = trace_span!(
            "rank",
            candidates = items.len(),
            parallel = self.cfg.parallel
        )
        .entered();

        let guarded = |item: &T| -> Option<PrintMatchResult<Outcome>> {
            if self.is_stopped() {
                None
            } else {
                Some(evaluate(item))
            }
        };

        #[cfg(feature = "rayon")]
        let outcomes: Vec<_> = if self.cfg.parallel {
            items.par_iter().map(guarded).collect()
        } else {
            evaluate_in_order(items, guarded)
        };
        #[cfg(not(feature = "rayon"))]
        let outcomes = evaluate_in_order(items, guarded);

        let mut report = RankReport {
            stopped: outcomes.len() < items.len() || outcomes.iter().any(Option::is_none),
            ..RankReport::default()
        };
        for outcome in outcomes.into_iter().flatten() {
            match outcome? {
                Outcome::Scored(result) => {
                    if result.score >= self.cfg.similarity_threshold {
                        report.accepted.push(result);
                    } else {
                        report.rejected.push(result);
                    }
                }
                Outcome::Skipped(skipped) => report.skipped.push(skipped),
            }
        }
        report
            .accepted
            .sort_by(|a, b| b.score.total_cmp(&a.score));
        report
            .rejected
            .sort_by(|a, b| b.score.total_cmp(&a.score));

        trace_event!(
            "rank_done",
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            skipped = report.skipped.len()
        );
        Ok(report)
    }
}

/// Sequential evaluation that ends at the first stop request.
fn evaluate_in_order<T, G>(items: &[T], guarded: G) -> Vec<Option<PrintMatchResult<Outcome>>>
where
    G: Fn(&T) -> Option<PrintMatchResult<Outcome>>,
{
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match guarded(item) {
            Some(outcome) => out.push(Some(outcome)),
            None => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{RankConfig, RankReport, Ranker, StopFlag};
    use crate::image::OwnedImage;
    use crate::rank::loader::MemoryLoader;
    use crate::util::PrintMatchError;

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let cfg = RankConfig {
            similarity_threshold: 120.0,
            ..RankConfig::default()
        };
        assert!(matches!(
            Ranker::new(cfg),
            Err(PrintMatchError::InvalidConfig {
                field: "similarity_threshold",
                ..
            })
        ));
    }

    #[test]
    fn missing_probe_yields_empty_report() {
        let ranker = Ranker::new(RankConfig::default()).unwrap();
        let loader = MemoryLoader::new();
        let report = ranker
            .rank_against_collection("Attacker1", &["Suspect1"], &loader)
            .unwrap();
        assert!(report.accepted.is_empty());
        assert!(report.skipped.is_empty());
        assert_eq!(report.compared(), 0);
        assert!(report.probe_error.as_ref().is_some_and(|e| e.is_load_failure()));
    }

    #[test]
    fn stop_before_start_compares_nothing() {
        let stop = StopFlag::new();
        stop.stop();
        let ranker = Ranker::new(RankConfig::default()).unwrap().with_stop(stop);
        let mut loader = MemoryLoader::new();
        let img = OwnedImage::new(vec![0; 32 * 32], 32, 32).unwrap();
        loader.insert("p", img.clone());
        loader.insert("c", img);
        let report = ranker.rank_against_collection("p", &["c"], &loader).unwrap();
        assert!(report.stopped);
        assert_eq!(report, RankReport {
            stopped: true,
            ..RankReport::default()
        });
    }
}
