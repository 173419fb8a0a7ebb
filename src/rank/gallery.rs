//! Pre-extracted, pre-indexed candidate collections.
//!
//! Ranking several probes against the same collection repeats the candidate
//! extraction and index build for every probe. A [`Gallery`] does that work
//! once and keeps each candidate's index alongside its keypoints.

use crate::features::SiftExtractor;
use crate::image::OwnedImage;
use crate::index::IndexedKeypointSet;
use crate::matching::Matcher;
use crate::rank::loader::ImageLoader;
use crate::rank::SkippedCandidate;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::PrintMatchResult;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// One loaded candidate.
#[derive(Clone, Debug)]
pub struct GalleryEntry {
    pub id: String,
    pub image: OwnedImage,
    pub indexed: IndexedKeypointSet,
}

/// Candidates that loaded successfully, in input order, plus the ones that
/// did not.
#[derive(Clone, Debug, Default)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
    skipped: Vec<SkippedCandidate>,
}

impl Gallery {
    /// Loads, extracts and indexes every candidate. Load failures are kept
    /// as skipped entries; index construction errors are returned.
    pub fn build<S, L>(
        ids: &[S],
        loader: &L,
        extractor: &SiftExtractor,
        matcher: &Matcher,
        parallel: bool,
    ) -> PrintMatchResult<Self>
    where
        S: AsRef<str> + Sync,
        L: ImageLoader + ?Sized,
    {
        let _span = trace_span!("gallery_build", candidates = ids.len()).entered();
        let prepare = |id: &S| -> PrintMatchResult<Result<GalleryEntry, SkippedCandidate>> {
            let id = id.as_ref();
            let image = match loader.load(id) {
                Ok(image) => image,
                Err(error) => {
                    trace_warn!("candidate_skipped", id = id, reason = error.to_string().as_str());
                    return Ok(Err(SkippedCandidate {
                        id: id.to_string(),
                        error,
                    }));
                }
            };
            let features = extractor.extract(image.view());
            let indexed = matcher.index(features)?;
            Ok(Ok(GalleryEntry {
                id: id.to_string(),
                image,
                indexed,
            }))
        };

        #[cfg(feature = "rayon")]
        let prepared: Vec<_> = if parallel {
            ids.par_iter().map(prepare).collect()
        } else {
            ids.iter().map(prepare).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let prepared: Vec<_> = {
            let _ = parallel;
            ids.iter().map(prepare).collect()
        };

        let mut gallery = Gallery::default();
        for item in prepared {
            match item? {
                Ok(entry) => gallery.entries.push(entry),
                Err(skipped) => gallery.skipped.push(skipped),
            }
        }
        trace_event!(
            "gallery_ready",
            entries = gallery.entries.len(),
            skipped = gallery.skipped.len()
        );
        Ok(gallery)
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    /// Candidates that could not be loaded.
    pub fn skipped(&self) -> &[SkippedCandidate] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
