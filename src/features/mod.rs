//! Scale- and rotation-invariant keypoint extraction.
//!
//! The extractor builds a Gaussian scale space, keeps local extrema of the
//! difference-of-Gaussian stack that survive contrast and edge tests, assigns
//! each one or more dominant orientations and describes the surrounding
//! gradients with a 128-dimensional histogram. Extraction is deterministic:
//! the same image and configuration always produce the same set.

pub(crate) mod descriptor;
pub(crate) mod detect;
pub(crate) mod scale_space;

use crate::features::descriptor::describe;
use crate::features::detect::{detect, Detection};
use crate::features::scale_space::ScaleSpace;
use crate::image::{FloatImage, ImageView};
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{PrintMatchError, PrintMatchResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use std::cmp::Ordering;

pub use descriptor::DESCRIPTOR_LEN;

/// A detected keypoint in input-image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Diameter of the described neighbourhood.
    pub size: f32,
    /// Dominant orientation in degrees, `[0, 360)`.
    pub angle: f32,
    /// Absolute interpolated DoG response.
    pub response: f32,
    /// Octave the keypoint was detected in (0 is the upsampled base when
    /// upsampling is enabled).
    pub octave: usize,
}

/// Keypoints of one image with their descriptors stored row-major.
///
/// Descriptor `i` belongs to keypoint `i`. The set may be empty.
#[derive(Clone, Debug, PartialEq)]
pub struct KeypointSet {
    keypoints: Vec<Keypoint>,
    descriptors: Vec<f32>,
    dim: usize,
}

impl KeypointSet {
    /// Creates a set from keypoints and a flat descriptor buffer of
    /// `keypoints.len() * dim` values.
    pub fn new(keypoints: Vec<Keypoint>, descriptors: Vec<f32>, dim: usize) -> PrintMatchResult<Self> {
        if dim == 0 {
            return Err(PrintMatchError::InvalidConfig {
                field: "dim",
                reason: "descriptor dimensionality must be > 0",
            });
        }
        let needed = keypoints.len() * dim;
        if descriptors.len() != needed {
            return Err(PrintMatchError::BufferTooSmall {
                needed,
                got: descriptors.len(),
            });
        }
        Ok(Self {
            keypoints,
            descriptors,
            dim,
        })
    }

    /// Creates an empty set with descriptors of length `dim`.
    pub fn empty(dim: usize) -> Self {
        Self {
            keypoints: Vec::new(),
            descriptors: Vec::new(),
            dim,
        }
    }

    /// Number of keypoints.
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Descriptor length.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Flat row-major descriptor buffer.
    pub fn descriptors(&self) -> &[f32] {
        &self.descriptors
    }

    /// Returns the descriptor of keypoint `idx`.
    pub fn descriptor(&self, idx: usize) -> PrintMatchResult<&[f32]> {
        if idx >= self.len() {
            return Err(PrintMatchError::IndexOutOfBounds {
                index: idx,
                len: self.len(),
                context: "keypoint",
            });
        }
        Ok(&self.descriptors[idx * self.dim..(idx + 1) * self.dim])
    }

    /// Iterates over `(keypoint, descriptor)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Keypoint, &[f32])> + '_ {
        self.keypoints
            .iter()
            .zip(self.descriptors.chunks_exact(self.dim.max(1)))
    }
}

/// Extractor parameters.
#[derive(Clone, Debug)]
pub struct ExtractorConfig {
    /// Minimum interpolated DoG contrast (for intensities in `[0, 1]`),
    /// scaled by the number of octave layers.
    pub contrast_threshold: f32,
    /// Maximum principal-curvature ratio; larger keeps more edge-like points.
    pub edge_threshold: f32,
    /// Scale layers sampled per octave.
    pub octave_layers: usize,
    /// Blur of the base layer.
    pub sigma: f32,
    /// Doubles the input before building the first octave.
    pub upsample: bool,
    /// Keeps only the strongest keypoints when set.
    pub max_features: Option<usize>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            contrast_threshold: 0.04,
            edge_threshold: 10.0,
            octave_layers: 3,
            sigma: 1.6,
            upsample: true,
            max_features: None,
        }
    }
}

impl ExtractorConfig {
    /// Checks every parameter range.
    pub fn validate(&self) -> PrintMatchResult<()> {
        if !self.contrast_threshold.is_finite() || self.contrast_threshold < 0.0 {
            return Err(PrintMatchError::InvalidConfig {
                field: "contrast_threshold",
                reason: "must be finite and >= 0",
            });
        }
        if !self.edge_threshold.is_finite() || self.edge_threshold <= 0.0 {
            return Err(PrintMatchError::InvalidConfig {
                field: "edge_threshold",
                reason: "must be finite and > 0",
            });
        }
        if self.octave_layers == 0 {
            return Err(PrintMatchError::InvalidConfig {
                field: "octave_layers",
                reason: "must be > 0",
            });
        }
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(PrintMatchError::InvalidConfig {
                field: "sigma",
                reason: "must be finite and > 0",
            });
        }
        if self.max_features == Some(0) {
            return Err(PrintMatchError::InvalidConfig {
                field: "max_features",
                reason: "must be > 0 when set",
            });
        }
        Ok(())
    }
}

/// Reusable keypoint extractor with a validated configuration.
#[derive(Clone, Debug)]
pub struct SiftExtractor {
    cfg: ExtractorConfig,
}

impl SiftExtractor {
    /// Validates `cfg` and creates an extractor.
    pub fn new(cfg: ExtractorConfig) -> PrintMatchResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.cfg
    }

    /// Extracts keypoints and descriptors from an 8-bit grayscale view.
    ///
    /// Images without detectable structure yield an empty set.
    pub fn extract(&self, image: ImageView<'_, u8>) -> KeypointSet {
        let cfg = &self.cfg;
        let input = FloatImage::from_u8(image);
        let Some(space) = ScaleSpace::build(&input, cfg) else {
            trace_warn!(
                "degenerate_input",
                width = image.width(),
                height = image.height()
            );
            return KeypointSet::empty(DESCRIPTOR_LEN);
        };
        let _span = trace_span!(
            "extract_features",
            width = image.width(),
            height = image.height(),
            octaves = space.num_octaves()
        )
        .entered();

        let mut detections = detect(&space, cfg);
        dedupe(&mut detections);
        if let Some(limit) = cfg.max_features {
            retain_strongest(&mut detections, limit);
        }

        let descriptors = describe_all(&space, &detections);
        let keypoints: Vec<Keypoint> = detections.iter().map(|d| d.keypoint).collect();
        trace_event!("keypoints", count = keypoints.len());
        if keypoints.is_empty() {
            trace_warn!(
                "degenerate_input",
                width = image.width(),
                height = image.height()
            );
        }

        KeypointSet {
            keypoints,
            descriptors,
            dim: DESCRIPTOR_LEN,
        }
    }
}

/// Extracts keypoints from `image` with `cfg`.
pub fn extract_features(image: ImageView<'_, u8>, cfg: &ExtractorConfig) -> PrintMatchResult<KeypointSet> {
    Ok(SiftExtractor::new(cfg.clone())?.extract(image))
}

fn compare_detections(a: &Detection, b: &Detection) -> Ordering {
    let (ka, kb) = (&a.keypoint, &b.keypoint);
    ka.x.total_cmp(&kb.x)
        .then(ka.y.total_cmp(&kb.y))
        .then(ka.size.total_cmp(&kb.size))
        .then(ka.angle.total_cmp(&kb.angle))
}

/// Sorts by position, scale and angle and drops exact repeats.
fn dedupe(detections: &mut Vec<Detection>) {
    detections.sort_by(compare_detections);
    detections.dedup_by(|a, b| compare_detections(a, b) == Ordering::Equal);
}

/// Keeps the `limit` strongest detections; equal responses keep their
/// positional order.
fn retain_strongest(detections: &mut Vec<Detection>, limit: usize) {
    if detections.len() <= limit {
        return;
    }
    detections.sort_by(|a, b| b.keypoint.response.total_cmp(&a.keypoint.response));
    detections.truncate(limit);
}

fn describe_all(space: &ScaleSpace, detections: &[Detection]) -> Vec<f32> {
    let describe_one = |det: &Detection| {
        let img = &space.gaussians[det.keypoint.octave][det.layer];
        describe(img, det)
    };

    #[cfg(feature = "rayon")]
    let rows: Vec<[f32; DESCRIPTOR_LEN]> = detections.par_iter().map(describe_one).collect();
    #[cfg(not(feature = "rayon"))]
    let rows: Vec<[f32; DESCRIPTOR_LEN]> = detections.iter().map(describe_one).collect();

    let mut flat = Vec::with_capacity(rows.len() * DESCRIPTOR_LEN);
    for row in &rows {
        flat.extend_from_slice(row);
    }
    flat
}
