//! Sub-sample refinement of discrete maxima.
//!
//! `quad1d` interpolates circular histogram peaks, `quad3d` locates scale-space
//! extrema between grid samples.

pub(crate) mod quad1d;
pub(crate) mod quad3d;
