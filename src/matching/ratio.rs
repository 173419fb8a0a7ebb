//! Lowe's ratio test.

use crate::matching::correspond::{Correspondence, NeighborPair};

/// What to do with a source descriptor whose target set held only one
/// descriptor, so no second-nearest distance exists.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum SingleNeighborPolicy {
    /// Drop the correspondence.
    #[default]
    Reject,
    /// Keep the correspondence.
    Accept,
    /// Keep the correspondence when its distance is below the given value.
    AcceptBelow(f32),
}

/// Keeps pairs whose nearest distance is below `ratio` times the
/// second-nearest distance.
///
/// Raising `ratio` never removes a pair that a lower `ratio` kept.
pub fn ratio_test(
    pairs: &[NeighborPair],
    ratio: f32,
    single: SingleNeighborPolicy,
) -> Vec<Correspondence> {
    pairs
        .iter()
        .filter(|pair| match pair.second {
            Some(second) => pair.first.distance < ratio * second.distance,
            None => match single {
                SingleNeighborPolicy::Reject => false,
                SingleNeighborPolicy::Accept => true,
                SingleNeighborPolicy::AcceptBelow(max) => pair.first.distance < max,
            },
        })
        .map(NeighborPair::nearest)
        .collect()
}
