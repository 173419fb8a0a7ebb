//! Bounded nearest-neighbour collection.

use std::cmp::Ordering;

/// A stored vector found by a nearest-neighbour query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    /// Index of the stored vector.
    pub index: usize,
    /// Euclidean distance to the query.
    pub distance: f32,
}

/// Candidate held while a query is running; distances stay squared until the
/// result is reported.
#[derive(Clone, Copy, Debug)]
struct Entry {
    index: usize,
    dist_sq: f32,
}

fn entry_cmp_asc(a: &Entry, b: &Entry) -> Ordering {
    a.dist_sq
        .total_cmp(&b.dist_sq)
        .then_with(|| a.index.cmp(&b.index))
}

/// Keeps the `k` closest entries seen so far, sorted ascending.
///
/// Equal distances are ordered by index so results do not depend on visit
/// order.
#[derive(Clone, Debug)]
pub(crate) struct KnnSet {
    k: usize,
    items: Vec<Entry>,
}

impl KnnSet {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            k,
            items: Vec::with_capacity(k + 1),
        }
    }

    pub(crate) fn is_full(&self) -> bool {
        self.items.len() >= self.k
    }

    /// Squared distance a new entry must beat to be kept.
    pub(crate) fn worst_dist_sq(&self) -> f32 {
        if self.is_full() {
            self.items.last().map_or(f32::INFINITY, |e| e.dist_sq)
        } else {
            f32::INFINITY
        }
    }

    /// Inserts `index` at `dist_sq`, evicting the farthest entry when full.
    pub(crate) fn push(&mut self, index: usize, dist_sq: f32) {
        if self.k == 0 {
            return;
        }
        let entry = Entry { index, dist_sq };
        if self.is_full() {
            match self.items.last() {
                Some(last) if entry_cmp_asc(&entry, last) == Ordering::Less => {}
                _ => return,
            }
        }
        let pos = self
            .items
            .partition_point(|e| entry_cmp_asc(e, &entry) == Ordering::Less);
        self.items.insert(pos, entry);
        self.items.truncate(self.k);
    }

    /// Returns neighbours sorted by ascending Euclidean distance.
    pub(crate) fn into_sorted(self) -> Vec<Neighbor> {
        self.items
            .into_iter()
            .map(|e| Neighbor {
                index: e.index,
                distance: e.dist_sq.max(0.0).sqrt(),
            })
            .collect()
    }
}
