//! Randomized k-d forest for approximate nearest-neighbour search.
//!
//! Every tree splits on a dimension drawn at random from the few dimensions
//! with the highest variance, at the mean value along that dimension. Queries
//! descend all trees once, then keep exploring the closest unexplored branches
//! across the whole forest (best-bin-first) until `checks` stored vectors have
//! been compared. Each stored vector is compared at most once per query, and a
//! query with unlimited checks returns the exact neighbours.

use crate::index::knn::{KnnSet, Neighbor};
use crate::index::{IndexConfig, NeighborSearch};
use crate::kernel::squared_l2;
use crate::util::{PrintMatchError, PrintMatchResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Number of highest-variance dimensions a split is drawn from.
const RAND_DIM: usize = 5;
/// Points sampled when estimating per-dimension mean and variance.
const SAMPLE_MEAN: usize = 100;

#[derive(Clone, Debug)]
enum Node {
    /// Range into the tree's index permutation.
    Leaf { start: usize, end: usize },
    Split {
        dim: usize,
        value: f32,
        left: usize,
        right: usize,
    },
}

#[derive(Clone, Debug)]
struct Tree {
    nodes: Vec<Node>,
    order: Vec<usize>,
}

/// Unexplored branch waiting in the shared priority queue.
#[derive(Clone, Copy, Debug)]
struct Branch {
    mindist: f32,
    tree: usize,
    node: usize,
}

impl PartialEq for Branch {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Branch {}

impl PartialOrd for Branch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Branch {
    // Reversed so that `BinaryHeap` pops the closest branch first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .mindist
            .total_cmp(&self.mindist)
            .then_with(|| other.tree.cmp(&self.tree))
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Per-query search state shared across trees.
struct Search<'q> {
    query: &'q [f32],
    result: KnnSet,
    heap: BinaryHeap<Branch>,
    visited: Vec<bool>,
    checked: usize,
    max_checks: usize,
}

impl Search<'_> {
    fn exhausted(&self) -> bool {
        self.checked >= self.max_checks && self.result.is_full()
    }
}

/// Forest of randomized k-d trees over an owned descriptor matrix.
#[derive(Clone, Debug)]
pub struct KdForest {
    data: Vec<f32>,
    dim: usize,
    len: usize,
    trees: Vec<Tree>,
    checks: usize,
}

impl KdForest {
    /// Builds the forest over `data` (row-major, `dim` columns).
    pub fn build(data: Vec<f32>, dim: usize, cfg: &IndexConfig) -> PrintMatchResult<Self> {
        cfg.validate()?;
        if dim == 0 {
            return Err(PrintMatchError::InvalidConfig {
                field: "dim",
                reason: "descriptor dimensionality must be > 0",
            });
        }
        if data.len() % dim != 0 {
            let needed = (data.len() / dim + 1) * dim;
            return Err(PrintMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        let len = data.len() / dim;
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let trees = (0..cfg.trees)
            .map(|_| build_tree(&data, dim, len, cfg.leaf_size, &mut rng))
            .collect();
        Ok(Self {
            data,
            dim,
            len,
            trees,
            checks: cfg.checks,
        })
    }

    /// Number of trees in the forest.
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    fn row(&self, idx: usize) -> &[f32] {
        &self.data[idx * self.dim..(idx + 1) * self.dim]
    }

    fn search_from(&self, search: &mut Search<'_>, tree_idx: usize, start: usize, mindist: f32) {
        if search.result.is_full() && search.result.worst_dist_sq() < mindist {
            return;
        }
        let tree = &self.trees[tree_idx];
        let mut node = start;
        loop {
            match tree.nodes[node] {
                Node::Leaf { start, end } => {
                    for &idx in &tree.order[start..end] {
                        if search.visited[idx] {
                            continue;
                        }
                        if search.exhausted() {
                            return;
                        }
                        search.visited[idx] = true;
                        search.checked += 1;
                        let d = squared_l2(search.query, self.row(idx));
                        search.result.push(idx, d);
                    }
                    return;
                }
                Node::Split {
                    dim,
                    value,
                    left,
                    right,
                } => {
                    let diff = search.query[dim] - value;
                    let (best, other) = if diff < 0.0 { (left, right) } else { (right, left) };
                    // Lower bound on the squared distance to anything beyond the plane.
                    let other_dist = mindist.max(diff * diff);
                    if other_dist <= search.result.worst_dist_sq() || !search.result.is_full() {
                        search.heap.push(Branch {
                            mindist: other_dist,
                            tree: tree_idx,
                            node: other,
                        });
                    }
                    node = best;
                }
            }
        }
    }
}

impl NeighborSearch for KdForest {
    fn len(&self) -> usize {
        self.len
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn knn(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        if self.len == 0 || k == 0 {
            return Vec::new();
        }
        let k = k.min(self.len);
        let mut search = Search {
            query,
            result: KnnSet::new(k),
            heap: BinaryHeap::new(),
            visited: vec![false; self.len],
            checked: 0,
            max_checks: self.checks,
        };
        for tree in 0..self.trees.len() {
            self.search_from(&mut search, tree, 0, 0.0);
        }
        while let Some(branch) = search.heap.pop() {
            if search.exhausted() {
                break;
            }
            self.search_from(&mut search, branch.tree, branch.node, branch.mindist);
        }
        search.result.into_sorted()
    }
}

fn build_tree(data: &[f32], dim: usize, len: usize, leaf_size: usize, rng: &mut StdRng) -> Tree {
    let mut tree = Tree {
        nodes: Vec::new(),
        order: (0..len).collect(),
    };
    tree.nodes.push(Node::Leaf { start: 0, end: len });
    // Explicit stack: skewed splits can make the tree deep.
    let mut pending = vec![(0usize, 0usize, len)];
    while let Some((node_idx, start, end)) = pending.pop() {
        if end - start <= leaf_size {
            tree.nodes[node_idx] = Node::Leaf { start, end };
            continue;
        }
        let rows = &mut tree.order[start..end];
        let (split_dim, value) = choose_split(data, dim, rows, rng);
        let mid = start + plane_split(data, dim, rows, split_dim, value);

        let left = tree.nodes.len();
        tree.nodes.push(Node::Leaf { start, end: mid });
        let right = tree.nodes.len();
        tree.nodes.push(Node::Leaf { start: mid, end });
        tree.nodes[node_idx] = Node::Split {
            dim: split_dim,
            value,
            left,
            right,
        };
        pending.push((right, mid, end));
        pending.push((left, start, mid));
    }
    tree
}

/// Picks a split dimension among the highest-variance ones and returns it
/// with the sample mean along it.
fn choose_split(data: &[f32], dim: usize, rows: &[usize], rng: &mut StdRng) -> (usize, f32) {
    let sample = &rows[..rows.len().min(SAMPLE_MEAN)];
    let n = sample.len() as f32;
    let mut mean = vec![0.0f32; dim];
    for &r in sample {
        for (m, v) in mean.iter_mut().zip(&data[r * dim..(r + 1) * dim]) {
            *m += v;
        }
    }
    for m in mean.iter_mut() {
        *m /= n;
    }
    let mut var = vec![0.0f32; dim];
    for &r in sample {
        for ((s, v), m) in var.iter_mut().zip(&data[r * dim..(r + 1) * dim]).zip(&mean) {
            let d = v - m;
            *s += d * d;
        }
    }

    let mut by_var: Vec<usize> = (0..dim).collect();
    by_var.sort_by(|&a, &b| var[b].total_cmp(&var[a]).then(a.cmp(&b)));
    let pick = by_var[rng.random_range(0..RAND_DIM.min(dim))];
    (pick, mean[pick])
}

/// Reorders `rows` so that values below `value` come first and returns the
/// split position. Rows equal to `value` are divided to keep both halves
/// non-empty and as balanced as possible.
fn plane_split(data: &[f32], dim: usize, rows: &mut [usize], split_dim: usize, value: f32) -> usize {
    let at = |r: usize| data[r * dim + split_dim];
    let count = rows.len();

    let mut lim1 = 0;
    for i in 0..count {
        if at(rows[i]) < value {
            rows.swap(i, lim1);
            lim1 += 1;
        }
    }
    let mut lim2 = lim1;
    for i in lim1..count {
        if at(rows[i]) <= value {
            rows.swap(i, lim2);
            lim2 += 1;
        }
    }

    let half = count / 2;
    let index = if lim1 > half {
        lim1
    } else if lim2 < half {
        lim2
    } else {
        half
    };
    if index == 0 || index == count {
        half
    } else {
        index
    }
}

#[cfg(test)]
mod tests {
    use super::{plane_split, KdForest};
    use crate::index::{IndexConfig, NeighborSearch};
    use crate::kernel::scalar::knn_scan;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_rows(n: usize, dim: usize, seed: u64) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n * dim)
            .map(|_| rng.random_range(0..=255u32) as f32)
            .collect()
    }

    #[test]
    fn plane_split_keeps_both_sides_non_empty() {
        let data = vec![1.0f32; 6];
        let mut rows: Vec<usize> = (0..6).collect();
        let mid = plane_split(&data, 1, &mut rows, 0, 1.0);
        assert_eq!(mid, 3);

        let data = [0.0f32, 5.0, 1.0, 7.0];
        let mut rows: Vec<usize> = (0..4).collect();
        let mid = plane_split(&data, 1, &mut rows, 0, 3.25);
        assert_eq!(mid, 2);
        assert!(rows[..mid].iter().all(|&r| data[r] < 3.25));
    }

    #[test]
    fn stored_vector_is_its_own_nearest() {
        let dim = 16;
        let data = random_rows(200, dim, 7);
        let forest = KdForest::build(data.clone(), dim, &IndexConfig::default()).unwrap();
        for i in [0usize, 57, 199] {
            let q = &data[i * dim..(i + 1) * dim];
            let out = forest.knn(q, 2);
            assert_eq!(out[0].index, i);
            assert_eq!(out[0].distance, 0.0);
            assert!(out[0].distance <= out[1].distance);
        }
    }

    #[test]
    fn exhaustive_checks_match_brute_force() {
        let dim = 8;
        let data = random_rows(120, dim, 11);
        let cfg = IndexConfig {
            checks: 10_000,
            ..IndexConfig::default()
        };
        let forest = KdForest::build(data.clone(), dim, &cfg).unwrap();
        let queries = random_rows(20, dim, 12);
        for q in queries.chunks_exact(dim) {
            let approx = forest.knn(q, 2);
            let exact = knn_scan(q, &data, dim, 2);
            assert_eq!(approx, exact);
        }
    }

    #[test]
    fn same_seed_gives_same_answers() {
        let dim = 8;
        let data = random_rows(300, dim, 3);
        let cfg = IndexConfig::default();
        let a = KdForest::build(data.clone(), dim, &cfg).unwrap();
        let b = KdForest::build(data, dim, &cfg).unwrap();
        let q = random_rows(1, dim, 4);
        assert_eq!(a.knn(&q, 2), b.knn(&q, 2));
        assert_eq!(a.num_trees(), 5);
    }

    #[test]
    fn single_row_returns_single_neighbor() {
        let forest = KdForest::build(vec![1.0, 2.0], 2, &IndexConfig::default()).unwrap();
        let out = forest.knn(&[0.0, 0.0], 2);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].index, 0);
    }
}
