//! Neighbour Index
//!
//! Strategies for the one-shot all-pairs top-k precompute.

mod brute_force;
#[cfg(feature = "parallel")]
mod parallel;

pub use brute_force::BruteForceIndex;
#[cfg(feature = "parallel")]
pub use parallel::ParallelIndex;

use std::ops::Range;

use crate::error::{Error, Result};
use crate::vector::{Measure, SimilarityEngine, VectorStore};

/// Bulk all-pairs top-k strategy
///
/// `bulk_topk` is expensive (N full distance scans) and blocks the calling
/// thread until it finishes. It cannot be cancelled.
pub trait NeighborIndex: Send + Sync {
    /// Backend name for logs and stats
    fn name(&self) -> &str;

    fn bulk_topk(&self, measure: Measure, k: usize) -> Result<BulkResult>;
}

/// Precomputed neighbours for every stored vector under one (measure, k)
///
/// Row `i` holds the `width()` nearest vectors to vector `i`, itself
/// included, sorted by ascending distance with ties in index order.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkResult {
    measure: Measure,
    width: usize,
    rows: usize,
    distances: Vec<f32>,
    indices: Vec<usize>,
}

impl BulkResult {
    fn from_blocks(measure: Measure, width: usize, blocks: Vec<RowBlock>) -> Self {
        let rows = blocks.iter().map(|b| b.rows).sum();
        let mut distances = Vec::with_capacity(rows * width);
        let mut indices = Vec::with_capacity(rows * width);
        for block in blocks {
            distances.extend(block.distances);
            indices.extend(block.indices);
        }
        Self {
            measure,
            width,
            rows,
            distances,
            indices,
        }
    }

    pub fn measure(&self) -> Measure {
        self.measure
    }

    /// Neighbours per row (requested k clamped to the vocabulary size)
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Distances and indices for row `index`
    pub fn row(&self, index: usize) -> Option<(&[f32], &[usize])> {
        if index >= self.rows {
            return None;
        }
        let span = index * self.width..(index + 1) * self.width;
        Some((&self.distances[span.clone()], &self.indices[span]))
    }
}

/// Indices of the `k` smallest distances, ascending, ties by index
pub fn select_topk(distances: &[f32], k: usize) -> Vec<usize> {
    let order =
        |a: &usize, b: &usize| distances[*a].total_cmp(&distances[*b]).then(a.cmp(b));

    let k = k.min(distances.len());
    if k == 0 {
        return Vec::new();
    }

    let mut selected: Vec<usize> = (0..distances.len()).collect();
    if k < selected.len() {
        selected.select_nth_unstable_by(k - 1, order);
        selected.truncate(k);
    }
    selected.sort_unstable_by(order);
    selected
}

/// Width of a bulk result for `k`, rejecting `k == 0`
fn bulk_width(store: &VectorStore, k: usize) -> Result<usize> {
    if k == 0 {
        return Err(Error::configuration("bulk top-k requires k > 0"));
    }
    Ok(k.min(store.len()))
}

/// Consecutive rows of a bulk result
struct RowBlock {
    rows: usize,
    distances: Vec<f32>,
    indices: Vec<usize>,
}

fn compute_block(
    store: &VectorStore,
    measure: Measure,
    width: usize,
    range: Range<usize>,
) -> RowBlock {
    let engine = SimilarityEngine::new(store);
    let rows = range.len();
    let mut distances = Vec::with_capacity(rows * width);
    let mut indices = Vec::with_capacity(rows * width);
    let mut scratch = Vec::with_capacity(store.len());

    for i in range {
        engine.distances_into(store.row(i), measure, &mut scratch);
        for j in select_topk(&scratch, width) {
            distances.push(scratch[j]);
            indices.push(j);
        }
    }

    RowBlock {
        rows,
        distances,
        indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_topk_orders_and_breaks_ties_by_index() {
        let distances = [0.5, 0.1, 0.5, 0.0, 0.5];
        assert_eq!(select_topk(&distances, 3), vec![3, 1, 0]);
        assert_eq!(select_topk(&distances, 5), vec![3, 1, 0, 2, 4]);
        assert_eq!(select_topk(&distances, 10), vec![3, 1, 0, 2, 4]);
        assert!(select_topk(&distances, 0).is_empty());
    }

    #[test]
    fn test_select_topk_nan_sorts_last() {
        let distances = [f32::NAN, 1.0, 0.0];
        assert_eq!(select_topk(&distances, 2), vec![2, 1]);
    }

    #[test]
    fn test_bulk_result_rows() {
        let blocks = vec![
            RowBlock {
                rows: 1,
                distances: vec![0.0, 1.0],
                indices: vec![0, 1],
            },
            RowBlock {
                rows: 1,
                distances: vec![0.0, 1.0],
                indices: vec![1, 0],
            },
        ];
        let result = BulkResult::from_blocks(Measure::Euclidean, 2, blocks);
        assert_eq!(result.rows(), 2);
        assert_eq!(result.row(1), Some((&[0.0, 1.0][..], &[1, 0][..])));
        assert!(result.row(2).is_none());
    }
}
