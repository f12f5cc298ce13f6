//! Brute-force bulk index
//!
//! Full pairwise distances plus a partial sort per row, on the calling thread.

use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::{bulk_width, compute_block, BulkResult, NeighborIndex};
use crate::error::Result;
use crate::vector::{Measure, VectorStore};

/// Always-available fallback strategy
#[derive(Debug, Clone)]
pub struct BruteForceIndex {
    store: Arc<VectorStore>,
}

impl BruteForceIndex {
    pub fn new(store: Arc<VectorStore>) -> Self {
        Self { store }
    }
}

impl NeighborIndex for BruteForceIndex {
    fn name(&self) -> &str {
        "brute-force"
    }

    fn bulk_topk(&self, measure: Measure, k: usize) -> Result<BulkResult> {
        let width = bulk_width(&self.store, k)?;
        let start = Instant::now();

        let block = compute_block(&self.store, measure, width, 0..self.store.len());
        let result = BulkResult::from_blocks(measure, width, vec![block]);

        info!(
            "Brute-force {} top-{} over {} vectors in {:?}",
            measure,
            width,
            result.rows(),
            start.elapsed()
        );
        Ok(result)
    }
}
