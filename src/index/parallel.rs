//! Parallel bulk index
//!
//! Splits the all-pairs scan across scoped worker threads, optionally
//! pinned to CPU cores.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::{bulk_width, compute_block, BulkResult, NeighborIndex, RowBlock};
use crate::error::{Error, Result};
use crate::vector::{Measure, VectorStore};

/// Multi-threaded bulk strategy
///
/// Produces the same rows as [`BruteForceIndex`](super::BruteForceIndex);
/// only the wall-clock time differs.
#[derive(Debug, Clone)]
pub struct ParallelIndex {
    store: Arc<VectorStore>,
    workers: usize,
    pin_to_cores: bool,
}

impl ParallelIndex {
    /// `workers == 0` means one per CPU
    pub fn new(store: Arc<VectorStore>, workers: usize, pin_to_cores: bool) -> Self {
        let workers = if workers == 0 { num_cpus::get() } else { workers };
        Self {
            store,
            workers,
            pin_to_cores,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl NeighborIndex for ParallelIndex {
    fn name(&self) -> &str {
        "parallel"
    }

    fn bulk_topk(&self, measure: Measure, k: usize) -> Result<BulkResult> {
        let width = bulk_width(&self.store, k)?;
        let start = Instant::now();

        let n = self.store.len();
        let workers = self.workers.clamp(1, n.max(1));
        let chunk = n.div_ceil(workers);

        let core_ids = if self.pin_to_cores {
            core_affinity::get_core_ids().unwrap_or_default()
        } else {
            Vec::new()
        };

        let store = &*self.store;
        let blocks = crossbeam::thread::scope(|s| -> Result<Vec<RowBlock>> {
            let mut handles = Vec::with_capacity(workers);
            for i in 0..workers {
                let range = (i * chunk).min(n)..((i + 1) * chunk).min(n);
                let core_id = core_ids.get(i).copied();

                let handle = s
                    .builder()
                    .name(format!("bulk-{}", i))
                    .spawn(move |_| {
                        if let Some(core) = core_id {
                            if core_affinity::set_for_current(core) {
                                debug!("Bulk worker {} pinned to core {:?}", i, core);
                            }
                        }
                        compute_block(store, measure, width, range)
                    })
                    .map_err(|e| Error::TaskFailed(format!("failed to spawn bulk worker: {}", e)))?;
                handles.push(handle);
            }

            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .map_err(|_| Error::TaskFailed("bulk worker panicked".to_string()))
                })
                .collect()
        })
        .map_err(|_| Error::TaskFailed("bulk worker panicked".to_string()))??;

        let result = BulkResult::from_blocks(measure, width, blocks);
        info!(
            "Parallel {} top-{} over {} vectors with {} workers in {:?}",
            measure,
            width,
            result.rows(),
            workers,
            start.elapsed()
        );
        Ok(result)
    }
}
