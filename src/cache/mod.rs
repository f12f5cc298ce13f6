//! Neighbour Cache
//!
//! Two append-only tiers: bulk all-pairs results keyed by (measure, k) and
//! finished per-query results keyed by the full call parameters. Nothing is
//! invalidated; the vector space never changes after load.

mod bulk;
mod memo;

pub use bulk::BulkCache;
pub use memo::{MemoCache, MemoKey, QueryKey};

#[derive(Default)]
pub struct NeighborCache {
    bulk: BulkCache,
    memo: MemoCache,
}

impl NeighborCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bulk(&self) -> &BulkCache {
        &self.bulk
    }

    pub fn memo(&self) -> &MemoCache {
        &self.memo
    }
}
