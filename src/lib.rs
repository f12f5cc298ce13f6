//! NEIGHBOURS - Embedding Nearest-Neighbour Substitution Engine
//!
//! Top-k similar words over a pretrained word-vector space, with an
//! optional bulk precompute, on-demand fallback, out-of-vocabulary
//! detection and result memoization.

pub mod cache;
pub mod candidates;
pub mod config;
pub mod error;
pub mod index;
pub mod metrics;
pub mod service;
pub mod vector;

pub use candidates::SubstitutionCandidates;
pub use config::NeighborConfig;
pub use error::{Error, Result};
pub use index::{BruteForceIndex, BulkResult, NeighborIndex};
#[cfg(feature = "parallel")]
pub use index::ParallelIndex;
pub use metrics::ServiceStats;
pub use service::{
    AsyncNeighborService, NeighbourRequest, NeighborService, Neighbours, Query, ScoredNeighbours,
};
pub use vector::{is_pretrained, Measure, VectorStore};
