//! Neighbour Service
//!
//! Public entry point: resolves a query, detects out-of-vocabulary vectors,
//! consults both cache tiers and falls back to on-demand distance scans.

mod task;

pub use task::AsyncNeighborService;

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{MemoKey, NeighborCache, QueryKey};
use crate::config::NeighborConfig;
use crate::error::{Error, Result};
use crate::index::{select_topk, BruteForceIndex, NeighborIndex};
use crate::metrics::{Outcome, ServiceStats};
use crate::vector::{is_pretrained, Measure, SimilarityEngine, VectorStore};

/// Query element
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Index(usize),
    Word(String),
    /// Raw vector, bypassing the vocabulary. Only memoized when `key` is set.
    Vector {
        values: Vec<f32>,
        key: Option<String>,
    },
}

impl Query {
    pub fn vector(values: Vec<f32>) -> Self {
        Query::Vector { values, key: None }
    }

    /// Raw vector with an identity used for memoization
    pub fn keyed_vector(values: Vec<f32>, key: impl Into<String>) -> Self {
        Query::Vector {
            values,
            key: Some(key.into()),
        }
    }
}

impl From<usize> for Query {
    fn from(index: usize) -> Self {
        Query::Index(index)
    }
}

impl From<&str> for Query {
    fn from(word: &str) -> Self {
        Query::Word(word.to_string())
    }
}

impl From<String> for Query {
    fn from(word: String) -> Self {
        Query::Word(word)
    }
}

impl From<Vec<f32>> for Query {
    fn from(values: Vec<f32>) -> Self {
        Query::vector(values)
    }
}

/// Parallel distances and vocabulary indices, ascending by distance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoredNeighbours {
    pub distances: Vec<f32>,
    pub indices: Vec<usize>,
}

impl ScoredNeighbours {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Keep entries with distance strictly below `dist`
    fn below(self, dist: f32) -> Self {
        let (distances, indices) = self
            .distances
            .into_iter()
            .zip(self.indices)
            .filter(|(d, _)| *d < dist)
            .unzip();
        Self { distances, indices }
    }
}

/// Lookup result
#[derive(Debug, Clone, PartialEq)]
pub enum Neighbours {
    Words(Vec<String>),
    Scored(ScoredNeighbours),
}

impl Neighbours {
    fn empty(return_words: bool) -> Self {
        if return_words {
            Neighbours::Words(Vec::new())
        } else {
            Neighbours::Scored(ScoredNeighbours::default())
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Neighbours::Words(words) => words.len(),
            Neighbours::Scored(scored) => scored.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_words(self) -> Option<Vec<String>> {
        match self {
            Neighbours::Words(words) => Some(words),
            Neighbours::Scored(_) => None,
        }
    }

    pub fn into_scored(self) -> Option<ScoredNeighbours> {
        match self {
            Neighbours::Scored(scored) => Some(scored),
            Neighbours::Words(_) => None,
        }
    }
}

/// Parameters of one `find_neighbours` call
#[derive(Debug, Clone, PartialEq)]
pub struct NeighbourRequest {
    pub element: Query,
    pub measure: Measure,
    /// Number of neighbours; `None` ranks the whole vocabulary
    pub topk: Option<usize>,
    /// Keep only neighbours with distance strictly below this
    pub dist: Option<f32>,
    pub return_words: bool,
}

impl NeighbourRequest {
    pub fn new(element: impl Into<Query>, measure: Measure) -> Self {
        Self {
            element: element.into(),
            measure,
            topk: None,
            dist: None,
            return_words: false,
        }
    }

    /// Build with a measure given by name
    pub fn parse(element: impl Into<Query>, measure: &str) -> Result<Self> {
        Ok(Self::new(element, measure.parse()?))
    }

    pub fn with_topk(mut self, topk: usize) -> Self {
        self.topk = Some(topk);
        self
    }

    pub fn with_dist(mut self, dist: f32) -> Self {
        self.dist = Some(dist);
        self
    }

    pub fn returning_words(mut self) -> Self {
        self.return_words = true;
        self
    }
}

/// Query element resolved against the vector space
struct Resolved<'a> {
    vector: &'a [f32],
    /// Row in the vector space, when the query has one
    index: Option<usize>,
    key: Option<QueryKey>,
}

/// Nearest-neighbour lookups over a fixed vector space
pub struct NeighborService {
    store: Arc<VectorStore>,
    cache: NeighborCache,
    accelerator: Option<Arc<dyn NeighborIndex>>,
    fallback: BruteForceIndex,
    stats: Arc<ServiceStats>,
    config: NeighborConfig,
}

impl NeighborService {
    /// Create with default configuration
    pub fn new(store: Arc<VectorStore>) -> Self {
        Self::build(store, NeighborConfig::default())
    }

    pub fn with_config(store: Arc<VectorStore>, config: NeighborConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(store, config))
    }

    fn build(store: Arc<VectorStore>, config: NeighborConfig) -> Self {
        let accelerator = default_accelerator(&store, &config);
        info!(
            "Neighbour service over {} vectors of dimension {} (accelerator: {})",
            store.len(),
            store.dimension(),
            accelerator.as_ref().map(|a| a.name()).unwrap_or("none")
        );
        Self {
            fallback: BruteForceIndex::new(store.clone()),
            store,
            cache: NeighborCache::new(),
            accelerator,
            stats: Arc::new(ServiceStats::new()),
            config,
        }
    }

    /// Replace the acceleration backend
    pub fn with_accelerator(mut self, index: Arc<dyn NeighborIndex>) -> Self {
        self.accelerator = Some(index);
        self
    }

    pub fn without_accelerator(mut self) -> Self {
        self.accelerator = None;
        self
    }

    pub fn has_accelerator(&self) -> bool {
        self.accelerator.is_some()
    }

    pub fn store(&self) -> &Arc<VectorStore> {
        &self.store
    }

    pub fn stats(&self) -> &Arc<ServiceStats> {
        &self.stats
    }

    pub fn cache(&self) -> &NeighborCache {
        &self.cache
    }

    pub fn config(&self) -> &NeighborConfig {
        &self.config
    }

    /// Whether a bulk result for (measure, k) is installed
    pub fn has_bulk(&self, measure: Measure, k: usize) -> bool {
        self.cache.bulk().contains(measure, k)
    }

    /// Drop memoized per-query results; bulk results stay
    pub fn clear_memo(&self) {
        self.cache.memo().clear();
    }

    /// Find the nearest vocabulary entries to `request.element`
    pub fn find_neighbours(&self, request: &NeighbourRequest) -> Result<Neighbours> {
        let start = Instant::now();
        let measure = request.measure;
        if let Some(dist) = request.dist {
            measure.validate_threshold(dist)?;
        }

        let resolved = self.resolve(&request.element)?;

        let memo_key = resolved
            .key
            .filter(|_| self.config.memoize)
            .map(|query| {
                MemoKey::new(
                    query,
                    measure,
                    request.topk,
                    request.dist,
                    request.return_words,
                )
            });

        if let Some(key) = &memo_key {
            if let Some(hit) = self.cache.memo().get(key) {
                debug!("Memo hit for {:?}", key);
                self.stats.record_query(Outcome::MemoHit, start.elapsed());
                return Ok(hit);
            }
        }

        if !is_pretrained(resolved.vector) {
            self.stats.record_query(Outcome::OutOfVocabulary, start.elapsed());
            return Ok(Neighbours::empty(request.return_words));
        }

        let (mut scored, outcome) = match self.bulk_row(resolved.index, measure, request.topk) {
            Some(scored) => (scored, Outcome::BulkHit),
            None => (
                self.lazy_topk(resolved.vector, measure, request.topk),
                Outcome::Lazy,
            ),
        };

        if let Some(dist) = request.dist {
            scored = scored.below(dist);
        }

        let result = if request.return_words {
            let words = scored
                .indices
                .iter()
                .map(|&i| self.store.word_of(i).map(str::to_string))
                .collect::<Result<Vec<_>>>()?;
            Neighbours::Words(words)
        } else {
            Neighbours::Scored(scored)
        };

        let result = match memo_key {
            Some(key) => self.cache.memo().insert(key, result),
            None => result,
        };

        self.stats.record_query(outcome, start.elapsed());
        Ok(result)
    }

    /// Shorthand for a word-list lookup
    pub fn find_words(
        &self,
        element: impl Into<Query>,
        measure: Measure,
        topk: Option<usize>,
        dist: Option<f32>,
    ) -> Result<Vec<String>> {
        let request = NeighbourRequest {
            element: element.into(),
            measure,
            topk,
            dist,
            return_words: true,
        };
        Ok(self
            .find_neighbours(&request)?
            .into_words()
            .unwrap_or_default())
    }

    /// Shorthand for a (distances, indices) lookup
    pub fn find_scored(
        &self,
        element: impl Into<Query>,
        measure: Measure,
        topk: Option<usize>,
        dist: Option<f32>,
    ) -> Result<ScoredNeighbours> {
        let request = NeighbourRequest {
            element: element.into(),
            measure,
            topk,
            dist,
            return_words: false,
        };
        Ok(self
            .find_neighbours(&request)?
            .into_scored()
            .unwrap_or_default())
    }

    /// Precompute top-`topk` neighbours of every vector under `measure`.
    ///
    /// Blocks until the all-pairs scan finishes. Callers racing on the same
    /// (measure, topk) share one computation. Asking for the accelerator when
    /// none is installed logs a warning and leaves the cache untouched;
    /// lookups keep using the on-demand path.
    pub fn pre_search(&self, measure: Measure, topk: usize, use_accelerator: bool) -> Result<()> {
        let index: &dyn NeighborIndex = if use_accelerator {
            match &self.accelerator {
                Some(accelerator) => accelerator.as_ref(),
                None => {
                    let err = Error::MissingDependency("parallel neighbour index");
                    warn!("{}; {} top-{} lookups stay on-demand", err, measure, topk);
                    return Ok(());
                }
            }
        } else {
            &self.fallback
        };

        if self.has_bulk(measure, topk) {
            debug!("{} top-{} already precomputed", measure, topk);
            return Ok(());
        }

        info!(
            "Precomputing {} top-{} neighbours with {} backend",
            measure,
            topk,
            index.name()
        );

        let mut built = false;
        self.cache.bulk().get_or_compute(measure, topk, || {
            built = true;
            index.bulk_topk(measure, topk)
        })?;
        if built {
            self.stats.record_bulk_build(index.name());
        }
        Ok(())
    }

    fn resolve<'a>(&'a self, element: &'a Query) -> Result<Resolved<'a>> {
        match element {
            Query::Index(index) => Ok(Resolved {
                vector: self.store.vector_of(*index)?,
                index: Some(*index),
                key: Some(QueryKey::Index(*index)),
            }),
            Query::Word(word) => {
                let index = self.store.index_of(word)?;
                Ok(Resolved {
                    vector: self.store.vector_of(index)?,
                    index: Some(index),
                    key: Some(QueryKey::Word(word.clone())),
                })
            }
            Query::Vector { values, key } => {
                if values.len() != self.store.dimension() {
                    return Err(Error::InvalidQuery(format!(
                        "query vector has dimension {}, expected {}",
                        values.len(),
                        self.store.dimension()
                    )));
                }
                Ok(Resolved {
                    vector: values,
                    index: None,
                    key: key.clone().map(QueryKey::Keyed),
                })
            }
        }
    }

    /// Row of an installed bulk result, if the query has an index
    fn bulk_row(
        &self,
        index: Option<usize>,
        measure: Measure,
        topk: Option<usize>,
    ) -> Option<ScoredNeighbours> {
        let bulk = self.cache.bulk().get(measure, topk?)?;
        let (distances, indices) = bulk.row(index?)?;
        Some(ScoredNeighbours {
            distances: distances.to_vec(),
            indices: indices.to_vec(),
        })
    }

    fn lazy_topk(&self, query: &[f32], measure: Measure, topk: Option<usize>) -> ScoredNeighbours {
        let distances = SimilarityEngine::new(&self.store).distances(query, measure);
        let k = topk.unwrap_or(distances.len());
        let indices = select_topk(&distances, k);
        ScoredNeighbours {
            distances: indices.iter().map(|&i| distances[i]).collect(),
            indices,
        }
    }
}

#[cfg(feature = "parallel")]
fn default_accelerator(
    store: &Arc<VectorStore>,
    config: &NeighborConfig,
) -> Option<Arc<dyn NeighborIndex>> {
    use crate::index::ParallelIndex;

    if !config.accelerate {
        return None;
    }
    let index: Arc<dyn NeighborIndex> = Arc::new(ParallelIndex::new(
        store.clone(),
        config.workers,
        config.pin_to_cores,
    ));
    Some(index)
}

#[cfg(not(feature = "parallel"))]
fn default_accelerator(
    _store: &Arc<VectorStore>,
    config: &NeighborConfig,
) -> Option<Arc<dyn NeighborIndex>> {
    if config.accelerate {
        debug!("Parallel backend not compiled in");
    }
    None
}
