//! Bulk result tier
//!
//! Finished all-pairs results keyed by (measure, k), plus a registry of
//! computations still running so each key is computed at most once at a time.

use dashmap::DashMap;
use hashbrown::HashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::index::BulkResult;
use crate::vector::Measure;

type BulkKey = (Measure, usize);

/// One in-progress computation that followers wait on
struct Flight {
    outcome: Mutex<Option<Result<Arc<BulkResult>>>>,
    done: Condvar,
}

impl Flight {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn complete(&self, outcome: Result<Arc<BulkResult>>) {
        *self.outcome.lock() = Some(outcome);
        self.done.notify_all();
    }

    fn wait(&self) -> Result<Arc<BulkResult>> {
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(result) = outcome.as_ref() {
                return result.clone();
            }
            self.done.wait(&mut outcome);
        }
    }
}

/// Held by the caller that computes; releases followers even on panic
struct Leader<'a> {
    cache: &'a BulkCache,
    key: BulkKey,
    flight: Arc<Flight>,
    finished: bool,
}

impl Leader<'_> {
    fn finish(mut self, outcome: Result<Arc<BulkResult>>) -> Result<Arc<BulkResult>> {
        if let Ok(result) = &outcome {
            self.cache.results.insert(self.key, result.clone());
        }
        self.cache.in_flight.lock().remove(&self.key);
        self.flight.complete(outcome.clone());
        self.finished = true;
        outcome
    }
}

impl Drop for Leader<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.cache.in_flight.lock().remove(&self.key);
            self.flight.complete(Err(Error::TaskFailed(
                "bulk precompute did not complete".to_string(),
            )));
        }
    }
}

/// Append-only store of bulk results with single-flight computation
#[derive(Default)]
pub struct BulkCache {
    results: DashMap<BulkKey, Arc<BulkResult>>,
    in_flight: Mutex<HashMap<BulkKey, Arc<Flight>>>,
}

impl BulkCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, measure: Measure, k: usize) -> Option<Arc<BulkResult>> {
        self.results.get(&(measure, k)).map(|r| r.value().clone())
    }

    pub fn contains(&self, measure: Measure, k: usize) -> bool {
        self.results.contains_key(&(measure, k))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of computations currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Return the cached result for (measure, k), computing it if absent.
    ///
    /// Concurrent callers for the same key block until the first caller's
    /// `compute` finishes and share its outcome. Failures are handed to the
    /// waiting callers but not cached.
    pub fn get_or_compute<F>(&self, measure: Measure, k: usize, compute: F) -> Result<Arc<BulkResult>>
    where
        F: FnOnce() -> Result<BulkResult>,
    {
        let key = (measure, k);
        if let Some(hit) = self.get(measure, k) {
            return Ok(hit);
        }

        let leader = {
            let mut in_flight = self.in_flight.lock();
            // A leader may have finished between the fast path and taking the lock
            if let Some(hit) = self.get(measure, k) {
                return Ok(hit);
            }
            match in_flight.get(&key) {
                Some(flight) => Err(flight.clone()),
                None => {
                    let flight = Arc::new(Flight::new());
                    in_flight.insert(key, flight.clone());
                    Ok(Leader {
                        cache: self,
                        key,
                        flight,
                        finished: false,
                    })
                }
            }
        };

        match leader {
            Ok(leader) => {
                let outcome = compute().map(Arc::new);
                leader.finish(outcome)
            }
            Err(flight) => {
                debug!("Waiting on in-flight {} top-{} precompute", measure, k);
                flight.wait()
            }
        }
    }
}
