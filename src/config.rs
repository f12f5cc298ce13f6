//! Service Configuration

use crate::error::{Error, Result};

const MAX_WORKERS: usize = 1024;

/// Neighbour service configuration
#[derive(Debug, Clone)]
pub struct NeighborConfig {
    /// Number of bulk precompute workers (0 = auto-detect)
    pub workers: usize,

    /// Pin bulk workers to CPU cores
    pub pin_to_cores: bool,

    /// Install the parallel backend when it is compiled in
    pub accelerate: bool,

    /// Cache per-query results
    pub memoize: bool,
}

impl Default for NeighborConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            pin_to_cores: false,
            accelerate: true,
            memoize: true,
        }
    }
}

impl NeighborConfig {
    /// Set number of bulk workers
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Enable/disable CPU pinning
    pub fn with_pin_to_cores(mut self, pin: bool) -> Self {
        self.pin_to_cores = pin;
        self
    }

    /// Enable/disable the parallel backend
    pub fn with_accelerate(mut self, accelerate: bool) -> Self {
        self.accelerate = accelerate;
        self
    }

    /// Enable/disable per-query memoization
    pub fn with_memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    /// Resolved worker count
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.workers > MAX_WORKERS {
            return Err(Error::configuration(format!(
                "workers must be at most {}, got {}",
                MAX_WORKERS, self.workers
            )));
        }
        Ok(())
    }
}
