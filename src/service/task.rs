//! Async facade
//!
//! Runs lookups and precomputes on tokio's blocking pool so async hosts
//! never stall a runtime worker on an all-pairs scan.

use std::sync::Arc;
use tokio::task::{self, JoinError};

use super::{NeighbourRequest, NeighborService, Neighbours};
use crate::error::{Error, Result};
use crate::vector::Measure;

#[derive(Clone)]
pub struct AsyncNeighborService {
    inner: Arc<NeighborService>,
}

impl AsyncNeighborService {
    pub fn new(service: Arc<NeighborService>) -> Self {
        Self { inner: service }
    }

    pub fn inner(&self) -> &Arc<NeighborService> {
        &self.inner
    }

    pub async fn find_neighbours(&self, request: NeighbourRequest) -> Result<Neighbours> {
        let service = self.inner.clone();
        task::spawn_blocking(move || service.find_neighbours(&request))
            .await
            .map_err(task_failed)?
    }

    /// See [`NeighborService::pre_search`]
    pub async fn pre_search(&self, measure: Measure, topk: usize, use_accelerator: bool) -> Result<()> {
        let service = self.inner.clone();
        task::spawn_blocking(move || service.pre_search(measure, topk, use_accelerator))
            .await
            .map_err(task_failed)?
    }
}

fn task_failed(err: JoinError) -> Error {
    Error::TaskFailed(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::VectorStore;

    fn service() -> AsyncNeighborService {
        let store = VectorStore::from_rows(
            vec!["cat".into(), "dog".into(), "car".into()],
            vec![vec![1.0, 0.0], vec![0.9, 0.1], vec![0.0, 1.0]],
        )
        .unwrap();
        AsyncNeighborService::new(Arc::new(NeighborService::new(Arc::new(store))))
    }

    #[tokio::test]
    async fn test_async_lookup() {
        let service = service();
        let request = NeighbourRequest::new("car", Measure::Euclidean)
            .with_topk(1)
            .returning_words();
        let result = service.find_neighbours(request).await.unwrap();
        assert_eq!(result, Neighbours::Words(vec!["car".into()]));
    }

    #[tokio::test]
    async fn test_async_pre_search_then_lookup() {
        let service = service();
        service.pre_search(Measure::Cosine, 2, false).await.unwrap();
        assert!(service.inner().has_bulk(Measure::Cosine, 2));

        let request = NeighbourRequest::new(1usize, Measure::Cosine).with_topk(2);
        let scored = service
            .find_neighbours(request)
            .await
            .unwrap()
            .into_scored()
            .unwrap();
        assert_eq!(scored.indices, vec![1, 0]);
        assert_eq!(service.inner().stats().bulk_hits(), 1);
    }

    #[test]
    fn test_errors_cross_the_blocking_boundary() {
        let service = service();
        let request = NeighbourRequest::new("bird", Measure::Cosine);
        let result = tokio_test::block_on(service.find_neighbours(request));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
