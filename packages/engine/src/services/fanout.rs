//! Fan-out/fan-in barrier for decision requests.
//!
//! Every request in a step runs concurrently, capped by a semaphore, and
//! each one is bounded by a timeout. The step waits for all of them and
//! hands results back in request order, so arrival order never leaks into
//! game outcomes.

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::error::AgentError;

#[derive(Clone)]
pub struct FanOut {
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl FanOut {
    pub fn new(max_concurrency: usize, timeout: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            timeout,
        }
    }

    /// Runs one labelled request per entry and returns `(label, result)`
    /// pairs in the same order.
    pub async fn gather<K, T, F>(&self, requests: Vec<(K, F)>) -> Vec<(K, Result<T, AgentError>)>
    where
        F: Future<Output = Result<T, AgentError>>,
    {
        let (labels, futures): (Vec<K>, Vec<F>) = requests.into_iter().unzip();
        let results = join_all(futures.into_iter().map(|request| self.bounded(request))).await;
        labels.into_iter().zip(results).collect()
    }

    /// Runs a single request under the same cap and timeout.
    pub async fn one<T, F>(&self, request: F) -> Result<T, AgentError>
    where
        F: Future<Output = Result<T, AgentError>>,
    {
        self.bounded(request).await
    }

    async fn bounded<T, F>(&self, request: F) -> Result<T, AgentError>
    where
        F: Future<Output = Result<T, AgentError>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| AgentError::Unavailable)?;
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Timeout(self.timeout)),
        }
    }
}
