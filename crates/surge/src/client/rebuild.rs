//! Bounded async rebuild pool

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Executor for asynchronous cache rebuilds, owned by the client instance
///
/// Concurrency is bounded by a semaphore: at most `workers` rebuilds run at
/// once. Submissions past that queue inside their own spawned future, so the
/// submitting reader is never blocked.
#[derive(Clone)]
pub(crate) struct RebuildPool {
    permits: Arc<Semaphore>,
}

impl RebuildPool {
    pub(crate) fn new(workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers)),
        }
    }

    /// Submit a rebuild task; returns immediately
    pub(crate) fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = self.permits.clone();
        tokio::spawn(async move {
            // the semaphore is never closed, so this only fails at shutdown
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            task.await;
        });
    }
}
