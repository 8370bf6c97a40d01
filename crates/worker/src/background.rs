//! Detached background work.
//!
//! Stale-while-revalidate refreshes run after the response they were
//! triggered by has already been returned. Their failures are logged and
//! never reach a caller. Dropping the last handle abandons any pending work.

use phaseout_core::Error;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinSet;

/// Spawner for fire-and-forget tasks that can still be awaited on shutdown.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `task` in the background, logging its error if it fails.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(&self, label: String, task: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let mut tasks = self.lock();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            if let Err(e) = task.await {
                tracing::warn!(task = %label, error = %e, "background task failed");
            }
        });
    }

    /// Number of tasks spawned and not yet reaped.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Wait for every spawned task, including ones spawned while waiting.
    pub async fn settle(&self) {
        loop {
            let mut tasks = std::mem::take(&mut *self.lock());
            if tasks.is_empty() {
                return;
            }
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result
                    && e.is_panic()
                {
                    tracing::error!(error = %e, "background task panicked");
                }
            }
        }
    }
}

impl std::fmt::Debug for BackgroundTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTasks").field("pending", &self.pending()).finish()
    }
}
