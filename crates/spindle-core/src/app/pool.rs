//! WorkerPool - 同時実行数の上限
//!
//! permit を取ってから spawn し、タスクが終わるまで permit を持ち続けます。
//! permit が空くまで `admit` は待つので、consumer はそれ以上メッセージを
//! 受け取りません（= broker 側にバックプレッシャーがかかる）。

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// The pool has been drained and no longer admits work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("worker pool is closed")]
pub struct PoolClosed;

/// Bounded set of concurrently running executions.
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    capacity: usize,
    running: Mutex<JoinSet<()>>,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            running: Mutex::new(JoinSet::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Executions currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.permits.available_permits())
    }

    /// Wait for a free slot, then run `task` in the background.
    ///
    /// Cancel-safe: dropping the returned future before it resolves drops
    /// `task` without running it.
    pub async fn admit<F>(&self, task: F) -> Result<(), PoolClosed>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolClosed)?;

        let mut running = self.lock();
        running.spawn(async move {
            task.await;
            drop(permit);
        });

        // 終わったものをここで回収しておく
        while let Some(done) = running.try_join_next() {
            log_join(done);
        }
        Ok(())
    }

    /// Stop admitting and wait for every running execution to finish.
    pub async fn drain(&self) {
        self.permits.close();
        let mut running = std::mem::take(&mut *self.lock());
        debug!(remaining = running.len(), "draining worker pool");
        while let Some(done) = running.join_next().await {
            log_join(done);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!(error = %e, "execution panicked");
        }
    }
}
