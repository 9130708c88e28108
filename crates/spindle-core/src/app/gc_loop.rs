//! GcLoop - 終端状態のエントリの削除
//!
//! # フロー
//! 1. interval ごとに cutoff = now - retention を計算
//! 2. StatusStore::purge_finished(cutoff) で終端かつ古いエントリを削除
//!
//! 実行中（pending / processing）のエントリには触れません。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::StoreError;
use crate::ports::{Clock, StatusStore};

pub struct GcLoop {
    store: Arc<dyn StatusStore>,
    clock: Arc<dyn Clock>,
    retention: Duration,
    interval: Duration,
}

impl GcLoop {
    pub fn new(
        store: Arc<dyn StatusStore>,
        clock: Arc<dyn Clock>,
        retention: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            retention,
            interval,
        }
    }

    /// One pass. Returns how many entries were removed.
    pub async fn sweep(&self) -> Result<usize, StoreError> {
        let Ok(retention) = chrono::Duration::from_std(self.retention) else {
            return Ok(0);
        };
        let Some(cutoff) = self.clock.now().checked_sub_signed(retention) else {
            return Ok(0);
        };
        self.store.purge_finished(cutoff).await
    }

    pub fn spawn(self) -> GcHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(shutdown_rx));
        GcHandle { shutdown_tx, join }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }
            if *shutdown.borrow() {
                break;
            }

            match self.sweep().await {
                Ok(0) => debug!("gc: nothing to purge"),
                Ok(purged) => info!(purged, "gc: purged finished tasks"),
                Err(e) => warn!(error = %e, "gc sweep failed"),
            }
        }
    }
}

pub struct GcHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl GcHandle {
    pub async fn shutdown_and_join(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.join.await;
    }
}
