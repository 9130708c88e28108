//! ConsumerLoop - task queue からの受信ループ
//!
//! # フロー
//! 1. Deliveries から 1 件受け取る（shutdown と select で競合させる）
//! 2. TaskRecord にデコード（壊れていたら warn して ack せずに捨てる）
//! 3. WorkerPool に admit（空きが出るまで待つ）
//!
//! メッセージの処理順は保証しません。ack は executor が行います。

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::executor::TaskExecutor;
use super::pool::WorkerPool;
use crate::domain::TaskRecord;
use crate::ports::Deliveries;

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub received: u64,
    pub admitted: u64,
    pub malformed: u64,
}

pub struct ConsumerLoop {
    deliveries: Deliveries,
    pool: Arc<WorkerPool>,
    executor: Arc<TaskExecutor>,
}

impl ConsumerLoop {
    pub fn new(deliveries: Deliveries, pool: Arc<WorkerPool>, executor: Arc<TaskExecutor>) -> Self {
        Self {
            deliveries,
            pool,
            executor,
        }
    }

    /// Run on a background task.
    pub fn spawn(self) -> ConsumerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(shutdown_rx));
        ConsumerHandle { shutdown_tx, join }
    }

    /// Consume until the stream ends or shutdown is signalled.
    ///
    /// Executions already admitted keep running; drain the pool to wait for them.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> ConsumerStats {
        let mut stats = ConsumerStats::default();

        loop {
            if *shutdown.borrow() {
                break;
            }

            let delivery = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                next = self.deliveries.recv() => match next {
                    Some(delivery) => delivery,
                    None => {
                        info!("delivery stream closed");
                        break;
                    }
                },
            };
            stats.received += 1;

            let record = match TaskRecord::from_message(delivery.body()) {
                Ok(record) => record,
                Err(e) => {
                    warn!(
                        delivery_tag = delivery.delivery_tag(),
                        error = %e,
                        "dropping malformed task message"
                    );
                    stats.malformed += 1;
                    continue;
                }
            };
            debug!(task_id = %record.id, delivery_tag = delivery.delivery_tag(), "received task");

            let executor = Arc::clone(&self.executor);
            let admitted = tokio::select! {
                admitted = self.pool.admit(async move {
                    executor.run(record, delivery).await;
                }) => admitted,
                _ = shutdown.changed() => {
                    // 空き待ちの間に止められた。未 ack のまま手放す
                    info!("shutdown while waiting for a free slot");
                    break;
                }
            };

            match admitted {
                Ok(()) => stats.admitted += 1,
                Err(e) => {
                    warn!(error = %e, "stopping consumer");
                    break;
                }
            }
        }

        info!(
            received = stats.received,
            admitted = stats.admitted,
            malformed = stats.malformed,
            "consumer stopped"
        );
        stats
    }
}

/// Handle to a spawned consumer.
/// - `request_shutdown()` で受信を止める（実行中のタスクは止めない）
/// - `join()` でループの終了を待つ
pub struct ConsumerHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<ConsumerStats>,
}

impl ConsumerHandle {
    pub fn request_shutdown(&self) {
        // receiver が先に終わっていても構わない
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for the loop to end on its own (stream closed).
    pub async fn join(self) -> ConsumerStats {
        match self.join.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "consumer task failed");
                ConsumerStats::default()
            }
        }
    }

    pub async fn shutdown_and_join(self) -> ConsumerStats {
        self.request_shutdown();
        self.join().await
    }
}
