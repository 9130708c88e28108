//! TaskExecutor - 1 タスク分の状態機械
//!
//! # フロー
//! 1. status=processing, process=0 を書く（拒否されたら中断して ack）
//! 2. tick loop を別タスクで起動し、watchdog と競わせる
//! 3. 最大 N tick: キャンセル → unit of work → progress 書き込み
//!    （watchdog が先に切れたら tick を待たずに timed_out）
//! 4. 全 tick 完了なら completed
//! 5. StatusStore と突き合わせてから終端状態を 1 回だけ書く
//! 6. メッセージを ack（結果に関係なく必ず 1 回）

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use tracing::{Instrument, debug, error, info, info_span, warn};

use super::cancellation::CancellationRegistry;
use crate::domain::{Progress, StopReason, StoreError, TaskId, TaskRecord, TaskStatus, WorkError};
use crate::ports::{Delivery, StatusStore, UnitOfWork};

/// How an execution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The processing write was refused; no tick ran.
    Abandoned { reason: StoreError },

    /// The task reached a terminal status (as recorded in the store when the
    /// terminal write succeeded or was a no-op).
    Finished { status: TaskStatus, process: Progress },
}

/// Summary of one execution, returned for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub task_id: TaskId,
    pub outcome: ExecutionOutcome,
    /// Ticks whose unit of work completed.
    pub ticks_run: u32,
    /// Why ticking stopped before the last tick, if it did.
    pub stop_reason: Option<StopReason>,
    /// The terminal write failed for a reason other than a same-value no-op.
    pub write_error: Option<StoreError>,
}

impl ExecutionReport {
    pub fn status(&self) -> Option<TaskStatus> {
        match &self.outcome {
            ExecutionOutcome::Finished { status, .. } => Some(*status),
            ExecutionOutcome::Abandoned { .. } => None,
        }
    }

    pub fn process(&self) -> Option<Progress> {
        match &self.outcome {
            ExecutionOutcome::Finished { process, .. } => Some(*process),
            ExecutionOutcome::Abandoned { .. } => None,
        }
    }
}

/// Result of the tick loop before reconciliation.
struct Ticking {
    /// `None` when a store write failed and the status must come from the store.
    status: Option<TaskStatus>,
    process: Progress,
    ticks_run: u32,
    stop_reason: Option<StopReason>,
}

/// The tick loop of one execution, run on its own task.
///
/// Once the watchdog has fired nobody waits for it any more; it only finishes
/// the tick in hand and stops without writing.
struct TickLoop {
    store: Arc<dyn StatusStore>,
    registry: Arc<CancellationRegistry>,
    work: Arc<dyn UnitOfWork>,
    id: TaskId,
    ticks: u32,
    watchdog: Duration,
    expired: Arc<AtomicBool>,
    /// Ticks whose progress write was applied.
    committed: Arc<AtomicU32>,
}

impl TickLoop {
    async fn run(self) -> Ticking {
        let id = &self.id;
        let mut process = Progress::ZERO;

        for tick in 1..=self.ticks {
            let ticks_run = tick - 1;

            if self.expired.load(Ordering::Acquire) {
                return self.timed_out(process, ticks_run);
            }

            if self.registry.consume(id) {
                debug!(tick, "cancellation requested");
                return Ticking {
                    status: Some(TaskStatus::Cancelled),
                    process,
                    ticks_run,
                    stop_reason: Some(StopReason::CancelRequested),
                };
            }

            if let Err(e) = self.work.run_tick(id, tick).await {
                warn!(tick, error = %e, "unit of work failed");
                return Ticking {
                    status: Some(TaskStatus::Error),
                    process,
                    ticks_run,
                    stop_reason: Some(StopReason::Work(e)),
                };
            }

            if self.expired.load(Ordering::Acquire) {
                debug!(tick, "tick returned after the watchdog, dropping its progress");
                return self.timed_out(process, tick);
            }

            let next = Progress::after_tick(tick, self.ticks);
            if let Err(e) = self.store.write(id, TaskStatus::Processing, next).await {
                info!(tick, error = %e, "progress write refused, stopping");
                return Ticking {
                    status: None,
                    process,
                    ticks_run: tick,
                    stop_reason: Some(StopReason::StoreConflict(e)),
                };
            }
            process = next;
            self.committed.store(tick, Ordering::Release);
            debug!(tick, process = %process, "tick done");
        }

        Ticking {
            status: Some(TaskStatus::Completed),
            process,
            ticks_run: self.ticks,
            stop_reason: None,
        }
    }

    fn timed_out(&self, process: Progress, ticks_run: u32) -> Ticking {
        Ticking {
            status: Some(TaskStatus::TimedOut),
            process,
            ticks_run,
            stop_reason: Some(StopReason::Watchdog(self.watchdog)),
        }
    }
}

/// Runs one task through `pending -> processing -> terminal`.
///
/// Cancellation is cooperative: it is checked at tick boundaries and a
/// running tick is never interrupted, so detection latency is at most one
/// tick's duration. The watchdog does not wait for a boundary. When it fires
/// the executor finalizes `timed_out` with the last committed process and
/// leaves the running tick to finish on its own.
pub struct TaskExecutor {
    store: Arc<dyn StatusStore>,
    registry: Arc<CancellationRegistry>,
    work: Arc<dyn UnitOfWork>,
    ticks: u32,
    watchdog: Duration,
}

impl TaskExecutor {
    pub fn new(
        store: Arc<dyn StatusStore>,
        registry: Arc<CancellationRegistry>,
        work: Arc<dyn UnitOfWork>,
        ticks: u32,
        watchdog: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            work,
            ticks,
            watchdog,
        }
    }

    /// Execute `record`, then acknowledge `delivery` exactly once.
    pub async fn run(&self, record: TaskRecord, delivery: Box<dyn Delivery>) -> ExecutionReport {
        let tag = delivery.delivery_tag();
        let report = self.execute(&record).await;

        if let Err(e) = delivery.ack().await {
            warn!(task_id = %record.id, delivery_tag = tag, error = %e, "ack failed");
        }
        report
    }

    /// Execute `record` without touching the broker.
    pub async fn execute(&self, record: &TaskRecord) -> ExecutionReport {
        let span = info_span!("execute_task", task_id = %record.id);
        self.execute_inner(&record.id).instrument(span).await
    }

    async fn execute_inner(&self, id: &TaskId) -> ExecutionReport {
        // 1. ownership を取る
        if let Err(reason) = self
            .store
            .write(id, TaskStatus::Processing, Progress::ZERO)
            .await
        {
            // キャンセル済みのタスクに残った印を掃除する
            self.registry.consume(id);
            info!(error = %reason, "task cancelled or missing before start, abandoning");
            return ExecutionReport {
                task_id: id.clone(),
                outcome: ExecutionOutcome::Abandoned { reason },
                ticks_run: 0,
                stop_reason: None,
                write_error: None,
            };
        }
        debug!("processing");

        // 2-4. tick loop を切り離して watchdog と競わせる
        let expired = Arc::new(AtomicBool::new(false));
        let committed = Arc::new(AtomicU32::new(0));
        let ticking = tokio::spawn(
            TickLoop {
                store: Arc::clone(&self.store),
                registry: Arc::clone(&self.registry),
                work: Arc::clone(&self.work),
                id: id.clone(),
                ticks: self.ticks,
                watchdog: self.watchdog,
                expired: Arc::clone(&expired),
                committed: Arc::clone(&committed),
            }
            .run()
            .in_current_span(),
        );

        let ticked = tokio::select! {
            joined = ticking => match joined {
                Ok(ticked) => ticked,
                Err(e) => {
                    let ticks_run = committed.load(Ordering::Acquire);
                    error!(error = %e, "tick loop panicked");
                    Ticking {
                        status: Some(TaskStatus::Error),
                        process: Progress::after_tick(ticks_run, self.ticks),
                        ticks_run,
                        stop_reason: Some(StopReason::Work(WorkError::Failed {
                            tick: ticks_run.saturating_add(1),
                            reason: e.to_string(),
                        })),
                    }
                }
            },
            _ = tokio::time::sleep(self.watchdog) => {
                // 実行中の tick は待たずに手放す。遅れた progress は終端状態に拒否される
                expired.store(true, Ordering::Release);
                let ticks_run = committed.load(Ordering::Acquire);
                info!(watchdog = ?self.watchdog, ticks_run, "watchdog fired, finalizing without the running tick");
                Ticking {
                    status: Some(TaskStatus::TimedOut),
                    process: Progress::after_tick(ticks_run, self.ticks),
                    ticks_run,
                    stop_reason: Some(StopReason::Watchdog(self.watchdog)),
                }
            }
        };

        // 5. 突き合わせて終端状態を書く
        let (status, process, write_error) = self.finalize(id, ticked.status, ticked.process).await;

        info!(status = %status, process = %process, ticks = ticked.ticks_run, "task finished");
        ExecutionReport {
            task_id: id.clone(),
            outcome: ExecutionOutcome::Finished { status, process },
            ticks_run: ticked.ticks_run,
            stop_reason: ticked.stop_reason,
            write_error,
        }
    }

    /// Reconcile with the store, then write the terminal status once.
    ///
    /// A terminal status already in the store wins over the local one, so the
    /// write below becomes the same-value no-op.
    async fn finalize(
        &self,
        id: &TaskId,
        local: Option<TaskStatus>,
        process: Progress,
    ) -> (TaskStatus, Progress, Option<StoreError>) {
        let (mut status, mut process) = (local, process);

        match self.store.get(id).await {
            Ok(Some(entry)) if entry.status.is_terminal() => {
                if local != Some(entry.status) {
                    info!(stored = %entry.status, "already finalized elsewhere, adopting");
                }
                status = Some(entry.status);
                process = entry.process;
            }
            // 切り離された tick が直前に書いた progress を巻き戻さない
            Ok(Some(entry)) => process = process.max(entry.process),
            Ok(None) => warn!("task vanished from the store"),
            Err(e) => warn!(error = %e, "could not reconcile with the store"),
        }

        let status = status.unwrap_or(TaskStatus::Error);
        let written = self.store.write(id, status, process).await;

        // 終端が確定した後に印を消す。これより前に届いた cancel の印も残らない
        self.registry.consume(id);

        match written {
            Ok(entry) => (entry.status, entry.process, None),
            Err(StoreError::Conflict { current, .. }) => {
                // 終端の書き込みと同時に別の writer が確定させた
                info!(stored = %current, "terminal write lost the race, adopting");
                let process = match self.store.get(id).await {
                    Ok(Some(entry)) => entry.process,
                    _ => process,
                };
                (current, process, None)
            }
            Err(e) => {
                warn!(status = %status, error = %e, "terminal write failed");
                (status, process, Some(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StatusEntry;
    use crate::impls::{InMemoryBroker, InMemoryStatusStore, SimulatedWork};
    use crate::ports::Broker;
    use async_trait::async_trait;

    const TICK: Duration = Duration::from_secs(1);
    const WATCHDOG: Duration = Duration::from_secs(50);

    fn p(n: u8) -> Progress {
        Progress::new(n).unwrap()
    }

    struct Fixture {
        store: Arc<InMemoryStatusStore>,
        registry: Arc<CancellationRegistry>,
        record: TaskRecord,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = Arc::new(InMemoryStatusStore::new().with_journal());
            let record = TaskRecord::new(TaskId::new("task-1"));
            store.insert(&record).await.unwrap();
            Self {
                store,
                registry: Arc::new(CancellationRegistry::new()),
                record,
            }
        }

        fn executor(&self, work: Arc<dyn UnitOfWork>, watchdog: Duration) -> TaskExecutor {
            TaskExecutor::new(self.store.clone(), self.registry.clone(), work, 10, watchdog)
        }

        async fn stored(&self) -> (TaskStatus, Progress) {
            let entry = self.store.get(&self.record.id).await.unwrap().unwrap();
            (entry.status, entry.process)
        }

        async fn terminal_writes(&self) -> usize {
            self.store
                .journal(&self.record.id)
                .await
                .iter()
                .filter(|(s, _)| s.is_terminal())
                .count()
        }
    }

    /// Simulates a cancel request landing while tick `at` runs.
    struct CancelDuringTick {
        at: u32,
        mark_registry: bool,
        write_store: bool,
        store: Arc<InMemoryStatusStore>,
        registry: Arc<CancellationRegistry>,
    }

    #[async_trait]
    impl UnitOfWork for CancelDuringTick {
        async fn run_tick(&self, task_id: &TaskId, tick: u32) -> Result<(), WorkError> {
            if tick == self.at {
                if self.mark_registry {
                    self.registry.request(task_id);
                }
                if self.write_store {
                    let current = self.store.get(task_id).await.unwrap().unwrap().process;
                    self.store
                        .write(task_id, TaskStatus::Cancelled, current)
                        .await
                        .unwrap();
                }
            }
            tokio::time::sleep(TICK).await;
            Ok(())
        }
    }

    struct FailAt(u32);

    #[async_trait]
    impl UnitOfWork for FailAt {
        async fn run_tick(&self, _task_id: &TaskId, tick: u32) -> Result<(), WorkError> {
            if tick == self.0 {
                return Err(WorkError::Failed {
                    tick,
                    reason: "boom".into(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_to_completion() {
        let fx = Fixture::new().await;
        let executor = fx.executor(Arc::new(SimulatedWork::new(TICK)), WATCHDOG);

        let report = executor.execute(&fx.record).await;

        assert_eq!(report.status(), Some(TaskStatus::Completed));
        assert_eq!(report.process(), Some(Progress::DONE));
        assert_eq!(report.ticks_run, 10);
        assert!(report.stop_reason.is_none());
        assert_eq!(fx.stored().await, (TaskStatus::Completed, Progress::DONE));

        // pending, processing 0, 10 progress writes, completed
        let journal = fx.store.journal(&fx.record.id).await;
        assert_eq!(journal.len(), 13);
        assert_eq!(journal[1], (TaskStatus::Processing, Progress::ZERO));
        assert_eq!(journal[6], (TaskStatus::Processing, p(50)));
        assert_eq!(journal[12], (TaskStatus::Completed, Progress::DONE));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_requested_before_first_tick() {
        let fx = Fixture::new().await;
        fx.registry.request(&fx.record.id);
        let executor = fx.executor(Arc::new(SimulatedWork::new(TICK)), WATCHDOG);

        let report = executor.execute(&fx.record).await;

        assert_eq!(report.status(), Some(TaskStatus::Cancelled));
        assert_eq!(report.process(), Some(Progress::ZERO));
        assert_eq!(report.ticks_run, 0);
        assert_eq!(report.stop_reason, Some(StopReason::CancelRequested));
        assert!(!fx.registry.consume(&fx.record.id));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_tick_five_keeps_fifty() {
        let fx = Fixture::new().await;
        // 印は tick 5 の間に付き、tick 6 の境界で検知される
        let work = Arc::new(CancelDuringTick {
            at: 5,
            mark_registry: true,
            write_store: false,
            store: fx.store.clone(),
            registry: fx.registry.clone(),
        });
        let executor = fx.executor(work, WATCHDOG);

        let report = executor.execute(&fx.record).await;

        assert_eq!(report.status(), Some(TaskStatus::Cancelled));
        assert_eq!(report.process(), Some(p(50)));
        assert_eq!(report.ticks_run, 5);
        assert_eq!(report.stop_reason, Some(StopReason::CancelRequested));
        assert_eq!(fx.stored().await, (TaskStatus::Cancelled, p(50)));
        assert_eq!(fx.terminal_writes().await, 1);
        assert!(report.write_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_landing_mid_tick_wins_over_progress_write() {
        let fx = Fixture::new().await;
        let work = Arc::new(CancelDuringTick {
            at: 6,
            mark_registry: true,
            write_store: true,
            store: fx.store.clone(),
            registry: fx.registry.clone(),
        });
        let executor = fx.executor(work, WATCHDOG);

        let report = executor.execute(&fx.record).await;

        // tick 6 の progress(60) は拒否される
        assert_eq!(report.status(), Some(TaskStatus::Cancelled));
        assert_eq!(report.process(), Some(p(50)));
        assert_eq!(fx.stored().await, (TaskStatus::Cancelled, p(50)));
        assert_eq!(fx.terminal_writes().await, 1);
        assert!(!fx.registry.consume(&fx.record.id));
    }

    #[tokio::test(start_paused = true)]
    async fn store_cancel_without_marker_stops_at_next_write() {
        let fx = Fixture::new().await;
        let work = Arc::new(CancelDuringTick {
            at: 3,
            mark_registry: false,
            write_store: true,
            store: fx.store.clone(),
            registry: fx.registry.clone(),
        });
        let executor = fx.executor(work, WATCHDOG);

        let report = executor.execute(&fx.record).await;

        // ghost progress は残らない
        assert_eq!(report.status(), Some(TaskStatus::Cancelled));
        assert_eq!(report.process(), Some(p(20)));
        assert!(matches!(
            report.stop_reason,
            Some(StopReason::StoreConflict(StoreError::Conflict { .. }))
        ));
        assert_eq!(fx.stored().await, (TaskStatus::Cancelled, p(20)));
        assert_eq!(fx.terminal_writes().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_finalizes_without_waiting_for_the_tick() {
        let fx = Fixture::new().await;
        let executor = fx.executor(
            Arc::new(SimulatedWork::new(Duration::from_secs(10))),
            Duration::from_secs(45),
        );

        let start = tokio::time::Instant::now();
        let report = executor.execute(&fx.record).await;

        // tick 5 の途中 (45s) で発火。tick 4 までの 40 で確定する
        assert_eq!(report.status(), Some(TaskStatus::TimedOut));
        assert_eq!(report.process(), Some(p(40)));
        assert_eq!(report.ticks_run, 4);
        assert_eq!(report.stop_reason, Some(StopReason::Watchdog(Duration::from_secs(45))));
        assert_eq!(start.elapsed(), Duration::from_secs(45));
        assert_eq!(fx.stored().await, (TaskStatus::TimedOut, p(40)));

        // 切り離された tick 5 が終わっても progress は増えない
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fx.stored().await, (TaskStatus::TimedOut, p(40)));
        assert_eq!(fx.terminal_writes().await, 1);
    }

    struct Hang;

    #[async_trait]
    impl UnitOfWork for Hang {
        async fn run_tick(&self, _task_id: &TaskId, _tick: u32) -> Result<(), WorkError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_tick_still_times_out_and_acks() {
        let fx = Fixture::new().await;
        let broker = InMemoryBroker::new();
        broker.declare_queue("q").await.unwrap();
        broker.publish("q", fx.record.to_message()).await.unwrap();
        let mut deliveries = broker.consume("q").await.unwrap();
        let delivery = deliveries.recv().await.unwrap();
        let tag = delivery.delivery_tag();

        let executor = fx.executor(Arc::new(Hang), WATCHDOG);
        let start = tokio::time::Instant::now();
        let report = tokio::time::timeout(
            Duration::from_secs(3600),
            executor.run(fx.record.clone(), delivery),
        )
        .await
        .expect("execution must end at the watchdog");

        assert_eq!(start.elapsed(), WATCHDOG);
        assert_eq!(report.status(), Some(TaskStatus::TimedOut));
        assert_eq!(report.process(), Some(Progress::ZERO));
        assert_eq!(report.ticks_run, 0);
        assert_eq!(fx.stored().await, (TaskStatus::TimedOut, Progress::ZERO));
        assert_eq!(broker.ack_counts("q").get(&tag), Some(&1));
        assert_eq!(broker.counts("q").unwrap().unacked, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn work_failure_ends_in_error() {
        let fx = Fixture::new().await;
        let executor = fx.executor(Arc::new(FailAt(3)), WATCHDOG);

        let report = executor.execute(&fx.record).await;

        assert_eq!(report.status(), Some(TaskStatus::Error));
        assert_eq!(report.process(), Some(p(20)));
        assert!(matches!(report.stop_reason, Some(StopReason::Work(_))));
        assert_eq!(fx.stored().await, (TaskStatus::Error, p(20)));
    }

    #[tokio::test(start_paused = true)]
    async fn already_cancelled_task_is_abandoned() {
        let fx = Fixture::new().await;
        fx.store
            .write(&fx.record.id, TaskStatus::Cancelled, Progress::ZERO)
            .await
            .unwrap();
        fx.registry.request(&fx.record.id);
        let executor = fx.executor(Arc::new(SimulatedWork::new(TICK)), WATCHDOG);

        let report = executor.execute(&fx.record).await;

        assert!(matches!(
            report.outcome,
            ExecutionOutcome::Abandoned {
                reason: StoreError::Conflict {
                    current: TaskStatus::Cancelled,
                    ..
                }
            }
        ));
        assert_eq!(fx.stored().await, (TaskStatus::Cancelled, Progress::ZERO));
        assert!(!fx.registry.consume(&fx.record.id));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_task_is_abandoned() {
        let fx = Fixture::new().await;
        let executor = fx.executor(Arc::new(SimulatedWork::new(TICK)), WATCHDOG);

        let report = executor.execute(&TaskRecord::new(TaskId::new("ghost"))).await;

        assert!(matches!(
            report.outcome,
            ExecutionOutcome::Abandoned {
                reason: StoreError::NotFound(_)
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn run_acks_exactly_once_even_when_abandoned() {
        let fx = Fixture::new().await;
        fx.store
            .write(&fx.record.id, TaskStatus::Cancelled, Progress::ZERO)
            .await
            .unwrap();

        let broker = InMemoryBroker::new();
        broker.declare_queue("q").await.unwrap();
        broker.publish("q", fx.record.to_message()).await.unwrap();
        let mut deliveries = broker.consume("q").await.unwrap();
        let delivery = deliveries.recv().await.unwrap();
        let tag = delivery.delivery_tag();

        let executor = fx.executor(Arc::new(SimulatedWork::new(TICK)), WATCHDOG);
        let report = executor.run(fx.record.clone(), delivery).await;

        assert_eq!(report.status(), None);
        assert_eq!(broker.ack_counts("q").get(&tag), Some(&1));
        assert_eq!(broker.counts("q").unwrap().unacked, 0);
    }

    /// Store whose first `get` lets a cancel land right after the read.
    struct CancelAfterReconcileRead {
        inner: Arc<InMemoryStatusStore>,
        registry: Arc<CancellationRegistry>,
        armed: AtomicBool,
    }

    #[async_trait]
    impl StatusStore for CancelAfterReconcileRead {
        async fn insert(&self, record: &TaskRecord) -> Result<(), StoreError> {
            self.inner.insert(record).await
        }

        async fn get(&self, id: &TaskId) -> Result<Option<StatusEntry>, StoreError> {
            let seen = self.inner.get(id).await?;
            if self.armed.swap(false, Ordering::SeqCst) {
                if let Some(entry) = &seen {
                    self.registry.request(id);
                    self.inner
                        .write(id, TaskStatus::Cancelled, entry.process)
                        .await?;
                }
            }
            Ok(seen)
        }

        async fn write(
            &self,
            id: &TaskId,
            status: TaskStatus,
            process: Progress,
        ) -> Result<StatusEntry, StoreError> {
            self.inner.write(id, status, process).await
        }

        async fn purge_finished(
            &self,
            cutoff: chrono::DateTime<chrono::Utc>,
        ) -> Result<usize, StoreError> {
            self.inner.purge_finished(cutoff).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_racing_the_terminal_write_leaves_no_marker() {
        let fx = Fixture::new().await;
        let store = Arc::new(CancelAfterReconcileRead {
            inner: fx.store.clone(),
            registry: fx.registry.clone(),
            armed: AtomicBool::new(true),
        });
        let executor = TaskExecutor::new(
            store,
            fx.registry.clone(),
            Arc::new(SimulatedWork::new(TICK)),
            10,
            WATCHDOG,
        );

        let report = executor.execute(&fx.record).await;

        // completed の書き込みは cancelled に負けて、それを採用する
        assert_eq!(report.status(), Some(TaskStatus::Cancelled));
        assert_eq!(report.process(), Some(Progress::DONE));
        assert!(report.write_error.is_none());
        assert_eq!(fx.terminal_writes().await, 1);
        assert!(!fx.registry.consume(&fx.record.id));
    }
}
