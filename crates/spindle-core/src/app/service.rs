//! TaskService - create / query / cancel / update
//!
//! HTTP ハンドラから呼ばれる操作をまとめたもの。
//! StatusStore への書き込みはすべて条件付き（transition ルール）なので、
//! executor と同時に動いても終端状態は 1 回しか確定しません。

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::cancellation::CancellationRegistry;
use crate::domain::{Progress, ServiceError, StoreError, TaskId, TaskRecord, TaskStatus};
use crate::ports::{Broker, IdGenerator, StatusStore};

pub struct TaskService {
    store: Arc<dyn StatusStore>,
    broker: Arc<dyn Broker>,
    registry: Arc<CancellationRegistry>,
    ids: Arc<dyn IdGenerator>,
    queue: String,
}

impl TaskService {
    pub fn new(
        store: Arc<dyn StatusStore>,
        broker: Arc<dyn Broker>,
        registry: Arc<CancellationRegistry>,
        ids: Arc<dyn IdGenerator>,
        queue: impl Into<String>,
    ) -> Self {
        Self {
            store,
            broker,
            registry,
            ids,
            queue: queue.into(),
        }
    }

    /// Store a new `pending` task, then publish it.
    ///
    /// If publishing fails the stored entry is finalized as `error` so it
    /// does not sit in `pending` forever.
    pub async fn create(&self) -> Result<TaskRecord, ServiceError> {
        let record = TaskRecord::new(self.ids.generate_task_id());
        self.store.insert(&record).await?;

        if let Err(e) = self.broker.publish(&self.queue, record.to_message()).await {
            warn!(task_id = %record.id, error = %e, "publish failed, marking task as error");
            if let Err(write) = self
                .store
                .write(&record.id, TaskStatus::Error, Progress::ZERO)
                .await
            {
                warn!(task_id = %record.id, error = %write, "could not mark unpublished task");
            }
            return Err(e.into());
        }

        info!(task_id = %record.id, "task created");
        Ok(record)
    }

    pub async fn query(&self, id: &TaskId) -> Result<Option<TaskRecord>, ServiceError> {
        let entry = self.store.get(id).await?;
        Ok(entry.map(|entry| entry.to_record(id.clone())))
    }

    /// Request cancellation.
    ///
    /// A task already in a terminal status is returned unchanged. Otherwise
    /// the marker is set for the executor and `cancelled` is written with the
    /// current process, so a task still waiting in the queue is never started.
    pub async fn cancel(&self, id: &TaskId) -> Result<TaskRecord, ServiceError> {
        let entry = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.clone()))?;

        if entry.status.is_terminal() {
            debug!(task_id = %id, status = %entry.status, "cancel on finished task ignored");
            return Ok(entry.to_record(id.clone()));
        }

        self.registry.request(id);
        match self
            .store
            .write(id, TaskStatus::Cancelled, entry.process)
            .await
        {
            Ok(stored) => {
                info!(task_id = %id, process = %stored.process, "task cancelled");
                Ok(stored.to_record(id.clone()))
            }
            Err(StoreError::Conflict { current, .. }) => {
                // 読んでから書くまでの間に executor が確定させた
                self.registry.consume(id);
                debug!(task_id = %id, status = %current, "task finished before cancel landed");
                self.query(id)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(id.clone()))
            }
            Err(e) => {
                self.registry.consume(id);
                Err(e.into())
            }
        }
    }

    /// Externally driven status write, checked against the transition rule.
    pub async fn update(
        &self,
        id: &TaskId,
        status: TaskStatus,
        process: Progress,
    ) -> Result<TaskRecord, ServiceError> {
        let stored = self.store.write(id, status, process).await?;
        debug!(task_id = %id, status = %stored.status, process = %stored.process, "task updated");
        Ok(stored.to_record(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BrokerError;
    use crate::impls::{InMemoryBroker, InMemoryStatusStore};
    use crate::ports::{Deliveries, SystemClock, UlidGenerator};
    use async_trait::async_trait;

    struct Fixture {
        store: Arc<InMemoryStatusStore>,
        broker: Arc<InMemoryBroker>,
        registry: Arc<CancellationRegistry>,
        service: TaskService,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStatusStore::new());
        let broker = Arc::new(InMemoryBroker::new());
        broker.declare_queue("task_queue").await.unwrap();
        let registry = Arc::new(CancellationRegistry::new());
        let service = TaskService::new(
            store.clone(),
            broker.clone(),
            registry.clone(),
            Arc::new(UlidGenerator::new(SystemClock)),
            "task_queue",
        );
        Fixture {
            store,
            broker,
            registry,
            service,
        }
    }

    fn p(n: u8) -> Progress {
        Progress::new(n).unwrap()
    }

    #[tokio::test]
    async fn create_stores_then_publishes() {
        let fx = fixture().await;
        let record = fx.service.create().await.unwrap();

        assert_eq!(record.status, TaskStatus::Pending);
        assert_eq!(record.process, Progress::ZERO);
        assert_eq!(fx.service.query(&record.id).await.unwrap(), Some(record.clone()));

        let mut deliveries = fx.broker.consume("task_queue").await.unwrap();
        let delivery = deliveries.recv().await.unwrap();
        assert_eq!(TaskRecord::from_message(delivery.body()).unwrap(), record);
    }

    struct DownBroker;

    #[async_trait]
    impl Broker for DownBroker {
        async fn declare_queue(&self, _queue: &str) -> Result<(), BrokerError> {
            Ok(())
        }
        async fn publish(&self, _queue: &str, _body: Vec<u8>) -> Result<(), BrokerError> {
            Err(BrokerError::Transport("connection refused".into()))
        }
        async fn consume(&self, queue: &str) -> Result<Deliveries, BrokerError> {
            Err(BrokerError::UnknownQueue(queue.into()))
        }
    }

    struct OneId;

    impl IdGenerator for OneId {
        fn generate_task_id(&self) -> TaskId {
            TaskId::new("t-1")
        }
    }

    #[tokio::test]
    async fn failed_publish_finalizes_as_error() {
        let store = Arc::new(InMemoryStatusStore::new());
        let service = TaskService::new(
            store.clone(),
            Arc::new(DownBroker),
            Arc::new(CancellationRegistry::new()),
            Arc::new(OneId),
            "task_queue",
        );

        let err = service.create().await.unwrap_err();
        assert!(matches!(err, ServiceError::Broker(BrokerError::Transport(_))));

        let entry = store.get(&TaskId::new("t-1")).await.unwrap().unwrap();
        assert_eq!(entry.status, TaskStatus::Error);
    }

    #[tokio::test]
    async fn query_unknown_is_none() {
        let fx = fixture().await;
        assert_eq!(fx.service.query(&TaskId::new("nope")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn cancel_pending_task_marks_and_writes() {
        let fx = fixture().await;
        let record = fx.service.create().await.unwrap();

        let cancelled = fx.service.cancel(&record.id).await.unwrap();
        assert_eq!(cancelled.status, TaskStatus::Cancelled);
        assert_eq!(cancelled.process, Progress::ZERO);
        assert!(fx.registry.consume(&record.id));
    }

    #[tokio::test]
    async fn cancel_keeps_current_process() {
        let fx = fixture().await;
        let record = fx.service.create().await.unwrap();
        fx.store
            .write(&record.id, TaskStatus::Processing, p(40))
            .await
            .unwrap();

        let cancelled = fx.service.cancel(&record.id).await.unwrap();
        assert_eq!((cancelled.status, cancelled.process), (TaskStatus::Cancelled, p(40)));
    }

    #[tokio::test]
    async fn cancel_finished_task_is_a_noop() {
        let fx = fixture().await;
        let record = fx.service.create().await.unwrap();
        fx.store
            .write(&record.id, TaskStatus::Completed, Progress::DONE)
            .await
            .unwrap();

        let after = fx.service.cancel(&record.id).await.unwrap();
        assert_eq!(after.status, TaskStatus::Completed);
        assert!(!fx.registry.consume(&record.id));
    }

    #[tokio::test]
    async fn cancel_unknown_is_not_found() {
        let fx = fixture().await;
        let err = fx.service.cancel(&TaskId::new("nope")).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_after_cancel_conflicts() {
        let fx = fixture().await;
        let record = fx.service.create().await.unwrap();
        fx.service.cancel(&record.id).await.unwrap();

        let err = fx
            .service
            .update(&record.id, TaskStatus::Processing, p(30))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Conflict {
                current: TaskStatus::Cancelled,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn update_rejects_progress_regression() {
        let fx = fixture().await;
        let record = fx.service.create().await.unwrap();
        fx.service
            .update(&record.id, TaskStatus::Processing, p(60))
            .await
            .unwrap();

        let err = fx
            .service
            .update(&record.id, TaskStatus::Processing, p(30))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidUpdate { .. }));
    }
}
