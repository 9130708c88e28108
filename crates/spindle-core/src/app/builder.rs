//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 方針
//! - 起動時検証（Fail-fast）: 設定が不正なら build() で BuildError
//! - 協力者（store / broker / work / clock / id）は差し替え可能、未指定なら開発用の実装
//! - `App::start()` で queue を宣言し consumer と gc を起動する

use std::sync::Arc;

use axum::Router;
use tracing::info;

use super::cancellation::CancellationRegistry;
use super::config::SpindleConfig;
use super::consumer::{ConsumerHandle, ConsumerLoop, ConsumerStats};
use super::executor::TaskExecutor;
use super::gc_loop::{GcHandle, GcLoop};
use super::pool::WorkerPool;
use super::service::TaskService;
use crate::api::{self, ApiState};
use crate::domain::{BrokerError, ConfigError};
use crate::impls::{InMemoryBroker, InMemoryStatusStore, SimulatedWork};
use crate::ports::{Broker, Clock, IdGenerator, StatusStore, SystemClock, UlidGenerator, UnitOfWork};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(SpindleConfig::from_env()?)
///     .store(Arc::new(MyStore::connect(url).await?))
///     .build()?;
/// let workers = app.start().await?;
/// ```
pub struct AppBuilder {
    config: SpindleConfig,
    store: Option<Arc<dyn StatusStore>>,
    broker: Option<Arc<dyn Broker>>,
    work: Option<Arc<dyn UnitOfWork>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl AppBuilder {
    pub fn new(config: SpindleConfig) -> Self {
        Self {
            config,
            store: None,
            broker: None,
            work: None,
            clock: None,
            ids: None,
        }
    }

    pub fn store(mut self, store: Arc<dyn StatusStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn broker(mut self, broker: Arc<dyn Broker>) -> Self {
        self.broker = Some(broker);
        self
    }

    pub fn work(mut self, work: Arc<dyn UnitOfWork>) -> Self {
        self.work = Some(work);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// 設定を検証して App を生成
    pub fn build(self) -> Result<App, BuildError> {
        self.config.validate()?;
        let config = self.config;

        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let store: Arc<dyn StatusStore> = match self.store {
            Some(store) => store,
            None => Arc::new(InMemoryStatusStore::with_clock(Arc::clone(&clock))),
        };
        let broker: Arc<dyn Broker> = match self.broker {
            Some(broker) => broker,
            None => Arc::new(InMemoryBroker::new()),
        };
        let work: Arc<dyn UnitOfWork> = match self.work {
            Some(work) => work,
            None => Arc::new(SimulatedWork::new(config.tick_duration)),
        };
        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(Arc::clone(&clock))),
        };

        let registry = Arc::new(CancellationRegistry::new());
        let pool = Arc::new(WorkerPool::new(config.max_concurrent));
        let executor = Arc::new(TaskExecutor::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            work,
            config.ticks,
            config.watchdog,
        ));
        let service = Arc::new(TaskService::new(
            Arc::clone(&store),
            Arc::clone(&broker),
            Arc::clone(&registry),
            ids,
            config.task_queue.clone(),
        ));

        Ok(App {
            config,
            service,
            pool,
            registry,
            executor,
            store,
            broker,
            clock,
        })
    }
}

/// Wired application. Nothing runs until `start()`.
pub struct App {
    pub config: SpindleConfig,
    pub service: Arc<TaskService>,
    pub pool: Arc<WorkerPool>,
    pub registry: Arc<CancellationRegistry>,
    executor: Arc<TaskExecutor>,
    store: Arc<dyn StatusStore>,
    broker: Arc<dyn Broker>,
    clock: Arc<dyn Clock>,
}

impl App {
    /// Declare the task queue, start consuming, and start the retention
    /// sweep when configured.
    pub async fn start(&self) -> Result<Workers, BrokerError> {
        let queue = &self.config.task_queue;
        self.broker.declare_queue(queue).await?;
        let deliveries = self.broker.consume(queue).await?;

        let consumer = ConsumerLoop::new(
            deliveries,
            Arc::clone(&self.pool),
            Arc::clone(&self.executor),
        )
        .spawn();

        let gc = self.config.retention.map(|retention| {
            GcLoop::new(
                Arc::clone(&self.store),
                Arc::clone(&self.clock),
                retention,
                self.config.gc_interval,
            )
            .spawn()
        });

        info!(
            queue = %queue,
            max_concurrent = self.pool.capacity(),
            ticks = self.config.ticks,
            watchdog = ?self.config.watchdog,
            gc = gc.is_some(),
            "workers started"
        );
        Ok(Workers {
            consumer,
            gc,
            pool: Arc::clone(&self.pool),
        })
    }

    pub fn router(&self) -> Router {
        api::router(ApiState {
            service: Arc::clone(&self.service),
            pool: Arc::clone(&self.pool),
        })
    }
}

/// Background activities started by `App::start`.
pub struct Workers {
    consumer: ConsumerHandle,
    gc: Option<GcHandle>,
    pool: Arc<WorkerPool>,
}

impl Workers {
    /// Stop consuming, stop the sweep, then wait for running executions.
    pub async fn shutdown(self) -> ConsumerStats {
        let stats = self.consumer.shutdown_and_join().await;
        if let Some(gc) = self.gc {
            gc.shutdown_and_join().await;
        }
        info!(in_flight = self.pool.in_flight(), "draining executions");
        self.pool.drain().await;
        stats
    }
}
