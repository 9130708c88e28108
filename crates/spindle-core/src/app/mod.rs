//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてタスクのライフサイクルを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder / App**: 構築とワイヤリング、consumer と gc の起動
//! - **ConsumerLoop**: task queue から受信し WorkerPool に admit
//! - **WorkerPool**: 同時実行数の上限（Semaphore + JoinSet）
//! - **TaskExecutor**: 1 タスク分の状態機械（tick / watchdog / cancel / 終端書き込み / ack）
//! - **CancellationRegistry**: キャンセル要求の受け渡し
//! - **TaskService**: create / query / cancel / update
//! - **GcLoop**: 終端状態のエントリの retention 削除

pub mod builder;
pub mod cancellation;
pub mod config;
pub mod consumer;
pub mod executor;
pub mod gc_loop;
pub mod pool;
pub mod service;

// 主要な型を再エクスポート
pub use self::builder::{App, AppBuilder, BuildError, Workers};
pub use self::cancellation::CancellationRegistry;
pub use self::config::SpindleConfig;
pub use self::consumer::{ConsumerHandle, ConsumerLoop, ConsumerStats};
pub use self::executor::{ExecutionOutcome, ExecutionReport, TaskExecutor};
pub use self::gc_loop::{GcHandle, GcLoop};
pub use self::pool::{PoolClosed, WorkerPool};
pub use self::service::TaskService;
