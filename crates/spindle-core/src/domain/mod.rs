//! Domain model (ids, status, task record, errors).
//!
//! ここには I/O を持たない型だけを置きます。
//! 状態遷移ルール（`StatusEntry::transition`）もここにあり、
//! どの StatusStore 実装も同じルールで書き込みを判定します。

pub mod errors;
pub mod ids;
pub mod state;
pub mod task;

pub use errors::{
    BrokerError, ConfigError, DecodeError, ServiceError, StopReason, StoreError, WorkError,
};
pub use ids::TaskId;
pub use state::{Progress, ProgressError, TaskStatus};
pub use task::{Rejection, StatusEntry, TaskRecord, Transition};
