//! Errors - エラー型と分類
//!
//! # 分類
//! - DecodeError: キューメッセージが壊れている（ack せずに捨てる）
//! - StoreError::{NotFound, Conflict}: 他の writer が先に確定させた（残りの処理を中断）
//! - StoreError::Transport / BrokerError::Transport: 接続先に届かない（呼び出し元へ伝播）
//! - WorkError: unit of work の失敗（タスクは error で終わる）
//!
//! タイムアウトはエラーではなく終端状態（timed_out）への遷移です。

use std::time::Duration;

use super::ids::TaskId;
use super::state::TaskStatus;
use super::task::Rejection;

/// A queue message that cannot be turned into a task record.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed task message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("task message has an empty id")]
    MissingId,
}

/// Status store failures.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("task {0} does not exist")]
    NotFound(TaskId),

    #[error("task {id} is already {current}")]
    Conflict { id: TaskId, current: TaskStatus },

    #[error("task {id} rejected write: {reason}")]
    Rejected { id: TaskId, reason: String },

    #[error("task {0} already exists")]
    AlreadyExists(TaskId),

    #[error("status store unreachable: {0}")]
    Transport(String),
}

impl StoreError {
    /// Someone else finalized or purged the task.
    ///
    /// The executor treats this as "stop working on it", not as a failure.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound(_) | StoreError::Conflict { .. } | StoreError::Rejected { .. }
        )
    }

    pub fn from_rejection(id: TaskId, rejection: Rejection) -> Self {
        match rejection {
            Rejection::Finalized(current) => StoreError::Conflict { id, current },
            Rejection::IllegalTransition { from, to } => StoreError::Rejected {
                id,
                reason: format!("{from} -> {to} is not allowed"),
            },
            Rejection::ProgressRegression { current, requested } => StoreError::Rejected {
                id,
                reason: format!("progress {requested} is behind {current}"),
            },
        }
    }
}

/// Broker failures.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum BrokerError {
    #[error("queue {0} is not declared")]
    UnknownQueue(String),

    #[error("queue {0} already has a consumer")]
    AlreadyConsuming(String),

    #[error("queue {0} is closed")]
    Closed(String),

    #[error("broker unreachable: {0}")]
    Transport(String),
}

/// Failure of one tick of the opaque unit of work.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum WorkError {
    #[error("unit of work failed at tick {tick}: {reason}")]
    Failed { tick: u32, reason: String },
}

/// Errors surfaced by `TaskService` (and mapped to HTTP status codes).
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("task {id} is {current}, update refused")]
    Conflict { id: TaskId, current: TaskStatus },

    #[error("invalid update for task {id}: {reason}")]
    InvalidUpdate { id: TaskId, reason: String },

    #[error("store error: {0}")]
    Store(StoreError),

    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ServiceError::NotFound(id),
            StoreError::Conflict { id, current } => ServiceError::Conflict { id, current },
            StoreError::Rejected { id, reason } => ServiceError::InvalidUpdate { id, reason },
            other => ServiceError::Store(other),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    pub fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Why an execution stopped early, recorded on the execution report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Watchdog(Duration),
    CancelRequested,
    StoreConflict(StoreError),
    Work(WorkError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::Progress;

    #[test]
    fn conflict_classification() {
        let id = TaskId::new("t");
        assert!(StoreError::NotFound(id.clone()).is_conflict());
        assert!(
            StoreError::Conflict {
                id: id.clone(),
                current: TaskStatus::Cancelled
            }
            .is_conflict()
        );
        assert!(!StoreError::Transport("down".into()).is_conflict());
    }

    #[test]
    fn rejection_maps_to_store_error() {
        let id = TaskId::new("t");
        let err = StoreError::from_rejection(id.clone(), Rejection::Finalized(TaskStatus::Completed));
        assert_eq!(
            err,
            StoreError::Conflict {
                id: id.clone(),
                current: TaskStatus::Completed
            }
        );

        let err = StoreError::from_rejection(
            id,
            Rejection::ProgressRegression {
                current: Progress::new(50).unwrap(),
                requested: Progress::ZERO,
            },
        );
        assert!(err.to_string().contains("behind 50"));
    }

    #[test]
    fn service_error_from_store_error() {
        let id = TaskId::new("t");
        let err: ServiceError = StoreError::NotFound(id.clone()).into();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err: ServiceError = StoreError::Transport("down".into()).into();
        assert!(matches!(err, ServiceError::Store(_)));
    }
}
