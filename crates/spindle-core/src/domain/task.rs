//! Task record and status-store entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DecodeError;
use super::ids::TaskId;
use super::state::{Progress, TaskStatus};

/// The shared data unit: what clients see and what travels on the queue.
///
/// On the queue only `id` is authoritative; `status` and `process` are
/// advisory and may be missing from the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,

    #[serde(default = "pending")]
    pub status: TaskStatus,

    #[serde(default)]
    pub process: Progress,
}

fn pending() -> TaskStatus {
    TaskStatus::Pending
}

impl TaskRecord {
    /// A freshly created task: `pending`, process "0".
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            process: Progress::ZERO,
        }
    }

    /// Encode as a queue message body.
    pub fn to_message(&self) -> Vec<u8> {
        // Serializing a struct of strings cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Decode a queue message body.
    pub fn from_message(body: &[u8]) -> Result<Self, DecodeError> {
        let record: TaskRecord = serde_json::from_slice(body)?;
        if record.id.is_empty() {
            return Err(DecodeError::MissingId);
        }
        Ok(record)
    }
}

/// `id -> {status, process}` as held by the status store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub status: TaskStatus,
    pub process: Progress,
    pub updated_at: DateTime<Utc>,
}

/// Result of checking a write against the current entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The write changes the entry.
    Apply,

    /// The write repeats what is already stored; nothing to do.
    NoOp,
}

/// Why a write was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The entry is already in a (different) terminal status.
    Finalized(TaskStatus),

    /// The target status cannot follow the current one (e.g. back to pending).
    IllegalTransition { from: TaskStatus, to: TaskStatus },

    /// A processing write would move progress backwards.
    ProgressRegression { current: Progress, requested: Progress },
}

impl StatusEntry {
    pub fn new(status: TaskStatus, process: Progress, updated_at: DateTime<Utc>) -> Self {
        Self {
            status,
            process,
            updated_at,
        }
    }

    /// Decide whether `(status, process)` may be written over this entry.
    ///
    /// - terminal entries accept only a repeat of the same status (no-op)
    /// - nothing goes back to `pending`
    /// - `processing` progress never decreases
    pub fn transition(&self, status: TaskStatus, process: Progress) -> Result<Transition, Rejection> {
        if self.status.is_terminal() {
            return if status == self.status {
                Ok(Transition::NoOp)
            } else {
                Err(Rejection::Finalized(self.status))
            };
        }

        match (self.status, status) {
            (TaskStatus::Pending, TaskStatus::Pending) => Ok(Transition::NoOp),
            (TaskStatus::Processing, TaskStatus::Pending) => Err(Rejection::IllegalTransition {
                from: self.status,
                to: status,
            }),
            (TaskStatus::Processing, TaskStatus::Processing) if process < self.process => {
                Err(Rejection::ProgressRegression {
                    current: self.process,
                    requested: process,
                })
            }
            (TaskStatus::Processing, TaskStatus::Processing) if process == self.process => {
                Ok(Transition::NoOp)
            }
            _ => Ok(Transition::Apply),
        }
    }

    pub fn to_record(&self, id: TaskId) -> TaskRecord {
        TaskRecord {
            id,
            status: self.status,
            process: self.process,
        }
    }
}
