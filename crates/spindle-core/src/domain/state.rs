//! Task status and progress.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Task status.
///
/// State transitions:
/// - Pending -> Processing -> Completed
/// - Pending -> Processing -> Cancelled | TimedOut | Error
/// - Pending -> Cancelled | Error (cancelled before pickup, publish failure)
///
/// Serialized as snake_case: `pending`, `processing`, `completed`,
/// `cancelled`, `timed_out`, `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, waiting for a worker.
    Pending,

    /// A worker owns the task and is ticking.
    Processing,

    /// All ticks finished.
    Completed,

    /// Cancelled by an external request.
    Cancelled,

    /// The watchdog expired before the last tick.
    TimedOut,

    /// The unit of work or the store failed.
    Error,
}

impl TaskStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Cancelled | TaskStatus::TimedOut | TaskStatus::Error
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::TimedOut => "timed_out",
            TaskStatus::Error => "error",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentage of ticks done, 0..=100.
///
/// On the wire this is a string-encoded integer (`"50"`), matching the
/// `process` field of the task record. Numbers are accepted on decode too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "ProgressRepr", into = "String")]
pub struct Progress(u8);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProgressError {
    #[error("progress must be an integer, got {0:?}")]
    NotANumber(String),

    #[error("progress must be within 0..=100, got {0}")]
    OutOfRange(u64),
}

impl Progress {
    pub const ZERO: Progress = Progress(0);
    pub const DONE: Progress = Progress(100);

    pub fn new(percent: u8) -> Result<Self, ProgressError> {
        if percent > 100 {
            return Err(ProgressError::OutOfRange(percent as u64));
        }
        Ok(Self(percent))
    }

    /// Progress after `tick` of `total` ticks.
    ///
    /// Computed as `tick * 100 / total` so the last tick is always 100,
    /// whatever `total` is.
    pub fn after_tick(tick: u32, total: u32) -> Self {
        if total == 0 {
            return Self::DONE;
        }
        let tick = tick.min(total) as u64;
        Self((tick * 100 / total as u64) as u8)
    }

    pub fn percent(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Progress {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u64 = s
            .trim()
            .parse()
            .map_err(|_| ProgressError::NotANumber(s.to_string()))?;
        if value > 100 {
            return Err(ProgressError::OutOfRange(value));
        }
        Ok(Self(value as u8))
    }
}

impl From<Progress> for String {
    fn from(progress: Progress) -> Self {
        progress.to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProgressRepr {
    Text(String),
    Number(u64),
}

impl TryFrom<ProgressRepr> for Progress {
    type Error = ProgressError;

    fn try_from(repr: ProgressRepr) -> Result<Self, Self::Error> {
        match repr {
            ProgressRepr::Text(s) => s.parse(),
            ProgressRepr::Number(n) if n <= 100 => Ok(Self(n as u8)),
            ProgressRepr::Number(n) => Err(ProgressError::OutOfRange(n)),
        }
    }
}
