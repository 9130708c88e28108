//! Task identifiers.
//!
//! # TaskId
//! TaskId は外部から見ると不透明な文字列です。
//! 生成は `IdGenerator`（ULID ベース）が担当しますが、
//! HTTP やキューから受け取った任意の文字列もそのまま ID として扱えます。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identifier of a task (create / query / cancel unit).
///
/// Serializes as a bare JSON string so it matches the wire shape of the
/// queue message and the HTTP payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// ULID から TaskId を作成（小文字表現）
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid.to_string().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty ids are never issued by the generator and are rejected on decode.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<Ulid> for TaskId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
