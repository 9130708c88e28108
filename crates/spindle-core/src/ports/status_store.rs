//! StatusStore port - タスク状態の正本（source of truth）
//!
//! `id -> {status, process}` を保持します。
//! ワーカーが持つ TaskRecord はキャッシュに過ぎず、
//! 終端状態を書く前に必ずここと突き合わせます。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Progress, StatusEntry, StoreError, TaskId, TaskRecord, TaskStatus};

/// StatusStore はタスクの status / process を保存
///
/// # 設計原則
/// - 書き込みは `StatusEntry::transition` のルールで判定し、判定と反映は不可分
/// - 終端状態への同値の再書き込みは no-op（エラーではない）
/// - 終端状態からの遷移、progress の巻き戻しは `StoreError` で拒否
/// - リトライはしない（呼び出し側の責務でもない）
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Store a new entry. Fails with `AlreadyExists` if the id is taken.
    async fn insert(&self, record: &TaskRecord) -> Result<(), StoreError>;

    /// Read the entry, `None` if the id is unknown.
    async fn get(&self, id: &TaskId) -> Result<Option<StatusEntry>, StoreError>;

    /// Conditionally write `(status, process)` over the current entry.
    ///
    /// Returns the entry as stored after the call (unchanged on a no-op).
    async fn write(
        &self,
        id: &TaskId,
        status: TaskStatus,
        process: Progress,
    ) -> Result<StatusEntry, StoreError>;

    /// Delete terminal entries last updated before `cutoff`. Returns how many.
    async fn purge_finished(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
}
