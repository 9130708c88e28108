//! InMemoryStatusStore - 開発用・テスト用の状態ストア
//!
//! # 実装詳細
//! - HashMap<TaskId, StatusEntry> を tokio Mutex で保護
//! - 判定（transition）と反映を同じロックの中で行う = compare-and-set
//! - `with_journal()` で適用された書き込みの履歴を残せる（テスト用）

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{Progress, StatusEntry, StoreError, TaskId, TaskRecord, TaskStatus, Transition};
use crate::ports::{Clock, StatusStore, SystemClock};

#[derive(Default)]
struct StoreState {
    entries: HashMap<TaskId, StatusEntry>,
    journal: Option<HashMap<TaskId, Vec<(TaskStatus, Progress)>>>,
}

impl StoreState {
    fn record(&mut self, id: &TaskId, status: TaskStatus, process: Progress) {
        if let Some(journal) = self.journal.as_mut() {
            journal.entry(id.clone()).or_default().push((status, process));
        }
    }
}

/// In-memory status store.
pub struct InMemoryStatusStore {
    state: Mutex<StoreState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            clock,
        }
    }

    /// Keep every applied write per task, in order.
    pub fn with_journal(self) -> Self {
        let mut state = self.state.into_inner();
        state.journal = Some(HashMap::new());
        Self {
            state: Mutex::new(state),
            clock: self.clock,
        }
    }

    /// Applied writes for `id` (including the initial insert).
    /// Empty when the journal is disabled.
    pub async fn journal(&self, id: &TaskId) -> Vec<(TaskStatus, Progress)> {
        let state = self.state.lock().await;
        state
            .journal
            .as_ref()
            .and_then(|j| j.get(id).cloned())
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemoryStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn insert(&self, record: &TaskRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.entries.contains_key(&record.id) {
            return Err(StoreError::AlreadyExists(record.id.clone()));
        }
        let entry = StatusEntry::new(record.status, record.process, self.clock.now());
        state.entries.insert(record.id.clone(), entry);
        state.record(&record.id, record.status, record.process);
        Ok(())
    }

    async fn get(&self, id: &TaskId) -> Result<Option<StatusEntry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.entries.get(id).cloned())
    }

    async fn write(
        &self,
        id: &TaskId,
        status: TaskStatus,
        process: Progress,
    ) -> Result<StatusEntry, StoreError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        let entry = state
            .entries
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        match entry.transition(status, process) {
            Ok(Transition::NoOp) => Ok(entry.clone()),
            Ok(Transition::Apply) => {
                entry.status = status;
                entry.process = process;
                entry.updated_at = now;
                let stored = entry.clone();
                state.record(id, status, process);
                Ok(stored)
            }
            Err(rejection) => Err(StoreError::from_rejection(id.clone(), rejection)),
        }
    }

    async fn purge_finished(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| !(entry.status.is_terminal() && entry.updated_at < cutoff));
        Ok(before - state.entries.len())
    }
}
