//! CancellationRegistry - キャンセル要求の受け渡し
//!
//! キャンセル API が `request` で印を付け、executor が tick の境界で
//! `consume` して取り除きます。グローバル変数ではなく、
//! `Arc<CancellationRegistry>` を executor と service に明示的に渡します。

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use crate::domain::TaskId;

/// Set of task ids with a pending cancellation request.
///
/// The lock is held only for the set operation itself, never across an
/// await point, so a plain `std::sync::Mutex` is enough.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    requested: Mutex<HashSet<TaskId>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as cancellation-requested. Idempotent.
    ///
    /// Returns `true` if the marker was newly set.
    pub fn request(&self, id: &TaskId) -> bool {
        self.lock().insert(id.clone())
    }

    /// Test-and-clear the marker for `id`.
    ///
    /// A single request is observed by exactly one `consume` call.
    pub fn consume(&self, id: &TaskId) -> bool {
        self.lock().remove(id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<TaskId>> {
        self.requested.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
