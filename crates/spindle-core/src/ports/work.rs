//! UnitOfWork port - 1 tick 分の処理
//!
//! 実際のアルゴリズムは不透明です。executor はこの trait を通して
//! 1 tick ずつ呼び出すだけなので、状態機械はアルゴリズム無しでテストできます。

use async_trait::async_trait;

use crate::domain::{TaskId, WorkError};

/// UnitOfWork は 1 tick 分の処理を実行
///
/// `tick` は 1 始まり。呼び出し中に中断されることはありません
/// （キャンセル・タイムアウトは tick の境界でのみ判定されます）。
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    async fn run_tick(&self, task_id: &TaskId, tick: u32) -> Result<(), WorkError>;
}
