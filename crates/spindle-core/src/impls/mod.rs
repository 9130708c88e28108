//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryStatusStore**: HashMap ベースの状態ストア
//! - **InMemoryBroker**: mpsc ベースのメッセージブローカー
//! - **SimulatedWork**: 1 tick ごとに sleep するだけの unit of work
//!
//! 本番用（Redis / RabbitMQ など）の実装は ports の trait を実装した別クレートに置く想定です。

pub mod inmem_broker;
pub mod inmem_store;
pub mod simulated_work;

// 主要な型を再エクスポート
pub use self::inmem_broker::{InMemoryBroker, QueueCounts};
pub use self::inmem_store::InMemoryStatusStore;
pub use self::simulated_work::SimulatedWork;
