//! Ports - 抽象化レイヤー
//!
//! 外部の協力者（状態ストア、メッセージブローカー、アルゴリズム）への
//! インターフェースを定義し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - StatusStore が source of truth（正本）
//! - Broker は task queue（TaskRecord の JSON）を配送するだけ
//! - UnitOfWork は不透明な 1 tick の処理

pub mod broker;
pub mod clock;
pub mod id_generator;
pub mod status_store;
pub mod work;

// 主要な trait を再エクスポート
pub use self::broker::{Broker, Deliveries, Delivery};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::status_store::StatusStore;
pub use self::work::UnitOfWork;
