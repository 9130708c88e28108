//! spindle-core
//!
//! Core building blocks for the Spindle task pipeline.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, status / progress, task record, errors）
//! - **ports**: 抽象化レイヤー（StatusStore, Broker, UnitOfWork, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（builder, consumer, pool, executor, service, gc）
//! - **impls**: 実装（InMemoryStatusStore, InMemoryBroker, SimulatedWork など開発用）
//! - **api**: HTTP ルーター（axum）

pub mod api;
pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
