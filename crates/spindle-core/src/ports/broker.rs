//! Broker port - メッセージキュー（task queue）
//!
//! キューには TaskRecord を JSON にしたものが流れます。
//! ack は手動で、executor が終端状態に到達した後にだけ行います。

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::BrokerError;

/// One message handed to the consumer.
///
/// The consumer owns the delivery and must `ack` it exactly once;
/// `ack` takes `self` so a second ack cannot be written.
#[async_trait]
pub trait Delivery: Send {
    /// Broker-assigned tag, unique per queue.
    fn delivery_tag(&self) -> u64;

    fn body(&self) -> &[u8];

    /// Acknowledge the message.
    async fn ack(self: Box<Self>) -> Result<(), BrokerError>;
}

/// Stream of deliveries; closes when the queue is closed.
pub type Deliveries = mpsc::UnboundedReceiver<Box<dyn Delivery>>;

/// Broker は queue declare / publish / consume を提供
///
/// # 設計原則
/// - declare は冪等
/// - consume は 1 キューにつき 1 consumer
/// - 未 ack のメッセージをどう再配送するかは broker の方針（ここでは規定しない）
#[async_trait]
pub trait Broker: Send + Sync {
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError>;

    async fn publish(&self, queue: &str, body: Vec<u8>) -> Result<(), BrokerError>;

    async fn consume(&self, queue: &str) -> Result<Deliveries, BrokerError>;
}
