//! InMemoryBroker - 開発用のメッセージブローカー
//!
//! # 実装詳細
//! - キューごとに unbounded mpsc を 1 本持つ（consume 前の publish はバッファされる）
//! - consume できるのは 1 キューにつき 1 回だけ
//! - ack の集計（published / acked / unacked）を QueueCounts で参照できる
//! - 未 ack メッセージの再配送はしない

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::domain::BrokerError;
use crate::ports::{Broker, Deliveries, Delivery};

/// Observability snapshot of one queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub published: u64,
    pub acked: u64,
    pub unacked: u64,
}

#[derive(Default)]
struct Ledger {
    next_tag: u64,
    published: u64,
    outstanding: BTreeSet<u64>,
    ack_counts: HashMap<u64, u32>,
}

struct QueueSlot {
    tx: Option<mpsc::UnboundedSender<Box<dyn Delivery>>>,
    rx: Option<Deliveries>,
    ledger: Arc<Mutex<Ledger>>,
}

impl QueueSlot {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Some(tx),
            rx: Some(rx),
            ledger: Arc::new(Mutex::new(Ledger::default())),
        }
    }
}

/// In-memory broker.
#[derive(Default)]
pub struct InMemoryBroker {
    queues: Mutex<HashMap<String, QueueSlot>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop accepting publishes; the consumer sees the stream end once the
    /// buffered messages are drained.
    pub fn close(&self, queue: &str) {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = queues.get_mut(queue) {
            slot.tx = None;
        }
    }

    pub fn counts(&self, queue: &str) -> Option<QueueCounts> {
        let queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = queues.get(queue)?;
        let ledger = slot.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        let unacked = ledger.outstanding.len() as u64;
        Some(QueueCounts {
            published: ledger.published,
            acked: ledger.published - unacked,
            unacked,
        })
    }

    /// How many times each delivery tag was acked.
    pub fn ack_counts(&self, queue: &str) -> HashMap<u64, u32> {
        let queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        queues
            .get(queue)
            .map(|slot| {
                slot.ledger
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .ack_counts
                    .clone()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        queues.entry(queue.to_string()).or_insert_with(QueueSlot::new);
        Ok(())
    }

    async fn publish(&self, queue: &str, body: Vec<u8>) -> Result<(), BrokerError> {
        let queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = queues
            .get(queue)
            .ok_or_else(|| BrokerError::UnknownQueue(queue.to_string()))?;
        let tx = slot
            .tx
            .as_ref()
            .ok_or_else(|| BrokerError::Closed(queue.to_string()))?;

        let tag = {
            let mut ledger = slot.ledger.lock().unwrap_or_else(PoisonError::into_inner);
            ledger.next_tag += 1;
            ledger.published += 1;
            let tag = ledger.next_tag;
            ledger.outstanding.insert(tag);
            tag
        };

        let delivery = InMemoryDelivery {
            tag,
            body,
            ledger: Arc::clone(&slot.ledger),
        };
        tx.send(Box::new(delivery))
            .map_err(|_| BrokerError::Closed(queue.to_string()))
    }

    async fn consume(&self, queue: &str) -> Result<Deliveries, BrokerError> {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = queues
            .get_mut(queue)
            .ok_or_else(|| BrokerError::UnknownQueue(queue.to_string()))?;
        slot.rx
            .take()
            .ok_or_else(|| BrokerError::AlreadyConsuming(queue.to_string()))
    }
}

struct InMemoryDelivery {
    tag: u64,
    body: Vec<u8>,
    ledger: Arc<Mutex<Ledger>>,
}

#[async_trait]
impl Delivery for InMemoryDelivery {
    fn delivery_tag(&self) -> u64 {
        self.tag
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    async fn ack(self: Box<Self>) -> Result<(), BrokerError> {
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        ledger.outstanding.remove(&self.tag);
        *ledger.ack_counts.entry(self.tag).or_default() += 1;
        Ok(())
    }
}
