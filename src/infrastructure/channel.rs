use crate::domain::ports::SettlementPublisher;
use crate::domain::settlement::SettlementMessage;
use crate::error::{Result, WorkflowError};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::mpsc;

/// One at-least-once delivery of a settlement payload. `attempt` starts at
/// 1 and grows on every redelivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub body: Vec<u8>,
    pub attempt: u32,
}

/// Publisher half of the in-process settlement channel. Serializes each
/// message to its JSON wire form before handing it to the transport, so
/// the consumer sees exactly what a broker would carry.
#[derive(Clone)]
pub struct InMemoryPublisher {
    tx: mpsc::UnboundedSender<Delivery>,
}

#[async_trait]
impl SettlementPublisher for InMemoryPublisher {
    async fn publish(&self, message: &SettlementMessage) -> Result<()> {
        let body = serde_json::to_vec(message)?;
        self.tx
            .send(Delivery { body, attempt: 1 })
            .map_err(|_| WorkflowError::Channel("settlement channel closed".to_string()))
    }
}

/// Consumer half. Redeliveries go through an internal queue rather than
/// back into the channel, so the stream ends once every publisher is
/// dropped and the queue drains.
pub struct SettlementConsumer {
    rx: mpsc::UnboundedReceiver<Delivery>,
    pending: VecDeque<Delivery>,
    max_attempts: u32,
}

impl SettlementConsumer {
    /// Next delivery, waiting for one if none is queued. `None` once all
    /// publishers are gone and nothing is pending.
    pub async fn recv(&mut self) -> Option<Delivery> {
        if let Some(delivery) = self.pending.pop_front() {
            return Some(delivery);
        }
        self.rx.recv().await
    }

    /// Next delivery if one is immediately available.
    pub fn try_recv(&mut self) -> Option<Delivery> {
        if let Some(delivery) = self.pending.pop_front() {
            return Some(delivery);
        }
        self.rx.try_recv().ok()
    }

    /// Queues the delivery again with its attempt count bumped. Returns
    /// false once the redelivery budget is exhausted; the caller then
    /// dead-letters the message.
    pub fn redeliver(&mut self, delivery: Delivery) -> bool {
        if delivery.attempt >= self.max_attempts {
            return false;
        }
        self.pending.push_back(Delivery {
            body: delivery.body,
            attempt: delivery.attempt + 1,
        });
        true
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Creates the in-process settlement channel pair. `max_attempts` bounds
/// deliveries per message (first attempt included).
pub fn settlement_channel(max_attempts: u32) -> (InMemoryPublisher, SettlementConsumer) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        InMemoryPublisher { tx },
        SettlementConsumer {
            rx,
            pending: VecDeque::new(),
            max_attempts: max_attempts.max(1),
        },
    )
}
