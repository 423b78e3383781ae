//! Peek-lock message queue abstraction.
//!
//! A received [`Delivery`] stays locked to this consumer until it is
//! completed (removed) or abandoned (made visible again). A lock that is
//! neither settled nor renewed expires on the broker and the message is
//! redelivered.

pub mod memory;
pub mod servicebus;

pub use memory::InMemoryQueue;
pub use servicebus::ServiceBusQueue;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::QueueError;

/// A locked message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: String,
    pub lock_token: String,
    pub body: Vec<u8>,
    /// 1 on first delivery.
    pub delivery_count: u32,
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Waits up to `max_wait` for one message. `Ok(None)` when idle.
    async fn receive(&self, max_wait: Duration) -> Result<Option<Delivery>, QueueError>;

    /// Acknowledges and removes the message.
    async fn complete(&self, delivery: &Delivery) -> Result<(), QueueError>;

    /// Releases the lock so the message is redelivered.
    async fn abandon(&self, delivery: &Delivery) -> Result<(), QueueError>;

    async fn send(&self, body: &str) -> Result<(), QueueError>;
}
