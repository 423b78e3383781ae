use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

use super::{Delivery, MessageQueue};
use crate::error::QueueError;

/// Service Bus's default before a message is dead-lettered.
const DEFAULT_MAX_DELIVERIES: u32 = 10;

#[derive(Debug, Clone)]
struct StoredMessage {
    message_id: String,
    body: Vec<u8>,
    delivery_count: u32,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<StoredMessage>,
    /// Keyed by lock token.
    locked: HashMap<String, StoredMessage>,
    dead_letters: Vec<StoredMessage>,
}

/// In-process queue with peek-lock semantics, used for local runs and
/// tests. Lock expiry is not simulated; unsettled messages stay locked.
pub struct InMemoryQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    max_deliveries: u32,
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::with_max_deliveries(DEFAULT_MAX_DELIVERIES)
    }

    pub fn with_max_deliveries(max_deliveries: u32) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            max_deliveries: max_deliveries.max(1),
        }
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, QueueState>, QueueError> {
        self.state
            .lock()
            .map_err(|_| QueueError::Request("queue state lock poisoned".to_string()))
    }

    /// Messages waiting to be received.
    pub fn ready_count(&self) -> usize {
        self.lock_state().map(|s| s.ready.len()).unwrap_or(0)
    }

    /// Messages received but not yet settled.
    pub fn in_flight_count(&self) -> usize {
        self.lock_state().map(|s| s.locked.len()).unwrap_or(0)
    }

    pub fn dead_letter_count(&self) -> usize {
        self.lock_state().map(|s| s.dead_letters.len()).unwrap_or(0)
    }

    fn try_lock_next(&self) -> Result<Option<Delivery>, QueueError> {
        let mut state = self.lock_state()?;
        let Some(mut message) = state.ready.pop_front() else {
            return Ok(None);
        };

        message.delivery_count += 1;
        let lock_token = Uuid::new_v4().to_string();
        let delivery = Delivery {
            message_id: message.message_id.clone(),
            lock_token: lock_token.clone(),
            body: message.body.clone(),
            delivery_count: message.delivery_count,
        };
        state.locked.insert(lock_token, message);
        Ok(Some(delivery))
    }

    fn take_locked(
        state: &mut QueueState,
        delivery: &Delivery,
    ) -> Result<StoredMessage, QueueError> {
        state
            .locked
            .remove(&delivery.lock_token)
            .ok_or_else(|| QueueError::LockLost {
                message_id: delivery.message_id.clone(),
            })
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn receive(&self, max_wait: Duration) -> Result<Option<Delivery>, QueueError> {
        let deadline = Instant::now() + max_wait;
        loop {
            let notified = self.notify.notified();
            if let Some(delivery) = self.try_lock_next()? {
                return Ok(Some(delivery));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn complete(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let mut state = self.lock_state()?;
        Self::take_locked(&mut state, delivery)?;
        Ok(())
    }

    async fn abandon(&self, delivery: &Delivery) -> Result<(), QueueError> {
        {
            let mut state = self.lock_state()?;
            let message = Self::take_locked(&mut state, delivery)?;
            if message.delivery_count >= self.max_deliveries {
                warn!(
                    "Message {} exceeded {} deliveries; dead-lettering",
                    message.message_id, self.max_deliveries
                );
                state.dead_letters.push(message);
                return Ok(());
            }
            state.ready.push_back(message);
        }
        self.notify.notify_one();
        Ok(())
    }

    async fn send(&self, body: &str) -> Result<(), QueueError> {
        {
            let mut state = self.lock_state()?;
            state.ready.push_back(StoredMessage {
                message_id: Uuid::new_v4().to_string(),
                body: body.as_bytes().to_vec(),
                delivery_count: 0,
            });
        }
        self.notify.notify_one();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_receive_locks_and_complete_removes() {
        let queue = InMemoryQueue::new();
        queue.send(r#"{"jobId":"a"}"#).await.unwrap();

        let delivery = queue
            .receive(Duration::from_millis(10))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivery.body, br#"{"jobId":"a"}"#);
        assert_eq!(delivery.delivery_count, 1);
        assert_eq!(queue.ready_count(), 0);
        assert_eq!(queue.in_flight_count(), 1);

        queue.complete(&delivery).await.unwrap();
        assert_eq!(queue.in_flight_count(), 0);
        assert!(queue
            .receive(Duration::from_millis(10))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_abandon_redelivers_with_incremented_count() {
        let queue = InMemoryQueue::new();
        queue.send("m").await.unwrap();

        let first = queue.receive(Duration::ZERO).await.unwrap().unwrap();
        queue.abandon(&first).await.unwrap();
        let second = queue.receive(Duration::ZERO).await.unwrap().unwrap();

        assert_eq!(second.message_id, first.message_id);
        assert_ne!(second.lock_token, first.lock_token);
        assert_eq!(second.delivery_count, 2);
    }

    #[tokio::test]
    async fn test_settling_twice_is_lock_lost() {
        let queue = InMemoryQueue::new();
        queue.send("m").await.unwrap();
        let delivery = queue.receive(Duration::ZERO).await.unwrap().unwrap();

        queue.complete(&delivery).await.unwrap();
        let err = queue.abandon(&delivery).await.unwrap_err();
        assert!(matches!(err, QueueError::LockLost { .. }));
    }

    #[tokio::test]
    async fn test_dead_letters_after_max_deliveries() {
        let queue = InMemoryQueue::with_max_deliveries(2);
        queue.send("poison").await.unwrap();

        for _ in 0..2 {
            let d = queue.receive(Duration::ZERO).await.unwrap().unwrap();
            queue.abandon(&d).await.unwrap();
        }

        assert_eq!(queue.dead_letter_count(), 1);
        assert!(queue.receive(Duration::ZERO).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_receive_waits_full_window() {
        let queue = InMemoryQueue::new();
        let start = Instant::now();

        let got = queue.receive(Duration::from_secs(30)).await.unwrap();

        assert!(got.is_none());
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_waiting_receiver_wakes_on_send() {
        let queue = Arc::new(InMemoryQueue::new());
        let receiver = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.receive(Duration::from_secs(5)).await })
        };

        tokio::task::yield_now().await;
        queue.send("late").await.unwrap();

        let delivery = receiver.await.unwrap().unwrap().unwrap();
        assert_eq!(delivery.body, b"late");
    }
}
