use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use super::liveness::LivenessReporter;
use crate::jobs::JobMessage;
use crate::pipeline::{JobOutcome, JobPipeline};
use crate::queue::{Delivery, MessageQueue};

const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(30);
const RECEIVE_ERROR_PAUSE: Duration = Duration::from_secs(5);

/// Counters returned when the consumer stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub received: u64,
    pub completed: u64,
    pub abandoned: u64,
}

/// Pulls one message at a time and runs it through the pipeline.
pub struct QueueConsumer {
    queue: Arc<dyn MessageQueue>,
    pipeline: JobPipeline,
    liveness: LivenessReporter,
    max_wait: Duration,
}

impl QueueConsumer {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        pipeline: JobPipeline,
        liveness: LivenessReporter,
    ) -> Self {
        Self {
            queue,
            pipeline,
            liveness,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }

    /// Longest a single receive waits for a message.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Runs until `cancel` fires. A job in progress is finished and
    /// settled before the loop exits.
    pub async fn run(&self, cancel: CancellationToken) -> ConsumerStats {
        let mut stats = ConsumerStats::default();
        info!("Queue consumer started");

        while !cancel.is_cancelled() {
            self.liveness.beat().await;

            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                received = self.queue.receive(self.max_wait) => received,
            };

            let delivery = match received {
                Ok(Some(delivery)) => delivery,
                Ok(None) => continue,
                Err(e) => {
                    error!("Failed to receive message: {}", e);
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(RECEIVE_ERROR_PAUSE) => {}
                    }
                    continue;
                }
            };

            stats.received += 1;
            if self.handle(&delivery).await {
                stats.completed += 1;
            } else {
                stats.abandoned += 1;
            }
        }

        info!(
            "Queue consumer stopped: {} received, {} completed, {} abandoned",
            stats.received, stats.completed, stats.abandoned
        );
        stats
    }

    /// Returns `true` when the message was acknowledged.
    async fn handle(&self, delivery: &Delivery) -> bool {
        let message = match JobMessage::from_slice(&delivery.body) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    "Undecodable message {} (delivery {}): {}",
                    delivery.message_id, delivery.delivery_count, e
                );
                self.abandon(delivery).await;
                return false;
            }
        };

        debug!(
            "Message {} carries job {} (delivery {})",
            delivery.message_id, message.job_id, delivery.delivery_count
        );

        match self.pipeline.process(&message).await {
            Ok(JobOutcome::Completed { pages }) => {
                info!("Job {} completed ({} pages)", message.job_id, pages);
                self.complete(delivery).await;
                true
            }
            Ok(JobOutcome::AlreadyTerminal(status)) => {
                info!(
                    "Job {} already {}; acknowledging redelivery",
                    message.job_id, status
                );
                self.complete(delivery).await;
                true
            }
            Err(e) => {
                error!("Job {} failed: {}", message.job_id, e);
                self.abandon(delivery).await;
                false
            }
        }
    }

    async fn complete(&self, delivery: &Delivery) {
        if let Err(e) = self.queue.complete(delivery).await {
            error!("Failed to complete message {}: {}", delivery.message_id, e);
        }
    }

    async fn abandon(&self, delivery: &Delivery) {
        if let Err(e) = self.queue.abandon(delivery).await {
            error!("Failed to abandon message {}: {}", delivery.message_id, e);
        }
    }
}
