pub mod consumer;
pub mod liveness;

pub use consumer::{ConsumerStats, QueueConsumer};
pub use liveness::{LivenessReporter, DEFAULT_LIVENESS_PATH};
