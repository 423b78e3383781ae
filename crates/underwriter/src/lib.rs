pub mod ai;
pub mod config;
pub mod db;
pub mod error;
mod http;
pub mod jobs;
pub mod logging;
pub mod pipeline;
pub mod processor;
pub mod queue;
pub mod retry;
pub mod secrets;
pub mod storage;
pub mod worker;

pub use ai::{AzureOpenAiClient, CompletionClient, CompletionRequest, PromptSettings};
pub use config::{load_config, WorkerConfig};
pub use db::{Database, SqliteJobStore};
pub use error::{
    BlobError, CompletionError, ConfigError, ProcessError, QueueError, Result, UnderwriterError,
};
pub use jobs::{Job, JobMessage, JobStatus, JobStore, JobSubmitter, StateUpdater, StoreError};
pub use pipeline::{JobOutcome, JobPipeline, PipelineError, PipelineSettings, WorkerContext};
pub use queue::{Delivery, InMemoryQueue, MessageQueue, ServiceBusQueue};
pub use retry::{RetryPolicy, Retryable};
pub use secrets::{SecretError, SecretRef};
pub use storage::{AzureBlobStore, BlobFetcher, BlobStore, FilesystemBlobStore};
pub use worker::{ConsumerStats, LivenessReporter, QueueConsumer};
