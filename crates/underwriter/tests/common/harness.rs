//! Test harness for isolated pipeline runs.
//!
//! Each `TestHarness` owns a temporary directory holding a SQLite job
//! database and a filesystem blob root, plus an in-memory queue. The
//! completion service is supplied by the test.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use underwriter::jobs::VersionedJob;
use underwriter::storage::split_blob_path;
use underwriter::{
    BlobStore, CompletionClient, Database, FilesystemBlobStore, InMemoryQueue, Job, JobMessage,
    JobPipeline, JobStatus, JobStore, LivenessReporter, MessageQueue, PipelineSettings,
    PromptSettings, QueueConsumer, RetryPolicy, SqliteJobStore, WorkerContext,
};

pub struct TestHarness {
    temp_dir: TempDir,
    pub store: Arc<SqliteJobStore>,
    pub blobs: Arc<FilesystemBlobStore>,
    pub queue: Arc<InMemoryQueue>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_queue(InMemoryQueue::new())
    }

    pub fn with_queue(queue: InMemoryQueue) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(&temp_dir.path().join("jobs.db")).expect("Failed to open database");
        let blob_root = temp_dir.path().join("blobs");
        std::fs::create_dir_all(&blob_root).expect("Failed to create blob root");

        Self {
            store: Arc::new(SqliteJobStore::new(db)),
            blobs: Arc::new(FilesystemBlobStore::new(&blob_root)),
            queue: Arc::new(queue),
            temp_dir,
        }
    }

    pub fn temp_path(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    /// Millisecond delays keep retrying tests fast.
    pub fn retry() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1), 2.0)
    }

    pub fn settings() -> PipelineSettings {
        PipelineSettings {
            retry: Self::retry(),
            prompts: PromptSettings::default(),
        }
    }

    pub fn pipeline(&self, completions: Arc<dyn CompletionClient>) -> JobPipeline {
        self.pipeline_with_blobs(completions, self.blobs.clone())
    }

    pub fn pipeline_with_blobs(
        &self,
        completions: Arc<dyn CompletionClient>,
        blobs: Arc<dyn BlobStore>,
    ) -> JobPipeline {
        let ctx = WorkerContext::new(self.store.clone(), blobs, completions, &Self::settings());
        JobPipeline::new(ctx)
    }

    pub fn consumer(&self, completions: Arc<dyn CompletionClient>) -> QueueConsumer {
        self.consumer_with_blobs(completions, self.blobs.clone())
    }

    pub fn consumer_with_blobs(
        &self,
        completions: Arc<dyn CompletionClient>,
        blobs: Arc<dyn BlobStore>,
    ) -> QueueConsumer {
        QueueConsumer::new(
            self.queue.clone(),
            self.pipeline_with_blobs(completions, blobs),
            LivenessReporter::new(self.temp_path().join("worker_alive")),
        )
        .with_max_wait(Duration::from_millis(50))
    }

    /// Inserts the pending job record, uploads the document and enqueues
    /// the message, in the order the upload API does.
    pub async fn enqueue(&self, message: &JobMessage, document: &[u8]) {
        let job = Job::pending(
            message.job_id.clone(),
            &message.filename,
            message.insurance_type.clone(),
        );
        self.store.insert(&job).await.expect("Failed to insert job");
        self.upload(&message.blob_path, document).await;
        self.queue
            .send(&message.to_json().expect("Failed to encode message"))
            .await
            .expect("Failed to enqueue message");
    }

    pub async fn upload(&self, blob_path: &str, document: &[u8]) {
        let (container, key) = split_blob_path(blob_path).expect("Invalid blob path");
        self.blobs
            .put(container, key, document)
            .await
            .expect("Failed to upload document");
    }

    /// Polls until the job reaches `status`, panicking after five seconds.
    pub async fn wait_for_status(&self, job_id: &str, status: JobStatus) -> VersionedJob {
        for _ in 0..500 {
            if let Some(current) = self.store.get(job_id).await.expect("Failed to read job") {
                if current.job.status == status {
                    return current;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never reached {}", job_id, status);
    }

    /// Polls until no message is ready or locked.
    pub async fn wait_for_drained_queue(&self) {
        for _ in 0..500 {
            if self.queue.ready_count() == 0 && self.queue.in_flight_count() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("queue never drained");
    }

    pub async fn job(&self, job_id: &str) -> VersionedJob {
        self.store
            .get(job_id)
            .await
            .expect("Failed to read job")
            .expect("Job not found")
    }
}
