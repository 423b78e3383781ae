//! Producer side: creating jobs and clearing stale ones.

use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

use super::message::JobMessage;
use super::model::{Job, JobStatus};
use super::store::{JobStore, StoreError};
use crate::error::Result;
use crate::queue::MessageQueue;
use crate::retry::RetryPolicy;

/// Creates `pending` job records and enqueues their work messages.
///
/// The document itself must already be (or soon be) uploaded at the
/// returned message's `blob_path`.
pub struct JobSubmitter {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn MessageQueue>,
    container: String,
    retry: RetryPolicy,
}

impl JobSubmitter {
    pub fn new(
        store: Arc<dyn JobStore>,
        queue: Arc<dyn MessageQueue>,
        container: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            queue,
            container: container.into(),
            retry,
        }
    }

    /// `<container>/<jobId>/<filename>`
    pub fn blob_path(container: &str, job_id: &str, filename: &str) -> String {
        format!("{}/{}/{}", container, job_id, filename)
    }

    pub async fn submit(
        &self,
        filename: &str,
        insurance_type: Option<String>,
    ) -> Result<JobMessage> {
        let job_id = Uuid::new_v4().to_string();
        let job = Job::pending(job_id.clone(), filename, insurance_type.clone());

        let store = self.store.as_ref();
        let record = &job;
        self.retry
            .run("job insert", move || async move { store.insert(record).await })
            .await?;

        let message = JobMessage {
            job_id: job_id.clone(),
            filename: filename.to_string(),
            blob_path: Self::blob_path(&self.container, &job_id, filename),
            insurance_type,
            timestamp: Utc::now().to_rfc3339(),
        };
        let body = message.to_json().map_err(StoreError::from)?;

        let queue = self.queue.as_ref();
        let body = body.as_str();
        self.retry
            .run("queue send", move || async move { queue.send(body).await })
            .await?;

        info!("Submitted job {} for {}", job_id, filename);
        Ok(message)
    }
}

/// Outcome of [`purge_stale_jobs`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub deleted: usize,
    pub failed: usize,
}

/// Deletes every job in one of `statuses`. A failed delete is logged and
/// counted; the sweep carries on.
pub async fn purge_stale_jobs(
    store: &dyn JobStore,
    statuses: &[JobStatus],
    retry: &RetryPolicy,
) -> std::result::Result<PurgeReport, StoreError> {
    let mut report = PurgeReport::default();

    for &status in statuses {
        let jobs = retry
            .run("job listing", move || async move {
                store.list_by_status(status).await
            })
            .await?;

        for job in jobs {
            let job_id = job.job_id.as_str();
            match retry
                .run("job delete", move || async move { store.delete(job_id).await })
                .await
            {
                Ok(true) => report.deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("Failed to delete {} job {}: {}", status, job_id, e);
                    report.failed += 1;
                }
            }
        }
    }

    info!(
        "Purge finished: {} deleted, {} failed",
        report.deleted, report.failed
    );
    Ok(report)
}
