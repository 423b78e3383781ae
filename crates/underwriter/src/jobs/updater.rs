//! Partial, guarded updates to a job record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;

use super::model::{ComprehensiveAnalysis, Job, JobFailure, JobStatus, PageResult, Progress};
use super::store::{JobStore, StoreError};
use crate::retry::RetryPolicy;

/// Fields to merge into a job. Unset fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<Progress>,
    pub extracted_data: Option<Vec<PageResult>>,
    pub analysis: Option<ComprehensiveAnalysis>,
    pub error: Option<JobFailure>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn progress(progress: Progress) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_extracted_data(mut self, pages: Vec<PageResult>) -> Self {
        self.extracted_data = Some(pages);
        self
    }

    pub fn with_analysis(mut self, analysis: ComprehensiveAnalysis) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn with_error(mut self, error: JobFailure) -> Self {
        self.error = Some(error);
        self
    }

    /// Merges into `job` and advances `updated_at`, never moving it backwards.
    pub fn apply_to(&self, job: &mut Job, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(progress) = &self.progress {
            job.progress = Some(progress.clone());
        }
        if let Some(pages) = &self.extracted_data {
            job.extracted_data = Some(pages.clone());
        }
        if let Some(analysis) = &self.analysis {
            job.analysis = Some(analysis.clone());
        }
        if let Some(error) = &self.error {
            job.error = Some(error.clone());
        }
        job.updated_at = now.max(job.updated_at);
    }
}

/// Applies [`JobUpdate`]s as read-modify-write cycles under the retry policy.
///
/// A version conflict is retried with a fresh read, so concurrent writers
/// never silently drop each other's fields. Records already in a terminal
/// status are never written again.
#[derive(Clone)]
pub struct StateUpdater {
    store: Arc<dyn JobStore>,
    retry: RetryPolicy,
}

impl StateUpdater {
    pub fn new(store: Arc<dyn JobStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Reads the current record, retrying transient store failures.
    pub async fn current(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        let store = self.store.as_ref();
        let found = self
            .retry
            .run("job read", move || async move { store.get(job_id).await })
            .await?;
        Ok(found.map(|v| v.job))
    }

    /// Merges `update` into the stored record and returns what was written.
    pub async fn apply(&self, job_id: &str, update: &JobUpdate) -> Result<Job, StoreError> {
        let store = self.store.as_ref();

        let job = self
            .retry
            .run("job update", move || async move {
                let current = store
                    .get(job_id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound {
                        job_id: job_id.to_string(),
                    })?;

                let mut job = current.job;
                if job.status.is_terminal() {
                    return Err(StoreError::TerminalState {
                        job_id: job_id.to_string(),
                        status: job.status,
                    });
                }
                if let Some(next) = update.status {
                    if next.rank() < job.status.rank() {
                        return Err(StoreError::InvalidTransition {
                            job_id: job_id.to_string(),
                            from: job.status,
                            to: next,
                        });
                    }
                }

                update.apply_to(&mut job, Utc::now());
                store.replace(&job, current.version).await?;
                Ok::<Job, StoreError>(job)
            })
            .await?;

        debug!("Job {} updated (status: {})", job_id, job.status);
        Ok(job)
    }
}
