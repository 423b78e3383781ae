//! Job store abstraction.
//!
//! A store keeps one JSON record per job together with a monotonically
//! increasing version. Writers read a [`VersionedJob`], modify it and hand
//! the version back to [`JobStore::replace`]; a store that has moved on
//! reports [`StoreError::Conflict`] instead of overwriting.

use async_trait::async_trait;
use thiserror::Error;

use super::model::{Job, JobStatus};
use crate::db::DatabaseError;
use crate::retry::Retryable;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Job '{job_id}' not found")]
    NotFound { job_id: String },

    #[error("Job '{job_id}' already exists")]
    AlreadyExists { job_id: String },

    #[error("Job '{job_id}' changed since version {expected}")]
    Conflict { job_id: String, expected: u64 },

    #[error("Job '{job_id}' is already {status}")]
    TerminalState { job_id: String, status: JobStatus },

    #[error("Job '{job_id}' cannot move from {from} back to {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Failed to (de)serialize job record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Job store task failed: {0}")]
    Task(String),
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict { .. } | StoreError::Database(_) | StoreError::Task(_)
        )
    }
}

/// A job record as read, with the version a conditional write must match.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedJob {
    pub job: Job,
    pub version: u64,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Creates a new record at version 1.
    async fn insert(&self, job: &Job) -> Result<(), StoreError>;

    async fn get(&self, job_id: &str) -> Result<Option<VersionedJob>, StoreError>;

    /// Overwrites the record only if its stored version is still
    /// `expected_version`. Returns the new version.
    async fn replace(&self, job: &Job, expected_version: u64) -> Result<u64, StoreError>;

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError>;

    /// Returns `false` when no such record existed.
    async fn delete(&self, job_id: &str) -> Result<bool, StoreError>;
}
