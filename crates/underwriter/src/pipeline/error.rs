use thiserror::Error;

use crate::error::{BlobError, CompletionError, ProcessError};
use crate::jobs::StoreError;

/// Job-fatal failures. Each is recorded on the job before it propagates.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Document download failed: {0}")]
    Blob(#[from] BlobError),

    #[error("Document processing failed: {0}")]
    Process(#[from] ProcessError),

    #[error("Comprehensive analysis failed: {0}")]
    Aggregation(#[from] CompletionError),

    #[error("Job update failed: {0}")]
    JobUpdate(#[from] StoreError),
}
