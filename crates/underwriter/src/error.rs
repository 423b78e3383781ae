use std::path::PathBuf;
use thiserror::Error;

use crate::retry::Retryable;

#[derive(Error, Debug)]
pub enum UnderwriterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Blob storage error: {0}")]
    Blob(#[from] BlobError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Completion service error: {0}")]
    Completion(#[from] CompletionError),

    #[error("Job store error: {0}")]
    Store(#[from] crate::jobs::StoreError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Missing required setting: {name}")]
    Missing { name: &'static str },

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Secret resolution failed: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    #[error("Extraction task failed: {0}")]
    TaskFailed(String),
}

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Invalid blob path format: '{0}' (expected '<container>/<objectKey>')")]
    MalformedPath(String),

    #[error("Blob request failed: {0}")]
    Request(String),

    #[error("Blob '{path}' not found")]
    NotFound { path: String },

    #[error("Failed to download blob '{path}': {source}")]
    Download {
        path: String,
        #[source]
        source: Box<BlobError>,
    },
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue request failed: {0}")]
    Request(String),

    #[error("Queue returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid broker response: {0}")]
    InvalidResponse(String),

    #[error("Unknown or expired lock for message {message_id}")]
    LockLost { message_id: String },
}

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Completion request failed: {0}")]
    Request(String),

    #[error("Completion service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Completion response had no content")]
    EmptyResponse,

    #[error("Failed to decode completion response: {0}")]
    Decode(String),
}

impl Retryable for BlobError {
    fn is_retryable(&self) -> bool {
        // A missing blob may still be uploading after the job was queued.
        !matches!(self, BlobError::MalformedPath(_))
    }
}

impl Retryable for QueueError {
    fn is_retryable(&self) -> bool {
        match self {
            QueueError::Status { status, .. } => *status == 429 || *status >= 500,
            QueueError::LockLost { .. } => false,
            QueueError::Request(_) | QueueError::InvalidResponse(_) => true,
        }
    }
}

impl Retryable for CompletionError {
    fn is_retryable(&self) -> bool {
        match self {
            // Auth and malformed-request failures will not heal on their own.
            CompletionError::Status { status, .. } => !matches!(status, 400 | 401 | 403 | 404),
            _ => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, UnderwriterError>;
