use std::path::PathBuf;
use thiserror::Error;

/// Failures opening or querying the job database.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Job database query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cannot create database directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Job database migration v{version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// A thread panicked while holding the connection.
    #[error("Job database connection is poisoned")]
    LockPoisoned,
}
