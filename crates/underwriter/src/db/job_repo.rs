//! Job repository: versioned JSON documents in the `jobs` table.

use async_trait::async_trait;
use chrono::SecondsFormat;
use rusqlite::{params, Row};

use super::{Database, DatabaseError};
use crate::jobs::{Job, JobStatus, JobStore, StoreError, VersionedJob};

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub status: String,
    pub version: i64,
    /// The full job record as camelCase JSON.
    pub document: String,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            status: row.get("status")?,
            version: row.get("version")?,
            document: row.get("document")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn from_job(job: &Job, version: u64) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: job.job_id.clone(),
            status: job.status.as_str().to_string(),
            version: version as i64,
            document: serde_json::to_string(job)?,
            created_at: job.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            updated_at: job.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }

    pub fn into_versioned(self) -> Result<VersionedJob, serde_json::Error> {
        Ok(VersionedJob {
            job: serde_json::from_str(&self.document)?,
            version: self.version.max(0) as u64,
        })
    }
}

/// Inserts a new row. Returns `false` if the id is already taken.
pub fn insert(db: &Database, row: &JobRow) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "INSERT OR IGNORE INTO jobs (id, status, version, document, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.id,
                row.status,
                row.version,
                row.document,
                row.created_at,
                row.updated_at,
            ],
        )?;
        Ok(changed == 1)
    })
}

/// Overwrites a row if its version is still `expected_version`, bumping
/// the version by one. Returns `false` when nothing matched.
pub fn update_versioned(
    db: &Database,
    row: &JobRow,
    expected_version: i64,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE jobs SET status = ?2, document = ?3, updated_at = ?4, version = version + 1
             WHERE id = ?1 AND version = ?5",
            params![
                row.id,
                row.status,
                row.document,
                row.updated_at,
                expected_version,
            ],
        )?;
        Ok(changed == 1)
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], JobRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists jobs with the given status, oldest first.
pub fn list_by_status(db: &Database, status: &str) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM jobs WHERE status = ?1 ORDER BY created_at ASC")?;
        let rows = stmt
            .query_map(params![status], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts jobs with the given status.
pub fn count_by_status(db: &Database, status: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Deletes a job. Returns `false` if it did not exist.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
        Ok(changed == 1)
    })
}

/// [`JobStore`] backed by the local SQLite database.
///
/// Every call runs on the blocking pool so the connection mutex is never
/// held across an await point.
#[derive(Clone)]
pub struct SqliteJobStore {
    db: Database,
}

impl SqliteJobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn insert(&self, job: &Job) -> Result<(), StoreError> {
        let row = JobRow::from_job(job, 1)?;
        self.blocking(move |db| {
            if insert(db, &row)? {
                Ok(())
            } else {
                Err(StoreError::AlreadyExists { job_id: row.id })
            }
        })
        .await
    }

    async fn get(&self, job_id: &str) -> Result<Option<VersionedJob>, StoreError> {
        let id = job_id.to_string();
        self.blocking(move |db| match find_by_id(db, &id)? {
            Some(row) => Ok(Some(row.into_versioned()?)),
            None => Ok(None),
        })
        .await
    }

    async fn replace(&self, job: &Job, expected_version: u64) -> Result<u64, StoreError> {
        let row = JobRow::from_job(job, expected_version + 1)?;
        let expected = expected_version as i64;
        self.blocking(move |db| {
            if update_versioned(db, &row, expected)? {
                return Ok(expected_version + 1);
            }
            if find_by_id(db, &row.id)?.is_some() {
                Err(StoreError::Conflict {
                    job_id: row.id,
                    expected: expected_version,
                })
            } else {
                Err(StoreError::NotFound { job_id: row.id })
            }
        })
        .await
    }

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, StoreError> {
        self.blocking(move |db| {
            list_by_status(db, status.as_str())?
                .into_iter()
                .map(|row| {
                    row.into_versioned()
                        .map(|v| v.job)
                        .map_err(StoreError::from)
                })
                .collect()
        })
        .await
    }

    async fn delete(&self, job_id: &str) -> Result<bool, StoreError> {
        let id = job_id.to_string();
        self.blocking(move |db| Ok(delete(db, &id)?)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::Progress;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample_job(id: &str) -> Job {
        Job::pending(id, "application.pdf", Some("life".to_string()))
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        let row = JobRow::from_job(&sample_job("job-1"), 1).unwrap();
        assert!(insert(&db, &row).unwrap());

        let found = find_by_id(&db, "job-1").unwrap().unwrap();
        assert_eq!(found.status, "pending");
        assert_eq!(found.version, 1);

        let versioned = found.into_versioned().unwrap();
        assert_eq!(versioned.job.filename, "application.pdf");
    }

    #[test]
    fn test_insert_duplicate_is_ignored() {
        let db = test_db();
        let row = JobRow::from_job(&sample_job("dup"), 1).unwrap();
        assert!(insert(&db, &row).unwrap());
        assert!(!insert(&db, &row).unwrap());
    }

    #[test]
    fn test_find_nonexistent() {
        let db = test_db();
        assert!(find_by_id(&db, "nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_update_versioned_requires_matching_version() {
        let db = test_db();
        let mut job = sample_job("job-2");
        insert(&db, &JobRow::from_job(&job, 1).unwrap()).unwrap();

        job.status = JobStatus::Processing;
        let row = JobRow::from_job(&job, 2).unwrap();
        assert!(!update_versioned(&db, &row, 7).unwrap());
        assert!(update_versioned(&db, &row, 1).unwrap());

        let found = find_by_id(&db, "job-2").unwrap().unwrap();
        assert_eq!(found.status, "processing");
        assert_eq!(found.version, 2);
    }

    #[test]
    fn test_count_and_list_by_status() {
        let db = test_db();
        insert(&db, &JobRow::from_job(&sample_job("a"), 1).unwrap()).unwrap();
        insert(&db, &JobRow::from_job(&sample_job("b"), 1).unwrap()).unwrap();
        let mut done = sample_job("c");
        done.status = JobStatus::Completed;
        insert(&db, &JobRow::from_job(&done, 1).unwrap()).unwrap();

        assert_eq!(count_by_status(&db, "pending").unwrap(), 2);
        assert_eq!(count_by_status(&db, "completed").unwrap(), 1);
        assert_eq!(list_by_status(&db, "pending").unwrap().len(), 2);
    }

    #[test]
    fn test_delete() {
        let db = test_db();
        insert(&db, &JobRow::from_job(&sample_job("d"), 1).unwrap()).unwrap();
        assert!(delete(&db, "d").unwrap());
        assert!(!delete(&db, "d").unwrap());
    }

    #[tokio::test]
    async fn test_store_replace_bumps_version() {
        let store = SqliteJobStore::new(test_db());
        let mut job = sample_job("s1");
        store.insert(&job).await.unwrap();

        job.progress = Some(Progress::new("Starting document processing", 0, 0));
        let version = store.replace(&job, 1).await.unwrap();
        assert_eq!(version, 2);

        let stored = store.get("s1").await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.job.progress, job.progress);
    }

    #[tokio::test]
    async fn test_store_stale_replace_conflicts() {
        let store = SqliteJobStore::new(test_db());
        let job = sample_job("s2");
        store.insert(&job).await.unwrap();
        store.replace(&job, 1).await.unwrap();

        let err = store.replace(&job, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 1, .. }));
    }

    #[tokio::test]
    async fn test_store_replace_missing_is_not_found() {
        let store = SqliteJobStore::new(test_db());
        let err = store.replace(&sample_job("ghost"), 1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_store_insert_twice_fails() {
        let store = SqliteJobStore::new(test_db());
        store.insert(&sample_job("s3")).await.unwrap();
        let err = store.insert(&sample_job("s3")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_store_reads_legacy_extracted_records() {
        let db = test_db();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO jobs (id, status, version, document, created_at, updated_at)
                 VALUES ('old', 'extracted', 4, ?1, '2025-01-01', '2025-01-01')",
                params![r#"{"jobId":"old","filename":"x.pdf","status":"extracted",
                    "createdAt":"2025-01-01T00:00:00Z","updatedAt":"2025-01-01T00:00:00Z"}"#],
            )?;
            Ok(())
        })
        .unwrap();

        let store = SqliteJobStore::new(db);
        let stored = store.get("old").await.unwrap().unwrap();
        assert_eq!(stored.job.status, JobStatus::Processing);
        assert_eq!(stored.version, 4);
    }
}
