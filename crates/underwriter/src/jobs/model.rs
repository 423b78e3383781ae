//! Persisted job record and its parts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Lifecycle status of a job. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    /// Records written by the retired blob-trigger path carry `extracted`;
    /// they are read as still in progress.
    #[serde(alias = "extracted")]
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" | "extracted" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Position in the forward-only lifecycle.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Processing => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub message: String,
    pub current_page: u32,
    pub total_pages: u32,
}

impl Progress {
    pub fn new(message: impl Into<String>, current_page: u32, total_pages: u32) -> Self {
        Self {
            message: message.into(),
            current_page,
            total_pages,
        }
    }
}

/// Per-page extraction and analysis result, 1-indexed by `page`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub page: u32,
    pub text: String,
    pub page_type: String,
    #[serde(default)]
    pub key_values: Map<String, Value>,
    /// Structured analysis, `{rawAnalysis}` or `{error}`.
    pub analysis: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub description: String,
    #[serde(
        default,
        deserialize_with = "deserialize_page_ref",
        skip_serializing_if = "Option::is_none"
    )]
    pub page: Option<u32>,
}

/// Accepts `3`, `"3"` or `"page 3"`; anything else becomes `None`.
fn deserialize_page_ref<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s
            .trim()
            .trim_start_matches(|c: char| !c.is_ascii_digit())
            .parse()
            .ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensiveAnalysis {
    pub summary: String,
    #[serde(default)]
    pub risks: Vec<Risk>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl JobFailure {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The job record, keyed (and partitioned) by `job_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: String,
    pub filename: String,
    #[serde(default)]
    pub insurance_type: Option<String>,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_data: Option<Vec<PageResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ComprehensiveAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A fresh `pending` record, as the upload API creates it.
    pub fn pending(
        job_id: impl Into<String>,
        filename: impl Into<String>,
        insurance_type: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.into(),
            filename: filename.into(),
            insurance_type,
            status: JobStatus::Pending,
            progress: None,
            extracted_data: None,
            analysis: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}
