use serde::{Deserialize, Serialize};

/// Work message placed on the extraction queue, one per uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMessage {
    pub job_id: String,
    pub filename: String,
    /// `<container>/<objectKey>`
    pub blob_path: String,
    #[serde(default)]
    pub insurance_type: Option<String>,
    /// ISO-8601 as written by the producer; kept verbatim.
    #[serde(default)]
    pub timestamp: String,
}

impl JobMessage {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
