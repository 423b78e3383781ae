use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use log::warn;

pub const DEFAULT_LIVENESS_PATH: &str = "/tmp/worker_alive";

/// Heartbeat file for external health probes.
#[derive(Debug, Clone)]
pub struct LivenessReporter {
    path: PathBuf,
}

impl Default for LivenessReporter {
    fn default() -> Self {
        Self::new(DEFAULT_LIVENESS_PATH)
    }
}

impl LivenessReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the file with the current time. Never fails the caller.
    pub async fn beat(&self) {
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        if let Err(e) = tokio::fs::write(&self.path, stamp).await {
            warn!("Failed to write liveness file {:?}: {}", self.path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_beat_writes_rfc3339_timestamp() {
        let dir = TempDir::new().unwrap();
        let reporter = LivenessReporter::new(dir.path().join("alive"));

        let before = Utc::now();
        reporter.beat().await;

        let content = std::fs::read_to_string(reporter.path()).unwrap();
        let stamp = DateTime::parse_from_rfc3339(&content).unwrap();
        assert!(stamp.with_timezone(&Utc) >= before - chrono::Duration::milliseconds(1));
    }

    #[tokio::test]
    async fn test_beat_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alive");
        std::fs::write(&path, "stale content that is much longer than a timestamp").unwrap();

        LivenessReporter::new(&path).beat().await;

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));
    }

    #[tokio::test]
    async fn test_unwritable_path_is_ignored() {
        let dir = TempDir::new().unwrap();
        let reporter = LivenessReporter::new(dir.path().join("missing").join("alive"));
        reporter.beat().await;
        assert!(!reporter.path().exists());
    }
}
