use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ai::PromptSettings;
use crate::pipeline::PipelineSettings;
use crate::retry::RetryPolicy;
use crate::secrets::SecretRef;
use crate::worker::DEFAULT_LIVENESS_PATH;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerConfig {
    pub queue: QueueConfig,
    pub storage: StorageConfig,
    pub openai: OpenAiConfig,
    pub database: DatabaseConfig,
    pub worker: WorkerSettings,
    pub retry: RetryConfig,
    pub prompts: PromptSettings,
    pub logging: LoggingConfig,
}

impl WorkerConfig {
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            retry: self.retry.to_policy(),
            prompts: self.prompts.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueConfig {
    /// Bare name, host or URL of the Service Bus namespace.
    pub namespace: Option<String>,
    pub queue_name: String,
    pub sas_token: SecretRef,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            queue_name: "document-extraction".to_string(),
            sas_token: SecretRef::default(),
        }
    }
}

/// Either an Azure storage account or a local directory tree laid out as
/// `{root}/{container}/{key}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    pub account_name: Option<String>,
    pub sas_token: SecretRef,
    pub local_root: Option<PathBuf>,
    /// Container new uploads are placed in.
    pub container: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            account_name: None,
            sas_token: SecretRef::default(),
            local_root: None,
            container: "documents".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenAiConfig {
    pub endpoint: Option<String>,
    pub api_key: SecretRef,
    pub deployment: String,
    pub api_version: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: SecretRef::default(),
            deployment: "gpt-4".to_string(),
            api_version: "2024-02-15-preview".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseConfig {
    /// Defaults to `~/.underwriter/data/jobs.db`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkerSettings {
    pub liveness_path: PathBuf,
    pub max_wait_secs: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            liveness_path: PathBuf::from(DEFAULT_LIVENESS_PATH),
            max_wait_secs: 30,
        }
    }
}

impl WorkerSettings {
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            factor: policy.factor,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            self.factor,
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `underwriter=debug,info`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_yields_defaults() {
        let config: WorkerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, WorkerConfig::default());
        assert_eq!(config.queue.queue_name, "document-extraction");
        assert_eq!(config.openai.deployment, "gpt-4");
        assert_eq!(config.openai.api_version, "2024-02-15-preview");
        assert_eq!(config.storage.container, "documents");
        assert_eq!(config.worker.liveness_path, PathBuf::from("/tmp/worker_alive"));
    }

    #[test]
    fn test_retry_defaults_match_policy() {
        assert_eq!(RetryConfig::default().to_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_nested_camel_case() {
        let config: WorkerConfig = serde_json::from_str(
            r#"{
                "queue": {"namespace": "myns", "sasToken": {"env": "SB_TOKEN"}},
                "storage": {"localRoot": "/srv/blobs"},
                "retry": {"maxAttempts": 5, "baseDelayMs": 100},
                "prompts": {"pageTextChars": 1000},
                "logging": {"format": "json"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.queue.namespace.as_deref(), Some("myns"));
        assert_eq!(config.queue.sas_token.env.as_deref(), Some("SB_TOKEN"));
        assert_eq!(config.storage.local_root, Some(PathBuf::from("/srv/blobs")));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.factor, 2.0);
        assert_eq!(config.prompts.page_text_chars, 1000);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.pipeline_settings().retry.max_attempts, 5);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse(" text "), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("xml"), None);
    }
}
