use std::path::{Path, PathBuf};

use crate::config::schema::{LogFormat, WorkerConfig};
use crate::error::ConfigError;
use crate::secrets::SecretRef;

/// Names the config file when `--config` is not given.
pub const CONFIG_PATH_ENV: &str = "UNDERWRITER_CONFIG";

pub const OPENAI_KEY_ENV: &[&str] = &["AZURE_OPENAI_KEY", "OPENAI_API_KEY"];

/// Reads the optional JSON file, then lets environment variables override
/// individual settings.
pub fn load_config(path: Option<&Path>) -> Result<WorkerConfig, ConfigError> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| env_value(CONFIG_PATH_ENV).map(PathBuf::from));

    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFile { path, source: e })?;
            load_config_from_str(&content)?
        }
        None => WorkerConfig::default(),
    };

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn load_config_from_str(content: &str) -> Result<WorkerConfig, ConfigError> {
    let config: WorkerConfig = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn apply_env_overrides(config: &mut WorkerConfig) -> Result<(), ConfigError> {
    override_opt(&mut config.queue.namespace, "SERVICE_BUS_NAMESPACE");
    override_string(&mut config.queue.queue_name, "SERVICE_BUS_QUEUE_NAME");
    override_secret(&mut config.queue.sas_token, &["SERVICE_BUS_SAS_TOKEN"]);

    override_opt(&mut config.storage.account_name, "STORAGE_ACCOUNT_NAME");
    override_secret(&mut config.storage.sas_token, &["STORAGE_SAS_TOKEN"]);
    if let Some(root) = env_value("STORAGE_LOCAL_ROOT") {
        config.storage.local_root = Some(PathBuf::from(root));
    }
    override_string(&mut config.storage.container, "STORAGE_CONTAINER_NAME");

    override_opt(&mut config.openai.endpoint, "AZURE_OPENAI_ENDPOINT");
    override_secret(&mut config.openai.api_key, OPENAI_KEY_ENV);
    override_string(&mut config.openai.deployment, "AZURE_OPENAI_DEPLOYMENT");
    override_string(&mut config.openai.api_version, "OPENAI_API_VERSION");

    if let Some(path) = env_value("JOB_DB_PATH") {
        config.database.path = Some(PathBuf::from(path));
    }
    if let Some(path) = env_value("LIVENESS_PATH") {
        config.worker.liveness_path = PathBuf::from(path);
    }

    override_string(&mut config.logging.level, "LOG_LEVEL");
    if let Some(format) = env_value("LOG_FORMAT") {
        config.logging.format =
            LogFormat::parse(&format).ok_or_else(|| ConfigError::Validation {
                message: format!("LOG_FORMAT must be 'text' or 'json', got '{}'", format),
            })?;
    }

    Ok(())
}

/// Checks that hold for every command.
fn validate_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    if config.retry.max_attempts == 0 {
        return Err(ConfigError::Validation {
            message: "retry.maxAttempts must be at least 1".to_string(),
        });
    }
    if !config.retry.factor.is_finite() || config.retry.factor < 1.0 {
        return Err(ConfigError::Validation {
            message: format!("retry.factor must be >= 1.0, got {}", config.retry.factor),
        });
    }
    if config.queue.queue_name.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "queue.queueName must not be empty".to_string(),
        });
    }
    if config.storage.container.trim().is_empty() || config.storage.container.contains('/') {
        return Err(ConfigError::Validation {
            message: format!(
                "storage.container '{}' is not a valid container name",
                config.storage.container
            ),
        });
    }
    if config.prompts.temperature < 0.0 || config.prompts.temperature > 2.0 {
        return Err(ConfigError::Validation {
            message: format!(
                "prompts.temperature must be within 0.0..=2.0, got {}",
                config.prompts.temperature
            ),
        });
    }
    Ok(())
}

/// Checks the settings the queue worker cannot start without.
pub fn validate_for_worker(config: &WorkerConfig) -> Result<(), ConfigError> {
    if config.queue.namespace.is_none() {
        return Err(ConfigError::Missing {
            name: "SERVICE_BUS_NAMESPACE",
        });
    }
    if !config.queue.sas_token.is_configured() {
        return Err(ConfigError::Missing {
            name: "SERVICE_BUS_SAS_TOKEN",
        });
    }

    match (&config.storage.account_name, &config.storage.local_root) {
        (Some(_), _) if !config.storage.sas_token.is_configured() => {
            return Err(ConfigError::Missing {
                name: "STORAGE_SAS_TOKEN",
            });
        }
        (None, None) => {
            return Err(ConfigError::Missing {
                name: "STORAGE_ACCOUNT_NAME",
            });
        }
        _ => {}
    }

    if config.openai.endpoint.is_none() {
        return Err(ConfigError::Missing {
            name: "AZURE_OPENAI_ENDPOINT",
        });
    }
    if !config.openai.api_key.is_configured() {
        return Err(ConfigError::Missing {
            name: "AZURE_OPENAI_KEY",
        });
    }
    if config.worker.max_wait_secs == 0 {
        return Err(ConfigError::Validation {
            message: "worker.maxWaitSecs must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Set and non-blank, trimmed.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn override_opt(field: &mut Option<String>, name: &str) {
    if let Some(value) = env_value(name) {
        *field = Some(value);
    }
}

fn override_string(field: &mut String, name: &str) {
    if let Some(value) = env_value(name) {
        *field = value;
    }
}

/// The first set variable replaces whatever the file configured.
fn override_secret(field: &mut SecretRef, names: &[&str]) {
    if let Some(name) = names.iter().find(|name| env_value(name).is_some()) {
        *field = SecretRef {
            env: Some(name.to_string()),
            ..SecretRef::default()
        };
    }
}
