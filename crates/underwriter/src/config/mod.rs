pub mod loader;
pub mod schema;

pub use loader::{
    apply_env_overrides, load_config, load_config_from_str, validate_for_worker, CONFIG_PATH_ENV,
    OPENAI_KEY_ENV,
};
pub use schema::{
    DatabaseConfig, LogFormat, LoggingConfig, OpenAiConfig, QueueConfig, RetryConfig,
    StorageConfig, WorkerConfig, WorkerSettings,
};
