use std::sync::Arc;

use log::info;
use secrecy::SecretString;
use underwriter::config::{WorkerConfig, OPENAI_KEY_ENV};
use underwriter::db::default_database_path;
use underwriter::{
    AzureBlobStore, AzureOpenAiClient, BlobStore, CompletionClient, ConfigError, Database,
    FilesystemBlobStore, MessageQueue, SecretRef, ServiceBusQueue, SqliteJobStore,
    UnderwriterError,
};

pub fn open_job_store(config: &WorkerConfig) -> Result<Arc<SqliteJobStore>, UnderwriterError> {
    let path = config
        .database
        .path
        .clone()
        .or_else(default_database_path)
        .ok_or(ConfigError::Missing {
            name: "JOB_DB_PATH",
        })?;
    info!("Opening job database at {:?}", path);
    let db = Database::open(&path)?;
    Ok(Arc::new(SqliteJobStore::new(db)))
}

pub fn build_queue(config: &WorkerConfig) -> Result<Arc<dyn MessageQueue>, UnderwriterError> {
    let namespace = config
        .queue
        .namespace
        .as_deref()
        .ok_or(ConfigError::Missing {
            name: "SERVICE_BUS_NAMESPACE",
        })?;
    let token = required_secret(
        &config.queue.sas_token,
        &["SERVICE_BUS_SAS_TOKEN"],
        "SERVICE_BUS_SAS_TOKEN",
    )?;
    info!(
        "Consuming queue '{}' on namespace '{}'",
        config.queue.queue_name, namespace
    );
    Ok(Arc::new(ServiceBusQueue::new(
        namespace,
        &config.queue.queue_name,
        token,
    )?))
}

pub fn build_blob_store(config: &WorkerConfig) -> Result<Arc<dyn BlobStore>, UnderwriterError> {
    let storage = &config.storage;
    if let Some(account) = storage.account_name.as_deref() {
        let token = required_secret(
            &storage.sas_token,
            &["STORAGE_SAS_TOKEN"],
            "STORAGE_SAS_TOKEN",
        )?;
        info!("Reading documents from storage account '{}'", account);
        return Ok(Arc::new(AzureBlobStore::for_account(account, token)?));
    }
    if let Some(root) = storage.local_root.as_ref() {
        info!("Reading documents from local directory {:?}", root);
        return Ok(Arc::new(FilesystemBlobStore::new(root)));
    }
    Err(ConfigError::Missing {
        name: "STORAGE_ACCOUNT_NAME",
    }
    .into())
}

pub fn build_completion_client(
    config: &WorkerConfig,
) -> Result<Arc<dyn CompletionClient>, UnderwriterError> {
    let openai = &config.openai;
    let endpoint = openai.endpoint.as_deref().ok_or(ConfigError::Missing {
        name: "AZURE_OPENAI_ENDPOINT",
    })?;
    let key = required_secret(&openai.api_key, OPENAI_KEY_ENV, "AZURE_OPENAI_KEY")?;
    Ok(Arc::new(AzureOpenAiClient::new(
        endpoint,
        &openai.deployment,
        &openai.api_version,
        key,
    )?))
}

fn required_secret(
    secret: &SecretRef,
    fallback_env: &[&str],
    name: &'static str,
) -> Result<SecretString, ConfigError> {
    secret
        .resolve(fallback_env)?
        .ok_or(ConfigError::Missing { name })
}
