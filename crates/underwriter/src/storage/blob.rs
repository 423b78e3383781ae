//! Blob path handling and the retrying fetcher.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::error::BlobError;
use crate::retry::RetryPolicy;

/// Read access to an object store addressed by container and key.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, BlobError>;
}

/// Splits `<container>/<objectKey>` at the first `/`. The key may itself
/// contain slashes; neither part may be empty.
pub fn split_blob_path(path: &str) -> Result<(&str, &str), BlobError> {
    match path.split_once('/') {
        Some((container, key)) if !container.is_empty() && !key.is_empty() => {
            Ok((container, key))
        }
        _ => Err(BlobError::MalformedPath(path.to_string())),
    }
}

/// Downloads whole documents through a [`BlobStore`] under the retry policy.
#[derive(Clone)]
pub struct BlobFetcher {
    store: Arc<dyn BlobStore>,
    retry: RetryPolicy,
}

impl BlobFetcher {
    pub fn new(store: Arc<dyn BlobStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub async fn fetch(&self, blob_path: &str) -> Result<Vec<u8>, BlobError> {
        let (container, key) = split_blob_path(blob_path)?;
        let store = self.store.as_ref();

        let bytes = self
            .retry
            .run("blob download", move || async move {
                store.get(container, key).await
            })
            .await
            .map_err(|e| BlobError::Download {
                path: blob_path.to_string(),
                source: Box::new(e),
            })?;

        debug!("Downloaded {} ({} bytes)", blob_path, bytes.len());
        Ok(bytes)
    }
}
