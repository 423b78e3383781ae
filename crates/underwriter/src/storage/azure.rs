use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};

use super::blob::BlobStore;
use crate::error::BlobError;
use crate::http::{create_http_client, sas_query};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Azure Blob Storage reader authenticated with a pre-issued SAS token.
pub struct AzureBlobStore {
    client: Client,
    endpoint: Url,
    sas_token: SecretString,
}

impl AzureBlobStore {
    /// `https://<account>.blob.core.windows.net`
    pub fn for_account(account: &str, sas_token: SecretString) -> Result<Self, BlobError> {
        Self::new(
            &format!("https://{}.blob.core.windows.net", account),
            sas_token,
        )
    }

    /// Uses an explicit service endpoint, e.g. a local storage emulator.
    pub fn new(endpoint: &str, sas_token: SecretString) -> Result<Self, BlobError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| BlobError::Request(format!("invalid endpoint '{}': {}", endpoint, e)))?;
        let client = create_http_client(DOWNLOAD_TIMEOUT)
            .map_err(|e| BlobError::Request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint,
            sas_token,
        })
    }

    /// Builds the object URL without credentials. Key segments are
    /// percent-encoded individually so `/` inside the key is preserved.
    fn blob_url(&self, container: &str, key: &str) -> Result<Url, BlobError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                BlobError::Request(format!("endpoint '{}' cannot be a base", self.endpoint))
            })?
            .pop_if_empty()
            .push(container)
            .extend(key.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, BlobError> {
        let mut url = self.blob_url(container, key)?;
        debug!("GET {}", url);
        url.set_query(Some(sas_query(self.sas_token.expose_secret())));

        let response = self
            .client
            .get(url)
            .header("x-ms-version", "2023-11-03")
            .send()
            .await
            .map_err(|e| BlobError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(BlobError::NotFound {
                path: format!("{}/{}", container, key),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BlobError::Request(format!("HTTP {}: {}", status, body)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BlobError::Request(e.without_url().to_string()))?;
        Ok(bytes.to_vec())
    }
}
