use std::time::Duration;

use reqwest::Client;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Creates an HTTP client with a connect timeout and an overall request
/// timeout. Long-polling callers pass a timeout above their poll window.
pub(crate) fn create_http_client(request_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
}

/// Strips a leading `?` so a SAS token can be appended as a query string.
pub(crate) fn sas_query(token: &str) -> &str {
    token.trim().trim_start_matches('?')
}
