use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{Delivery, MessageQueue};
use crate::error::QueueError;
use crate::http::create_http_client;

/// Added to the server-side wait so the HTTP call outlives the long poll.
const RECEIVE_GRACE: Duration = Duration::from_secs(15);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// `BrokerProperties` header on a peek-locked message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BrokerProperties {
    message_id: String,
    lock_token: String,
    #[serde(default)]
    delivery_count: u32,
}

/// Azure Service Bus queue over the REST API, authorised with a
/// pre-issued `SharedAccessSignature` token.
pub struct ServiceBusQueue {
    client: Client,
    queue_url: Url,
    sas_token: SecretString,
}

impl ServiceBusQueue {
    /// `namespace` may be a bare name (`myns`), a host
    /// (`myns.servicebus.windows.net`) or a full URL.
    pub fn new(namespace: &str, queue: &str, sas_token: SecretString) -> Result<Self, QueueError> {
        let base = namespace_url(namespace);
        let mut queue_url = Url::parse(&base)
            .map_err(|e| QueueError::Request(format!("invalid namespace '{}': {}", namespace, e)))?;
        queue_url
            .path_segments_mut()
            .map_err(|_| QueueError::Request(format!("invalid namespace '{}'", namespace)))?
            .pop_if_empty()
            .push(queue);

        let client = create_http_client(REQUEST_TIMEOUT)
            .map_err(|e| QueueError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            queue_url,
            sas_token,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.queue_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    fn lock_url(&self, delivery: &Delivery) -> Url {
        self.url(&["messages", &delivery.message_id, &delivery.lock_token])
    }

    async fn settle(&self, response: Response, delivery: &Delivery) -> Result<(), QueueError> {
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(QueueError::LockLost {
                message_id: delivery.message_id.clone(),
            }),
            s => Err(status_error(s, response).await),
        }
    }
}

fn namespace_url(namespace: &str) -> String {
    if namespace.contains("://") {
        namespace.to_string()
    } else if namespace.contains('.') {
        format!("https://{}", namespace)
    } else {
        format!("https://{}.servicebus.windows.net", namespace)
    }
}

async fn status_error(status: StatusCode, response: Response) -> QueueError {
    QueueError::Status {
        status: status.as_u16(),
        body: response.text().await.unwrap_or_default(),
    }
}

fn request_error(e: reqwest::Error) -> QueueError {
    QueueError::Request(e.without_url().to_string())
}

#[async_trait]
impl MessageQueue for ServiceBusQueue {
    async fn receive(&self, max_wait: Duration) -> Result<Option<Delivery>, QueueError> {
        let mut url = self.url(&["messages", "head"]);
        url.query_pairs_mut()
            .append_pair("timeout", &max_wait.as_secs().to_string());

        let response = self
            .client
            .post(url)
            .header("Authorization", self.sas_token.expose_secret())
            .header("Content-Length", "0")
            .timeout(max_wait + RECEIVE_GRACE)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        let properties = response
            .headers()
            .get("BrokerProperties")
            .ok_or_else(|| QueueError::InvalidResponse("missing BrokerProperties".to_string()))?
            .to_str()
            .map_err(|e| QueueError::InvalidResponse(e.to_string()))
            .and_then(|raw| {
                serde_json::from_str::<BrokerProperties>(raw)
                    .map_err(|e| QueueError::InvalidResponse(e.to_string()))
            })?;

        let body = response.bytes().await.map_err(request_error)?;
        debug!(
            "Received message {} (delivery {})",
            properties.message_id, properties.delivery_count
        );

        Ok(Some(Delivery {
            message_id: properties.message_id,
            lock_token: properties.lock_token,
            body: body.to_vec(),
            delivery_count: properties.delivery_count,
        }))
    }

    async fn complete(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let response = self
            .client
            .delete(self.lock_url(delivery))
            .header("Authorization", self.sas_token.expose_secret())
            .send()
            .await
            .map_err(request_error)?;
        self.settle(response, delivery).await
    }

    async fn abandon(&self, delivery: &Delivery) -> Result<(), QueueError> {
        let response = self
            .client
            .put(self.lock_url(delivery))
            .header("Authorization", self.sas_token.expose_secret())
            .header("Content-Length", "0")
            .send()
            .await
            .map_err(request_error)?;
        self.settle(response, delivery).await
    }

    async fn send(&self, body: &str) -> Result<(), QueueError> {
        let response = self
            .client
            .post(self.url(&["messages"]))
            .header("Authorization", self.sas_token.expose_secret())
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(status_error(status, response).await)
        }
    }
}
