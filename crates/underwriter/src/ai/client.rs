use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::CompletionError;
use crate::http::create_http_client;

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);

/// One chat completion: a system role, a user prompt and sampling limits.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the text of the first choice.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Azure OpenAI chat-completions client for a single deployment.
pub struct AzureOpenAiClient {
    client: Client,
    url: Url,
    api_key: SecretString,
}

impl AzureOpenAiClient {
    pub fn new(
        endpoint: &str,
        deployment: &str,
        api_version: &str,
        api_key: SecretString,
    ) -> Result<Self, CompletionError> {
        let url = completions_url(endpoint, deployment, api_version)?;
        let client = create_http_client(COMPLETION_TIMEOUT)
            .map_err(|e| CompletionError::Request(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url,
            api_key,
        })
    }
}

/// `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={v}`
fn completions_url(
    endpoint: &str,
    deployment: &str,
    api_version: &str,
) -> Result<Url, CompletionError> {
    let mut url = Url::parse(endpoint)
        .map_err(|e| CompletionError::Request(format!("invalid endpoint '{}': {}", endpoint, e)))?;
    url.path_segments_mut()
        .map_err(|_| CompletionError::Request(format!("endpoint '{}' cannot be a base", endpoint)))?
        .pop_if_empty()
        .extend(["openai", "deployments", deployment, "chat", "completions"]);
    url.query_pairs_mut().append_pair("api-version", api_version);
    Ok(url)
}

#[async_trait]
impl CompletionClient for AzureOpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let body = ChatBody {
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        debug!(
            "Requesting completion ({} prompt chars, max_tokens {})",
            request.user_prompt.chars().count(),
            request.max_tokens
        );

        let response = self
            .client
            .post(self.url.clone())
            .header("api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Decode(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CompletionError::EmptyResponse)
    }
}
