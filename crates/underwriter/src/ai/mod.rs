//! AI-backed page analysis and whole-document underwriting analysis.

pub mod aggregate;
pub mod client;
pub mod page;
pub mod parse;

pub use aggregate::Aggregator;
pub use client::{AzureOpenAiClient, CompletionClient, CompletionRequest};
pub use page::PageAnalyzer;
pub use parse::{parse_completion, ParsedCompletion};

use serde::{Deserialize, Serialize};

use crate::error::CompletionError;
use crate::retry::RetryPolicy;

/// Prompt sizes and sampling parameters. Character budgets count chars,
/// not bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptSettings {
    pub page_text_chars: usize,
    pub aggregate_page_chars: usize,
    pub aggregate_total_chars: usize,
    pub temperature: f32,
    pub page_max_tokens: u32,
    pub aggregate_max_tokens: u32,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            page_text_chars: 4000,
            aggregate_page_chars: 2000,
            aggregate_total_chars: 8000,
            temperature: 0.3,
            page_max_tokens: 1500,
            aggregate_max_tokens: 2000,
        }
    }
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

pub(crate) async fn complete_with_retry(
    client: &dyn CompletionClient,
    retry: &RetryPolicy,
    label: &str,
    request: &CompletionRequest,
) -> Result<String, CompletionError> {
    retry
        .run(label, move || async move { client.complete(request).await })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_prompt_settings_partial_override() {
        let settings: PromptSettings =
            serde_json::from_str(r#"{"pageTextChars": 1000, "temperature": 0.0}"#).unwrap();
        assert_eq!(settings.page_text_chars, 1000);
        assert_eq!(settings.temperature, 0.0);
        assert_eq!(settings.aggregate_total_chars, 8000);
    }
}
