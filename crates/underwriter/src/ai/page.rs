use std::sync::Arc;

use log::warn;
use serde_json::{json, Map, Value};

use super::client::{CompletionClient, CompletionRequest};
use super::parse::{parse_completion, ParsedCompletion};
use super::{complete_with_retry, truncate_chars, PromptSettings};
use crate::jobs::PageResult;
use crate::processor::ExtractedPage;
use crate::retry::RetryPolicy;

pub const PAGE_SYSTEM_PROMPT: &str =
    "You are an insurance underwriting assistant. Extract structured data from documents.";

pub fn page_prompt(page: u32, text: &str) -> String {
    format!(
        "Analyze this insurance document page and extract key information:\n\
         \n\
         Page {page} Content:\n\
         {text}\n\
         \n\
         Extract and return as JSON:\n\
         1. documentType: (application, medical_report, financial_statement, etc.)\n\
         2. keyValues: {{key: value}} pairs of important data\n\
         3. riskFactors: list of identified risk factors\n\
         4. concerns: list of any discrepancies or concerns\n\
         \n\
         Return only valid JSON."
    )
}

/// Analyses one page at a time. Never fails: a bad response or a failed
/// call is recorded in the page's `analysis`.
#[derive(Clone)]
pub struct PageAnalyzer {
    client: Arc<dyn CompletionClient>,
    retry: RetryPolicy,
    settings: PromptSettings,
}

impl PageAnalyzer {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        retry: RetryPolicy,
        settings: PromptSettings,
    ) -> Self {
        Self {
            client,
            retry,
            settings,
        }
    }

    pub async fn analyze(&self, page: &ExtractedPage) -> PageResult {
        let request = CompletionRequest {
            system_prompt: PAGE_SYSTEM_PROMPT.to_string(),
            user_prompt: page_prompt(
                page.page,
                truncate_chars(&page.text, self.settings.page_text_chars),
            ),
            temperature: self.settings.temperature,
            max_tokens: self.settings.page_max_tokens,
        };

        let analysis = match complete_with_retry(
            self.client.as_ref(),
            &self.retry,
            "page analysis",
            &request,
        )
        .await
        {
            Ok(text) => match parse_completion(&text) {
                ParsedCompletion::Structured(value) => value,
                ParsedCompletion::Raw(raw) => {
                    warn!(
                        "Could not parse analysis of page {} as JSON; keeping raw text",
                        page.page
                    );
                    json!({ "rawAnalysis": raw })
                }
            },
            Err(e) => {
                warn!("Analysis of page {} failed: {}", page.page, e);
                json!({ "error": e.to_string() })
            }
        };

        let page_type = analysis
            .get("documentType")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let key_values = analysis
            .get("keyValues")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_else(Map::new);

        PageResult {
            page: page.page,
            text: page.text.clone(),
            page_type,
            key_values,
            analysis,
        }
    }
}
