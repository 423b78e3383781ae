use std::sync::Arc;

use chrono::Utc;
use log::warn;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::client::{CompletionClient, CompletionRequest};
use super::parse::{parse_completion, ParsedCompletion};
use super::{complete_with_retry, truncate_chars, PromptSettings};
use crate::error::CompletionError;
use crate::jobs::{ComprehensiveAnalysis, PageResult, Risk};
use crate::retry::RetryPolicy;

pub const ANALYSIS_SYSTEM_PROMPT: &str = "You are an expert insurance underwriter. \
     Analyze applications for risks and provide recommendations.";

/// `Page {n}:\n{text}` blocks separated by blank lines, each page and the
/// whole bounded by the character budgets.
pub fn combined_page_text(pages: &[PageResult], settings: &PromptSettings) -> String {
    let full = pages
        .iter()
        .map(|p| {
            format!(
                "Page {}:\n{}",
                p.page,
                truncate_chars(&p.text, settings.aggregate_page_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_chars(&full, settings.aggregate_total_chars).to_string()
}

pub fn analysis_prompt(combined: &str) -> String {
    format!(
        "Perform comprehensive underwriting analysis on this insurance application:\n\
         \n\
         {combined}\n\
         \n\
         Provide analysis as JSON with:\n\
         1. summary: Brief overview of the application\n\
         2. risks: Array of {{category, severity, description, page}} for identified risks\n\
         3. recommendations: Array of recommended actions\n\
         \n\
         Focus on medical history, financial status, lifestyle factors, and any discrepancies."
    )
}

#[derive(Deserialize)]
struct AnalysisDraft {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    risks: Vec<Risk>,
    #[serde(default, deserialize_with = "loose_strings")]
    recommendations: Vec<String>,
}

/// Keeps string items as-is and renders anything else as compact JSON.
fn loose_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

/// Produces the whole-document analysis from all page results.
#[derive(Clone)]
pub struct Aggregator {
    client: Arc<dyn CompletionClient>,
    retry: RetryPolicy,
    settings: PromptSettings,
}

impl Aggregator {
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

    /// Fails only when the completion call itself fails; an unusable
    /// response becomes a summary-only analysis.
    pub async fn aggregate(
        &self,
        pages: &[PageResult],
    ) -> Result<ComprehensiveAnalysis, CompletionError> {
        let request = CompletionRequest {
            system_prompt: ANALYSIS_SYSTEM_PROMPT.to_string(),
            user_prompt: analysis_prompt(&combined_page_text(pages, &self.settings)),
            temperature: self.settings.temperature,
            max_tokens: self.settings.aggregate_max_tokens,
        };

        let text = complete_with_retry(
            self.client.as_ref(),
            &self.retry,
            "comprehensive analysis",
            &request,
        )
        .await?;

        Ok(into_analysis(&text))
    }
}

fn into_analysis(text: &str) -> ComprehensiveAnalysis {
    let draft = match parse_completion(text) {
        ParsedCompletion::Structured(value) => typed_draft(value),
        ParsedCompletion::Raw(_) => None,
    };

    let draft = draft.unwrap_or_else(|| {
        warn!("Could not parse comprehensive analysis as JSON; using raw text as summary");
        AnalysisDraft {
            summary: text.to_string(),
            risks: Vec::new(),
            recommendations: Vec::new(),
        }
    });

    ComprehensiveAnalysis {
        summary: draft.summary,
        risks: draft.risks,
        recommendations: draft.recommendations,
        completed_at: Utc::now(),
    }
}

fn typed_draft(value: Value) -> Option<AnalysisDraft> {
    match serde_json::from_value(value) {
        Ok(draft) => Some(draft),
        Err(e) => {
            warn!("Comprehensive analysis has unexpected shape: {}", e);
            None
        }
    }
}
