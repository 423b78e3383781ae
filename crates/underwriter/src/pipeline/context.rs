use std::sync::Arc;

use crate::ai::{Aggregator, CompletionClient, PageAnalyzer, PromptSettings};
use crate::jobs::{JobStore, StateUpdater};
use crate::retry::RetryPolicy;
use crate::storage::{BlobFetcher, BlobStore};

/// Tunables shared by every pipeline stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSettings {
    pub retry: RetryPolicy,
    pub prompts: PromptSettings,
}

/// Long-lived collaborators of the pipeline, built once at startup and
/// shared by every job the worker processes.
#[derive(Clone)]
pub struct WorkerContext {
    pub updater: StateUpdater,
    pub blobs: BlobFetcher,
    pub pages: PageAnalyzer,
    pub aggregator: Aggregator,
}

impl WorkerContext {
    pub fn new(
        store: Arc<dyn JobStore>,
        blob_store: Arc<dyn BlobStore>,
        completions: Arc<dyn CompletionClient>,
        settings: &PipelineSettings,
    ) -> Self {
        Self {
            updater: StateUpdater::new(store, settings.retry),
            blobs: BlobFetcher::new(blob_store, settings.retry),
            pages: PageAnalyzer::new(
                completions.clone(),
                settings.retry,
                settings.prompts.clone(),
            ),
            aggregator: Aggregator::new(completions, settings.retry, settings.prompts.clone()),
        }
    }
}
