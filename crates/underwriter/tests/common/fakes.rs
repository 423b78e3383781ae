//! In-process stand-ins for the completion service and blob storage.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use underwriter::ai::aggregate::ANALYSIS_SYSTEM_PROMPT;
use underwriter::{BlobError, BlobStore, CompletionClient, CompletionError, CompletionRequest};

/// One scripted reply from the completion service.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    /// Retryable transport failure.
    Unavailable,
    /// Non-retryable rejection.
    Rejected,
}

impl Reply {
    pub fn text(s: &str) -> Self {
        Reply::Text(s.to_string())
    }

    fn into_result(self) -> Result<String, CompletionError> {
        match self {
            Reply::Text(s) => Ok(s),
            Reply::Unavailable => Err(CompletionError::Request("connection reset".to_string())),
            Reply::Rejected => Err(CompletionError::Status {
                status: 400,
                body: "content filtered".to_string(),
            }),
        }
    }
}

/// Answers page and whole-document requests from separate scripts. Once a
/// script runs out its last reply repeats.
pub struct ScriptedCompletions {
    page_replies: Mutex<VecDeque<Reply>>,
    analysis_replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletions {
    pub fn new(page: Reply, analysis: Reply) -> Self {
        Self::scripted(vec![page], vec![analysis])
    }

    pub fn scripted(page: Vec<Reply>, analysis: Vec<Reply>) -> Self {
        Self {
            page_replies: Mutex::new(page.into()),
            analysis_replies: Mutex::new(analysis.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn analysis_requests(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.system_prompt == ANALYSIS_SYSTEM_PROMPT)
            .count()
    }

    pub fn page_requests(&self) -> usize {
        self.requests().len() - self.analysis_requests()
    }

    fn next(script: &Mutex<VecDeque<Reply>>) -> Reply {
        let mut script = script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap_or(Reply::Unavailable)
        }
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletions {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = if request.system_prompt == ANALYSIS_SYSTEM_PROMPT {
            Self::next(&self.analysis_replies)
        } else {
            Self::next(&self.page_replies)
        };
        reply.into_result()
    }
}

/// Blob store whose every request fails with a transport error.
#[derive(Default)]
pub struct UnreachableBlobStore {
    pub calls: AtomicU32,
}

impl UnreachableBlobStore {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for UnreachableBlobStore {
    async fn get(&self, _container: &str, _key: &str) -> Result<Vec<u8>, BlobError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BlobError::Request("storage endpoint unreachable".to_string()))
    }
}
