//! Provider that replays canned responses, for tests and offline demos

use super::{AnalysisProvider, ProviderError, ProviderRequest, ProviderResult, RawAnalysis};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Replays queued responses in order. An empty queue yields
/// `ProviderError::Unavailable`.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<ProviderResult<RawAnalysis>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful payload
    pub fn respond(self, raw: RawAnalysis) -> Self {
        self.push(Ok(raw));
        self
    }

    /// Queue a provider failure
    pub fn fail(self, error: ProviderError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, response: ProviderResult<RawAnalysis>) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
    }

    /// Number of `analyze` calls received so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl AnalysisProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn analyze(&self, _request: &ProviderRequest) -> ProviderResult<RawAnalysis> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Unavailable("no scripted response".to_string())))
    }
}
