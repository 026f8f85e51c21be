//! Analysis provider boundary
//!
//! The engine never analyzes content itself. It hands a request to an
//! [`AnalysisProvider`] and gets back a loosely-typed [`RawAnalysis`], which
//! the scan pipeline normalizes exactly once.
//!
//! The shipped provider is [`LlmProvider`], which talks to an LLM backend
//! (Anthropic, OpenAI-compatible, or a local Ollama) over sync HTTP.
//!
//! # Environment Variables
//!
//! - `ANTHROPIC_API_KEY`: Required for the Anthropic backend
//! - `OPENAI_API_KEY`: Required for the OpenAI backend
//! - `OPENROUTER_API_KEY`: Required for the OpenRouter backend
//! - `FRAMESCAN_BACKEND`: Backend override

mod client;
mod llm;
mod normalize;
mod profiles;
mod scripted;

pub use client::{AiClient, AiConfig, LlmBackend};
pub use llm::LlmProvider;
pub use normalize::{normalize, NormalizedAnalysis, NormalizedOutcome, RawAnalysis, RawAxis};
pub use profiles::{profile_for, DomainProfile};
pub use scripted::ScriptedProvider;

use crate::models::{Domain, Modality};
use thiserror::Error;

/// Errors that can occur while calling a provider
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Missing API key: {env_var} not set. Get your key at {signup_url}")]
    MissingApiKey { env_var: String, signup_url: String },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse provider response: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// What the pipeline sends to a provider
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub domain: Domain,
    pub modality: Modality,
    /// Text body, or the image reference for image scans
    pub content: String,
    /// Short description of the situation the content comes from
    pub context_label: String,
    pub system_prompt: String,
    /// Whether the caller paid for the detailed tier
    pub detailed: bool,
}

/// Contract the engine requires from an external analysis provider
pub trait AnalysisProvider: Send + Sync {
    /// Provider name (for logging)
    fn name(&self) -> &str;

    /// Produce raw axis judgments for the request
    fn analyze(&self, request: &ProviderRequest) -> ProviderResult<RawAnalysis>;
}
