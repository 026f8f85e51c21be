//! LLM-backed analysis provider

use super::{
    AiClient, AnalysisProvider, ProviderError, ProviderRequest, ProviderResult,
    RawAnalysis,
};
use crate::config::UserConfig;
use crate::models::Modality;
use crate::scoring::AxisId;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

static FENCED_JSON: OnceLock<Regex> = OnceLock::new();
static INJECTION_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn fenced_json() -> &'static Regex {
    // (?s) so multi-line payloads match
    FENCED_JSON.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```").expect("valid regex")
    })
}

fn injection_patterns() -> &'static Vec<Regex> {
    INJECTION_PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"(?i)ignore\s+(all\s+)?previous\s+instructions?").expect("valid regex"),
            Regex::new(r"(?i)disregard\s+(all\s+)?previous").expect("valid regex"),
            Regex::new(r"(?i)(score|rate)\s+(this|me|all\s+axes)\s+(as\s+)?\+?3").expect("valid regex"),
            Regex::new(r"(?i)<\s*/?\s*system\s*>").expect("valid regex"),
            Regex::new(r"(?im)^\s*(system|assistant)\s*:").expect("valid regex"),
        ]
    })
}

/// Neutralize instructions embedded in submitted content
fn sanitize_content(content: &str) -> String {
    injection_patterns()
        .iter()
        .fold(content.to_string(), |text, pattern| {
            pattern.replace_all(&text, "[REDACTED]").into_owned()
        })
}

/// Provider that asks an LLM for a strict JSON axis judgment
pub struct LlmProvider {
    client: AiClient,
    name: String,
}

impl LlmProvider {
    pub fn new(client: AiClient) -> Self {
        let name = format!("{}/{}", client.backend(), client.model());
        Self { client, name }
    }

    /// Build from user config and environment
    pub fn from_user_config(user: &UserConfig) -> ProviderResult<Self> {
        Ok(Self::new(AiClient::from_user_config(user)?))
    }
}

impl AnalysisProvider for LlmProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn analyze(&self, request: &ProviderRequest) -> ProviderResult<RawAnalysis> {
        let system = build_system_prompt(request);
        let prompt = build_user_prompt(request);

        debug!(
            "Requesting {} analysis from {} ({} chars)",
            request.domain,
            self.name,
            request.content.len()
        );
        let response = self.client.complete(&system, &prompt)?;

        parse_analysis(&response)
    }
}

fn build_system_prompt(request: &ProviderRequest) -> String {
    let axes: Vec<String> = AxisId::all()
        .iter()
        .map(|a| format!("  - {} ({})", a.name(), a.label()))
        .collect();

    let depth = if request.detailed {
        "Give at least three notes, quote supporting evidence for every axis you move off 0, \
         and suggest concrete corrections."
    } else {
        "Keep notes brief."
    };

    format!(
        "{}\n\n\
         Score each of these axes with an integer from -3 (weak frame) to +3 (strong frame):\n{}\n\n\
         {}\n\n\
         If the content lacks enough context (who it is for, what it is about, when or why it \
         was sent) to judge, set \"rejected\": true and explain in \"rejection_reason\".\n\n\
         Respond with ONLY a JSON object of this shape:\n\
         {{\"axes\": [{{\"id\": \"<axis id>\", \"score\": <integer>}}], \
         \"notes\": [\"...\"], \"supporting_evidence\": [\"...\"], \
         \"corrections\": [\"...\"], \"patterns\": [\"short-label\"], \
         \"summary\": \"...\", \"rejected\": false, \"rejection_reason\": null}}",
        request.system_prompt,
        axes.join("\n"),
        depth
    )
}

fn build_user_prompt(request: &ProviderRequest) -> String {
    match request.modality {
        Modality::Text => format!(
            "Context: {}\n\nContent:\n\"\"\"\n{}\n\"\"\"",
            request.context_label,
            sanitize_content(&request.content)
        ),
        Modality::Image => format!(
            "Context: {}\n\nImage: {}",
            request.context_label, request.content
        ),
    }
}

/// Pull the JSON object out of a model response, which may be wrapped in
/// prose or a fenced block.
fn parse_analysis(response: &str) -> ProviderResult<RawAnalysis> {
    let json_str = fenced_json()
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .or_else(|| {
            let start = response.find('{')?;
            let end = response.rfind('}')?;
            (start < end).then(|| &response[start..=end])
        })
        .ok_or_else(|| ProviderError::ParseError("No JSON object in response".to_string()))?;

    serde_json::from_str(json_str)
        .map_err(|e| ProviderError::ParseError(format!("Failed to parse JSON response: {}", e)))
}
