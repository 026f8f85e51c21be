//! Chat completion client for the analysis provider
//!
//! One system prompt and one user prompt in, the reply text out. Anthropic
//! uses its messages API; OpenAI, OpenRouter and Ollama share the OpenAI
//! chat completions shape. Calls are blocking (`ureq`).

use super::{ProviderError, ProviderResult};
use crate::config::UserConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Supported LLM backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmBackend {
    #[default]
    Anthropic,
    OpenAi,
    OpenRouter,
    Ollama,
}

/// Static facts about a backend
struct BackendSpec {
    endpoint: &'static str,
    default_model: &'static str,
    /// `None` for backends that run locally without a key
    key_var: Option<&'static str>,
    key_url: &'static str,
}

impl LlmBackend {
    fn spec(&self) -> &'static BackendSpec {
        match self {
            LlmBackend::Anthropic => &BackendSpec {
                endpoint: "https://api.anthropic.com/v1/messages",
                default_model: "claude-sonnet-4-20250514",
                key_var: Some("ANTHROPIC_API_KEY"),
                key_url: "https://console.anthropic.com/settings/keys",
            },
            LlmBackend::OpenAi => &BackendSpec {
                endpoint: "https://api.openai.com/v1/chat/completions",
                default_model: "gpt-4o",
                key_var: Some("OPENAI_API_KEY"),
                key_url: "https://platform.openai.com/api-keys",
            },
            LlmBackend::OpenRouter => &BackendSpec {
                endpoint: "https://openrouter.ai/api/v1/chat/completions",
                default_model: "anthropic/claude-sonnet-4",
                key_var: Some("OPENROUTER_API_KEY"),
                key_url: "https://openrouter.ai/keys",
            },
            LlmBackend::Ollama => &BackendSpec {
                endpoint: "http://localhost:11434/v1/chat/completions",
                default_model: "llama3.1",
                key_var: None,
                key_url: "https://ollama.com",
            },
        }
    }

    pub fn default_model(&self) -> &'static str {
        self.spec().default_model
    }

    pub fn requires_api_key(&self) -> bool {
        self.spec().key_var.is_some()
    }
}

impl FromStr for LlmBackend {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(LlmBackend::Anthropic),
            "openai" => Ok(LlmBackend::OpenAi),
            "openrouter" => Ok(LlmBackend::OpenRouter),
            "ollama" => Ok(LlmBackend::Ollama),
            other => Err(ProviderError::ConfigError(format!(
                "unknown backend '{}' (expected anthropic, openai, openrouter or ollama)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LlmBackend::Anthropic => "anthropic",
            LlmBackend::OpenAi => "openai",
            LlmBackend::OpenRouter => "openrouter",
            LlmBackend::Ollama => "ollama",
        };
        f.write_str(name)
    }
}

/// Sampling settings for a client
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub backend: LlmBackend,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::default(),
            model: None,
            max_tokens: 2048,
            temperature: 0.1,
        }
    }
}

impl AiConfig {
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.backend.default_model())
    }
}

/// Blocking chat client for one backend
pub struct AiClient {
    config: AiConfig,
    api_key: Option<String>,
    agent: ureq::Agent,
}

impl AiClient {
    /// Client with an explicit key. Keyless backends ignore `api_key`.
    pub fn new(config: AiConfig, api_key: Option<String>) -> ProviderResult<Self> {
        let spec = config.backend.spec();
        let api_key = match (spec.key_var, api_key) {
            (None, _) => None,
            (Some(_), Some(key)) if !key.trim().is_empty() => Some(key),
            (Some(var), _) => {
                return Err(ProviderError::MissingApiKey {
                    env_var: var.to_string(),
                    signup_url: spec.key_url.to_string(),
                })
            }
        };

        let agent = ureq::config::Config::builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .new_agent();

        Ok(Self {
            config,
            api_key,
            agent,
        })
    }

    /// Client for the backend and key chosen in the user config. The config
    /// has already folded in environment overrides.
    pub fn from_user_config(user: &UserConfig) -> ProviderResult<Self> {
        let backend: LlmBackend = user.backend().parse()?;
        let model = match (user.model(), backend) {
            (Some(model), _) => Some(model.to_string()),
            (None, LlmBackend::Ollama) => Some(user.ollama_model().to_string()),
            (None, _) => None,
        };
        let config = AiConfig {
            backend,
            model,
            ..Default::default()
        };
        Self::new(config, user.api_key().map(str::to_string))
    }

    pub fn backend(&self) -> LlmBackend {
        self.config.backend
    }

    pub fn model(&self) -> &str {
        self.config.model()
    }

    /// Send one system + user prompt pair and return the reply text
    pub fn complete(&self, system: &str, user: &str) -> ProviderResult<String> {
        match self.config.backend {
            LlmBackend::Anthropic => self.complete_anthropic(system, user),
            _ => self.complete_chat(system, user),
        }
    }

    fn complete_anthropic(&self, system: &str, user: &str) -> ProviderResult<String> {
        let body = AnthropicRequest {
            model: self.model(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system,
            messages: [Turn {
                role: "user",
                content: user,
            }],
        };
        let request = self
            .agent
            .post(self.config.backend.spec().endpoint)
            .header("x-api-key", self.api_key.as_deref().unwrap_or_default())
            .header("anthropic-version", ANTHROPIC_VERSION);

        let reply: AnthropicReply = read_reply(request.send_json(&body))?;
        reply
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text)
            .ok_or_else(|| ProviderError::ParseError("reply has no text block".to_string()))
    }

    fn complete_chat(&self, system: &str, user: &str) -> ProviderResult<String> {
        let body = ChatRequest {
            model: self.model(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: [
                Turn {
                    role: "system",
                    content: system,
                },
                Turn {
                    role: "user",
                    content: user,
                },
            ],
        };
        let mut request = self.agent.post(self.config.backend.spec().endpoint);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", &format!("Bearer {}", key));
        }

        let reply: ChatReply = read_reply(request.send_json(&body))?;
        reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::ParseError("reply has no choices".to_string()))
    }
}

/// Map transport errors, error statuses and undecodable bodies
fn read_reply<T: serde::de::DeserializeOwned>(
    sent: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
) -> ProviderResult<T> {
    let response = sent.map_err(|e| ProviderError::Unavailable(e.to_string()))?;
    let status = response.status().as_u16();
    let mut body = response.into_body();
    if status >= 400 {
        return Err(ProviderError::ApiError {
            status,
            message: body.read_to_string().unwrap_or_default(),
        });
    }
    body.read_json()
        .map_err(|e| ProviderError::ParseError(e.to_string()))
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Turn<'a>; 1],
}

#[derive(Deserialize)]
struct AnthropicReply {
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Turn<'a>; 2],
}

#[derive(Deserialize)]
struct ChatReply {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("claude".parse::<LlmBackend>().unwrap(), LlmBackend::Anthropic);
        assert_eq!("OpenAI".parse::<LlmBackend>().unwrap(), LlmBackend::OpenAi);
        assert_eq!(LlmBackend::OpenRouter.to_string(), "openrouter");
        assert!("gemini".parse::<LlmBackend>().is_err());
    }

    #[test]
    fn test_config_model() {
        assert_eq!(AiConfig::default().model(), "claude-sonnet-4-20250514");

        let config = AiConfig {
            model: Some("custom-model".to_string()),
            ..Default::default()
        };
        assert_eq!(config.model(), "custom-model");
    }

    #[test]
    fn test_missing_key_names_the_variable() {
        let config = AiConfig {
            backend: LlmBackend::OpenAi,
            ..Default::default()
        };
        match AiClient::new(config, None) {
            Err(ProviderError::MissingApiKey { env_var, .. }) => {
                assert_eq!(env_var, "OPENAI_API_KEY")
            }
            _ => panic!("expected a missing key error"),
        }
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let user: UserConfig = toml::from_str(
            r#"
[provider]
backend = "ollama"
ollama_model = "qwen2.5"
"#,
        )
        .unwrap();
        let client = AiClient::from_user_config(&user).unwrap();
        assert_eq!(client.backend(), LlmBackend::Ollama);
        assert_eq!(client.model(), "qwen2.5");
    }
}
