//! User-level configuration for framescan
//!
//! Supports loading provider settings from:
//! - Environment variables
//! - ~/.config/framescan/config.toml

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UserConfig {
    #[serde(default)]
    pub provider: ProviderSettings,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProviderSettings {
    /// Backend: "anthropic" (default), "openai", "openrouter", "ollama"
    pub backend: Option<String>,

    /// Model override (backend default when unset)
    pub model: Option<String>,

    pub anthropic_api_key: Option<String>,

    pub openai_api_key: Option<String>,

    pub openrouter_api_key: Option<String>,

    /// Ollama model (default: llama3.1)
    pub ollama_model: Option<String>,
}

impl UserConfig {
    /// Load config from all sources, with priority:
    /// 1. Environment variables (highest)
    /// 2. User config (~/.config/framescan/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = UserConfig::default();

        if let Some(user_config) = Self::user_config_path()
            .filter(|p| p.exists())
            .and_then(|p| std::fs::read_to_string(&p).ok())
            .and_then(|content| toml::from_str::<UserConfig>(&content).ok())
        {
            config.merge(user_config);
        }

        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            config.provider.anthropic_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.provider.openai_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            config.provider.openrouter_api_key = Some(key);
        }
        if let Ok(backend) = std::env::var("FRAMESCAN_BACKEND") {
            config.provider.backend = Some(backend);
        }

        Ok(config)
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("framescan").join("config.toml"))
    }

    /// Merge another config into this one (other takes priority)
    fn merge(&mut self, other: UserConfig) {
        if other.provider.backend.is_some() {
            self.provider.backend = other.provider.backend;
        }
        if other.provider.model.is_some() {
            self.provider.model = other.provider.model;
        }
        if other.provider.anthropic_api_key.is_some() {
            self.provider.anthropic_api_key = other.provider.anthropic_api_key;
        }
        if other.provider.openai_api_key.is_some() {
            self.provider.openai_api_key = other.provider.openai_api_key;
        }
        if other.provider.openrouter_api_key.is_some() {
            self.provider.openrouter_api_key = other.provider.openrouter_api_key;
        }
        if other.provider.ollama_model.is_some() {
            self.provider.ollama_model = other.provider.ollama_model;
        }
    }

    /// Configured backend name
    pub fn backend(&self) -> &str {
        self.provider.backend.as_deref().unwrap_or("anthropic")
    }

    pub fn model(&self) -> Option<&str> {
        self.provider.model.as_deref()
    }

    /// API key for the configured backend, if it has one on file
    pub fn api_key(&self) -> Option<&str> {
        match self.backend().trim().to_lowercase().as_str() {
            "openai" => self.provider.openai_api_key.as_deref(),
            "anthropic" | "claude" => self.provider.anthropic_api_key.as_deref(),
            "openrouter" => self.provider.openrouter_api_key.as_deref(),
            _ => None,
        }
    }

    pub fn ollama_model(&self) -> &str {
        self.provider.ollama_model.as_deref().unwrap_or("llama3.1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UserConfig::default();
        assert_eq!(config.backend(), "anthropic");
        assert!(config.api_key().is_none());
        assert!(config.model().is_none());
        assert_eq!(config.ollama_model(), "llama3.1");
    }

    #[test]
    fn test_toml_parsing_openai_backend() {
        let toml_str = r#"
[provider]
backend = "openai"
openai_api_key = "sk-test-123"
model = "gpt-4o-mini"
"#;
        let config: UserConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.backend(), "openai");
        assert_eq!(config.api_key(), Some("sk-test-123"));
        assert_eq!(config.model(), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_toml_parsing_minimal() {
        let config: UserConfig = toml::from_str("").unwrap();
        assert_eq!(config.backend(), "anthropic");
    }

    #[test]
    fn test_merge_preserves_base_when_other_is_none() {
        let mut base = UserConfig {
            provider: ProviderSettings {
                backend: Some("ollama".to_string()),
                ollama_model: Some("qwen2.5".to_string()),
                ..Default::default()
            },
        };
        base.merge(UserConfig::default());
        assert_eq!(base.backend(), "ollama");
        assert_eq!(base.ollama_model(), "qwen2.5");
    }

    #[test]
    fn test_merge_overrides_set_fields() {
        let mut base = UserConfig::default();
        let other = UserConfig {
            provider: ProviderSettings {
                backend: Some("anthropic".to_string()),
                anthropic_api_key: Some("sk-ant-new".to_string()),
                ..Default::default()
            },
        };
        base.merge(other);
        assert_eq!(base.api_key(), Some("sk-ant-new"));
    }

    #[test]
    fn test_user_config_path_returns_some() {
        if let Some(p) = UserConfig::user_config_path() {
            assert!(p.ends_with("framescan/config.toml"));
        }
    }
}
