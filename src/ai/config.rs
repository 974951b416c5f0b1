use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{AiError, Result};
use crate::storage::backend::AI_CONFIG_KEY;
use crate::storage::KeyValueStore;

/// Environment variable that overrides the stored API key
pub const API_KEY_ENV: &str = "STUDYMATE_API_KEY";

/// Supported model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    DeepSeek,
    Moonshot,
    Qwen,
    Anthropic,
}

/// Request/response shape spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// `POST {base}/chat/completions`
    ChatCompletions,
    /// `POST {base}/v1/messages`
    Messages,
}

impl Provider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::DeepSeek => "https://api.deepseek.com/v1",
            Provider::Moonshot => "https://api.moonshot.cn/v1",
            Provider::Qwen => "https://dashscope.aliyuncs.com/compatible-mode/v1",
            Provider::Anthropic => "https://api.anthropic.com",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::DeepSeek => "deepseek-chat",
            Provider::Moonshot => "moonshot-v1-8k",
            Provider::Qwen => "qwen-plus",
            Provider::Anthropic => "claude-3-5-haiku-20241022",
        }
    }

    pub fn wire_format(self) -> WireFormat {
        match self {
            Provider::Anthropic => WireFormat::Messages,
            _ => WireFormat::ChatCompletions,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::OpenAi => "openai",
            Provider::DeepSeek => "deepseek",
            Provider::Moonshot => "moonshot",
            Provider::Qwen => "qwen",
            Provider::Anthropic => "anthropic",
        };
        f.write_str(name)
    }
}

impl FromStr for Provider {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "deepseek" => Ok(Provider::DeepSeek),
            "moonshot" | "kimi" => Ok(Provider::Moonshot),
            "qwen" | "dashscope" => Ok(Provider::Qwen),
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            other => Err(AiError::Validation(format!("unknown provider '{}'", other))),
        }
    }
}

/// AI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub api_key: String,
    /// Overrides the provider's default endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2048
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            api_key: String::new(),
            base_url: None,
            model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl AiConfig {
    /// Load from the key-value store, defaulting when absent or unreadable
    pub fn load(backend: &dyn KeyValueStore) -> Result<Self> {
        let Some(raw) = backend.read(AI_CONFIG_KEY).map_err(crate::storage::StoreError::from)?
        else {
            return Ok(Self::default());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("AI: stored provider config is unreadable ({}), using defaults", e);
            Self::default()
        }))
    }

    pub fn save(&self, backend: &dyn KeyValueStore) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(crate::storage::StoreError::from)?;
        backend
            .write(AI_CONFIG_KEY, &json)
            .map_err(crate::storage::StoreError::from)?;
        Ok(())
    }

    /// Take the API key from the environment when set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api_key = key;
            }
        }
        self
    }

    /// The API key, or `ConfigurationMissing` when none is set
    pub fn require_api_key(&self) -> Result<&str> {
        let key = self.api_key.trim();
        if key.is_empty() {
            return Err(AiError::ConfigurationMissing(format!(
                "no API key for {} (set one with `config set-ai` or {})",
                self.provider, API_KEY_ENV
            )));
        }
        Ok(key)
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.provider.default_model())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    #[test]
    fn test_defaults_resolve_from_provider() {
        let config = AiConfig {
            provider: Provider::DeepSeek,
            ..Default::default()
        };
        assert_eq!(config.base_url(), "https://api.deepseek.com/v1");
        assert_eq!(config.model(), "deepseek-chat");
        assert_eq!(Provider::Anthropic.wire_format(), WireFormat::Messages);
        assert_eq!(Provider::Qwen.wire_format(), WireFormat::ChatCompletions);
    }

    #[test]
    fn test_overrides_win() {
        let config = AiConfig {
            base_url: Some("http://localhost:11434/v1/".into()),
            model: Some("llama3".into()),
            ..Default::default()
        };
        assert_eq!(config.base_url(), "http://localhost:11434/v1");
        assert_eq!(config.model(), "llama3");
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let config = AiConfig::default();
        assert!(matches!(
            config.require_api_key(),
            Err(AiError::ConfigurationMissing(_))
        ));
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("Claude".parse::<Provider>().unwrap(), Provider::Anthropic);
        assert_eq!("kimi".parse::<Provider>().unwrap(), Provider::Moonshot);
        assert!(matches!(
            "nope".parse::<Provider>(),
            Err(AiError::Validation(_))
        ));
        assert_eq!(Provider::DeepSeek.to_string(), "deepseek");
    }

    #[test]
    fn test_save_and_load() {
        let backend = MemoryBackend::new();
        assert_eq!(AiConfig::load(&backend).unwrap(), AiConfig::default());

        let config = AiConfig {
            provider: Provider::Anthropic,
            api_key: "sk-test".into(),
            ..Default::default()
        };
        config.save(&backend).unwrap();
        assert_eq!(AiConfig::load(&backend).unwrap(), config);
    }

    #[test]
    fn test_legacy_config_backfills() {
        let backend = MemoryBackend::new();
        backend
            .write(AI_CONFIG_KEY, r#"{"provider": "qwen", "apiKey": "k"}"#)
            .unwrap();
        let config = AiConfig::load(&backend).unwrap();
        assert_eq!(config.provider, Provider::Qwen);
        assert_eq!(config.max_tokens, 2048);
    }
}
