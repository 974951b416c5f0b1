//! Chat client for the configured model provider

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::config::{AiConfig, WireFormat};
use super::{AiError, Result};

/// Version header required by the messages API
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Upper bound on one model call, generation included
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Upstream error bodies are cut to this many characters
const MAX_ERROR_BODY: usize = 500;

/// A model that turns a system + user prompt into text
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Provider name, for the call log
    fn provider(&self) -> String;

    /// Model name, for the call log
    fn model(&self) -> String;

    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// HTTP implementation for the supported providers
pub struct HttpChatModel {
    config: AiConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl HttpChatModel {
    /// Create a client; fails with `ConfigurationMissing` when no API key is set
    pub fn new(config: AiConfig) -> Result<Self> {
        config.require_api_key()?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self { config, client })
    }

    async fn chat_completions(&self, system: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url());
        let body = ChatCompletionsRequest {
            model: self.config.model(),
            messages: vec![
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.require_api_key()?)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let parsed: ChatCompletionsResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AiError::Parse("response has no choices".to_string()))
    }

    async fn messages(&self, system: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/v1/messages", self.config.base_url());
        let body = MessagesRequest {
            model: self.config.model(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.config.require_api_key()?)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;
        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            return Err(AiError::Parse("response has no text content".to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl ChatModel for HttpChatModel {
    fn provider(&self) -> String {
        self.config.provider.to_string()
    }

    fn model(&self) -> String {
        self.config.model().to_string()
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        log::debug!(
            "AI: calling {} model {}",
            self.config.provider,
            self.config.model()
        );
        match self.config.provider.wire_format() {
            WireFormat::ChatCompletions => self.chat_completions(system, prompt).await,
            WireFormat::Messages => self.messages(system, prompt).await,
        }
    }
}

/// Map a non-success status to `RemoteApi`, keeping the start of the body
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(AiError::RemoteApi {
        status: status.as_u16(),
        message: truncate(&body, MAX_ERROR_BODY),
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::config::Provider;

    #[test]
    fn test_new_requires_api_key() {
        assert!(matches!(
            HttpChatModel::new(AiConfig::default()),
            Err(AiError::ConfigurationMissing(_))
        ));

        let model = HttpChatModel::new(AiConfig {
            provider: Provider::Moonshot,
            api_key: "sk-test".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(model.provider(), "moonshot");
        assert_eq!(model.model(), "moonshot-v1-8k");
    }

    #[test]
    fn test_chat_completions_response_parsing() {
        let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"hi"}}]}"#;
        let parsed: ChatCompletionsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hi"));
    }

    #[test]
    fn test_messages_request_shape() {
        let body = MessagesRequest {
            model: "claude",
            max_tokens: 10,
            temperature: 0.0,
            system: "be brief",
            messages: vec![Message {
                role: "user",
                content: "hello",
            }],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["system"], "be brief");
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}
