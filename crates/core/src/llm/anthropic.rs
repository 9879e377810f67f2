use crate::config::Settings;
use crate::llm::error::GenerationError;
use crate::llm::{GenerationConfig, Provider, TextGenerator};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    config: GenerationConfig,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings, config: GenerationConfig) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url = settings
            .anthropic_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("GENERATION_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            config,
        })
    }

    fn request(&self, prompt: &str) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.config.model().to_string(),
            max_tokens: self.config.max_tokens(),
            temperature: self.config.temperature(),
            messages: vec![Message {
                role: "user",
                content: prompt.to_string(),
            }],
        }
    }

    async fn create_message(
        &self,
        req: CreateMessageRequest,
    ) -> Result<CreateMessageResponse, GenerationError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| GenerationError::decode(Provider::Anthropic, format!("invalid api key header: {e}")))?;
        headers.insert("x-api-key", key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .map_err(|e| GenerationError::transport(Provider::Anthropic, &e))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| GenerationError::transport(Provider::Anthropic, &e))?;
        if !status.is_success() {
            return Err(GenerationError::status(Provider::Anthropic, status, &text));
        }

        serde_json::from_str::<CreateMessageResponse>(&text).map_err(|e| {
            GenerationError::decode(
                Provider::Anthropic,
                format!("failed to decode Anthropic response: {e}"),
            )
        })
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            match block {
                ContentBlock::Text { text } => {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(text);
                }
                ContentBlock::Thinking { .. } | ContentBlock::RedactedThinking { .. } => {
                    // Ignore.
                }
                ContentBlock::Unknown => {
                    // Ignore unknown blocks.
                }
            }
        }
        out
    }
}

#[async_trait::async_trait]
impl TextGenerator for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let res = self.create_message(self.request(prompt)).await?;

        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            tracing::warn!(
                max_tokens = self.config.max_tokens(),
                "Anthropic stop_reason=max_tokens; section text is truncated"
            );
        }

        let text = Self::response_text(&res);
        if text.trim().is_empty() {
            return Err(GenerationError::empty(Provider::Anthropic));
        }
        Ok(text)
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "thinking")]
    Thinking {
        #[serde(default)]
        thinking: String,
    },

    #[serde(rename = "redacted_thinking")]
    RedactedThinking {
        #[serde(default)]
        data: String,
    },

    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> AnthropicClient {
        AnthropicClient {
            http: reqwest::Client::new(),
            api_key: "test".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            config: GenerationConfig::new("claude-test", 256, 0.3).unwrap(),
        }
    }

    #[test]
    fn base_url_comes_from_settings() {
        let mut settings = Settings {
            anthropic_api_key: Some("k".to_string()),
            ..Settings::default()
        };
        let config = GenerationConfig::defaults_for(Provider::Anthropic);

        let client = AnthropicClient::from_settings(&settings, config.clone()).unwrap();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);

        settings.anthropic_base_url = Some("http://127.0.0.1:8080/".to_string());
        let client = AnthropicClient::from_settings(&settings, config).unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:8080/");
    }

    #[test]
    fn request_carries_generation_parameters() {
        let req = client().request("Write the Financials section.");
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["model"], json!("claude-test"));
        assert_eq!(v["max_tokens"], json!(256));
        assert!((v["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert_eq!(v["messages"][0]["role"], json!("user"));
        assert_eq!(v["messages"][0]["content"], json!("Write the Financials section."));
    }

    #[test]
    fn joins_text_blocks_and_skips_others() {
        let res: CreateMessageResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "hmm", "signature": "x"},
                {"type": "text", "text": "Revenue grew."},
                {"type": "tool_use", "id": "t1", "name": "n", "input": {}},
                {"type": "text", "text": "Margins held."}
            ],
            "stop_reason": "end_turn"
        }))
        .unwrap();

        assert_eq!(
            AnthropicClient::response_text(&res),
            "Revenue grew.\nMargins held."
        );
    }
}
