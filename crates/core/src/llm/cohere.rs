use crate::config::Settings;
use crate::llm::error::GenerationError;
use crate::llm::{GenerationConfig, Provider, TextGenerator};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.cohere.ai";
pub const DEFAULT_MODEL: &str = "command-light";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Client for Cohere's single-prompt `generate` endpoint.
#[derive(Debug, Clone)]
pub struct CohereClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    config: GenerationConfig,
}

impl CohereClient {
    pub fn from_settings(settings: &Settings, config: GenerationConfig) -> anyhow::Result<Self> {
        let api_key = settings.require_cohere_api_key()?.to_string();
        let base_url = settings
            .cohere_base_url
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

    fn request<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: self.config.model(),
            prompt,
            max_tokens: self.config.max_tokens(),
            temperature: self.config.temperature(),
        }
    }

    fn headers(&self) -> Result<HeaderMap, GenerationError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| GenerationError::decode(Provider::Cohere, format!("invalid api key header: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    fn first_generation(res: GenerateResponse) -> Result<String, GenerationError> {
        res.generations
            .into_iter()
            .next()
            .map(|g| g.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| GenerationError::empty(Provider::Cohere))
    }
}

#[async_trait::async_trait]
impl TextGenerator for CohereClient {
    fn provider(&self) -> Provider {
        Provider::Cohere
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/v1/generate", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(self.headers()?)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| GenerationError::transport(Provider::Cohere, &e))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| GenerationError::transport(Provider::Cohere, &e))?;
        if !status.is_success() {
            return Err(GenerationError::status(Provider::Cohere, status, &text));
        }

        let parsed = serde_json::from_str::<GenerateResponse>(&text).map_err(|e| {
            GenerationError::decode(Provider::Cohere, format!("failed to decode Cohere response: {e}"))
        })?;
        Self::first_generation(parsed)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    generations: Vec<Generation>,
}

#[derive(Debug, Deserialize)]
struct Generation {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_url_comes_from_settings() {
        let mut settings = Settings {
            cohere_api_key: Some("k".to_string()),
            ..Settings::default()
        };
        let config = GenerationConfig::defaults_for(Provider::Cohere);

        let client = CohereClient::from_settings(&settings, config.clone()).unwrap();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);

        settings.cohere_base_url = Some("http://127.0.0.1:8080/".to_string());
        let client = CohereClient::from_settings(&settings, config).unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:8080/");
    }

    #[test]
    fn request_matches_generate_endpoint_shape() {
        let client = CohereClient {
            http: reqwest::Client::new(),
            api_key: "k".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            config: GenerationConfig::defaults_for(Provider::Cohere),
        };
        let v = serde_json::to_value(client.request("prompt text")).unwrap();
        assert_eq!(v["model"], json!("command-light"));
        assert_eq!(v["prompt"], json!("prompt text"));
        assert_eq!(v["max_tokens"], json!(500));
        assert!((v["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn takes_the_first_generation() {
        let res: GenerateResponse = serde_json::from_value(json!({
            "id": "abc",
            "generations": [
                {"id": "g1", "text": " The balance sheet is strong."},
                {"id": "g2", "text": "ignored"}
            ],
            "prompt": "..."
        }))
        .unwrap();
        assert_eq!(
            CohereClient::first_generation(res).unwrap(),
            " The balance sheet is strong."
        );
    }

    #[test]
    fn empty_generations_are_an_error() {
        let res: GenerateResponse = serde_json::from_value(json!({"generations": []})).unwrap();
        let err = CohereClient::first_generation(res).unwrap_err();
        assert_eq!(err.stage, "empty");

        let res: GenerateResponse =
            serde_json::from_value(json!({"generations": [{"text": "   "}]})).unwrap();
        assert!(CohereClient::first_generation(res).is_err());
    }
}
