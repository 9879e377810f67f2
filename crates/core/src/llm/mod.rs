pub mod anthropic;
pub mod cohere;
pub mod error;

use crate::config::Settings;
use crate::llm::error::GenerationError;
use anyhow::ensure;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Cohere,
    Anthropic,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Cohere => f.write_str("cohere"),
            Provider::Anthropic => f.write_str("anthropic"),
        }
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cohere" => Ok(Provider::Cohere),
            "anthropic" => Ok(Provider::Anthropic),
            other => anyhow::bail!("unknown generation provider {other:?} (expected cohere or anthropic)"),
        }
    }
}

/// Parameters sent with every generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl GenerationConfig {
    pub fn new(model: impl Into<String>, max_tokens: u32, temperature: f32) -> anyhow::Result<Self> {
        let model = model.into().trim().to_string();
        ensure!(!model.is_empty(), "model must be non-empty");
        ensure!(max_tokens > 0, "max_tokens must be positive");
        ensure!(
            temperature.is_finite() && (0.0..=1.0).contains(&temperature),
            "temperature must be between 0 and 1 (got {temperature})"
        );
        Ok(Self {
            model,
            max_tokens,
            temperature,
        })
    }

    pub fn defaults_for(provider: Provider) -> Self {
        let model = match provider {
            Provider::Cohere => cohere::DEFAULT_MODEL,
            Provider::Anthropic => anthropic::DEFAULT_MODEL,
        };
        Self {
            model: model.to_string(),
            max_tokens: 500,
            temperature: 0.7,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }
}

#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Builds the backend selected by `GENERATION_PROVIDER`.
pub fn generator_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn TextGenerator>> {
    let provider = settings.provider()?;
    let config = settings.generation_config(provider)?;
    tracing::info!(
        %provider,
        model = config.model(),
        max_tokens = config.max_tokens(),
        temperature = config.temperature(),
        "configured generation backend"
    );

    let generator: Arc<dyn TextGenerator> = match provider {
        Provider::Cohere => Arc::new(cohere::CohereClient::from_settings(settings, config)?),
        Provider::Anthropic => {
            Arc::new(anthropic::AnthropicClient::from_settings(settings, config)?)
        }
    };
    Ok(generator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_rejects_out_of_range_values() {
        assert!(GenerationConfig::new("command-light", 500, 0.7).is_ok());
        assert!(GenerationConfig::new("  ", 500, 0.7).is_err());
        assert!(GenerationConfig::new("command-light", 0, 0.7).is_err());
        assert!(GenerationConfig::new("command-light", 500, -0.1).is_err());
        assert!(GenerationConfig::new("command-light", 500, 1.01).is_err());
        assert!(GenerationConfig::new("command-light", 500, f32::NAN).is_err());
    }

    #[test]
    fn config_accepts_temperature_bounds() {
        assert!(GenerationConfig::new("m", 1, 0.0).is_ok());
        assert!(GenerationConfig::new("m", 1, 1.0).is_ok());
    }

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!("Cohere".parse::<Provider>().unwrap(), Provider::Cohere);
        assert_eq!(" anthropic ".parse::<Provider>().unwrap(), Provider::Anthropic);
        assert!("openai".parse::<Provider>().is_err());
    }
}
