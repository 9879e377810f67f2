use crate::llm::Provider;
use std::fmt;

/// A failed generation call. Recoverable: the report keeps going without
/// this section's text.
#[derive(Debug, Clone)]
pub struct GenerationError {
    pub provider: Provider,
    pub stage: &'static str,
    pub status: Option<u16>,
    pub detail: String,
}

impl GenerationError {
    pub fn transport(provider: Provider, err: &reqwest::Error) -> Self {
        Self {
            provider,
            stage: "http",
            status: err.status().map(|s| s.as_u16()),
            detail: err.to_string(),
        }
    }

    pub fn status(provider: Provider, status: reqwest::StatusCode, body: &str) -> Self {
        Self {
            provider,
            stage: "http",
            status: Some(status.as_u16()),
            detail: body.trim().to_string(),
        }
    }

    pub fn decode(provider: Provider, detail: impl Into<String>) -> Self {
        Self {
            provider,
            stage: "decode",
            status: None,
            detail: detail.into(),
        }
    }

    pub fn empty(provider: Provider) -> Self {
        Self {
            provider,
            stage: "empty",
            status: None,
            detail: "response contained no generated text".to_string(),
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "generation failed (provider={}, stage={}", self.provider, self.stage)?;
        if let Some(status) = self.status {
            write!(f, ", status={status}")?;
        }
        write!(f, "): {}", self.detail)
    }
}

impl std::error::Error for GenerationError {}
