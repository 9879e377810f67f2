pub mod domain;
pub mod llm;
pub mod market;
pub mod prompt;
pub mod report;

pub mod config {
    use crate::llm::{GenerationConfig, Provider};
    use crate::prompt::{CompanyInfoMode, PromptOptions, SummaryPolicy};
    use anyhow::Context;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub generation_provider: Option<String>,
        pub cohere_api_key: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub cohere_base_url: Option<String>,
        pub anthropic_base_url: Option<String>,
        pub generation_model: Option<String>,
        pub generation_max_tokens: Option<String>,
        pub generation_temperature: Option<String>,
        pub market_data_base_url: Option<String>,
        pub market_data_crumb: Option<String>,
        pub market_data_cookie: Option<String>,
        pub summary_policy: Option<String>,
        pub company_info_mode: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                generation_provider: env_non_empty("GENERATION_PROVIDER"),
                cohere_api_key: env_non_empty("COHERE_API_KEY"),
                anthropic_api_key: env_non_empty("ANTHROPIC_API_KEY"),
                cohere_base_url: env_non_empty("COHERE_BASE_URL"),
                anthropic_base_url: env_non_empty("ANTHROPIC_BASE_URL"),
                generation_model: env_non_empty("GENERATION_MODEL"),
                generation_max_tokens: env_non_empty("GENERATION_MAX_TOKENS"),
                generation_temperature: env_non_empty("GENERATION_TEMPERATURE"),
                market_data_base_url: env_non_empty("MARKET_DATA_BASE_URL"),
                market_data_crumb: env_non_empty("MARKET_DATA_CRUMB"),
                market_data_cookie: env_non_empty("MARKET_DATA_COOKIE"),
                summary_policy: env_non_empty("SUMMARY_POLICY"),
                company_info_mode: env_non_empty("COMPANY_INFO_MODE"),
                sentry_dsn: env_non_empty("SENTRY_DSN"),
            })
        }

        pub fn require_cohere_api_key(&self) -> anyhow::Result<&str> {
            self.cohere_api_key
                .as_deref()
                .context("COHERE_API_KEY is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn provider(&self) -> anyhow::Result<Provider> {
            match self.generation_provider.as_deref() {
                None => Ok(Provider::Cohere),
                Some(s) => s
                    .parse::<Provider>()
                    .with_context(|| format!("invalid GENERATION_PROVIDER: {s}")),
            }
        }

        /// Generation parameters for `provider`, with unset values taken from the
        /// provider's defaults.
        pub fn generation_config(&self, provider: Provider) -> anyhow::Result<GenerationConfig> {
            let defaults = GenerationConfig::defaults_for(provider);

            let model = self
                .generation_model
                .clone()
                .unwrap_or_else(|| defaults.model().to_string());

            let max_tokens = match self.generation_max_tokens.as_deref() {
                Some(s) => s
                    .parse::<u32>()
                    .with_context(|| format!("invalid GENERATION_MAX_TOKENS: {s}"))?,
                None => defaults.max_tokens(),
            };

            let temperature = match self.generation_temperature.as_deref() {
                Some(s) => s
                    .parse::<f32>()
                    .with_context(|| format!("invalid GENERATION_TEMPERATURE: {s}"))?,
                None => defaults.temperature(),
            };

            GenerationConfig::new(model, max_tokens, temperature)
        }

        pub fn prompt_options(&self) -> anyhow::Result<PromptOptions> {
            let mut out = PromptOptions::default();

            if let Some(s) = self.summary_policy.as_deref() {
                out.summary_policy = s
                    .parse::<SummaryPolicy>()
                    .with_context(|| format!("invalid SUMMARY_POLICY: {s}"))?;
            }

            if let Some(s) = self.company_info_mode.as_deref() {
                out.company_info_mode = s
                    .parse::<CompanyInfoMode>()
                    .with_context(|| format!("invalid COMPANY_INFO_MODE: {s}"))?;
            }

            Ok(out)
        }
    }

    fn env_non_empty(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }

}
