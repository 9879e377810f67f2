use crate::config::Settings;
use crate::domain::company::{EmptyTickerError, FinancialData, Ticker};
use crate::domain::section::{Section, SectionSelection};
use crate::llm::error::GenerationError;
use crate::llm::{generator_from_settings, TextGenerator};
use crate::market::error::DataFetchError;
use crate::market::{provider_from_settings, MarketDataProvider};
use crate::prompt::{section_input, PromptOptions, SectionInput};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

const SECTION_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum SectionBody {
    Generated(String),
    Rendered(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionReport {
    pub section: Section,
    pub body: SectionBody,
}

impl SectionReport {
    fn failed(section: Section, err: &GenerationError) -> Self {
        Self {
            section,
            body: SectionBody::Failed(format!("Error generating {section} section: {err}")),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.body, SectionBody::Failed(_))
    }

    pub fn text(&self) -> &str {
        match &self.body {
            SectionBody::Generated(t) | SectionBody::Rendered(t) | SectionBody::Failed(t) => t,
        }
    }

    /// `**<Section>**` followed by the body on the next line.
    pub fn render(&self) -> String {
        format!("**{}**\n{}", self.section, self.text())
    }
}

/// Section fragments in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    sections: Vec<SectionReport>,
}

impl Report {
    pub fn sections(&self) -> &[SectionReport] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.sections.iter().filter(|s| s.is_failed()).count()
    }

    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(SectionReport::render)
            .collect::<Vec<_>>()
            .join(SECTION_SEPARATOR)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Turns fetched data into a report, one generation call per section.
pub struct ReportBuilder<'a> {
    generator: &'a dyn TextGenerator,
    options: PromptOptions,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(generator: &'a dyn TextGenerator, options: PromptOptions) -> Self {
        Self { generator, options }
    }

    pub async fn build_report(
        &self,
        ticker: &Ticker,
        sections: &SectionSelection,
        data: &FinancialData,
    ) -> Report {
        let mut out = Vec::with_capacity(sections.len());

        for section in sections.iter() {
            let report = match section_input(ticker, section, data, self.options) {
                SectionInput::Rendered(text) => SectionReport {
                    section,
                    body: SectionBody::Rendered(text),
                },
                SectionInput::Prompt(prompt) => self.generate_section(ticker, section, &prompt).await,
            };
            out.push(report);
        }

        Report { sections: out }
    }

    async fn generate_section(&self, ticker: &Ticker, section: Section, prompt: &str) -> SectionReport {
        tracing::info!(
            %ticker,
            %section,
            provider = %self.generator.provider(),
            prompt_chars = prompt.chars().count(),
            "generating report section"
        );

        let generated = self.generator.generate(prompt).await.and_then(|text| {
            let text = text.trim();
            if text.is_empty() {
                return Err(GenerationError::empty(self.generator.provider()));
            }
            Ok(text.to_string())
        });

        match generated {
            Ok(text) => SectionReport {
                section,
                body: SectionBody::Generated(text),
            },
            Err(err) => {
                tracing::warn!(%ticker, %section, error = %err, "section generation failed; continuing");
                SectionReport::failed(section, &err)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum ReportError {
    EmptyTicker(EmptyTickerError),
    DataFetch(DataFetchError),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::EmptyTicker(_) => {
                f.write_str("Please enter a valid company ticker to generate the report.")
            }
            ReportError::DataFetch(err) => write!(
                f,
                "Error fetching data for {}: {}: {}",
                err.ticker, err.kind, err.detail
            ),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::EmptyTicker(err) => Some(err),
            ReportError::DataFetch(err) => Some(err),
        }
    }
}

impl From<EmptyTickerError> for ReportError {
    fn from(err: EmptyTickerError) -> Self {
        ReportError::EmptyTicker(err)
    }
}

impl From<DataFetchError> for ReportError {
    fn from(err: DataFetchError) -> Self {
        ReportError::DataFetch(err)
    }
}

/// One "Generate Report" action: validate, fetch, build.
#[derive(Clone)]
pub struct ReportService {
    market: Arc<dyn MarketDataProvider>,
    generator: Arc<dyn TextGenerator>,
    options: PromptOptions,
}

impl ReportService {
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        generator: Arc<dyn TextGenerator>,
        options: PromptOptions,
    ) -> Self {
        Self {
            market,
            generator,
            options,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self::new(
            provider_from_settings(settings)?,
            generator_from_settings(settings)?,
            settings.prompt_options()?,
        ))
    }

    pub fn options(&self) -> PromptOptions {
        self.options
    }

    pub fn with_options(mut self, options: PromptOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn generate(
        &self,
        ticker: &str,
        sections: &SectionSelection,
    ) -> Result<Report, ReportError> {
        let ticker = Ticker::new(ticker)?;

        tracing::info!(
            %ticker,
            provider = self.market.provider_name(),
            sections = sections.len(),
            "fetching market data"
        );
        let data = self.market.fetch(&ticker).await.map_err(|err| {
            tracing::error!(%ticker, error = %err, "market data fetch failed");
            err
        })?;

        let report = ReportBuilder::new(self.generator.as_ref(), self.options)
            .build_report(&ticker, sections, &data)
            .await;

        tracing::info!(
            %ticker,
            sections = report.sections().len(),
            failures = report.failures(),
            "report generated"
        );
        Ok(report)
    }
}
