//! Prompt assembly. Every function here is pure: identical inputs give
//! identical text.

use crate::domain::company::{CompanyProfile, FinancialData, Ticker};
use crate::domain::section::Section;
use crate::domain::table::{format_cell, FinancialTable};
use std::str::FromStr;

/// How much of a table is embedded in a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryPolicy {
    /// The whole table as aligned text.
    #[default]
    Full,
    /// Only the most recent period's value per metric.
    Latest,
}

impl FromStr for SummaryPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(SummaryPolicy::Full),
            "latest" => Ok(SummaryPolicy::Latest),
            other => anyhow::bail!("unknown summary policy {other:?} (expected full or latest)"),
        }
    }
}

/// Whether Company Info goes through the generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompanyInfoMode {
    #[default]
    Direct,
    Generated,
}

impl FromStr for CompanyInfoMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(CompanyInfoMode::Direct),
            "generated" => Ok(CompanyInfoMode::Generated),
            other => {
                anyhow::bail!("unknown company info mode {other:?} (expected direct or generated)")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PromptOptions {
    pub summary_policy: SummaryPolicy,
    pub company_info_mode: CompanyInfoMode,
}

/// What a section needs before it lands in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionInput {
    /// Send this prompt to the generation backend.
    Prompt(String),
    /// Final text, no generation call.
    Rendered(String),
}

pub fn section_input(
    ticker: &Ticker,
    section: Section,
    data: &FinancialData,
    options: PromptOptions,
) -> SectionInput {
    let table = |t: &FinancialTable| render_table(t, options.summary_policy);
    match section {
        Section::CompanyInfo => match options.company_info_mode {
            CompanyInfoMode::Direct => {
                SectionInput::Rendered(render_company_info(ticker, data.profile.as_ref()))
            }
            CompanyInfoMode::Generated => {
                SectionInput::Prompt(render_company_info_prompt(ticker, data.profile.as_ref()))
            }
        },
        Section::Financials => {
            SectionInput::Prompt(render_prompt(ticker, section, &table(&data.financials)))
        }
        Section::BalanceSheet => {
            SectionInput::Prompt(render_prompt(ticker, section, &table(&data.balance_sheet)))
        }
        Section::CashFlow => {
            SectionInput::Prompt(render_prompt(ticker, section, &table(&data.cashflow)))
        }
        Section::AnalystRecommendations => {
            SectionInput::Prompt(render_prompt(ticker, section, &table(&data.recommendations)))
        }
        Section::SectoralAnalysis => SectionInput::Prompt(render_sector_prompt(ticker, data.sector())),
    }
}

fn focus(section: Section) -> &'static str {
    match section {
        Section::CompanyInfo => "Describe the business, its industry and its competitive position.",
        Section::Financials => "Analyze revenue, profitability and margin trends across the reported periods.",
        Section::BalanceSheet => "Assess liquidity, leverage and the capital structure.",
        Section::CashFlow => {
            "Discuss operating, investing and financing cash flows and free cash flow generation."
        }
        Section::AnalystRecommendations => {
            "Summarize the analyst consensus and its recent changes, then give your own recommendation based on this data."
        }
        Section::SectoralAnalysis => "Analyze the sector's outlook, drivers and risks.",
    }
}

/// The instruction for a data-backed section. `data_text` may be empty.
pub fn render_prompt(ticker: &Ticker, section: Section, data_text: &str) -> String {
    format!(
        "Write the {section} section of a CFA Research Challenge report for {ticker}. {focus} \
Base the analysis on the data below.\n\
{section} data:\n\
{data_text}\n",
        focus = focus(section),
    )
}

pub fn render_sector_prompt(ticker: &Ticker, sector: Option<&str>) -> String {
    let sector = sector.map(str::trim).filter(|s| !s.is_empty()).unwrap_or("Unspecified");
    format!(
        "Write the {label} section of a CFA Research Challenge report for {ticker}. \
{ticker} operates in the {sector} sector. {focus} \
Explain how the company is positioned relative to the sector.\n",
        label = Section::SectoralAnalysis,
        focus = focus(Section::SectoralAnalysis),
    )
}

/// Company metadata as plain text, used as the Company Info section body in
/// direct mode.
pub fn render_company_info(ticker: &Ticker, profile: Option<&CompanyProfile>) -> String {
    let Some(profile) = profile else {
        return format!("No company profile is available for {ticker}.");
    };
    let field = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("N/A")
            .to_string()
    };

    format!(
        "Ticker: {ticker}\nName: {}\nIndustry: {}\nSector: {}\nDescription: {}",
        field(&profile.name),
        field(&profile.industry),
        field(&profile.sector),
        field(&profile.description),
    )
}

pub fn render_company_info_prompt(ticker: &Ticker, profile: Option<&CompanyProfile>) -> String {
    render_prompt(
        ticker,
        Section::CompanyInfo,
        &render_company_info(ticker, profile),
    )
}

pub fn render_table(table: &FinancialTable, policy: SummaryPolicy) -> String {
    if table.is_empty() {
        return String::new();
    }
    match policy {
        SummaryPolicy::Full => render_full(table),
        SummaryPolicy::Latest => render_latest(table),
    }
}

fn render_full(table: &FinancialTable) -> String {
    let label_width = table
        .rows()
        .iter()
        .map(|r| r.label.chars().count())
        .max()
        .unwrap_or(0);

    let cells: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|r| r.values.iter().map(|v| format_cell(*v)).collect())
        .collect();

    let widths: Vec<usize> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|row| row.get(i).map_or(0, |cell| cell.chars().count()))
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(table.rows().len() + 1);

    let mut header = " ".repeat(label_width);
    for (name, width) in table.columns().iter().zip(&widths) {
        header.push_str(&format!("  {name:>width$}"));
    }
    lines.push(header);

    for (row, row_cells) in table.rows().iter().zip(&cells) {
        let mut line = format!("{:<label_width$}", row.label);
        for (cell, width) in row_cells.iter().zip(&widths) {
            line.push_str(&format!("  {cell:>width$}"));
        }
        lines.push(line);
    }

    lines.join("\n")
}

fn render_latest(table: &FinancialTable) -> String {
    let mut lines = Vec::new();
    if let Some(period) = table.latest_period() {
        lines.push(format!("Most recent period: {period}"));
    }
    for (metric, value) in table.latest() {
        lines.push(format!("{metric}: {}", format_cell(value)));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::{TableLayout, TableRow};

    fn acme() -> Ticker {
        Ticker::new("ACME").unwrap()
    }

    fn income() -> FinancialTable {
        FinancialTable::new(
            TableLayout::PeriodColumns,
            vec!["2023-12-31".to_string(), "2022-12-31".to_string()],
            vec![
                TableRow {
                    label: "netIncome".to_string(),
                    values: vec![None, Some(90.0)],
                },
                TableRow {
                    label: "totalRevenue".to_string(),
                    values: vec![Some(1000.0), Some(900.0)],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn full_table_is_aligned() {
        let text = render_table(&income(), SummaryPolicy::Full);
        let expected = [
            "              2023-12-31  2022-12-31",
            "netIncome            NaN          90",
            "totalRevenue        1000         900",
        ]
        .join("\n");
        assert_eq!(text, expected);
    }

    #[test]
    fn latest_summary_keeps_newest_period_only() {
        let text = render_table(&income(), SummaryPolicy::Latest);
        assert_eq!(
            text,
            "Most recent period: 2023-12-31\nnetIncome: NaN\ntotalRevenue: 1000"
        );
    }

    #[test]
    fn prompt_embeds_section_ticker_and_data() {
        let data = render_table(&income(), SummaryPolicy::Full);
        let prompt = render_prompt(&acme(), Section::Financials, &data);
        assert!(prompt.starts_with(
            "Write the Financials section of a CFA Research Challenge report for ACME."
        ));
        assert!(prompt.contains("Financials data:\n"));
        assert!(prompt.contains("totalRevenue        1000"));
    }

    #[test]
    fn prompt_is_deterministic() {
        let data = render_table(&income(), SummaryPolicy::Latest);
        let a = render_prompt(&acme(), Section::CashFlow, &data);
        let b = render_prompt(&acme(), Section::CashFlow, &data);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_table_still_produces_a_prompt() {
        let empty = FinancialTable::empty(TableLayout::PeriodColumns);
        assert_eq!(render_table(&empty, SummaryPolicy::Full), "");
        assert_eq!(render_table(&empty, SummaryPolicy::Latest), "");

        let prompt = render_prompt(&acme(), Section::BalanceSheet, "");
        assert!(prompt.ends_with("Balance Sheet data:\n\n"));
    }

    #[test]
    fn sector_prompt_has_no_table_and_defaults_sector() {
        let prompt = render_sector_prompt(&acme(), Some("Industrials"));
        assert!(prompt.contains("Sectoral Analysis"));
        assert!(prompt.contains("in the Industrials sector"));
        assert!(!prompt.contains("data:"));

        let prompt = render_sector_prompt(&acme(), None);
        assert!(prompt.contains("in the Unspecified sector"));
    }

    #[test]
    fn company_info_renders_profile_fields() {
        let profile = CompanyProfile {
            name: Some("Acme Corp".to_string()),
            industry: None,
            sector: Some("Industrials".to_string()),
            description: Some("Makes widgets.".to_string()),
        };
        let text = render_company_info(&acme(), Some(&profile));
        assert_eq!(
            text,
            "Ticker: ACME\nName: Acme Corp\nIndustry: N/A\nSector: Industrials\nDescription: Makes widgets."
        );
        assert_eq!(
            render_company_info(&acme(), None),
            "No company profile is available for ACME."
        );
    }

    #[test]
    fn section_input_follows_company_info_mode() {
        let data = FinancialData::empty();
        let direct = section_input(&acme(), Section::CompanyInfo, &data, PromptOptions::default());
        assert!(matches!(direct, SectionInput::Rendered(_)));

        let options = PromptOptions {
            company_info_mode: CompanyInfoMode::Generated,
            ..Default::default()
        };
        let generated = section_input(&acme(), Section::CompanyInfo, &data, options);
        match generated {
            SectionInput::Prompt(p) => assert!(p.contains("Company Info data:")),
            other => panic!("expected a prompt, got {other:?}"),
        }
    }

    #[test]
    fn section_input_uses_the_matching_dataset() {
        let mut data = FinancialData::empty();
        data.cashflow = income();
        let options = PromptOptions {
            summary_policy: SummaryPolicy::Latest,
            ..Default::default()
        };

        let SectionInput::Prompt(cash) = section_input(&acme(), Section::CashFlow, &data, options) else {
            panic!("cash flow must be generated");
        };
        assert!(cash.contains("totalRevenue: 1000"));

        let SectionInput::Prompt(fin) = section_input(&acme(), Section::Financials, &data, options) else {
            panic!("financials must be generated");
        };
        assert!(!fin.contains("totalRevenue"));
    }

    #[test]
    fn policies_parse() {
        assert_eq!("LATEST".parse::<SummaryPolicy>().unwrap(), SummaryPolicy::Latest);
        assert_eq!("direct".parse::<CompanyInfoMode>().unwrap(), CompanyInfoMode::Direct);
        assert!("partial".parse::<SummaryPolicy>().is_err());
    }
}
