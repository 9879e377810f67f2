//! Wire shapes of the quoteSummary endpoint.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteSummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    pub quote_summary: QuoteSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteSummary {
    #[serde(default)]
    pub result: Option<Vec<QuoteSummaryResult>>,
    #[serde(default)]
    pub error: Option<QuoteSummaryError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteSummaryError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummaryResult {
    pub price: Option<PriceModule>,
    pub asset_profile: Option<AssetProfile>,
    pub income_statement_history: Option<IncomeStatementHistory>,
    pub balance_sheet_history: Option<BalanceSheetHistory>,
    pub cashflow_statement_history: Option<CashflowStatementHistory>,
    pub recommendation_trend: Option<RecommendationTrend>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceModule {
    pub long_name: Option<String>,
    pub short_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetProfile {
    pub industry: Option<String>,
    pub sector: Option<String>,
    pub long_business_summary: Option<String>,
}

/// One reporting period of a statement: `endDate` plus `{ "raw": n, "fmt": .. }`
/// per metric.
pub type StatementEntry = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeStatementHistory {
    #[serde(default)]
    pub income_statement_history: Vec<StatementEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheetHistory {
    #[serde(default)]
    pub balance_sheet_statements: Vec<StatementEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashflowStatementHistory {
    #[serde(default)]
    pub cashflow_statements: Vec<StatementEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationTrend {
    #[serde(default)]
    pub trend: Vec<TrendEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendEntry {
    pub period: String,
    pub strong_buy: Option<f64>,
    pub buy: Option<f64>,
    pub hold: Option<f64>,
    pub sell: Option<f64>,
    pub strong_sell: Option<f64>,
}
