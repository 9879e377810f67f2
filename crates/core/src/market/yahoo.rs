use crate::config::Settings;
use crate::domain::company::{CompanyProfile, FinancialData, Ticker};
use crate::domain::table::{FinancialTable, TableLayout, TableRow};
use crate::market::error::{DataFetchError, DataFetchErrorKind};
use crate::market::types::{QuoteSummaryEnvelope, QuoteSummaryResult, StatementEntry, TrendEntry};
use crate::market::MarketDataProvider;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, USER_AGENT};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::collections::BTreeSet;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MODULES: &str = "price,assetProfile,incomeStatementHistory,balanceSheetHistory,cashflowStatementHistory,recommendationTrend";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const NON_METRIC_KEYS: [&str; 2] = ["endDate", "maxAge"];
const TREND_COLUMNS: [&str; 5] = ["strongBuy", "buy", "hold", "sell", "strongSell"];

#[derive(Debug, Clone)]
pub struct YahooFinanceProvider {
    http: reqwest::Client,
    base_url: Url,
    crumb: Option<String>,
    cookie: Option<HeaderValue>,
}

impl YahooFinanceProvider {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let raw_base = settings
            .market_data_base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL);
        let base_url = Url::parse(raw_base)
            .with_context(|| format!("invalid MARKET_DATA_BASE_URL: {raw_base}"))?;
        anyhow::ensure!(
            !base_url.cannot_be_a_base(),
            "MARKET_DATA_BASE_URL must be an http(s) base URL: {raw_base}"
        );

        let timeout_secs = std::env::var("MARKET_DATA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build market data http client")?;

        let cookie = settings
            .market_data_cookie
            .as_deref()
            .map(HeaderValue::from_str)
            .transpose()
            .context("MARKET_DATA_COOKIE is not a valid header value")?;

        Ok(Self {
            http,
            base_url,
            crumb: settings.market_data_crumb.clone(),
            cookie,
        })
    }

    fn url(&self, ticker: &Ticker) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v10", "finance", "quoteSummary", ticker.as_str()]);
        }
        url
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        if let Some(cookie) = &self.cookie {
            headers.insert(COOKIE, cookie.clone());
        }
        headers
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    fn provider_name(&self) -> &'static str {
        "yahoo_finance"
    }

    async fn fetch(&self, ticker: &Ticker) -> Result<FinancialData, DataFetchError> {
        let mut query: Vec<(&str, &str)> = vec![("modules", MODULES)];
        if let Some(crumb) = &self.crumb {
            query.push(("crumb", crumb.as_str()));
        }

        tracing::debug!(%ticker, "requesting quoteSummary");
        let res = self
            .http
            .get(self.url(ticker))
            .headers(self.headers())
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                DataFetchError::new(ticker.as_str(), DataFetchErrorKind::Unreachable, e.to_string())
            })?;

        let status = res.status();
        let text = res.text().await.map_err(|e| {
            DataFetchError::new(ticker.as_str(), DataFetchErrorKind::Unreachable, e.to_string())
        })?;

        let result = parse_quote_summary(ticker, status, &text)?;
        into_financial_data(result).map_err(|e| {
            DataFetchError::new(ticker.as_str(), DataFetchErrorKind::InvalidResponse, format!("{e:#}"))
        })
    }
}

/// Maps an HTTP response onto the single quoteSummary result it carries.
pub fn parse_quote_summary(
    ticker: &Ticker,
    status: StatusCode,
    body: &str,
) -> Result<QuoteSummaryResult, DataFetchError> {
    let fail = |kind, detail: String| DataFetchError::new(ticker.as_str(), kind, detail);

    let envelope = serde_json::from_str::<QuoteSummaryEnvelope>(body);

    if let Ok(QuoteSummaryEnvelope { quote_summary }) = &envelope {
        if let Some(err) = &quote_summary.error {
            let kind = if status == StatusCode::NOT_FOUND || err.code.eq_ignore_ascii_case("Not Found") {
                DataFetchErrorKind::UnknownTicker
            } else {
                DataFetchErrorKind::InvalidResponse
            };
            return Err(fail(kind, format!("{}: {}", err.code, err.description)));
        }
    }

    if status == StatusCode::NOT_FOUND {
        return Err(fail(DataFetchErrorKind::UnknownTicker, format!("HTTP {status}")));
    }
    if !status.is_success() {
        return Err(fail(
            DataFetchErrorKind::InvalidResponse,
            format!("HTTP {status}: {}", body.trim()),
        ));
    }

    let envelope = envelope.map_err(|e| {
        fail(
            DataFetchErrorKind::InvalidResponse,
            format!("quoteSummary response is not valid JSON: {e}"),
        )
    })?;

    envelope
        .quote_summary
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| fail(DataFetchErrorKind::UnknownTicker, "no quoteSummary result".to_string()))
}

pub fn into_financial_data(result: QuoteSummaryResult) -> Result<FinancialData> {
    let financials = statement_table(
        result
            .income_statement_history
            .map(|h| h.income_statement_history)
            .unwrap_or_default(),
    )
    .context("income statement")?;
    let balance_sheet = statement_table(
        result
            .balance_sheet_history
            .map(|h| h.balance_sheet_statements)
            .unwrap_or_default(),
    )
    .context("balance sheet")?;
    let cashflow = statement_table(
        result
            .cashflow_statement_history
            .map(|h| h.cashflow_statements)
            .unwrap_or_default(),
    )
    .context("cash flow statement")?;
    let recommendations = trend_table(
        result
            .recommendation_trend
            .map(|t| t.trend)
            .unwrap_or_default(),
    )
    .context("recommendation trend")?;

    let price = result.price.unwrap_or_default();
    let asset = result.asset_profile.unwrap_or_default();
    let profile = CompanyProfile {
        name: price.long_name.or(price.short_name),
        industry: asset.industry,
        sector: asset.sector,
        description: asset.long_business_summary,
    };
    let profile = (profile != CompanyProfile::default()).then_some(profile);

    Ok(FinancialData {
        financials,
        balance_sheet,
        cashflow,
        recommendations,
        profile,
    })
}

/// Metric rows (sorted by name) over period columns, newest first.
fn statement_table(mut entries: Vec<StatementEntry>) -> Result<FinancialTable> {
    entries.sort_by_key(|entry| std::cmp::Reverse(end_date_raw(entry).unwrap_or(i64::MIN)));

    let columns: Vec<String> = entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| period_label(entry, idx))
        .collect();

    let metrics: BTreeSet<&str> = entries
        .iter()
        .flat_map(|entry| entry.iter())
        .filter(|(key, value)| !NON_METRIC_KEYS.contains(&key.as_str()) && metric_value(value).is_some())
        .map(|(key, _)| key.as_str())
        .collect();

    let rows = metrics
        .into_iter()
        .map(|metric| TableRow {
            label: metric.to_string(),
            values: entries
                .iter()
                .map(|entry| entry.get(metric).and_then(metric_value).flatten())
                .collect(),
        })
        .collect();

    FinancialTable::new(TableLayout::PeriodColumns, columns, rows)
}

fn trend_table(trend: Vec<TrendEntry>) -> Result<FinancialTable> {
    if trend.is_empty() {
        return Ok(FinancialTable::empty(TableLayout::PeriodRows));
    }
    let columns = TREND_COLUMNS.iter().map(|c| c.to_string()).collect();
    let rows = trend
        .into_iter()
        .map(|t| TableRow {
            label: t.period,
            values: vec![t.strong_buy, t.buy, t.hold, t.sell, t.strong_sell],
        })
        .collect();
    FinancialTable::new(TableLayout::PeriodRows, columns, rows)
}

/// `Some(v)` for metric-shaped values (`{"raw": n}`, `{}` or a bare number),
/// `None` for anything else.
fn metric_value(value: &Value) -> Option<Option<f64>> {
    match value {
        Value::Object(map) => Some(map.get("raw").and_then(Value::as_f64)),
        Value::Number(n) => Some(n.as_f64()),
        Value::Null => Some(None),
        _ => None,
    }
}

fn end_date_raw(entry: &StatementEntry) -> Option<i64> {
    entry.get("endDate")?.get("raw")?.as_i64()
}

fn period_label(entry: &StatementEntry, idx: usize) -> String {
    let end_date = entry.get("endDate");
    if let Some(fmt) = end_date.and_then(|d| d.get("fmt")).and_then(Value::as_str) {
        return fmt.to_string();
    }
    end_date_raw(entry)
        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.date_naive().to_string())
        .unwrap_or_else(|| format!("period_{}", idx + 1))
}
