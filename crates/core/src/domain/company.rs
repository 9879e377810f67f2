use crate::domain::table::{FinancialTable, TableLayout};
use serde::Serialize;
use std::fmt;

/// A user-supplied ticker symbol. Only non-emptiness is checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Ticker(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyTickerError;

impl fmt::Display for EmptyTickerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ticker symbol must be non-empty")
    }
}

impl std::error::Error for EmptyTickerError {}

impl Ticker {
    pub fn new(raw: &str) -> Result<Self, EmptyTickerError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EmptyTickerError);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyProfile {
    pub name: Option<String>,
    pub industry: Option<String>,
    pub sector: Option<String>,
    pub description: Option<String>,
}

/// Everything fetched for one report run.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialData {
    pub financials: FinancialTable,
    pub balance_sheet: FinancialTable,
    pub cashflow: FinancialTable,
    pub recommendations: FinancialTable,
    pub profile: Option<CompanyProfile>,
}

impl FinancialData {
    pub fn empty() -> Self {
        Self {
            financials: FinancialTable::empty(TableLayout::PeriodColumns),
            balance_sheet: FinancialTable::empty(TableLayout::PeriodColumns),
            cashflow: FinancialTable::empty(TableLayout::PeriodColumns),
            recommendations: FinancialTable::empty(TableLayout::PeriodRows),
            profile: None,
        }
    }

    pub fn sector(&self) -> Option<&str> {
        self.profile.as_ref().and_then(|p| p.sector.as_deref())
    }
}
