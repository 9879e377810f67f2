pub mod error;
pub mod types;
pub mod yahoo;

use crate::config::Settings;
use crate::domain::company::{FinancialData, Ticker};
use crate::market::error::DataFetchError;
use std::sync::Arc;

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Fetches the four statement tables and the company profile. Called once
    /// per report; nothing is cached.
    async fn fetch(&self, ticker: &Ticker) -> Result<FinancialData, DataFetchError>;
}

pub fn provider_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn MarketDataProvider>> {
    Ok(Arc::new(yahoo::YahooFinanceProvider::from_settings(settings)?))
}
