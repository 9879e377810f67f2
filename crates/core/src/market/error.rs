use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFetchErrorKind {
    Unreachable,
    UnknownTicker,
    InvalidResponse,
}

impl fmt::Display for DataFetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFetchErrorKind::Unreachable => f.write_str("market data provider unreachable"),
            DataFetchErrorKind::UnknownTicker => f.write_str("ticker not recognised"),
            DataFetchErrorKind::InvalidResponse => f.write_str("invalid market data response"),
        }
    }
}

/// Market data could not be acquired. Fatal for the whole report.
#[derive(Debug, Clone)]
pub struct DataFetchError {
    pub ticker: String,
    pub kind: DataFetchErrorKind,
    pub detail: String,
}

impl DataFetchError {
    pub fn new(ticker: impl Into<String>, kind: DataFetchErrorKind, detail: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for DataFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "could not fetch market data for {}: {}: {}",
            self.ticker, self.kind, self.detail
        )
    }
}

impl std::error::Error for DataFetchError {}
