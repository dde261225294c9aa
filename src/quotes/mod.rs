use anyhow::Result;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

mod coingecko;
mod stooq;
pub use coingecko::*;
pub use stooq::*;

#[cfg(test)]
pub(crate) use stooq::test::FakeQuotes;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const EQUITY_SUFFIX: &str = ".US";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("not a number: {0:?}")]
    NotANumber(String),
    #[error("empty response")]
    Empty,
}

impl FetchError {
    /// Whether asking again later could give a different answer. A well-formed
    /// reply that is empty or rejected (e.g. an unknown coin id) is final.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status(status) => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    Crypto(String),
    Equity(String),
}

impl Asset {
    pub fn parse(id: &str) -> Self {
        let upper = id.to_uppercase();
        match upper.strip_suffix(EQUITY_SUFFIX) {
            Some(symbol) => Asset::Equity(symbol.to_string()),
            None => Asset::Crypto(id.to_string()),
        }
    }

    /// Name used for icon lookup and display.
    pub fn id(&self) -> &str {
        match self {
            Asset::Crypto(id) | Asset::Equity(id) => id,
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Crypto(id) => write!(f, "{}", id),
            Asset::Equity(symbol) => write!(f, "{}{}", symbol, EQUITY_SUFFIX),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteMeta {
    pub volume: f64,
    pub market_cap_rank: u32,
    pub all_time_high: bool,
    /// Intraday change in percent, equities only.
    pub day_change: Option<f64>,
}

/// Prices oldest first. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries(Vec<f64>);

impl PriceSeries {
    pub const SENTINEL: f64 = 0.0;

    pub fn new(points: Vec<f64>) -> Self {
        if points.is_empty() {
            Self::sentinel()
        } else {
            Self(points)
        }
    }

    pub fn sentinel() -> Self {
        Self(vec![Self::SENTINEL])
    }

    pub fn is_sentinel(&self) -> bool {
        self.0 == [Self::SENTINEL]
    }

    pub fn points(&self) -> &[f64] {
        &self.0
    }

    pub fn latest(&self) -> f64 {
        self.0[self.0.len() - 1]
    }

    /// Change from first to last point in percent, rounded to two places.
    pub fn change_pct(&self) -> f64 {
        let first = self.0[0];
        if self.0.len() < 2 || first == 0.0 {
            return 0.0;
        }
        ((self.latest() - first) / first * 10000.0).round() / 100.0
    }
}

/// Live snapshot from the aggregator's markets endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub price: f64,
    pub all_time_high: Option<f64>,
    pub market_cap_rank: u32,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockQuote {
    pub open: f64,
    pub close: f64,
    pub volume: f64,
}

impl MarketSnapshot {
    /// True only when the aggregator reports an ATH and the price beats it.
    pub fn is_all_time_high(&self) -> bool {
        self.all_time_high.map_or(false, |ath| self.price > ath)
    }
}

impl StockQuote {
    pub fn change_pct(&self) -> f64 {
        if self.open == 0.0 {
            return 0.0;
        }
        (self.close - self.open) / self.open * 100.0
    }
}

/// Crypto aggregator endpoints.
pub trait MarketData {
    async fn history(
        &self,
        coin: &str,
        fiat: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<f64>, FetchError>;

    async fn market(&self, coin: &str, fiat: &str) -> Result<MarketSnapshot, FetchError>;
}

/// Equity quote service endpoints.
pub trait QuoteService {
    async fn quote(&self, symbol: &str) -> Result<StockQuote, FetchError>;

    async fn daily_closes(&self, symbol: &str) -> Result<Vec<f64>, FetchError>;
}

pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    tracing::trace!(%url, "GET");
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Err(FetchError::Empty);
    }
    Ok(body)
}
