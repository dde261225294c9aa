use crate::quotes::{get_text, FetchError, PriceSeries, QuoteMeta, QuoteService, StockQuote};
use csv::Reader;
use futures::future::try_join;
use serde::Deserialize;
use tracing::{info, warn};

const STOOQ: &str = "https://stooq.com";
const HISTORY_LEN: usize = 14;
const MISSING: [&str; 3] = ["N/D", "-", ""];

#[derive(Debug, Deserialize)]
struct QuoteRow {
    #[serde(rename = "Open", default)]
    open: Option<String>,
    #[serde(rename = "Close", default)]
    close: Option<String>,
    #[serde(rename = "Volume", default)]
    volume: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    #[serde(rename = "Close", default)]
    close: Option<String>,
}

pub struct Stooq {
    client: reqwest::Client,
    base_url: String,
}

impl Stooq {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: STOOQ.to_string(),
        }
    }
}

/// The result of an equity lookup. A failed lookup carries the sentinel series.
#[derive(Debug, Clone, PartialEq)]
pub struct EquityFetch {
    pub series: PriceSeries,
    pub meta: QuoteMeta,
}

fn number(field: Option<&str>) -> Result<f64, FetchError> {
    let field = field.unwrap_or_default().trim();
    if MISSING.contains(&field) {
        return Ok(0.0);
    }
    field
        .replace(',', "")
        .parse()
        .map_err(|_| FetchError::NotANumber(field.to_string()))
}

pub fn parse_quote(body: &str) -> Result<StockQuote, FetchError> {
    let mut reader = Reader::from_reader(body.as_bytes());
    let row = reader.deserialize::<QuoteRow>().next().ok_or(FetchError::Empty)??;
    Ok(StockQuote {
        open: number(row.open.as_deref())?,
        close: number(row.close.as_deref())?,
        volume: number(row.volume.as_deref())?,
    })
}

pub fn parse_daily_closes(body: &str) -> Result<Vec<f64>, FetchError> {
    let mut reader = Reader::from_reader(body.as_bytes());
    let closes = reader
        .deserialize::<HistoryRow>()
        .map(|row| number(row?.close.as_deref()))
        .collect::<Result<Vec<f64>, FetchError>>()?;
    let skip = closes.len().saturating_sub(HISTORY_LEN);
    Ok(closes.into_iter().skip(skip).collect())
}

impl QuoteService for Stooq {
    async fn quote(&self, symbol: &str) -> Result<StockQuote, FetchError> {
        let url = format!(
            "{}/q/l/?s={}.US&f=sd2t2ohlcvn&h&e=csv",
            self.base_url, symbol
        );
        parse_quote(&get_text(&self.client, &url).await?)
    }

    async fn daily_closes(&self, symbol: &str) -> Result<Vec<f64>, FetchError> {
        let url = format!("{}/q/d/l/?s={}.US&i=d", self.base_url, symbol);
        parse_daily_closes(&get_text(&self.client, &url).await?)
    }
}

#[tracing::instrument(skip(service))]
pub async fn fetch_equity<Q: QuoteService>(service: &Q, symbol: &str) -> EquityFetch {
    match try_join(service.quote(symbol), service.daily_closes(symbol)).await {
        Ok((quote, closes)) => {
            let change_pct = quote.change_pct();
            info!("{} = ${:.2} ({:+.2}%)", symbol, quote.close, change_pct);
            let series = if closes.is_empty() {
                PriceSeries::new(vec![quote.close])
            } else {
                PriceSeries::new(closes)
            };
            EquityFetch {
                series,
                meta: QuoteMeta {
                    volume: quote.volume,
                    market_cap_rank: 0,
                    all_time_high: false,
                    day_change: Some(change_pct),
                },
            }
        }
        Err(e) => {
            warn!("Quote lookup failed for {}: {}", symbol, e);
            EquityFetch {
                series: PriceSeries::sentinel(),
                meta: QuoteMeta::default(),
            }
        }
    }
}
