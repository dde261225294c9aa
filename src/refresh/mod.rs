use crate::quotes::{fetch_equity, Asset, MarketData, PriceSeries, QuoteMeta, QuoteService};
use chrono::{Duration as ChronoDuration, Utc};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            initial_backoff: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Refresh {
    Ready { series: PriceSeries, meta: QuoteMeta },
    /// The source has no data this cycle; nothing should be charted.
    Unavailable { reason: String },
}

/// Raw outcome of the crypto retry loop, before the series is made non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CryptoFetch {
    pub prices: Vec<f64>,
    pub meta: QuoteMeta,
    pub live: bool,
}

pub struct Sources<M, Q> {
    pub market_data: M,
    pub quotes: Q,
}

impl<M: MarketData, Q: QuoteService> Sources<M, Q> {
    pub async fn refresh(
        &self,
        policy: &RetryPolicy,
        asset: &Asset,
        fiat: &str,
        lookback_days: u32,
    ) -> Refresh {
        match asset {
            Asset::Equity(symbol) => {
                let fetch = fetch_equity(&self.quotes, symbol).await;
                if fetch.series.is_sentinel() {
                    Refresh::Unavailable {
                        reason: format!("{} price unavailable. Try again later!", symbol),
                    }
                } else {
                    Refresh::Ready {
                        series: fetch.series,
                        meta: fetch.meta,
                    }
                }
            }
            Asset::Crypto(coin) => {
                let to = Utc::now();
                let from = to
                    .checked_sub_signed(ChronoDuration::days(lookback_days.into()))
                    .map_or(0, |from| from.timestamp());
                let fetch =
                    refresh_crypto(&self.market_data, policy, coin, fiat, from, to.timestamp())
                        .await;
                if !fetch.live {
                    warn!(coin = %coin, points = fetch.prices.len(), "No live price, showing history only");
                }
                Refresh::Ready {
                    series: PriceSeries::new(fetch.prices),
                    meta: fetch.meta,
                }
            }
        }
    }
}

/// Fetches history and the live price, retrying with exponential backoff while
/// the live call fails transiently. Never fails; returns whatever was gathered.
#[tracing::instrument(skip(api, policy))]
pub async fn refresh_crypto<M: MarketData>(
    api: &M,
    policy: &RetryPolicy,
    coin: &str,
    fiat: &str,
    from: i64,
    to: i64,
) -> CryptoFetch {
    let mut fetch = CryptoFetch::default();
    let mut backoff = policy.initial_backoff;
    for attempt in 1..=policy.attempts {
        match api.history(coin, fiat, from, to).await {
            // A later successful history supersedes an earlier one.
            Ok(prices) => fetch.prices = prices,
            Err(e) => warn!(attempt, "History request failed: {}", e),
        }
        match api.market(coin, fiat).await {
            Ok(snapshot) => {
                fetch.meta = QuoteMeta {
                    volume: snapshot.volume,
                    market_cap_rank: snapshot.market_cap_rank,
                    all_time_high: snapshot.is_all_time_high(),
                    day_change: None,
                };
                fetch.prices.push(snapshot.price);
                fetch.live = true;
                info!(price = snapshot.price, "Live price received");
                return fetch;
            }
            Err(e) if e.is_transient() => {
                warn!(attempt, "Live price request failed: {}", e);
                if attempt < policy.attempts {
                    debug!("Retrying in {:?}", backoff);
                    sleep(backoff).await;
                    backoff *= 2;
                }
            }
            Err(e) => {
                warn!(attempt, "No live price for {}: {}", coin, e);
                return fetch;
            }
        }
    }
    fetch
}
