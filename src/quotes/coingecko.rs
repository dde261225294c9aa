use crate::quotes::{get_text, FetchError, MarketData, MarketSnapshot};
use serde::Deserialize;
use tracing::debug;

const COINGECKO_API: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Deserialize)]
struct MarketChart {
    #[serde(default)]
    prices: Vec<(f64, f64)>,
}

#[derive(Debug, Deserialize)]
struct Market {
    current_price: Option<f64>,
    ath: Option<f64>,
    market_cap_rank: Option<u32>,
    total_volume: Option<f64>,
}

pub struct CoinGecko {
    client: reqwest::Client,
    base_url: String,
}

impl CoinGecko {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: COINGECKO_API.to_string(),
        }
    }
}

/// The aggregator has no tether quotes, so those are served in dollars.
pub fn api_fiat(fiat: &str) -> String {
    let fiat = fiat.to_lowercase();
    if fiat == "usdt" {
        "usd".to_string()
    } else {
        fiat
    }
}

pub fn parse_market_chart(body: &str) -> Result<Vec<f64>, FetchError> {
    let chart: MarketChart = serde_json::from_str(body)?;
    Ok(chart.prices.into_iter().map(|(_, price)| price).collect())
}

pub fn parse_markets(body: &str) -> Result<MarketSnapshot, FetchError> {
    let markets: Vec<Market> = serde_json::from_str(body)?;
    let market = markets.into_iter().next().ok_or(FetchError::Empty)?;
    let price = market.current_price.ok_or(FetchError::Empty)?;
    Ok(MarketSnapshot {
        price,
        all_time_high: market.ath,
        market_cap_rank: market.market_cap_rank.unwrap_or_default(),
        volume: market.total_volume.unwrap_or_default(),
    })
}

impl MarketData for CoinGecko {
    async fn history(
        &self,
        coin: &str,
        fiat: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<f64>, FetchError> {
        let url = format!(
            "{}/coins/{}/market_chart/range?vs_currency={}&from={}&to={}",
            self.base_url,
            coin,
            api_fiat(fiat),
            from,
            to
        );
        let prices = parse_market_chart(&get_text(&self.client, &url).await?)?;
        debug!(coin, points = prices.len(), "Downloaded price history");
        Ok(prices)
    }

    async fn market(&self, coin: &str, fiat: &str) -> Result<MarketSnapshot, FetchError> {
        let url = format!(
            "{}/coins/markets?vs_currency={}&ids={}",
            self.base_url,
            api_fiat(fiat),
            coin
        );
        let snapshot = parse_markets(&get_text(&self.client, &url).await?)?;
        debug!(coin, price = snapshot.price, "Downloaded market snapshot");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_api_fiat() {
        assert_eq!(api_fiat("USDT"), "usd");
        assert_eq!(api_fiat("EUR"), "eur");
    }

    #[test]
    fn test_parse_market_chart() {
        let body = r#"{
            "prices": [[1700000000000, 36500.5], [1700003600000, 36620.25]],
            "market_caps": [],
            "total_volumes": []
        }"#;
        assert_eq!(parse_market_chart(body).unwrap(), vec![36500.5, 36620.25]);
        assert!(parse_market_chart("{}").unwrap().is_empty());
        assert!(parse_market_chart("<html>").is_err());
    }

    #[test]
    fn test_parse_markets() {
        let body = r#"[{
            "id": "bitcoin",
            "current_price": 69100.0,
            "ath": 69045.0,
            "market_cap_rank": 1,
            "total_volume": 31234567890.0
        }]"#;
        let snapshot = parse_markets(body).unwrap();
        assert_eq!(
            snapshot,
            MarketSnapshot {
                price: 69100.0,
                all_time_high: Some(69045.0),
                market_cap_rank: 1,
                volume: 31234567890.0,
            }
        );
    }

    #[test]
    fn test_parse_markets_without_ath() {
        let snapshot = parse_markets(r#"[{"current_price": 5.0, "ath": null}]"#).unwrap();
        assert_eq!(snapshot.all_time_high, None);
        assert!(!snapshot.is_all_time_high());
        let snapshot = parse_markets(r#"[{"current_price": 5.0}]"#).unwrap();
        assert!(!snapshot.is_all_time_high());
    }

    #[test]
    fn test_parse_markets_empty() {
        assert!(matches!(parse_markets("[]"), Err(FetchError::Empty)));
        assert!(matches!(
            parse_markets(r#"[{"current_price": null}]"#),
            Err(FetchError::Empty)
        ));
    }
}
