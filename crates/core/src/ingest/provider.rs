use crate::config::Settings;
use crate::domain::market::{Constituent, Quote};
use crate::domain::rates::RateSnapshot;
use crate::ingest::types::{NewsRow, QuoteRow, TreasuryRow};
use crate::storage::rate_history::parse_date;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://financialmodelingprep.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The provider rejects batch quote requests above this many symbols.
pub const MAX_QUOTE_BATCH: usize = 500;

/// News endpoints. Both project onto `{title, text, publishedDate}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NewsFeed {
    /// Legacy per-symbol feed, read with a one-day window.
    StockNews,
    /// Current per-symbol feed, read with a two-day window.
    SymbolNews,
}

impl NewsFeed {
    pub fn endpoint(self) -> &'static str {
        match self {
            NewsFeed::StockNews => "api/v3/stock_news",
            NewsFeed::SymbolNews => "stable/news/stock",
        }
    }

    pub fn window_days(self) -> i64 {
        match self {
            NewsFeed::StockNews => 1,
            NewsFeed::SymbolNews => 2,
        }
    }
}

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Single or batch quote; callers keep `symbols.len() <= MAX_QUOTE_BATCH`.
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>>;

    async fn fetch_constituents(&self) -> Result<Vec<Constituent>>;

    /// Latest treasury-rate row. Fails when the provider returns nothing.
    async fn fetch_treasury_rates(&self) -> Result<RateSnapshot>;

    async fn fetch_news(&self, feed: NewsFeed, symbol: &str) -> Result<Vec<NewsRow>>;

    /// Symbols attached to the provider's latest-news stream, in feed order.
    async fn fetch_latest_news_symbols(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Clone)]
pub struct FmpClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FmpClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_fmp_api_key()?.to_string();
        let base_url = std::env::var("FMP_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("FMP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build data provider http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// GET a JSON array. An empty body, `{}` or `[]` is an empty Vec.
    async fn get_rows<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let url = self.url(endpoint);
        let mut query: Vec<(&str, &str)> = params.to_vec();
        query.push(("apikey", self.api_key.as_str()));

        let res = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            // The query string carries the api key.
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("data provider request failed: {endpoint}"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .context("failed to read provider response")?;

        if !status.is_success() {
            anyhow::bail!("data provider HTTP {status} for {endpoint}: {text}");
        }

        if text.trim().is_empty() {
            tracing::warn!(endpoint, "no data returned");
            return Ok(Vec::new());
        }

        let raw = serde_json::from_str::<serde_json::Value>(&text)
            .with_context(|| format!("provider response is not valid JSON: {text}"))?;
        if raw.as_object().is_some_and(|o| o.is_empty()) {
            tracing::warn!(endpoint, "no data returned");
            return Ok(Vec::new());
        }
        anyhow::ensure!(
            raw.is_array(),
            "provider returned non-array payload for {endpoint}: {raw}"
        );

        let rows = serde_json::from_value::<Vec<T>>(raw)
            .with_context(|| format!("unexpected row shape from {endpoint}"))?;
        if rows.is_empty() {
            tracing::warn!(endpoint, "no data returned");
        }
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for FmpClient {
    fn provider_name(&self) -> &'static str {
        "fmp"
    }

    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>> {
        anyhow::ensure!(!symbols.is_empty(), "at least one symbol is required");
        anyhow::ensure!(
            symbols.len() <= MAX_QUOTE_BATCH,
            "quote batch must be at most {MAX_QUOTE_BATCH} symbols (got {})",
            symbols.len()
        );

        let endpoint = format!("api/v3/quote/{}", symbols.join(","));
        let rows: Vec<QuoteRow> = self.get_rows(&endpoint, &[]).await?;
        Ok(rows
            .into_iter()
            .map(|r| Quote {
                symbol: r.symbol,
                price: r.price,
                change_percent: r.changes_percentage,
            })
            .collect())
    }

    async fn fetch_constituents(&self) -> Result<Vec<Constituent>> {
        self.get_rows("api/v3/sp500_constituent", &[]).await
    }

    async fn fetch_treasury_rates(&self) -> Result<RateSnapshot> {
        let rows: Vec<TreasuryRow> = self.get_rows("stable/treasury-rates", &[]).await?;
        let latest = rows
            .into_iter()
            .next()
            .context("treasury-rate response was empty")?;
        Ok(RateSnapshot {
            date: parse_date(&latest.date)?,
            year2: latest.year2,
            year10: latest.year10,
            year30: latest.year30,
        })
    }

    async fn fetch_news(&self, feed: NewsFeed, symbol: &str) -> Result<Vec<NewsRow>> {
        self.get_rows(feed.endpoint(), &[("symbols", symbol)]).await
    }

    async fn fetch_latest_news_symbols(&self) -> Result<Vec<String>> {
        let rows: Vec<NewsRow> = self.get_rows("stable/news/stock-latest", &[]).await?;
        Ok(rows
            .into_iter()
            .filter_map(|r| r.symbol)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && s != "null")
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn request_errors_do_not_expose_api_key() {
        let client = FmpClient {
            http: reqwest::Client::new(),
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: "SECRET-FMP-KEY".to_string(),
        };
        let err = client.fetch_constituents().await.unwrap_err();
        let text = format!("{err:#} {err:?}");
        assert!(text.contains("api/v3/sp500_constituent"));
        assert!(!text.contains("SECRET-FMP-KEY"));
    }

    #[test]
    fn quote_rows_tolerate_missing_change() {
        let v = json!([
            {"symbol": "AAPL", "price": 190.5, "changesPercentage": 1.25, "volume": 10},
            {"symbol": "XYZ", "price": null}
        ]);
        let rows: Vec<QuoteRow> = serde_json::from_value(v).unwrap();
        assert_eq!(rows[0].changes_percentage, Some(1.25));
        assert_eq!(rows[1].changes_percentage, None);
        assert_eq!(rows[1].price, None);
    }

    #[test]
    fn treasury_row_ignores_other_maturities() {
        let v = json!([{
            "date": "2026-01-27",
            "month1": 4.3,
            "year2": 4.12,
            "year10": 4.55,
            "year30": 4.81
        }]);
        let rows: Vec<TreasuryRow> = serde_json::from_value(v).unwrap();
        assert_eq!(rows[0].year10, Some(4.55));
    }

    #[test]
    fn feeds_have_distinct_endpoints_and_windows() {
        assert_ne!(NewsFeed::StockNews.endpoint(), NewsFeed::SymbolNews.endpoint());
        assert_eq!(NewsFeed::StockNews.window_days(), 1);
        assert_eq!(NewsFeed::SymbolNews.window_days(), 2);
    }
}
