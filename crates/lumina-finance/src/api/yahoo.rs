//! Yahoo Finance client
//!
//! Prices and company metadata go through `yahoo_finance_api`, which also
//! handles the crumb handshake the quote-summary endpoint requires. News and
//! research come from the public search endpoint and are rate limited.

use super::{MarketDataProvider, NewsProvider, RawNewsItem};
use crate::error::{FinanceError, Result};
use crate::models::{CompanyInfo, Period, PricePoint};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, instrument};
use yahoo_finance_api as yahoo;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const SEARCH_URL: &str = "https://query2.finance.yahoo.com/v1/finance/search";
// The search endpoint rejects requests without a browser-like agent
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Yahoo Finance client
#[derive(Clone)]
pub struct YahooFinanceClient {
    client: Client,
    rate_limiter: SharedRateLimiter,
}

impl YahooFinanceClient {
    /// Create a client allowing `searches_per_minute` news/research requests
    pub fn new(searches_per_minute: u32) -> Self {
        let quota =
            Quota::per_minute(NonZeroU32::new(searches_per_minute).unwrap_or(NonZeroU32::MIN));
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Self {
            client: Client::new(),
            rate_limiter,
        }
    }

    fn connector() -> Result<yahoo::YahooConnector> {
        yahoo::YahooConnector::new().map_err(|e| FinanceError::YahooFinanceError(e.to_string()))
    }

    /// Run one search request and return the array stored under `key`
    async fn search(&self, params: &[(&str, String)], key: &str) -> Result<Vec<RawNewsItem>> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(SEARCH_URL)
            .header("User-Agent", USER_AGENT)
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FinanceError::ApiError(format!(
                "Yahoo search error: {}",
                response.status()
            )));
        }

        let body: Value = response.json().await?;
        let items: Vec<RawNewsItem> = body
            .get(key)
            .and_then(Value::as_array)
            .map(|items| items.iter().map(RawNewsItem::from_value).collect())
            .unwrap_or_default();

        debug!("Yahoo search returned {} {} items", items.len(), key);
        Ok(items)
    }
}

impl Default for YahooFinanceClient {
    fn default() -> Self {
        Self::new(60)
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    #[instrument(skip(self, period), fields(period = %period))]
    async fn history(&self, symbol: &str, period: Period) -> Result<Vec<PricePoint>> {
        let provider = Self::connector()?;

        let response = provider
            .get_quote_range(symbol, "1d", period.as_str())
            .await
            .map_err(|e| FinanceError::YahooFinanceError(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| FinanceError::YahooFinanceError(e.to_string()))?;

        let mut history: Vec<PricePoint> = quotes
            .iter()
            .filter_map(|q| {
                let date = DateTime::<Utc>::from_timestamp(q.timestamp as i64, 0)?;
                Some(PricePoint {
                    date,
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    volume: q.volume,
                })
            })
            .collect();
        history.sort_by_key(|p| p.date);

        debug!("Fetched {} bars for {}", history.len(), symbol);
        Ok(history)
    }

    #[instrument(skip(self))]
    async fn info(&self, symbol: &str) -> Result<CompanyInfo> {
        #[allow(unused_mut)]
        let mut provider = Self::connector()?;

        let summary = provider
            .get_ticker_info(symbol)
            .await
            .map_err(|e| FinanceError::YahooFinanceError(e.to_string()))?;

        let result = summary
            .quote_summary
            .and_then(|qs| qs.result)
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| FinanceError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "empty quote summary".to_string(),
            })?;

        let detail = result.summary_detail.as_ref();
        let name = result
            .quote_type
            .as_ref()
            .and_then(|qt| qt.long_name.clone().or_else(|| qt.short_name.clone()));

        Ok(CompanyInfo {
            name,
            market_cap: detail.and_then(|d| d.market_cap).map(|v| v as f64),
            trailing_pe: detail.and_then(|d| d.trailing_pe),
            fifty_two_week_high: detail.and_then(|d| d.fifty_two_week_high),
            fifty_two_week_low: detail.and_then(|d| d.fifty_two_week_low),
        })
    }
}

#[async_trait]
impl NewsProvider for YahooFinanceClient {
    #[instrument(skip(self))]
    async fn search_news(&self, term: &str, count: usize) -> Result<Vec<RawNewsItem>> {
        let params = [
            ("q", term.to_string()),
            ("newsCount", count.to_string()),
            ("quotesCount", "0".to_string()),
        ];
        self.search(&params, "news").await
    }

    #[instrument(skip(self))]
    async fn search_research(&self, term: &str) -> Result<Vec<RawNewsItem>> {
        let params = [
            ("q", term.to_string()),
            ("quotesCount", "0".to_string()),
            ("newsCount", "0".to_string()),
            ("enableResearchReports", "true".to_string()),
        ];
        self.search(&params, "researchReports").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_history() {
        let client = YahooFinanceClient::default();
        let history = client.history("AAPL", Period::OneMonth).await.unwrap();
        assert!(!history.is_empty());
        assert!(history.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_info() {
        let client = YahooFinanceClient::default();
        let info = client.info("MSFT").await.unwrap();
        assert!(info.market_cap.is_some());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_search_news() {
        let client = YahooFinanceClient::default();
        let items = client.search_news("AAPL", 5).await.unwrap();
        assert!(items.iter().all(|i| i.href().is_some() || i.title.is_some()));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_unknown_symbol_fails() {
        let client = YahooFinanceClient::default();
        assert!(client.history("NOT_A_REAL_SYMBOL_123", Period::OneMonth).await.is_err());
    }
}
