//! Provider seams for market data and news search
//!
//! The workflow depends only on the two traits below; [`YahooFinanceClient`]
//! implements both against Yahoo Finance.

pub mod yahoo;

pub use yahoo::YahooFinanceClient;

use crate::error::Result;
use crate::models::{CompanyInfo, Period, PricePoint, PublishedAt};
use async_trait::async_trait;
use serde_json::Value;

/// Source of historical prices and descriptive company metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars for `period`, ordered by date
    async fn history(&self, symbol: &str, period: Period) -> Result<Vec<PricePoint>>;

    /// Company metadata; missing fields stay `None`
    async fn info(&self, symbol: &str) -> Result<CompanyInfo>;
}

/// Source of news headlines and research notes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Up to `count` recent news items mentioning `term`
    async fn search_news(&self, term: &str, count: usize) -> Result<Vec<RawNewsItem>>;

    /// Research reports mentioning `term`
    async fn search_research(&self, term: &str) -> Result<Vec<RawNewsItem>>;
}

/// A search hit with every field the provider may omit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawNewsItem {
    pub title: Option<String>,
    pub publisher: Option<String>,
    pub summary: Option<String>,
    pub link: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<PublishedAt>,
}

impl RawNewsItem {
    /// Pick the known fields out of one loosely typed search result
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let published_at = ["providerPublishTime", "published_at"]
            .iter()
            .filter_map(|key| value.get(*key))
            .find_map(|v| match v {
                Value::Number(n) => n.as_i64().filter(|secs| *secs != 0).map(PublishedAt::Epoch),
                Value::String(s) if !s.trim().is_empty() => Some(PublishedAt::Text(s.clone())),
                _ => None,
            });

        Self {
            title: text("title").or_else(|| text("reportHeadline")),
            publisher: text("publisher"),
            summary: text("summary"),
            link: text("link"),
            url: text("url"),
            published_at,
        }
    }

    /// `link` if present, otherwise `url`
    pub fn href(&self) -> Option<&str> {
        self.link.as_deref().or(self.url.as_deref())
    }
}
