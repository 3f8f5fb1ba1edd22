//! Display formatting for summaries, market caps and news

use crate::models::{MarketSnapshot, NewsItem, SymbolRecord};
use crate::news::format_published;
use serde::Serialize;

/// Headlines shown in the ticker and the article list
pub const NEWS_PREVIEW_LEN: usize = 5;

const NOT_AVAILABLE: &str = "N/A";
const NO_DATA: &str = "No Data";

/// Format a market capitalization with a T/B/M suffix
///
/// Values under one million are written out with thousands separators.
pub fn format_market_cap(value: f64) -> String {
    if value >= 1e12 {
        format!("${:.2}T", value / 1e12)
    } else if value >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else {
        format!("${}", group_thousands(value.round() as i64))
    }
}

/// Format a price as `$x.xx`
pub fn format_money(value: f64) -> String {
    format!("${value:.2}")
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

/// One row of the data summary table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub symbol: String,
    pub current_price: String,
    pub change: String,
    pub change_pct: String,
    pub market_cap: String,
}

impl SummaryRow {
    /// Build the row for one snapshot entry
    pub fn from_record(symbol: &str, record: &SymbolRecord) -> Self {
        let filled = |value: &str| Self {
            symbol: symbol.to_string(),
            current_price: value.to_string(),
            change: value.to_string(),
            change_pct: value.to_string(),
            market_cap: value.to_string(),
        };

        match record {
            SymbolRecord::Unavailable { .. } => filled(NO_DATA),
            SymbolRecord::Available {
                current_price: None,
                ..
            } => filled(NOT_AVAILABLE),
            SymbolRecord::Available {
                info,
                current_price: Some(price),
                price_change,
                price_change_pct,
                ..
            } => Self {
                symbol: symbol.to_string(),
                current_price: format_money(*price),
                change: price_change.map_or_else(|| NOT_AVAILABLE.to_string(), format_money),
                change_pct: price_change_pct
                    .map_or_else(|| NOT_AVAILABLE.to_string(), |p| format!("{p:.2}%")),
                market_cap: info
                    .market_cap
                    .map_or_else(|| NOT_AVAILABLE.to_string(), format_market_cap),
            },
        }
    }
}

/// Summary rows in snapshot order
pub fn summary_rows(snapshot: &MarketSnapshot) -> Vec<SummaryRow> {
    snapshot
        .iter()
        .map(|(symbol, record)| SummaryRow::from_record(symbol, record))
        .collect()
}

/// First headlines joined for a scrolling ticker
pub fn news_ticker(news: &[NewsItem]) -> String {
    news.iter()
        .take(NEWS_PREVIEW_LEN)
        .map(|n| n.title.as_str())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// An expanded article entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleDetail {
    pub index: usize,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub published: String,
}

/// Details for the first articles, numbered from 1
pub fn article_details(news: &[NewsItem]) -> Vec<ArticleDetail> {
    news.iter()
        .take(NEWS_PREVIEW_LEN)
        .enumerate()
        .map(|(i, item)| ArticleDetail {
            index: i + 1,
            title: item.title.clone(),
            description: Some(item.description.clone()).filter(|d| !d.is_empty()),
            url: Some(item.url.clone()).filter(|u| !u.is_empty()),
            published: format_published(&item.published_at),
        })
        .collect()
}
