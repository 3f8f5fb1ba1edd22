//! Domain types shared by the fetchers, chart builder and analysis generator

use crate::error::FinanceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Look-back window for historical prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
}

impl Period {
    /// All selectable periods, shortest first
    pub const ALL: [Period; 6] = [
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
    ];

    /// Range string understood by the market data provider
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Period::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                FinanceError::InvalidArgument(format!(
                    "unknown period '{s}', expected one of 1mo, 3mo, 6mo, 1y, 2y, 5y"
                ))
            })
    }
}

/// Chart rendering style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Line,
    Candlestick,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Candlestick => "candlestick",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "line" => Ok(ChartKind::Line),
            "candlestick" | "candle" => Ok(ChartKind::Candlestick),
            other => Err(FinanceError::InvalidArgument(format!(
                "unknown chart kind '{other}', expected line or candlestick"
            ))),
        }
    }
}

/// One daily bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Descriptive company metadata, every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub name: Option<String>,
    pub market_cap: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
}

/// Outcome of fetching one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolRecord {
    /// The history fetch failed; nothing else is known
    Unavailable { reason: String },
    /// History (possibly empty) and derived metrics
    Available {
        history: Vec<PricePoint>,
        info: CompanyInfo,
        current_price: Option<f64>,
        price_change: Option<f64>,
        price_change_pct: Option<f64>,
    },
}

impl SymbolRecord {
    /// Build an `Available` record, deriving price metrics from the history
    ///
    /// `current_price` is the last close. The change fields need at least two
    /// points and a non-zero first close.
    pub fn available(history: Vec<PricePoint>, info: CompanyInfo) -> Self {
        let current_price = history.last().map(|p| p.close);
        let (price_change, price_change_pct) = match (history.first(), current_price) {
            (Some(first), Some(last)) if history.len() >= 2 && first.close != 0.0 => {
                let change = last - first.close;
                (Some(change), Some(change / first.close * 100.0))
            }
            _ => (None, None),
        };

        SymbolRecord::Available {
            history,
            info,
            current_price,
            price_change,
            price_change_pct,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        SymbolRecord::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SymbolRecord::Available { .. })
    }

    /// Price history, empty for unavailable records
    pub fn history(&self) -> &[PricePoint] {
        match self {
            SymbolRecord::Available { history, .. } => history,
            SymbolRecord::Unavailable { .. } => &[],
        }
    }

    pub fn current_price(&self) -> Option<f64> {
        match self {
            SymbolRecord::Available { current_price, .. } => *current_price,
            SymbolRecord::Unavailable { .. } => None,
        }
    }
}

/// Per-symbol fetch results in the order the symbols were requested
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    entries: Vec<(String, SymbolRecord)>,
}

impl MarketSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, symbol: impl Into<String>, record: SymbolRecord) {
        self.entries.push((symbol.into(), record));
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolRecord> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, r)| r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SymbolRecord)> {
        self.entries.iter().map(|(s, r)| (s.as_str(), r))
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.entries.iter().map(|(s, _)| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, SymbolRecord)> for MarketSnapshot {
    fn from_iter<T: IntoIterator<Item = (String, SymbolRecord)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Publication time as delivered by the news provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublishedAt {
    /// Seconds since the Unix epoch
    Epoch(i64),
    /// Free-form text, usually ISO-8601
    Text(String),
}

impl fmt::Display for PublishedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishedAt::Epoch(secs) => write!(f, "{secs}"),
            PublishedAt::Text(text) => f.write_str(text),
        }
    }
}

/// A news headline or research note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub description: String,
    pub url: String,
    pub published_at: PublishedAt,
}

impl NewsItem {
    /// The "no news found" marker carries no link
    pub fn is_placeholder(&self) -> bool {
        self.url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: i64, close: f64) -> PricePoint {
        PricePoint {
            date: DateTime::from_timestamp(1_700_000_000 + day * 86_400, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn test_period_parse_and_display() {
        assert_eq!("1y".parse::<Period>().unwrap(), Period::OneYear);
        assert_eq!(" 6MO ".parse::<Period>().unwrap(), Period::SixMonths);
        assert_eq!(Period::FiveYears.to_string(), "5y");
        assert_eq!(Period::default(), Period::OneYear);
        assert!("10y".parse::<Period>().is_err());
    }

    #[test]
    fn test_chart_kind_parse() {
        assert_eq!("line".parse::<ChartKind>().unwrap(), ChartKind::Line);
        assert_eq!(
            "Candlestick".parse::<ChartKind>().unwrap(),
            ChartKind::Candlestick
        );
        assert!("bar".parse::<ChartKind>().is_err());
    }

    #[test]
    fn test_price_change_two_points() {
        let record =
            SymbolRecord::available(vec![bar(0, 100.0), bar(1, 110.0)], CompanyInfo::default());
        match record {
            SymbolRecord::Available {
                current_price,
                price_change,
                price_change_pct,
                ..
            } => {
                assert_eq!(current_price, Some(110.0));
                assert_eq!(price_change, Some(10.0));
                assert_eq!(format!("{:.2}", price_change_pct.unwrap()), "10.00");
            }
            SymbolRecord::Unavailable { .. } => panic!("expected available"),
        }
    }

    #[test]
    fn test_price_change_single_point_is_undefined() {
        let record = SymbolRecord::available(vec![bar(0, 42.0)], CompanyInfo::default());
        assert_eq!(record.current_price(), Some(42.0));
        match record {
            SymbolRecord::Available {
                price_change,
                price_change_pct,
                ..
            } => {
                assert!(price_change.is_none());
                assert!(price_change_pct.is_none());
            }
            SymbolRecord::Unavailable { .. } => panic!("expected available"),
        }
    }

    #[test]
    fn test_empty_history_has_no_price() {
        let record = SymbolRecord::available(Vec::new(), CompanyInfo::default());
        assert!(record.is_available());
        assert!(record.current_price().is_none());
        assert!(record.history().is_empty());
    }

    #[test]
    fn test_zero_first_close_leaves_change_undefined() {
        let record =
            SymbolRecord::available(vec![bar(0, 0.0), bar(1, 5.0)], CompanyInfo::default());
        match record {
            SymbolRecord::Available { price_change, .. } => assert!(price_change.is_none()),
            SymbolRecord::Unavailable { .. } => panic!("expected available"),
        }
    }

    #[test]
    fn test_snapshot_preserves_order() {
        let mut snapshot = MarketSnapshot::new();
        snapshot.push("TSLA", SymbolRecord::unavailable("boom"));
        snapshot.push("AAPL", SymbolRecord::available(vec![bar(0, 1.0)], CompanyInfo::default()));
        assert_eq!(snapshot.symbols(), vec!["TSLA", "AAPL"]);
        assert!(!snapshot.get("TSLA").unwrap().is_available());
        assert!(snapshot.get("MSFT").is_none());
    }

    #[test]
    fn test_published_at_untagged() {
        let epoch: PublishedAt = serde_json::from_str("1700000000").unwrap();
        assert_eq!(epoch, PublishedAt::Epoch(1_700_000_000));
        let text: PublishedAt = serde_json::from_str("\"2024-01-02T03:04:05\"").unwrap();
        assert_eq!(text, PublishedAt::Text("2024-01-02T03:04:05".to_string()));
    }
}
