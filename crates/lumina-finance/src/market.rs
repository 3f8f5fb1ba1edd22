//! Per-symbol market data fetching

use crate::api::MarketDataProvider;
use crate::models::{CompanyInfo, MarketSnapshot, Period, SymbolRecord};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Fetches history and company info for each symbol in turn
///
/// A failed history fetch marks that symbol unavailable. A failed info
/// fetch keeps the record available with empty metadata.
#[derive(Clone)]
pub struct MarketDataFetcher {
    provider: Arc<dyn MarketDataProvider>,
}

impl MarketDataFetcher {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    #[instrument(skip(self, period), fields(period = %period))]
    pub async fn fetch(&self, symbols: &[String], period: Period) -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::new();

        for symbol in symbols {
            let record = self.fetch_symbol(symbol, period).await;
            snapshot.push(symbol.clone(), record);
        }

        let available = snapshot.iter().filter(|(_, r)| r.is_available()).count();
        info!("Fetched market data: {}/{} symbols available", available, snapshot.len());
        snapshot
    }

    async fn fetch_symbol(&self, symbol: &str, period: Period) -> SymbolRecord {
        let history = match self.provider.history(symbol, period).await {
            Ok(history) => history,
            Err(e) => {
                warn!("Error fetching data for {}: {}", symbol, e);
                return SymbolRecord::unavailable(e.to_string());
            }
        };

        let info = self.provider.info(symbol).await.unwrap_or_else(|e| {
            warn!("Company info unavailable for {}: {}", symbol, e);
            CompanyInfo::default()
        });

        SymbolRecord::available(history, info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockMarketDataProvider;
    use crate::error::FinanceError;
    use crate::models::PricePoint;
    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;

    fn bars(closes: &[f64]) -> Vec<PricePoint> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: Utc.with_ymd_and_hms(2024, 1, 1 + i as u32, 0, 0, 0).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_history_failure_is_isolated() {
        let mut mock = MockMarketDataProvider::new();
        mock.expect_history()
            .with(eq("AAPL"), eq(Period::OneYear))
            .returning(|_, _| Ok(bars(&[100.0, 110.0])));
        mock.expect_history()
            .with(eq("BAD"), eq(Period::OneYear))
            .returning(|_, _| Err(FinanceError::YahooFinanceError("no data".to_string())));
        mock.expect_info()
            .with(eq("AAPL"))
            .times(1)
            .returning(|_| {
                Ok(CompanyInfo {
                    market_cap: Some(3.0e12),
                    ..CompanyInfo::default()
                })
            });

        let fetcher = MarketDataFetcher::new(Arc::new(mock));
        let symbols = vec!["AAPL".to_string(), "BAD".to_string()];
        let snapshot = fetcher.fetch(&symbols, Period::OneYear).await;

        assert_eq!(snapshot.symbols(), vec!["AAPL", "BAD"]);
        match snapshot.get("AAPL").unwrap() {
            SymbolRecord::Available {
                current_price,
                price_change,
                price_change_pct,
                info,
                ..
            } => {
                assert_eq!(*current_price, Some(110.0));
                assert_eq!(*price_change, Some(10.0));
                assert!((price_change_pct.unwrap() - 10.0).abs() < 1e-9);
                assert_eq!(info.market_cap, Some(3.0e12));
            }
            other => panic!("Expected Available, got {other:?}"),
        }
        assert!(!snapshot.get("BAD").unwrap().is_available());
    }

    #[tokio::test]
    async fn test_info_failure_degrades() {
        let mut mock = MockMarketDataProvider::new();
        mock.expect_history().returning(|_, _| Ok(bars(&[50.0])));
        mock.expect_info()
            .returning(|_| Err(FinanceError::ApiError("401".to_string())));

        let fetcher = MarketDataFetcher::new(Arc::new(mock));
        let snapshot = fetcher.fetch(&["TSLA".to_string()], Period::OneMonth).await;

        match snapshot.get("TSLA").unwrap() {
            SymbolRecord::Available {
                info,
                current_price,
                price_change,
                ..
            } => {
                assert_eq!(*info, CompanyInfo::default());
                assert_eq!(*current_price, Some(50.0));
                assert_eq!(*price_change, None);
            }
            other => panic!("Expected Available, got {other:?}"),
        }
    }
}
