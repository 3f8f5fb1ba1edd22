//! Financial comparison workflow for LuminaFi
//!
//! This crate turns a free-text question such as "Compare AAPL vs MSFT" into
//! a narrative analysis. It includes:
//!
//! - Symbol resolution through a model call with a pattern fallback
//! - Historical prices and company metadata from Yahoo Finance
//! - News and research search, deduplicated by URL
//! - Line and candlestick comparison charts rasterized to PNG
//! - Vision or text-only analysis with markup repair
//! - Per-session state and progress events for a front-end
//!
//! # Architecture
//!
//! [`FinanceWorkflow`] sequences the components for one query:
//! - `SymbolResolver`: query to ticker symbols
//! - `MarketDataFetcher`: per-symbol history and company info
//! - `NewsFetcher`: first symbol in-line, the rest in a background task
//! - `chart`: figure construction and rasterization
//! - `AnalysisGenerator`: prompt rendering and the model call
//!
//! Providers sit behind the [`MarketDataProvider`], [`NewsProvider`] and
//! [`lumina_llm::LLMProvider`] traits.
//!
//! # Example
//!
//! ```rust,ignore
//! use lumina_finance::{ChartKind, FinanceConfig, FinanceWorkflow, Period, Session};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = FinanceConfig::from_env()?;
//!     let workflow = FinanceWorkflow::from_config(&config)?;
//!
//!     let mut session = Session::new();
//!     let (events, _rx) = mpsc::unbounded_channel();
//!     let analysis = workflow
//!         .run(&mut session, "Compare AAPL vs MSFT", Period::OneYear, ChartKind::Line, &events)
//!         .await?;
//!     println!("{}", analysis);
//!
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod api;
pub mod chart;
pub mod config;
pub mod error;
pub mod market;
pub mod models;
pub mod news;
pub mod prompts;
pub mod report;
pub mod resolver;
pub mod sanitize;
pub mod session;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use analysis::AnalysisGenerator;
pub use api::{MarketDataProvider, NewsProvider, RawNewsItem, YahooFinanceClient};
pub use chart::{ChartArtifact, ChartTrace};
pub use config::{FinanceConfig, FinanceConfigBuilder};
pub use error::{FinanceError, ResolveError, Result};
pub use market::MarketDataFetcher;
pub use models::{
    ChartKind, CompanyInfo, MarketSnapshot, NewsItem, Period, PricePoint, PublishedAt,
    SymbolRecord,
};
pub use news::{NewsFeed, NewsFetcher};
pub use resolver::{Resolution, ResolveWarning, SymbolResolver};
pub use sanitize::sanitize;
pub use session::{ChatMessage, ChatRole, Session, WorkflowData};
pub use workflow::{FinanceWorkflow, Stage, WorkflowEvent};
