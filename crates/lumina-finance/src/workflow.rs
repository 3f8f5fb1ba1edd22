//! Per-query pipeline
//!
//! A run resolves symbols, fetches the first symbol's news, fetches market
//! data, draws the chart and generates the analysis, in that order. News for
//! the remaining symbols arrives through a background task attached to the
//! session. Progress is published as [`WorkflowEvent`]s.

use crate::analysis::AnalysisGenerator;
use crate::api::{MarketDataProvider, NewsProvider, YahooFinanceClient};
use crate::chart;
use crate::config::FinanceConfig;
use crate::error::Result;
use crate::market::MarketDataFetcher;
use crate::models::{ChartKind, Period};
use crate::news::{self, NewsFetcher};
use crate::resolver::SymbolResolver;
use crate::session::{ChatRole, Session};
use lumina_llm::LLMProvider;
use lumina_llm::providers::OpenAIProvider;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, instrument, warn};

/// Pipeline position of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    SymbolsResolving,
    DataFetching,
    ChartBuilding,
    Analyzing,
    Done,
}

impl Stage {
    /// Completion percentage shown for this stage
    pub fn progress(&self) -> u8 {
        match self {
            Stage::Idle => 0,
            Stage::SymbolsResolving => 10,
            Stage::DataFetching => 20,
            Stage::ChartBuilding => 40,
            Stage::Analyzing => 60,
            Stage::Done => 100,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Stage::Idle => "Waiting for a query",
            Stage::SymbolsResolving => "Extracting symbols from your query",
            Stage::DataFetching => "Fetching financial data",
            Stage::ChartBuilding => "Creating comparison visualization",
            Stage::Analyzing => "Generating AI analysis",
            Stage::Done => "Workflow completed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Progress notification published during a run
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    Stage(Stage),
    /// User-visible, non-fatal condition
    Warning(String),
    /// The session news feed changed and now holds `count` items
    NewsUpdated { count: usize },
    /// A chart was built; `rasterized` tells whether a PNG exists
    ChartReady { rasterized: bool },
    AnalysisChunk(String),
    Completed,
}

/// Sequences the pipeline components for one query at a time
pub struct FinanceWorkflow {
    resolver: SymbolResolver,
    market: MarketDataFetcher,
    news: Arc<NewsFetcher>,
    analysis: AnalysisGenerator,
}

impl FinanceWorkflow {
    pub fn new(
        resolver: SymbolResolver,
        market: MarketDataFetcher,
        news: Arc<NewsFetcher>,
        analysis: AnalysisGenerator,
    ) -> Self {
        Self {
            resolver,
            market,
            news,
            analysis,
        }
    }

    /// Assemble the pipeline over the given providers
    pub fn with_providers(
        llm: Arc<dyn LLMProvider>,
        market: Arc<dyn MarketDataProvider>,
        news: Arc<dyn NewsProvider>,
        config: &FinanceConfig,
    ) -> Result<Self> {
        Ok(Self::new(
            SymbolResolver::new(llm.clone(), config)?,
            MarketDataFetcher::new(market),
            Arc::new(NewsFetcher::new(news, config.news_count)?),
            AnalysisGenerator::new(llm, config),
        ))
    }

    /// Production pipeline: Together AI for the model, Yahoo for data and news
    pub fn from_config(config: &FinanceConfig) -> Result<Self> {
        config.validate()?;
        let llm = Arc::new(OpenAIProvider::with_config(config.llm_config())?);
        let yahoo = Arc::new(YahooFinanceClient::new(config.news_rate_limit_per_minute));
        Self::with_providers(llm, yahoo.clone(), yahoo, config)
    }

    /// Run the whole pipeline for `query`
    ///
    /// The session is reset first. A query without symbols leaves the session
    /// idle and returns the resolve error before any provider call; every
    /// other failure degrades in place. Returns the analysis text.
    #[instrument(skip(self, session, events), fields(session = %session.id()))]
    pub async fn run(
        &self,
        session: &mut Session,
        query: &str,
        period: Period,
        kind: ChartKind,
        events: &UnboundedSender<WorkflowEvent>,
    ) -> Result<String> {
        session.reset();
        session.push_message(ChatRole::User, query);

        advance(session, Stage::SymbolsResolving, events);
        let resolution = match self.resolver.resolve(query).await {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!("Symbol resolution failed: {}", e);
                advance(session, Stage::Idle, events);
                return Err(e.into());
            }
        };
        if let Some(warning) = &resolution.warning {
            emit(events, WorkflowEvent::Warning(warning.to_string()));
        }
        let symbols = resolution.symbols;
        session.data_mut().symbols = symbols.clone();

        self.start_news(session, &symbols, events).await;

        advance(session, Stage::DataFetching, events);
        let snapshot = self.market.fetch(&symbols, period).await;

        advance(session, Stage::ChartBuilding, events);
        if snapshot.iter().any(|(_, record)| record.is_available()) {
            let artifact = chart::build(&snapshot, kind);
            let png = chart::rasterize(&artifact);
            emit(
                events,
                WorkflowEvent::ChartReady {
                    rasterized: !png.is_empty(),
                },
            );
            let data = session.data_mut();
            data.chart = Some(artifact);
            data.chart_png = png;
        } else {
            warn!("No market data available, skipping chart");
        }

        advance(session, Stage::Analyzing, events);
        let chart_png = Some(session.data().chart_png.as_slice()).filter(|png| !png.is_empty());
        let analysis = self
            .analysis
            .analyze(&snapshot, query, chart_png, |chunk| {
                emit(events, WorkflowEvent::AnalysisChunk(chunk.to_string()));
            })
            .await;

        let data = session.data_mut();
        data.snapshot = Some(snapshot);
        data.analysis = Some(analysis.clone());
        session.push_message(ChatRole::Assistant, analysis.clone());

        advance(session, Stage::Done, events);
        emit(events, WorkflowEvent::Completed);
        Ok(analysis)
    }

    /// Fetch the first symbol's news now and queue the rest in the background
    async fn start_news(
        &self,
        session: &mut Session,
        symbols: &[String],
        events: &UnboundedSender<WorkflowEvent>,
    ) {
        let Some((first, rest)) = symbols.split_first() else {
            return;
        };

        let feed = session.data().news.clone();
        feed.extend(self.news.fetch_news(first).await);
        emit(events, WorkflowEvent::NewsUpdated { count: feed.len() });

        if rest.is_empty() {
            return;
        }

        let sender = events.clone();
        let handle = news::spawn_remaining(self.news.clone(), feed, rest.to_vec(), move |count| {
            emit(&sender, WorkflowEvent::NewsUpdated { count });
        });
        session.attach_news_task(handle);
    }
}

fn advance(session: &mut Session, stage: Stage, events: &UnboundedSender<WorkflowEvent>) {
    info!("Stage {:?} ({}%)", stage, stage.progress());
    session.set_stage(stage);
    emit(events, WorkflowEvent::Stage(stage));
}

// A closed receiver only means nobody is watching progress
fn emit(events: &UnboundedSender<WorkflowEvent>, event: WorkflowEvent) {
    let _ = events.send(event);
}
