//! Ticker symbol resolution
//!
//! The model is asked for a JSON array first. An empty or unusable answer
//! falls back to a pattern match over the uppercased query.

use crate::config::FinanceConfig;
use crate::error::{ResolveError, Result};
use crate::prompts::{SYSTEM_SYMBOL_EXTRACTOR, symbol_extraction_prompt};
use lumina_llm::{CompletionRequest, LLMProvider, Message};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const MAX_SYMBOL_LEN: usize = 6;

/// Words the fallback pattern would otherwise mistake for tickers
const STOPWORDS: [&str; 11] = [
    "THE", "AND", "OR", "FOR", "WITH", "VS", "VERSUS", "COMPARE", "ANALYZE", "STOCK", "STOCKS",
];

/// Non-fatal condition noticed while resolving
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveWarning {
    TooManySymbols { found: usize, limit: usize },
}

impl fmt::Display for ResolveWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveWarning::TooManySymbols { found, limit } => write!(
                f,
                "Too many symbols ({found}). Limiting to first {limit} symbols."
            ),
        }
    }
}

/// Resolved symbols in query order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub symbols: Vec<String>,
    pub warning: Option<ResolveWarning>,
}

/// Turns free text into an ordered, deduplicated list of tickers
pub struct SymbolResolver {
    llm: Arc<dyn LLMProvider>,
    model: String,
    max_tokens: usize,
    max_symbols: usize,
    strip_pattern: Regex,
    token_pattern: Regex,
}

impl SymbolResolver {
    pub fn new(llm: Arc<dyn LLMProvider>, config: &FinanceConfig) -> Result<Self> {
        Ok(Self {
            llm,
            model: config.extraction_model.clone(),
            max_tokens: config.extraction_max_tokens,
            max_symbols: config.max_symbols,
            strip_pattern: Regex::new(r"[^A-Z0-9\s]")?,
            token_pattern: Regex::new(r"\b[A-Z0-9]{1,5}\b")?,
        })
    }

    /// Resolve `query` to at most `max_symbols` tickers
    ///
    /// Both an empty model answer and a failed extraction use the pattern
    /// fallback. Fails only when neither path yields a symbol.
    #[instrument(skip(self))]
    pub async fn resolve(&self, query: &str) -> std::result::Result<Resolution, ResolveError> {
        let mut symbols = match self.extract_with_llm(query).await {
            Ok(symbols) if !symbols.is_empty() => symbols,
            Ok(_) => {
                debug!("Model returned no symbols, using pattern fallback");
                self.extract_with_pattern(query)
            }
            Err(e) => {
                warn!("LLM symbol extraction failed, falling back to pattern match: {}", e);
                self.extract_with_pattern(query)
            }
        };

        if symbols.is_empty() {
            return Err(ResolveError::NoSymbolsFound);
        }

        let warning = (symbols.len() > self.max_symbols).then(|| {
            let found = symbols.len();
            symbols.truncate(self.max_symbols);
            ResolveWarning::TooManySymbols {
                found,
                limit: self.max_symbols,
            }
        });
        if let Some(w) = &warning {
            warn!("{}", w);
        }

        info!("Resolved symbols: {:?}", symbols);
        Ok(Resolution { symbols, warning })
    }

    /// Ask the model for a JSON array of tickers
    ///
    /// `Ok` may hold an empty list. Transport errors and replies without a
    /// parseable array are `ExtractionFailed`.
    pub async fn extract_with_llm(
        &self,
        query: &str,
    ) -> std::result::Result<Vec<String>, ResolveError> {
        let prompt = symbol_extraction_prompt(query)
            .map_err(|e| ResolveError::ExtractionFailed(e.to_string()))?;

        let request = CompletionRequest::builder(&self.model)
            .system(SYSTEM_SYMBOL_EXTRACTOR)
            .add_message(Message::user(prompt))
            .max_tokens(self.max_tokens)
            .temperature(0.0)
            .build();

        let response = self
            .llm
            .complete(request)
            .await
            .map_err(|e| ResolveError::ExtractionFailed(e.to_string()))?;

        parse_symbol_array(response.message.text().unwrap_or_default())
    }

    /// Pattern fallback over the uppercased query with stopwords removed
    pub fn extract_with_pattern(&self, query: &str) -> Vec<String> {
        let upper = query.to_uppercase();
        let cleaned = self.strip_pattern.replace_all(&upper, "");

        let mut seen = HashSet::new();
        self.token_pattern
            .find_iter(&cleaned)
            .map(|m| m.as_str())
            .filter(|token| !STOPWORDS.contains(token))
            .filter(|token| seen.insert(*token))
            .map(str::to_string)
            .collect()
    }
}

/// Parse the span between the first `[` and the last `]` as a symbol list
///
/// Entries that are not short alphanumeric strings are dropped; the rest are
/// uppercased and deduplicated in order.
pub fn parse_symbol_array(text: &str) -> std::result::Result<Vec<String>, ResolveError> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Err(ResolveError::ExtractionFailed(
            "no JSON array in model reply".to_string(),
        ));
    };
    if end < start {
        return Err(ResolveError::ExtractionFailed(
            "no JSON array in model reply".to_string(),
        ));
    }

    let values: Vec<Value> = serde_json::from_str(&text[start..=end])
        .map_err(|e| ResolveError::ExtractionFailed(format!("failed to parse symbols JSON: {e}")))?;

    let mut seen = HashSet::new();
    Ok(values
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| (1..=MAX_SYMBOL_LEN).contains(&s.len()))
        .filter(|s| s.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_uppercase)
        .filter(|s| seen.insert(s.clone()))
        .collect())
}
