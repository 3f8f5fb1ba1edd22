//! Narrative analysis generation
//!
//! With a chart image the vision model is streamed; without one the text
//! model is called once. Output is always sanitized, and the fixed fallback
//! narrative replaces any failure that leaves no text.

use crate::config::FinanceConfig;
use crate::error::Result;
use crate::models::{MarketSnapshot, SymbolRecord};
use crate::prompts::{
    BlockStatus, FALLBACK_ANALYSIS, SYSTEM_FINANCIAL_ANALYST, SymbolBlock, analysis_prompt,
    vision_prompt,
};
use crate::report::{format_market_cap, format_money};
use crate::sanitize::sanitize;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::StreamExt;
use lumina_llm::{CompletionRequest, LLMProvider, Message, StopReason};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const NOT_AVAILABLE: &str = "N/A";
const PNG_MEDIA_TYPE: &str = "image/png";

/// Builds analysis prompts and calls the model
pub struct AnalysisGenerator {
    llm: Arc<dyn LLMProvider>,
    vision_model: String,
    text_model: String,
    vision_max_tokens: usize,
    text_max_tokens: usize,
    temperature: f32,
}

impl AnalysisGenerator {
    pub fn new(llm: Arc<dyn LLMProvider>, config: &FinanceConfig) -> Self {
        Self {
            llm,
            vision_model: config.vision_model.clone(),
            text_model: config.text_model.clone(),
            vision_max_tokens: config.vision_max_tokens,
            text_max_tokens: config.text_max_tokens,
            temperature: config.analysis_temperature,
        }
    }

    /// Render the text prompt for `query` over `snapshot`
    pub fn build_prompt(&self, snapshot: &MarketSnapshot, query: &str) -> Result<String> {
        analysis_prompt(query, &symbol_blocks(snapshot))
    }

    /// Produce the sanitized analysis narrative
    ///
    /// `on_chunk` sees every streamed increment on the vision path. It is not
    /// called for the text path or the fallback.
    #[instrument(
        skip(self, snapshot, chart_png, on_chunk),
        fields(symbols = snapshot.len(), vision = chart_png.is_some())
    )]
    pub async fn analyze<F>(
        &self,
        snapshot: &MarketSnapshot,
        query: &str,
        chart_png: Option<&[u8]>,
        on_chunk: F,
    ) -> String
    where
        F: FnMut(&str) + Send,
    {
        let prompt = match self.build_prompt(snapshot, query) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Failed to render analysis prompt: {}", e);
                return sanitize(FALLBACK_ANALYSIS);
            }
        };

        let text = match chart_png.filter(|png| !png.is_empty()) {
            Some(png) => self.analyze_with_vision(&prompt, png, on_chunk).await,
            None => self.analyze_text_only(&prompt).await,
        };

        if text.trim().is_empty() {
            warn!("Model returned no analysis, using fallback narrative");
            return sanitize(FALLBACK_ANALYSIS);
        }

        sanitize(&text)
    }

    async fn analyze_with_vision<F>(&self, prompt: &str, png: &[u8], mut on_chunk: F) -> String
    where
        F: FnMut(&str) + Send,
    {
        let request = CompletionRequest::builder(&self.vision_model)
            .system(SYSTEM_FINANCIAL_ANALYST)
            .add_message(Message::user_with_image(
                vision_prompt(prompt),
                PNG_MEDIA_TYPE,
                BASE64.encode(png),
            ))
            .max_tokens(self.vision_max_tokens)
            .temperature(self.temperature)
            .build();

        let mut stream = match self.llm.complete_stream(request).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Vision analysis request failed: {}", e);
                return String::new();
            }
        };

        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(delta) => {
                    on_chunk(&delta);
                    text.push_str(&delta);
                }
                Err(e) => {
                    warn!("Analysis stream interrupted after {} bytes: {}", text.len(), e);
                    break;
                }
            }
        }

        info!("Vision analysis produced {} bytes", text.len());
        text
    }

    async fn analyze_text_only(&self, prompt: &str) -> String {
        let request = CompletionRequest::builder(&self.text_model)
            .system(SYSTEM_FINANCIAL_ANALYST)
            .add_message(Message::user(prompt))
            .max_tokens(self.text_max_tokens)
            .temperature(self.temperature)
            .build();

        match self.llm.complete(request).await {
            Ok(response) => {
                if response.stop_reason == StopReason::MaxTokens {
                    warn!("Text analysis stopped at the {} token limit", self.text_max_tokens);
                }
                let text = response.message.text().unwrap_or_default().to_string();
                debug!(
                    "Text analysis produced {} bytes using {} tokens",
                    text.len(),
                    response.usage.total()
                );
                text
            }
            Err(e) => {
                warn!("Text analysis request failed: {}", e);
                String::new()
            }
        }
    }
}

/// Pre-format each snapshot entry for the analysis template
pub fn symbol_blocks(snapshot: &MarketSnapshot) -> Vec<SymbolBlock> {
    snapshot
        .iter()
        .map(|(symbol, record)| symbol_block(symbol, record))
        .collect()
}

fn symbol_block(symbol: &str, record: &SymbolRecord) -> SymbolBlock {
    let mut block = SymbolBlock {
        symbol: symbol.to_string(),
        status: BlockStatus::Failed,
        current_price: NOT_AVAILABLE.to_string(),
        price_change: NOT_AVAILABLE.to_string(),
        market_cap: NOT_AVAILABLE.to_string(),
        pe_ratio: NOT_AVAILABLE.to_string(),
        week_52_high: NOT_AVAILABLE.to_string(),
        week_52_low: NOT_AVAILABLE.to_string(),
        data_points: 0,
    };

    let SymbolRecord::Available {
        history,
        info,
        current_price,
        price_change,
        price_change_pct,
    } = record
    else {
        return block;
    };

    block.data_points = history.len();
    let Some(price) = current_price else {
        block.status = BlockStatus::Unpriced;
        return block;
    };

    let or_na = |value: Option<String>| value.unwrap_or_else(|| NOT_AVAILABLE.to_string());
    block.status = BlockStatus::Priced;
    block.current_price = format_money(*price);
    block.price_change = or_na(
        price_change
            .zip(*price_change_pct)
            .map(|(change, pct)| format!("{} ({pct:.2}%)", format_money(change))),
    );
    block.market_cap = or_na(info.market_cap.map(format_market_cap));
    block.pe_ratio = or_na(info.trailing_pe.map(|pe| format!("{pe:.2}")));
    block.week_52_high = or_na(info.fifty_two_week_high.map(format_money));
    block.week_52_low = or_na(info.fifty_two_week_low.map(format_money));
    block
}
