//! User message templates

use crate::error::Result;
use minijinja::Environment;
use minijinja::value::Value;
use serde::Serialize;

use super::VISION_SUFFIX;

const SYMBOL_EXTRACTION_TEMPLATE: &str = r#"Extract all stock ticker symbols (US stocks, ETFs, or crypto tickers) for yfinance from the following user query. Return ONLY a JSON array of strings, e.g. ["AAPL", "MSFT", "TSLA"].

User query: {{ query }}"#;

const ANALYSIS_TEMPLATE: &str = r#"Analyze the following financial data for the user query: "{{ query }}"

Financial Data Summary:
{% for s in symbols %}
{{ s.symbol }}:
{% if s.status == "priced" -%}
- Current Price: {{ s.current_price }}
- Price Change: {{ s.price_change }}
- Market Cap: {{ s.market_cap }}
- P/E Ratio: {{ s.pe_ratio }}
- 52 Week High: {{ s.week_52_high }}
- 52 Week Low: {{ s.week_52_low }}
{% elif s.status == "unpriced" -%}
- Status: Data available but current price unavailable
- Historical data points: {{ s.data_points }}
{% else -%}
- Status: Unable to fetch data for this symbol
{% endif -%}
{% endfor %}
Please provide a detailed financial analysis including:
1. Performance comparison between the securities
2. Key financial metrics analysis
3. Investment recommendations
4. Risk assessment
5. Market outlook and trends

Make the analysis comprehensive and actionable for investors."#;

/// Whether a symbol block lists metrics, only a point count, or a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    Priced,
    Unpriced,
    Failed,
}

/// One symbol's pre-formatted values for the analysis template
#[derive(Debug, Clone, Serialize)]
pub struct SymbolBlock {
    pub symbol: String,
    pub status: BlockStatus,
    pub current_price: String,
    pub price_change: String,
    pub market_cap: String,
    pub pe_ratio: String,
    pub week_52_high: String,
    pub week_52_low: String,
    pub data_points: usize,
}

#[derive(Serialize)]
struct AnalysisContext<'a> {
    query: &'a str,
    symbols: &'a [SymbolBlock],
}

fn render(template: &str, ctx: impl Serialize) -> Result<String> {
    let env = Environment::new();
    Ok(env.render_str(template, Value::from_serialize(&ctx))?)
}

/// Render the ticker extraction request for `query`
pub fn symbol_extraction_prompt(query: &str) -> Result<String> {
    render(
        SYMBOL_EXTRACTION_TEMPLATE,
        serde_json::json!({ "query": query }),
    )
}

/// Render the analysis request for `query` over the given symbol blocks
pub fn analysis_prompt(query: &str, symbols: &[SymbolBlock]) -> Result<String> {
    render(ANALYSIS_TEMPLATE, AnalysisContext { query, symbols })
}

/// Append the chart paragraph to an analysis prompt
pub fn vision_prompt(analysis_prompt: &str) -> String {
    format!("{analysis_prompt}\n\n{VISION_SUFFIX}")
}
