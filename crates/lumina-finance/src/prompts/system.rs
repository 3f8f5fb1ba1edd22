//! System prompts and fixed narrative text

/// System prompt for the analysis calls (vision and text)
pub const SYSTEM_FINANCIAL_ANALYST: &str = "You are a professional financial analyst with expertise in stock market analysis, \
investment strategies, and risk assessment. You can analyze both numerical data and financial charts. \
Provide detailed, actionable financial insights based on both the data and the visual chart patterns you observe.";

/// System prompt for ticker extraction
pub const SYSTEM_SYMBOL_EXTRACTOR: &str =
    "You are a financial data assistant to extract symbols from user query.";

/// Paragraph appended to the analysis prompt when a chart image is attached
pub const VISION_SUFFIX: &str = "Additionally, I'm providing you with a financial chart visualization of this data. \
Please analyze the visual patterns, trends, and technical indicators you can observe in the chart along with the numerical data.";

/// Narrative returned whenever the model produces nothing usable
pub const FALLBACK_ANALYSIS: &str = "## Financial Analysis Report

*Analysis temporarily unavailable due to API limitations. Please try again.*

Based on the provided financial data, here's a basic analysis framework:

### Performance Overview
Review the price movements and percentage changes for each security.

### Key Metrics to Consider
- Price-to-Earnings ratios
- Market capitalization
- 52-week highs and lows
- Trading volume patterns

### General Investment Principles
1. Diversification across sectors and asset classes
2. Regular portfolio rebalancing
3. Long-term perspective for equity investments
4. Risk management through position sizing

*Note: This is general information only and not personalized financial advice.*
";
