//! Error types for financial workflow operations

use thiserror::Error;

/// Errors raised by the market data, news and analysis components
#[derive(Debug, Error)]
pub enum FinanceError {
    /// API request failed
    #[error("API error: {0}")]
    ApiError(String),

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable {
        symbol: String,
        reason: String,
    },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Unrecognized period, chart kind or similar user-supplied value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Prompt template failed to render
    #[error("Template error: {0}")]
    TemplateError(#[from] minijinja::Error),

    /// Invalid regular expression
    #[error("Pattern error: {0}")]
    PatternError(#[from] regex::Error),

    /// Chart rendering error
    #[error("Chart error: {0}")]
    ChartError(String),

    /// Symbol resolution error
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Language model error
    #[error("LLM error: {0}")]
    Llm(#[from] lumina_llm::LLMError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Errors raised while turning a free-text query into ticker symbols
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The model call failed or its reply held no parseable JSON array
    #[error("Symbol extraction failed: {0}")]
    ExtractionFailed(String),

    /// Neither the model nor the fallback pattern found a ticker
    #[error("No stock symbols found in query. Please include ticker symbols like AAPL, MSFT or TSLA.")]
    NoSymbolsFound,
}

/// Result type alias for finance operations
pub type Result<T> = std::result::Result<T, FinanceError>;

impl From<lumina_utils::EnvError> for FinanceError {
    fn from(err: lumina_utils::EnvError) -> Self {
        FinanceError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FinanceError::DataUnavailable {
            symbol: "MSFT".to_string(),
            reason: "No data found".to_string(),
        };
        assert_eq!(err.to_string(), "Data not available for MSFT: No data found");
    }

    #[test]
    fn test_resolve_error_is_transparent() {
        let err: FinanceError = ResolveError::NoSymbolsFound.into();
        assert!(err.to_string().starts_with("No stock symbols found"));
    }

    #[test]
    fn test_llm_error_conversion() {
        let err: FinanceError = lumina_llm::LLMError::AuthenticationFailed.into();
        assert!(matches!(err, FinanceError::Llm(_)));
        assert!(err.to_string().starts_with("LLM error:"));
    }

    #[test]
    fn test_env_error_conversion() {
        let err: FinanceError =
            lumina_utils::EnvError::Missing("TOGETHER_API_KEY".to_string()).into();
        match err {
            FinanceError::ConfigError(msg) => assert!(msg.contains("TOGETHER_API_KEY")),
            other => panic!("Expected ConfigError, got {other:?}"),
        }
    }
}
