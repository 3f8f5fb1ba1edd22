//! Configuration for the financial analysis workflow

use crate::error::{FinanceError, Result};
use crate::models::{ChartKind, Period};
use lumina_llm::providers::OpenAIConfig;
use lumina_utils::{env_or, env_var, require_env};
use serde::{Deserialize, Serialize};

const DEFAULT_API_BASE: &str = "https://api.together.xyz/v1";
const DEFAULT_EXTRACTION_MODEL: &str = "meta-llama/Llama-Vision-Free";
const DEFAULT_VISION_MODEL: &str = "meta-llama/Llama-Vision-Free";
const DEFAULT_TEXT_MODEL: &str = "meta-llama/Llama-3.2-3B-Instruct-Turbo";

/// Configuration for the financial analysis workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinanceConfig {
    /// Together AI API key
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Base URL of the OpenAI-compatible endpoint
    pub api_base: String,

    /// Model used to pull ticker symbols out of a query
    pub extraction_model: String,

    /// Vision-capable model used when a chart image is available
    pub vision_model: String,

    /// Text-only model used when no chart image is available
    pub text_model: String,

    pub extraction_max_tokens: usize,
    pub vision_max_tokens: usize,
    pub text_max_tokens: usize,

    /// Sampling temperature for analysis calls (extraction always uses 0.0)
    pub analysis_temperature: f32,

    /// Period used when the caller does not choose one
    pub default_period: Period,

    /// Chart style used when the caller does not choose one
    pub default_chart: ChartKind,

    /// Upper bound on symbols per query; extra symbols are dropped with a warning
    pub max_symbols: usize,

    /// Number of news items requested per symbol
    pub news_count: usize,

    /// News search requests allowed per minute
    pub news_rate_limit_per_minute: u32,
}

impl Default for FinanceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            extraction_model: DEFAULT_EXTRACTION_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            extraction_max_tokens: 100,
            vision_max_tokens: 3000,
            text_max_tokens: 2000,
            analysis_temperature: 0.3,
            default_period: Period::OneYear,
            default_chart: ChartKind::Line,
            max_symbols: 10,
            news_count: 10,
            news_rate_limit_per_minute: 60,
        }
    }
}

impl FinanceConfig {
    /// Create a new configuration builder
    pub fn builder() -> FinanceConfigBuilder {
        FinanceConfigBuilder::default()
    }

    /// Load configuration from the environment
    ///
    /// `TOGETHER_API_KEY` is required. `TOGETHER_API_BASE`,
    /// `LUMINA_EXTRACTION_MODEL`, `LUMINA_VISION_MODEL`, `LUMINA_TEXT_MODEL`,
    /// `LUMINA_DEFAULT_PERIOD` and `LUMINA_DEFAULT_CHART` override defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let default_period = match env_var("LUMINA_DEFAULT_PERIOD") {
            Some(p) => p.parse()?,
            None => defaults.default_period,
        };
        let default_chart = match env_var("LUMINA_DEFAULT_CHART") {
            Some(c) => c.parse()?,
            None => defaults.default_chart,
        };

        let config = Self {
            api_key: require_env("TOGETHER_API_KEY")?,
            api_base: env_or("TOGETHER_API_BASE", DEFAULT_API_BASE),
            extraction_model: env_or("LUMINA_EXTRACTION_MODEL", DEFAULT_EXTRACTION_MODEL),
            vision_model: env_or("LUMINA_VISION_MODEL", DEFAULT_VISION_MODEL),
            text_model: env_or("LUMINA_TEXT_MODEL", DEFAULT_TEXT_MODEL),
            default_period,
            default_chart,
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(FinanceError::ConfigError(
                "TOGETHER_API_KEY must not be empty".to_string(),
            ));
        }

        if self.max_symbols == 0 {
            return Err(FinanceError::ConfigError(
                "max_symbols must be greater than 0".to_string(),
            ));
        }

        if self.news_rate_limit_per_minute == 0 {
            return Err(FinanceError::ConfigError(
                "news_rate_limit_per_minute must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Provider configuration for the model endpoint
    ///
    /// Requests carry no explicit timeout.
    pub fn llm_config(&self) -> OpenAIConfig {
        OpenAIConfig::new(self.api_key.clone()).with_api_base(self.api_base.clone())
    }
}

/// Builder for FinanceConfig
#[derive(Debug, Default)]
pub struct FinanceConfigBuilder {
    api_key: Option<String>,
    api_base: Option<String>,
    extraction_model: Option<String>,
    vision_model: Option<String>,
    text_model: Option<String>,
    default_period: Option<Period>,
    default_chart: Option<ChartKind>,
    max_symbols: Option<usize>,
    news_count: Option<usize>,
    news_rate_limit_per_minute: Option<u32>,
}

impl FinanceConfigBuilder {
    /// Set the API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the API base URL
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    pub fn extraction_model(mut self, model: impl Into<String>) -> Self {
        self.extraction_model = Some(model.into());
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = Some(model.into());
        self
    }

    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = Some(model.into());
        self
    }

    /// Set the default period
    pub fn default_period(mut self, period: Period) -> Self {
        self.default_period = Some(period);
        self
    }

    /// Set the default chart kind
    pub fn default_chart(mut self, kind: ChartKind) -> Self {
        self.default_chart = Some(kind);
        self
    }

    /// Set the maximum number of symbols per query
    pub fn max_symbols(mut self, max: usize) -> Self {
        self.max_symbols = Some(max);
        self
    }

    /// Set the number of news items per symbol
    pub fn news_count(mut self, count: usize) -> Self {
        self.news_count = Some(count);
        self
    }

    /// Set the news search rate limit
    pub fn news_rate_limit_per_minute(mut self, limit: u32) -> Self {
        self.news_rate_limit_per_minute = Some(limit);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<FinanceConfig> {
        let defaults = FinanceConfig::default();

        let config = FinanceConfig {
            api_key: self.api_key.unwrap_or(defaults.api_key),
            api_base: self.api_base.unwrap_or(defaults.api_base),
            extraction_model: self.extraction_model.unwrap_or(defaults.extraction_model),
            vision_model: self.vision_model.unwrap_or(defaults.vision_model),
            text_model: self.text_model.unwrap_or(defaults.text_model),
            default_period: self.default_period.unwrap_or(defaults.default_period),
            default_chart: self.default_chart.unwrap_or(defaults.default_chart),
            max_symbols: self.max_symbols.unwrap_or(defaults.max_symbols),
            news_count: self.news_count.unwrap_or(defaults.news_count),
            news_rate_limit_per_minute: self
                .news_rate_limit_per_minute
                .unwrap_or(defaults.news_rate_limit_per_minute),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FinanceConfig::default();
        assert_eq!(config.max_symbols, 10);
        assert_eq!(config.news_count, 10);
        assert_eq!(config.text_model, "meta-llama/Llama-3.2-3B-Instruct-Turbo");
        assert_eq!(config.vision_max_tokens, 3000);
        // No key in the defaults
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = FinanceConfig::builder()
            .api_key("test-key")
            .default_period(Period::SixMonths)
            .api_base("http://localhost:1234/v1")
            .max_symbols(5)
            .build()
            .unwrap();

        assert_eq!(config.max_symbols, 5);
        assert_eq!(config.default_period, Period::SixMonths);

        let llm = config.llm_config();
        assert_eq!(llm.api_key, "test-key");
        assert_eq!(llm.api_base, "http://localhost:1234/v1");
    }

    #[test]
    fn test_validation_rejects_zero_limits() {
        assert!(
            FinanceConfig::builder()
                .api_key("k")
                .max_symbols(0)
                .build()
                .is_err()
        );
        assert!(
            FinanceConfig::builder()
                .api_key("k")
                .news_rate_limit_per_minute(0)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_from_env() {
        unsafe {
            std::env::set_var("TOGETHER_API_KEY", "env-key");
            std::env::set_var("LUMINA_DEFAULT_PERIOD", "3mo");
            std::env::set_var("LUMINA_DEFAULT_CHART", "candlestick");
        }

        let config = FinanceConfig::from_env().unwrap();
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.default_period, Period::ThreeMonths);
        assert_eq!(config.default_chart, ChartKind::Candlestick);

        unsafe {
            std::env::remove_var("TOGETHER_API_KEY");
            std::env::remove_var("LUMINA_DEFAULT_PERIOD");
            std::env::remove_var("LUMINA_DEFAULT_CHART");
        }

        assert!(matches!(
            FinanceConfig::from_env(),
            Err(FinanceError::ConfigError(_))
        ));
    }
}
