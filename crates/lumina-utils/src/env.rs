//! Environment variable helpers

use thiserror::Error;

/// Errors raised while reading configuration from the environment
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    /// A required variable is unset or blank
    #[error("{0} environment variable not set")]
    Missing(String),
}

/// Read a variable, treating blank values as unset
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a variable or fall back to `default`
pub fn env_or(key: &str, default: &str) -> String {
    env_var(key).unwrap_or_else(|| default.to_string())
}

/// Read a variable that must be present
pub fn require_env(key: &str) -> Result<String, EnvError> {
    env_var(key).ok_or_else(|| EnvError::Missing(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_is_unset() {
        unsafe {
            std::env::set_var("LUMINA_UTILS_TEST_BLANK", "   ");
        }
        assert_eq!(env_var("LUMINA_UTILS_TEST_BLANK"), None);
        assert_eq!(env_or("LUMINA_UTILS_TEST_BLANK", "fallback"), "fallback");
        unsafe {
            std::env::remove_var("LUMINA_UTILS_TEST_BLANK");
        }
    }

    #[test]
    fn test_require_env() {
        unsafe {
            std::env::set_var("LUMINA_UTILS_TEST_SET", " value ");
        }
        assert_eq!(require_env("LUMINA_UTILS_TEST_SET").unwrap(), "value");
        unsafe {
            std::env::remove_var("LUMINA_UTILS_TEST_SET");
        }

        let err = require_env("LUMINA_UTILS_TEST_NEVER_SET").unwrap_err();
        assert_eq!(err, EnvError::Missing("LUMINA_UTILS_TEST_NEVER_SET".to_string()));
        assert_eq!(
            err.to_string(),
            "LUMINA_UTILS_TEST_NEVER_SET environment variable not set"
        );
    }
}
