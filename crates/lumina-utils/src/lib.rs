//! Shared utilities for LuminaFi
//!
//! This crate provides common functionality used across the workspace,
//! including logging setup and environment variable helpers.

pub mod env;
pub mod logging;

pub use env::{EnvError, env_or, env_var, require_env};
pub use logging::{LogFormat, init_tracing, init_tracing_with};
