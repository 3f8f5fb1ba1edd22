//! Prompt text for symbol extraction and financial analysis
//!
//! - `system`: fixed system prompts and the fallback narrative
//! - `user`: MiniJinja templates for the user turns

mod system;
mod user;

pub use system::*;
pub use user::*;
