//! Concrete LLM provider implementations

#[cfg(feature = "anthropic")]
pub mod anthropic;

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicProvider, API_KEY_ENV, DEFAULT_MODEL};
