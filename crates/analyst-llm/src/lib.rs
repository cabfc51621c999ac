//! LLM backend abstraction for analyst-rs
//!
//! Research nodes talk to the model through [`LLMProvider`] and the
//! [`complete_text`] helper, which turns a single-turn [`Prompt`] into text.
//! Concrete providers live behind feature flags.

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;

pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{ContentBlock, Message, MessageContent, Role};
pub use provider::{complete_text, LLMProvider, Prompt};

#[cfg(feature = "anthropic")]
pub mod providers;
