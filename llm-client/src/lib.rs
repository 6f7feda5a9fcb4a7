//! Text generation client for narration-prep
//!
//! Provides one generation boundary over two backends:
//! - Hosted inference API (Hugging Face text-generation)
//! - Local model daemon (Ollama)
//!
//! plus a mock provider for tests.

pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod providers;

pub use client::{CancelSignal, Generation, GenerationClient, GenerationRequest, TextGenerator};
pub use config::{Config, ModelSource, TokenStore};
pub use error::{LlmError, Result};
pub use provider::{LlmProvider, LlmRequest, LlmResponse, TokenUsage, estimate_tokens};
pub use providers::{MockProvider, get_provider};
