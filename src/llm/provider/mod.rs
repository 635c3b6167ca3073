//! LLM Provider implementations and factory
//!
//! Submodules implement providers other than the built-in Ollama client.

pub mod gemini;

use std::sync::Arc;

use crate::core::config::{Config, ProviderType};
use crate::core::Result;
use crate::llm::traits::LLMProvider;
use crate::llm::OllamaClient;

use self::gemini::GeminiProvider;

/// Create a new LLM provider based on configuration
pub fn create_provider(config: &Config) -> Result<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match config.provider {
        ProviderType::Ollama => Arc::new(OllamaClient::from_config(config)?),
        ProviderType::Gemini => Arc::new(GeminiProvider::from_config(config)?),
    };
    tracing::debug!(provider = provider.name(), model = %config.model, "model provider ready");
    Ok(provider)
}
