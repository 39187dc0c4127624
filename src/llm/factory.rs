//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::{AskError, Result};
use crate::llm::{LlmHandle, LlmProvider, MockLlmClient, OpenAiClient, OpenAiConfig};

/// Creates an LLM client from the `[llm]` configuration section.
///
/// The OpenAI provider requires `api_key` to be resolved already; the
/// `OPENAI_API_KEY` environment override is applied by the config layer.
pub fn create_client(config: &LlmConfig) -> Result<LlmHandle> {
    let provider: LlmProvider = config.provider.parse()?;

    match provider {
        LlmProvider::OpenAi => {
            let key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| {
                    AskError::config("No API key configured. Set llm.api_key or OPENAI_API_KEY.")
                })?;
            let client = OpenAiClient::new(OpenAiConfig::from_llm_config(config, key))?;
            Ok(Arc::new(client))
        }
        LlmProvider::Mock => Ok(Arc::new(MockLlmClient::new())),
    }
}
