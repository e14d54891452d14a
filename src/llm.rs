//! Generation provider facade.
//!
//! The model call is opaque to the rest of the system: prompt in, text
//! out. Until a hosted provider is wired in, a deterministic stub echoes
//! the prompt tagged with the configured provider name, which keeps the
//! chat and agent paths fully testable without network access.

use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Output of one generation call.
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub provider: String,
    pub text: String,
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Complete a prompt. Fails with a validation error on empty input.
    async fn complete(&self, prompt: &str) -> Result<GenerationResponse>;
}

/// Deterministic stand-in for a hosted model.
///
/// Responses are prefixed `[stub:{provider}]` without an API key and
/// `[provider:{provider}]` with one, so callers can tell which path ran.
pub struct StubGenerationProvider {
    provider: String,
    has_api_key: bool,
}

impl StubGenerationProvider {
    pub fn new(config: &LlmConfig) -> Self {
        let has_api_key = std::env::var(&config.api_key_env)
            .map(|v| !v.is_empty())
            .unwrap_or(false);
        Self {
            provider: config.provider.clone(),
            has_api_key,
        }
    }
}

#[async_trait]
impl GenerationProvider for StubGenerationProvider {
    async fn complete(&self, prompt: &str) -> Result<GenerationResponse> {
        let normalized = prompt.trim();
        if normalized.is_empty() {
            return Err(Error::validation("prompt must not be empty"));
        }

        let tag = if self.has_api_key { "provider" } else { "stub" };
        Ok(GenerationResponse {
            provider: self.provider.clone(),
            text: format!("[{}:{}] {}", tag, self.provider, normalized),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub() -> StubGenerationProvider {
        StubGenerationProvider {
            provider: "openai".to_string(),
            has_api_key: false,
        }
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected() {
        let err = stub().complete("   ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn stub_response_is_deterministic() {
        let provider = stub();
        let a = provider.complete("what is rust?").await.unwrap();
        let b = provider.complete("what is rust?").await.unwrap();
        assert_eq!(a.text, b.text);
        assert_eq!(a.text, "[stub:openai] what is rust?");
        assert_eq!(a.provider, "openai");
    }

    #[tokio::test]
    async fn api_key_switches_the_tag() {
        let provider = StubGenerationProvider {
            provider: "openai".to_string(),
            has_api_key: true,
        };
        let out = provider.complete("hi there").await.unwrap();
        assert!(out.text.starts_with("[provider:openai]"));
    }
}
