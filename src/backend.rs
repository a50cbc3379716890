//! The generation-backend seam.
//!
//! Everything that talks to a generative model goes through
//! [`GenerationBackend`], a narrow trait the engine, the image analyzer and
//! the slide-image mapper all share. Keeping the seam this small has two
//! payoffs:
//!
//! 1. **Testability** — the whole fallback ladder can be exercised with a
//!    scripted in-memory backend, no API key required.
//! 2. **Capability dispatch** — [`GenerationBackend::id`] is the provider
//!    identity that [`crate::capability::classify`] turns into a capability
//!    tier; the engine never branches on concrete provider types.
//!
//! [`LlmBackend`] is the production implementation, wrapping an
//! `edgequake_llm::LLMProvider`. edgequake-llm carries no first-class
//! response-format switch, so the adapter lowers [`ResponseFormat`] into an
//! extra system message; providers that honour JSON instructions reliably are
//! classified accordingly by the capability adapter.

use crate::error::OutlineError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// How the backend is asked to shape its reply.
#[derive(Debug, Clone)]
pub enum ResponseFormat {
    /// No structural constraint.
    Text,
    /// Syntactically valid JSON, schema enforced by the caller.
    JsonObject,
    /// The backend guarantees conformance to the given JSON Schema.
    JsonSchema(serde_json::Value),
}

/// One request to a generation backend.
pub struct BackendCall {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: usize,
    pub format: ResponseFormat,
}

/// The backend's reply, with token accounting.
#[derive(Debug, Clone, Default)]
pub struct BackendReply {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A backend call failed (network, API, rate limit).
///
/// Recoverable: the ladder retries with backoff, and batch image analysis
/// isolates it to the single image that triggered it.
#[derive(Debug, Clone, Error)]
#[error("backend call to '{provider}' failed: {detail}")]
pub struct BackendCallError {
    pub provider: String,
    pub detail: String,
}

/// A generative backend capable of chat completions, optionally with images.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Stable provider identifier ("openai", "anthropic", ...) used for
    /// capability classification. A pure property of the backend, never of
    /// run-time behaviour.
    fn id(&self) -> &str;

    /// Issue one completion call.
    async fn complete(&self, call: BackendCall) -> Result<BackendReply, BackendCallError>;
}

// ── Production adapter ───────────────────────────────────────────────────

/// [`GenerationBackend`] implementation over an edgequake-llm provider.
pub struct LlmBackend {
    id: String,
    provider: Arc<dyn LLMProvider>,
}

impl LlmBackend {
    /// Wrap a pre-constructed provider under the given identity.
    pub fn new(id: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            id: id.into(),
            provider,
        }
    }

    /// Instantiate a named provider with the given model via the factory.
    pub fn from_factory(provider_name: &str, model: &str) -> Result<Self, OutlineError> {
        let provider =
            ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
                OutlineError::ProviderNotConfigured {
                    provider: provider_name.to_string(),
                    hint: format!("{e}"),
                }
            })?;
        Ok(Self::new(provider_name, provider))
    }
}

#[async_trait]
impl GenerationBackend for LlmBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn complete(&self, call: BackendCall) -> Result<BackendReply, BackendCallError> {
        let mut messages = call.messages;

        // Lower the response format onto the prompt. Providers with native
        // structured output still need the schema in-band, since the
        // edgequake-llm chat surface has no schema parameter.
        match &call.format {
            ResponseFormat::Text => {}
            ResponseFormat::JsonObject => {
                messages.push(ChatMessage::system(crate::prompts::JSON_OBJECT_DIRECTIVE));
            }
            ResponseFormat::JsonSchema(schema) => {
                messages.push(ChatMessage::system(crate::prompts::json_schema_directive(
                    schema,
                )));
            }
        }

        let options = CompletionOptions {
            temperature: Some(call.temperature),
            max_tokens: Some(call.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| BackendCallError {
                provider: self.id.clone(),
                detail: format!("{e}"),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.id, response.prompt_tokens, response.completion_tokens
        );

        Ok(BackendReply {
            content: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}
