//! CompletionProvider trait definition.
//!
//! This is the abstraction every text-generation backend implements. The
//! conversation service treats providers as opaque: an ordered list of
//! role-tagged messages goes in, one reply string comes out.

use parlor_types::llm::{CompletionError, PromptMessage};

/// Trait for completion backends (OpenAI-compatible HTTP APIs, test doubles).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
///
/// Implementations live in parlor-infra (e.g., `OpenAiCompatibleProvider`).
pub trait CompletionProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai_compat").
    fn name(&self) -> &str;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Send the conversation and receive the full reply text.
    fn complete(
        &self,
        messages: &[PromptMessage],
    ) -> impl std::future::Future<Output = Result<String, CompletionError>> + Send;
}
