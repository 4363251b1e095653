//! Completion provider implementations.
//!
//! Contains the concrete [`CompletionProvider`] used by the CLI and the
//! factory that builds it from `[completion]` settings.
//!
//! [`CompletionProvider`]: parlor_core::llm::provider::CompletionProvider

pub mod openai_compat;

use secrecy::SecretString;

use parlor_core::llm::provider::CompletionProvider;
use parlor_observe::genai_attrs::PROVIDER_OPENAI_COMPAT;
use parlor_types::config::CompletionConfig;
use parlor_types::llm::{CompletionError, PromptMessage};

use self::openai_compat::OpenAiCompatibleProvider;

/// Read the API key from the environment variable named in the config.
///
/// # Errors
///
/// `NotConfigured` when the variable is unset or blank.
pub fn resolve_api_key(config: &CompletionConfig) -> Result<SecretString, CompletionError> {
    match std::env::var(&config.api_key_env) {
        Ok(key) if !key.trim().is_empty() => Ok(SecretString::from(key.trim().to_string())),
        _ => Err(CompletionError::NotConfigured(format!(
            "set {} to your API key",
            config.api_key_env
        ))),
    }
}

/// Build the completion provider from configuration.
pub fn create_provider(config: &CompletionConfig) -> Result<OpenAiCompatibleProvider, CompletionError> {
    let api_key = resolve_api_key(config)?;
    let provider = OpenAiCompatibleProvider::new(config, api_key)?;
    tracing::debug!(base_url = %config.base_url, model = %config.model, "Completion provider ready");
    Ok(provider)
}

/// The provider the application runs with, or why there is none.
///
/// Commands that never call the completion endpoint (registration, listing)
/// must work without an API key, so a missing key only surfaces when a reply
/// is requested.
pub enum ConfiguredProvider {
    Ready(OpenAiCompatibleProvider),
    Unavailable { model: String, reason: String },
}

impl ConfiguredProvider {
    pub fn from_config(config: &CompletionConfig) -> Self {
        match create_provider(config) {
            Ok(provider) => Self::Ready(provider),
            Err(e) => {
                tracing::debug!(error = %e, "Completion provider unavailable");
                Self::Unavailable {
                    model: config.model.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

impl CompletionProvider for ConfiguredProvider {
    fn name(&self) -> &str {
        match self {
            Self::Ready(provider) => provider.name(),
            Self::Unavailable { .. } => PROVIDER_OPENAI_COMPAT,
        }
    }

    fn model(&self) -> &str {
        match self {
            Self::Ready(provider) => provider.model(),
            Self::Unavailable { model, .. } => model,
        }
    }

    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, CompletionError> {
        match self {
            Self::Ready(provider) => provider.complete(messages).await,
            Self::Unavailable { reason, .. } => Err(CompletionError::NotConfigured(reason.clone())),
        }
    }
}
