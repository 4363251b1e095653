//! OpenAI-compatible completion provider.
//!
//! Sends non-streaming requests to `{base_url}/chat/completions` with a
//! bearer token. Works against any server speaking the OpenAI chat
//! completions protocol (DeepSeek, OpenAI, local gateways).
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

pub mod types;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::Instrument;

use parlor_core::llm::provider::CompletionProvider;
use parlor_observe::genai_attrs::{
    GEN_AI_RESPONSE_FINISH_REASONS, GEN_AI_RESPONSE_ID, GEN_AI_RESPONSE_MODEL,
    GEN_AI_USAGE_INPUT_TOKENS, GEN_AI_USAGE_OUTPUT_TOKENS, OP_CHAT, PROVIDER_OPENAI_COMPAT,
};
use parlor_types::config::CompletionConfig;
use parlor_types::llm::{CompletionError, CompletionRequest, PromptMessage};

use self::types::{ChatCompletionResponse, ErrorEnvelope};

/// Longest error body kept in `CompletionError::Status`.
const MAX_ERROR_BODY: usize = 512;

/// Provider for any OpenAI-compatible chat completions endpoint.
///
/// # API Key Security
///
/// Does NOT derive Debug. The key is only exposed when building the
/// `Authorization` header.
pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

/// A decoded reply plus the metadata recorded on the completion span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCompletion {
    pub content: String,
    pub response_id: Option<String>,
    pub response_model: Option<String>,
    pub finish_reason: Option<String>,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
}

impl OpenAiCompatibleProvider {
    /// Create a provider from endpoint settings and a resolved key.
    pub fn new(config: &CompletionConfig, api_key: SecretString) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| CompletionError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Build the full API URL for a given path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, messages: &[PromptMessage]) -> Result<String, CompletionError> {
        let body = CompletionRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
        };

        let response = self
            .client
            .post(self.url("/chat/completions"))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CompletionError::Transport(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &text));
        }

        let parsed = parse_response(&text)?;
        record_response(&parsed);
        Ok(parsed.content)
    }
}

impl CompletionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        PROVIDER_OPENAI_COMPAT
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, CompletionError> {
        let span = tracing::debug_span!(
            "openai_compat.request",
            gen_ai.operation.name = OP_CHAT,
            gen_ai.request.model = %self.model,
            gen_ai.response.id = tracing::field::Empty,
            gen_ai.response.model = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            messages = messages.len(),
        );
        self.send(messages).instrument(span).await
    }
}

/// Record response metadata on the current request span.
fn record_response(parsed: &ParsedCompletion) {
    let span = tracing::Span::current();
    if let Some(id) = &parsed.response_id {
        span.record(GEN_AI_RESPONSE_ID, id.as_str());
    }
    if let Some(model) = &parsed.response_model {
        span.record(GEN_AI_RESPONSE_MODEL, model.as_str());
    }
    if let Some(reason) = &parsed.finish_reason {
        span.record(GEN_AI_RESPONSE_FINISH_REASONS, reason.as_str());
    }
    if let Some(tokens) = parsed.input_tokens {
        span.record(GEN_AI_USAGE_INPUT_TOKENS, tokens);
    }
    if let Some(tokens) = parsed.output_tokens {
        span.record(GEN_AI_USAGE_OUTPUT_TOKENS, tokens);
    }
}

/// Map a non-2xx response to the completion error taxonomy.
pub fn status_error(status: u16, body: &str) -> CompletionError {
    match status {
        401 | 403 => CompletionError::AuthenticationFailed,
        _ => {
            let message = serde_json::from_str::<ErrorEnvelope>(body)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| body.trim().to_string());
            CompletionError::Status {
                status,
                body: truncate(&message, MAX_ERROR_BODY),
            }
        }
    }
}

/// Decode a response body and take the first choice's content.
pub fn parse_response(body: &str) -> Result<ParsedCompletion, CompletionError> {
    let response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| CompletionError::Malformed(format!("failed to parse response: {e}")))?;

    let Some(choice) = response.choices.into_iter().next() else {
        return Err(CompletionError::Malformed("response has no choices".to_string()));
    };
    let Some(content) = choice.message.content else {
        return Err(CompletionError::Malformed(
            "first choice has no message content".to_string(),
        ));
    };

    Ok(ParsedCompletion {
        content,
        response_id: response.id,
        response_model: response.model,
        finish_reason: choice.finish_reason,
        input_tokens: response.usage.map(|u| u.prompt_tokens),
        output_tokens: response.usage.map(|u| u.completion_tokens),
    })
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
