//! Global configuration types for Parlor.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! completion endpoint and conversation behavior.

use serde::{Deserialize, Serialize};

/// Top-level configuration for Parlor.
///
/// Loaded from `~/.parlor/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub conversation: ConversationConfig,
}

/// Remote completion endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Base URL of an OpenAI-compatible API; `/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// HTTP client timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_api_key_env() -> String {
    "PARLOR_API_KEY".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// What happens to the remaining AI participants when one fails to reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyFailurePolicy {
    /// Record the failure and let the next participant reply.
    #[default]
    Isolate,
    /// Stop at the first failure and return it.
    Abort,
}

/// Conversation orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Number of most recent messages sent as context with each request.
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Upper bound on a single reply, in seconds.
    #[serde(default = "default_reply_timeout_secs")]
    pub reply_timeout_secs: u64,

    #[serde(default)]
    pub failure_policy: ReplyFailurePolicy,
}

fn default_context_window() -> usize {
    20
}

fn default_reply_timeout_secs() -> u64 {
    60
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            context_window: default_context_window(),
            reply_timeout_secs: default_reply_timeout_secs(),
            failure_policy: ReplyFailurePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_config_default_values() {
        let config = GlobalConfig::default();
        assert_eq!(config.completion.model, "deepseek-chat");
        assert_eq!(config.completion.api_key_env, "PARLOR_API_KEY");
        assert_eq!(config.conversation.context_window, 20);
        assert_eq!(config.conversation.reply_timeout_secs, 60);
        assert_eq!(config.conversation.failure_policy, ReplyFailurePolicy::Isolate);
    }

    #[test]
    fn test_global_config_deserialize_with_defaults() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.completion.base_url, "https://api.deepseek.com/v1");
        assert_eq!(config.conversation.context_window, 20);
    }

    #[test]
    fn test_global_config_deserialize_with_values() {
        let toml_str = r#"
[completion]
base_url = "http://localhost:8080/v1"
model = "local-model"

[conversation]
context_window = 8
failure_policy = "abort"
"#;
        let config: GlobalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.completion.base_url, "http://localhost:8080/v1");
        assert_eq!(config.completion.model, "local-model");
        assert_eq!(config.completion.request_timeout_secs, 120);
        assert_eq!(config.conversation.context_window, 8);
        assert_eq!(config.conversation.failure_policy, ReplyFailurePolicy::Abort);
    }
}
