//! OpenTelemetry GenAI Semantic Convention attribute constants.
//!
//! Field names recorded on completion spans after the span is opened, plus
//! the well-known attribute values. Fields declared up front use the same
//! dotted names literally, since `tracing` macros need them at compile time.

// --- Response attributes (recorded once the reply arrives) ---

/// The model ID the provider reports having used.
pub const GEN_AI_RESPONSE_MODEL: &str = "gen_ai.response.model";

/// The number of input tokens consumed.
pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

/// The number of output tokens generated.
pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// The finish reasons for the response (e.g., "stop", "length").
pub const GEN_AI_RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";

/// The unique response ID from the provider.
pub const GEN_AI_RESPONSE_ID: &str = "gen_ai.response.id";

// --- Operation name values ---

/// Standard chat completion operation.
pub const OP_CHAT: &str = "chat";

// --- Provider name values ---

/// Any endpoint speaking the OpenAI chat completions protocol.
pub const PROVIDER_OPENAI_COMPAT: &str = "openai_compat";
