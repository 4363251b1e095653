//! Observability for Parlor.
//!
//! - `tracing_setup`: subscriber installation and OpenTelemetry bridge
//! - `genai_attrs`: GenAI semantic-convention attribute names for completion spans

pub mod genai_attrs;
pub mod tracing_setup;
