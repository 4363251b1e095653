//! Completion provider abstraction for Parlor.
//!
//! - `CompletionProvider`: RPITIT trait for concrete provider implementations

pub mod provider;
