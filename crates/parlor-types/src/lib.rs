//! Shared domain types for Parlor.
//!
//! This crate contains the core domain types used across the Parlor workspace:
//! users, characters, chats, membership relations, messages, completion
//! payloads, configuration, navigation routes, and their error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod character;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod navigation;
pub mod user;
