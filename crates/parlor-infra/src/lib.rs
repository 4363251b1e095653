//! Infrastructure layer for Parlor.
//!
//! Contains implementations of the ports defined in `parlor-core`: SQLite
//! repositories, the file-backed session slot, Argon2id password hashing,
//! and the OpenAI-compatible completion provider.

pub mod config;
pub mod crypto;
pub mod filesystem;
pub mod llm;
pub mod sqlite;
