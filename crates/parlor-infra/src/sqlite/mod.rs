//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod character;
pub mod chat;
pub mod message;
pub mod pool;
pub mod user;
