//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (parlor-infra) implements. The core crate never depends on any
//! specific storage technology.
//!
//! Every read returns `Option`/`Vec`; absence is never an error.

pub mod character;
pub mod chat;
pub mod message;
pub mod user;
