//! Chat directory, prompt assembly, transcript cache and the conversation
//! service that sequences AI replies.

pub mod cache;
pub mod directory;
pub mod prompt;
pub mod service;
