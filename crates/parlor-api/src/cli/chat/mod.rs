//! Interactive chat session for Parlor.
//!
//! This module implements `parlor talk`: a welcome banner, the recent
//! transcript, then an input loop with slash commands where every line is
//! sent to the chat and answered by its characters. Entry point:
//! `loop_runner::run_talk_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
