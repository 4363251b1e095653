//! Talk loop orchestration.
//!
//! Loads the chat and its transcript, prints the welcome banner and the
//! recent history, then sends every line the user types and prints each
//! character's reply in membership order.

use anyhow::Result;
use console::style;
use tracing::{debug, info};

use parlor_core::llm::provider::CompletionProvider;
use parlor_types::navigation::Route;
use parlor_types::user::User;

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use crate::cli::conversation::{print_outcome, user_chat};
use crate::cli::render::print_message;
use crate::cli::spinner;
use crate::state::AppState;

/// Messages replayed when a session opens.
const REPLAY: usize = 10;

/// Run the interactive talk loop for a chat.
pub async fn run_talk_loop(state: &AppState, user: &User, chat: &str) -> Result<()> {
    let summary = user_chat(state, chat)?;
    let chat_id = summary.chat.id;
    debug!(route = %Route::Chat { chat_id }, "Navigating");

    let messages = state.conversations.load_messages(&chat_id).await?;

    let provider = state.conversations.provider();
    let missing_key = (!provider.is_ready()).then_some(state.config.completion.api_key_env.as_str());
    print_welcome_banner(&summary, provider.model(), missing_key);

    for message in &messages[messages.len().saturating_sub(REPLAY)..] {
        print_message(&summary, message, user.id);
    }
    if !messages.is_empty() {
        println!();
    }

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) = ChatInput::new(prompt)
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    info!(chat_id = %chat_id, "Talk session started");
    let mut sent = 0usize;

    loop {
        match chat_input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("Session ended.").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!(
                    "\n  {}",
                    style("Press Ctrl+D to exit, or keep chatting.").dim()
                );
                continue;
            }
            InputEvent::Message(text) => {
                if text.is_empty() {
                    continue;
                }

                if let Some(cmd) = commands::parse(&text) {
                    match cmd {
                        ChatCommand::Help => commands::print_help(),
                        ChatCommand::Clear => chat_input.clear(),
                        ChatCommand::Exit => {
                            println!("\n  {}", style("Session ended.").dim());
                            break;
                        }
                        ChatCommand::Members => {
                            println!();
                            for member in &summary.members {
                                println!(
                                    "  {} {} {}",
                                    style("•").dim(),
                                    style(member.name()).cyan(),
                                    style(format!("({})", member.kind())).dim()
                                );
                            }
                            println!();
                        }
                        ChatCommand::History(n) => {
                            let transcript = state
                                .conversations
                                .transcript(&chat_id)
                                .unwrap_or_default();
                            println!();
                            for message in &transcript[transcript.len().saturating_sub(n)..] {
                                print_message(&summary, message, user.id);
                            }
                            println!();
                        }
                        ChatCommand::Unknown(name) => {
                            println!(
                                "\n  {} Unknown command: {}. Type /help for available commands.\n",
                                style("?").yellow().bold(),
                                style(name).dim()
                            );
                        }
                    }
                    continue;
                }

                let spinner = spinner("waiting for replies...", false);
                let outcome = state
                    .conversations
                    .send_message(user, &chat_id, &text)
                    .await;
                spinner.finish_and_clear();

                match outcome {
                    Ok(outcome) => {
                        sent += 1;
                        println!();
                        print_outcome(&summary, &outcome, user.id);
                        println!();
                    }
                    Err(e) => {
                        eprintln!("\n  {} {e}", style("!").red().bold());
                        eprintln!(
                            "  {}",
                            style("Type another message to retry, /exit to quit.").dim()
                        );
                        println!();
                    }
                }
            }
        }
    }

    info!(chat_id = %chat_id, sent, "Talk session ended");
    Ok(())
}
