//! Slash command parsing for the talk loop.
//!
//! Commands start with `/` and provide in-chat controls for help, the member
//! list and the transcript.

use console::style;

/// Number of messages `/history` shows without an argument.
pub const DEFAULT_HISTORY: usize = 20;

/// Available slash commands in the talk loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Show who is in the chat.
    Members,
    /// Show the last N messages.
    History(usize),
    /// Clear the terminal screen.
    Clear,
    /// Leave the session.
    Exit,
    /// Unknown command or bad argument.
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut parts = trimmed.splitn(2, ' ');
    let cmd = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    match cmd.as_str() {
        "/help" | "/h" | "/?" => Some(ChatCommand::Help),
        "/members" | "/who" => Some(ChatCommand::Members),
        "/history" => match arg {
            None => Some(ChatCommand::History(DEFAULT_HISTORY)),
            Some(n) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Some(ChatCommand::History(n)),
                _ => Some(ChatCommand::Unknown(format!(
                    "/history expects a positive number, got '{n}'"
                ))),
            },
        },
        "/clear" | "/cls" => Some(ChatCommand::Clear),
        "/exit" | "/quit" | "/q" => Some(ChatCommand::Exit),
        other => Some(ChatCommand::Unknown(other.to_string())),
    }
}

/// Print the help text listing all available commands.
pub fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    println!("  {}       {}", style("/help").cyan(), "Show this help message");
    println!("  {}    {}", style("/members").cyan(), "Show who is in this chat");
    println!(
        "  {} {}",
        style("/history [n]").cyan(),
        "Show the last n messages"
    );
    println!("  {}      {}", style("/clear").cyan(), "Clear the screen");
    println!("  {}       {}", style("/exit").cyan(), "Leave the chat");
    println!();
    println!(
        "  {}",
        style("Ctrl+D to exit, Ctrl+C safe (no message loss)").dim()
    );
    println!();
}
