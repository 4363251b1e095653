//! Welcome banner display for talk sessions.

use console::style;
use parlor_types::chat::ChatSummary;

use crate::cli::render::short_id;

/// Print the welcome banner at the start of a talk session.
///
/// Shows the chat name and kind, its characters, the model, and a warning
/// when no API key is configured.
pub fn print_welcome_banner(summary: &ChatSummary, model: &str, missing_key: Option<&str>) {
    println!();
    println!(
        "  {} {}",
        style(&summary.chat.name).cyan().bold(),
        style(format!("({})", summary.chat.kind)).dim()
    );
    println!(
        "  {}",
        style(
            summary
                .characters()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
        .dim()
    );
    println!();
    println!("  {}  {}", style("Model:").bold(), style(model).dim());
    println!(
        "  {}   {}",
        style("Chat:").bold(),
        style(short_id(&summary.chat.id)).dim()
    );
    if let Some(env) = missing_key {
        println!();
        println!(
            "  {} No API key: set {} to get replies",
            style("!").yellow().bold(),
            style(env).yellow()
        );
    }
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}
