//! Chat CLI commands: group new, chats, show, send.

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::{Input, MultiSelect};
use uuid::Uuid;

use parlor_core::chat::service::SendOutcome;
use parlor_core::repository::character::CharacterRepository;
use parlor_types::chat::{ChatKind, ChatSummary};
use parlor_types::error::ConversationError;
use parlor_types::user::User;

use crate::cli::render::{author_name, format_local_time, preview, print_message, short_id};
use crate::cli::{lookup, spinner};
use crate::state::AppState;

/// Resolve a chat reference to one of the user's chats.
pub fn user_chat(state: &AppState, query: &str) -> Result<ChatSummary> {
    let chats = state.conversations.chats();
    let chat_id = lookup::resolve_chat(&chats, query)?;
    chats
        .into_iter()
        .find(|c| c.chat.id == chat_id)
        .ok_or_else(|| ConversationError::ChatNotFound(chat_id).into())
}

/// Create a group chat from character references, or pick them interactively.
pub async fn new_group(
    state: &AppState,
    user: &User,
    name: Option<String>,
    references: Vec<String>,
    json: bool,
) -> Result<()> {
    let all = state.directory().characters().get_all().await?;
    if all.is_empty() {
        bail!("there are no characters yet; create one with `parlor character new`");
    }

    let name = match name {
        Some(n) => n,
        None => Input::<String>::new()
            .with_prompt("Group name")
            .interact_text()?,
    };

    let character_ids: Vec<Uuid> = if references.is_empty() {
        let labels: Vec<String> = all
            .iter()
            .map(|c| format!("{} ({})", c.name, short_id(&c.id)))
            .collect();
        let picked = MultiSelect::new()
            .with_prompt("Characters (space to select, enter to confirm)")
            .items(&labels)
            .interact()?;
        picked.into_iter().map(|i| all[i].id).collect()
    } else {
        references
            .iter()
            .map(|r| lookup::resolve_character(&all, r, user.id).map(|c| c.id))
            .collect::<Result<_>>()?
    };
    if character_ids.is_empty() {
        bail!("a group needs at least one character");
    }

    let spinner = spinner("Creating group...", json);
    let chat_id = state
        .conversations
        .start_group_conversation(user, &name, &character_ids)
        .await;
    spinner.finish_and_clear();
    let chat_id = chat_id?;

    let summary = user_chat(state, &chat_id.to_string())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!();
    println!("  {} Group created!", style("✓").green().bold());
    println!();
    println!(
        "  {}     {}",
        style("Name:").bold(),
        style(&summary.chat.name).cyan()
    );
    println!(
        "  {}  {}",
        style("Members:").bold(),
        summary
            .characters()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "  {}     {}",
        style("Chat:").bold(),
        style(short_id(&chat_id)).dim()
    );
    println!();
    println!(
        "  Start talking: {}",
        style(format!("parlor talk {}", short_id(&chat_id))).yellow()
    );
    println!();

    Ok(())
}

/// List the user's chats, most recently active first.
pub fn list_chats(state: &AppState, user: &User, json: bool) -> Result<()> {
    let chats = state.conversations.chats();

    if json {
        println!("{}", serde_json::to_string_pretty(&chats)?);
        return Ok(());
    }

    if chats.is_empty() {
        println!();
        println!(
            "  {} No chats yet. Create a character with: {}",
            style("i").blue().bold(),
            style("parlor character new").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("Members").fg(Color::White),
        Cell::new("Last Message").fg(Color::White),
        Cell::new("Time").fg(Color::White),
        Cell::new("ID").fg(Color::White),
    ]);

    for summary in &chats {
        let name = match summary.chat.kind {
            ChatKind::Single => Cell::new(&summary.chat.name).fg(Color::Cyan),
            ChatKind::Group => Cell::new(format!("# {}", summary.chat.name)).fg(Color::Magenta),
        };
        let members = summary
            .characters()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let last = match &summary.last_message {
            Some(message) => preview(
                &format!("{}: {}", author_name(summary, message, user.id), message.content),
                40,
            ),
            None => "-".to_string(),
        };

        table.add_row(vec![
            name,
            Cell::new(preview(&members, 30)),
            Cell::new(last),
            Cell::new(format_local_time(summary.activity_time())).fg(Color::DarkGrey),
            Cell::new(short_id(&summary.chat.id)).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} chat{}",
        style(chats.len()).bold(),
        if chats.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Print a chat's header line: name and members.
pub fn print_chat_header(summary: &ChatSummary) {
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
                .members
                .iter()
                .map(|m| m.name())
                .collect::<Vec<_>>()
                .join(", ")
        )
        .dim()
    );
    println!("  {}", style("---").dim());
}

/// Print a chat's transcript, optionally only the last `limit` messages.
pub async fn show_chat(
    state: &AppState,
    user: &User,
    chat: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let summary = user_chat(state, chat)?;
    let messages = state.conversations.load_messages(&summary.chat.id).await?;
    let skip = limit.map_or(0, |n| messages.len().saturating_sub(n));
    let messages = &messages[skip..];

    if json {
        println!("{}", serde_json::to_string_pretty(messages)?);
        return Ok(());
    }

    print_chat_header(&summary);
    if messages.is_empty() {
        println!(
            "  {}",
            style(format!("No messages yet. Say hi with: parlor send {} hello", short_id(&summary.chat.id))).dim()
        );
    }
    for message in messages {
        print_message(&summary, message, user.id);
    }
    println!();

    Ok(())
}

/// Print the replies (and reply failures) from one send.
pub fn print_outcome(summary: &ChatSummary, outcome: &SendOutcome, user_id: Uuid) {
    for reply in &outcome.replies {
        print_message(summary, reply, user_id);
    }
    for failure in &outcome.failures {
        eprintln!(
            "  {} {} did not reply: {}",
            style("!").yellow().bold(),
            style(&failure.character_name).cyan(),
            failure.error
        );
    }
}

/// Send one message and print every reply.
pub async fn send_message(
    state: &AppState,
    user: &User,
    chat: &str,
    words: &[String],
    json: bool,
) -> Result<()> {
    let summary = user_chat(state, chat)?;
    let text = words.join(" ");

    let spinner = spinner("waiting for replies...", json);
    let outcome = state
        .conversations
        .send_message(user, &summary.chat.id, &text)
        .await;
    spinner.finish_and_clear();
    let outcome = outcome?;

    if json {
        let failures: Vec<serde_json::Value> = outcome
            .failures
            .iter()
            .map(|f| {
                serde_json::json!({
                    "character_id": f.character_id,
                    "character_name": f.character_name,
                    "error": f.error.to_string(),
                })
            })
            .collect();
        let result = serde_json::json!({
            "user_message": outcome.user_message,
            "replies": outcome.replies,
            "failures": failures,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        print_message(&summary, &outcome.user_message, user.id);
        print_outcome(&summary, &outcome, user.id);
        println!();
    }

    if outcome.nobody_replied() {
        bail!("no character replied in '{}'", summary.chat.name);
    }
    Ok(())
}
