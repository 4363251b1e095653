//! Character CLI commands: new, list, available.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Input;
use uuid::Uuid;

use parlor_core::repository::character::CharacterRepository;
use parlor_types::character::{Character, CharacterSpec};
use parlor_types::error::ConversationError;
use parlor_types::user::User;

use crate::cli::render::{preview, short_id};
use crate::cli::{lookup, spinner};
use crate::state::AppState;

/// Persona fields as given on the command line.
pub struct CharacterArgs {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub personality: Option<String>,
    pub background: Option<String>,
    pub description: Option<String>,
}

fn ask(prompt: &str, value: Option<String>, wizard: bool) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None if wizard => Ok(Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?),
        None => Ok(String::new()),
    }
}

/// Create a character and its one-on-one chat.
///
/// # Examples
///
/// ```bash
/// # Interactive wizard
/// parlor character new
///
/// # One-shot with flags
/// parlor character new --name Mika --personality cheerful --background barista
/// ```
pub async fn new_character(
    state: &AppState,
    user: &User,
    args: CharacterArgs,
    json: bool,
) -> Result<()> {
    let wizard = args.name.is_none();
    let name = match args.name {
        Some(n) => n,
        None => Input::<String>::new()
            .with_prompt("Character name")
            .interact_text()?,
    };
    let spec = CharacterSpec {
        gender: ask("Gender", args.gender, wizard)?,
        personality: ask("Personality", args.personality, wizard)?,
        background: ask("Background", args.background, wizard)?,
        description: ask("Anything else about them", args.description, wizard)?,
        name,
    };

    let spinner = spinner("Creating character...", json);
    let chat_id = state
        .conversations
        .start_single_conversation(user, spec)
        .await;
    spinner.finish_and_clear();
    let chat_id = chat_id?;

    let summary = state
        .conversations
        .chats()
        .into_iter()
        .find(|c| c.chat.id == chat_id)
        .ok_or(ConversationError::ChatNotFound(chat_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let character = summary.characters().next();
    println!();
    println!(
        "  {} Character created!",
        style("✓").green().bold()
    );
    println!();
    println!(
        "  {}  {}",
        style("Name:").bold(),
        style(&summary.chat.name).cyan()
    );
    if let Some(character) = character {
        println!(
            "  {}    {}",
            style("ID:").bold(),
            style(character.id.to_string()).dim()
        );
    }
    println!(
        "  {}  {}",
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

fn character_table(characters: &[Character], user_id: Uuid) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("Gender").fg(Color::White),
        Cell::new("Personality").fg(Color::White),
        Cell::new("Background").fg(Color::White),
        Cell::new("Creator").fg(Color::White),
        Cell::new("ID").fg(Color::White),
    ]);

    for character in characters {
        let creator = if character.created_by == user_id {
            Cell::new("you").fg(Color::Green)
        } else {
            Cell::new(short_id(&character.created_by)).fg(Color::DarkGrey)
        };
        table.add_row(vec![
            Cell::new(&character.name).fg(Color::Cyan),
            Cell::new(&character.gender),
            Cell::new(preview(&character.personality, 30)),
            Cell::new(preview(&character.background, 30)),
            creator,
            Cell::new(short_id(&character.id)).fg(Color::DarkGrey),
        ]);
    }
    table
}

fn print_characters(characters: &[Character], user_id: Uuid, empty_hint: &str) {
    if characters.is_empty() {
        println!();
        println!("  {} {}", style("i").blue().bold(), empty_hint);
        println!();
        return;
    }

    println!();
    println!("{}", character_table(characters, user_id));
    println!();
    println!(
        "  {} character{}",
        style(characters.len()).bold(),
        if characters.len() == 1 { "" } else { "s" }
    );
    println!();
}

/// List every character, or only the user's own.
pub async fn list_characters(state: &AppState, user: &User, mine: bool, json: bool) -> Result<()> {
    let characters = state.directory().characters();
    let characters = if mine {
        characters.list_by_creator(&user.id).await?
    } else {
        characters.get_all().await?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&characters)?);
        return Ok(());
    }

    print_characters(
        &characters,
        user.id,
        &format!(
            "No characters yet. Create one with: {}",
            style("parlor character new").yellow()
        ),
    );
    Ok(())
}

/// List the characters that are not yet members of a chat.
pub async fn available_characters(
    state: &AppState,
    user: &User,
    chat: &str,
    json: bool,
) -> Result<()> {
    let chats = state.conversations.chats();
    let chat_id = lookup::resolve_chat(&chats, chat)?;
    if !chats.iter().any(|c| c.chat.id == chat_id) {
        return Err(ConversationError::ChatNotFound(chat_id).into());
    }

    let characters = state.directory().available_characters(&chat_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&characters)?);
        return Ok(());
    }

    print_characters(&characters, user.id, "Every character is already in this chat.");
    Ok(())
}
