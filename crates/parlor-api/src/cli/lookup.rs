//! Resolve the chat and character references typed on the command line.
//!
//! A reference is a full UUID, an id prefix, or a name (case-insensitive).

use anyhow::{Result, anyhow, bail};
use parlor_types::character::Character;
use parlor_types::chat::ChatSummary;
use uuid::Uuid;

use super::render::short_id;

/// Minimum id prefix length accepted as a reference.
const MIN_PREFIX: usize = 4;

fn matches_prefix(id: &Uuid, query: &str) -> bool {
    let query = query.to_lowercase().replace('-', "");
    query.len() >= MIN_PREFIX && id.simple().to_string().starts_with(&query)
}

/// Pick one of the user's chats.
///
/// A full UUID is returned as-is so the service can report a missing chat.
pub fn resolve_chat(chats: &[ChatSummary], query: &str) -> Result<Uuid> {
    let query = query.trim();
    if let Ok(id) = Uuid::parse_str(query) {
        return Ok(id);
    }

    let by_name: Vec<&ChatSummary> = chats
        .iter()
        .filter(|c| c.chat.name.eq_ignore_ascii_case(query))
        .collect();
    let candidates = if by_name.is_empty() {
        chats
            .iter()
            .filter(|c| matches_prefix(&c.chat.id, query))
            .collect()
    } else {
        by_name
    };

    match candidates.as_slice() {
        [] => bail!("no chat matches '{query}' (see `parlor chats`)"),
        [one] => Ok(one.chat.id),
        many => Err(anyhow!(
            "'{query}' matches {} chats: {}; use an id instead",
            many.len(),
            many.iter()
                .map(|c| format!("{} ({})", c.chat.name, short_id(&c.chat.id)))
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}

/// Pick one character from `characters` by id, id prefix or name.
///
/// When a name is shared, the signed-in user's own character wins if it is
/// the only one they own under that name.
pub fn resolve_character<'a>(
    characters: &'a [Character],
    query: &str,
    user_id: Uuid,
) -> Result<&'a Character> {
    let query = query.trim();
    if let Ok(id) = Uuid::parse_str(query) {
        return characters
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| anyhow!("character '{id}' not found"));
    }

    let by_name: Vec<&Character> = characters
        .iter()
        .filter(|c| c.name.eq_ignore_ascii_case(query))
        .collect();
    let candidates: Vec<&Character> = if by_name.is_empty() {
        characters
            .iter()
            .filter(|c| matches_prefix(&c.id, query))
            .collect()
    } else {
        by_name
    };

    let owned: Vec<&Character> = candidates
        .iter()
        .copied()
        .filter(|c| c.created_by == user_id)
        .collect();

    match (candidates.as_slice(), owned.as_slice()) {
        ([], _) => bail!("no character matches '{query}' (see `parlor character list`)"),
        ([one], _) | (_, [one]) => Ok(*one),
        (many, _) => Err(anyhow!(
            "'{query}' matches {} characters; use an id instead: {}",
            many.len(),
            many.iter()
                .map(|c| short_id(&c.id))
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}
