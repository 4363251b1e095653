//! Prompt assembly for character replies.
//!
//! Each reply request is one `system` message carrying the persona, followed
//! by the tail of the chat transcript. Messages written by the person sending
//! are tagged `user`; everything else (this character and any other
//! character in a group) is tagged `assistant`.

use parlor_types::character::Character;
use parlor_types::chat::ChatMessage;
use parlor_types::llm::PromptMessage;
use uuid::Uuid;

/// Persona system prompt for a character.
pub fn persona_prompt(character: &Character) -> String {
    format!(
        "From now on, you are {name}, a {gender} chatting with the user. \
         Your personality is {personality}, and your background is {background}. \
         {description}. Speak casually, the way people talk on social media.",
        name = character.name,
        gender = character.gender,
        personality = character.personality,
        background = character.background,
        description = character.description.trim_end_matches('.'),
    )
}

/// The last `window` transcript messages as role-tagged prompt messages,
/// oldest first.
pub fn context_window(transcript: &[ChatMessage], user_id: Uuid, window: usize) -> Vec<PromptMessage> {
    let start = transcript.len().saturating_sub(window);
    transcript[start..]
        .iter()
        .map(|message| {
            if message.created_by == user_id {
                PromptMessage::user(message.content.clone())
            } else {
                PromptMessage::assistant(message.content.clone())
            }
        })
        .collect()
}

/// Full request messages for `character`: persona prompt, then context.
pub fn build_messages(
    character: &Character,
    transcript: &[ChatMessage],
    user_id: Uuid,
    window: usize,
) -> Vec<PromptMessage> {
    let mut messages = Vec::with_capacity(window.min(transcript.len()) + 1);
    messages.push(PromptMessage::system(persona_prompt(character)));
    messages.extend(context_window(transcript, user_id, window));
    messages
}
