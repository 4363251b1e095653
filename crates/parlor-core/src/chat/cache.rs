//! In-memory cache of the signed-in user's chat list and transcripts.
//!
//! The cache is plain data; `ConversationService` keeps it behind a
//! `std::sync::RwLock` and never holds the guard across an `.await`.

use std::collections::HashMap;

use parlor_types::chat::{ChatMessage, ChatSummary};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct ChatCache {
    owner: Option<Uuid>,
    /// Chat summaries, most recently active first.
    chats: Vec<ChatSummary>,
    transcripts: HashMap<Uuid, Vec<ChatMessage>>,
}

impl ChatCache {
    /// Replace everything with the chat list of `owner`.
    pub fn init(&mut self, owner: Uuid, chats: Vec<ChatSummary>) {
        self.owner = Some(owner);
        self.chats = chats;
        self.transcripts.clear();
    }

    /// Drop every cached chat and transcript.
    pub fn clear(&mut self) {
        self.owner = None;
        self.chats.clear();
        self.transcripts.clear();
    }

    /// User whose chats are cached, if initialized.
    pub fn owner(&self) -> Option<Uuid> {
        self.owner
    }

    pub fn chats(&self) -> &[ChatSummary] {
        &self.chats
    }

    pub fn summary(&self, chat_id: &Uuid) -> Option<&ChatSummary> {
        self.chats.iter().find(|s| s.chat.id == *chat_id)
    }

    /// Insert or replace a summary and move it to the front of the list.
    pub fn put_front(&mut self, summary: ChatSummary) {
        self.chats.retain(|s| s.chat.id != summary.chat.id);
        self.chats.insert(0, summary);
    }

    pub fn set_transcript(&mut self, chat_id: Uuid, messages: Vec<ChatMessage>) {
        self.transcripts.insert(chat_id, messages);
    }

    pub fn transcript(&self, chat_id: &Uuid) -> Option<&[ChatMessage]> {
        self.transcripts.get(chat_id).map(Vec::as_slice)
    }

    /// The last `limit` transcript messages of a chat, oldest first.
    pub fn recent(&self, chat_id: &Uuid, limit: usize) -> Vec<ChatMessage> {
        let Some(messages) = self.transcripts.get(chat_id) else {
            return Vec::new();
        };
        let start = messages.len().saturating_sub(limit);
        messages[start..].to_vec()
    }

    /// Append a freshly persisted message to its transcript and make it the
    /// chat's last message, moving the chat to the front of the list.
    pub fn record_message(&mut self, message: &ChatMessage) {
        self.transcripts
            .entry(message.chat_id)
            .or_default()
            .push(message.clone());

        if let Some(index) = self.chats.iter().position(|s| s.chat.id == message.chat_id) {
            let mut summary = self.chats.remove(index);
            summary.last_message = Some(message.clone());
            self.chats.insert(0, summary);
        }
    }
}
