//! Chat, membership relation, and message types for Parlor.
//!
//! A chat links one human to one (`single`) or several (`group`) AI characters
//! through membership relations. Messages are append-only and ordered by
//! creation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use crate::character::Character;
use crate::user::User;

/// Kind of chat.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (kind IN ('single', 'group'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    /// One human and exactly one AI member.
    Single,
    /// One human and any number of AI members.
    Group,
}

impl fmt::Display for ChatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatKind::Single => write!(f, "single"),
            ChatKind::Group => write!(f, "group"),
        }
    }
}

impl FromStr for ChatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(ChatKind::Single),
            "group" => Ok(ChatKind::Group),
            other => Err(format!("invalid chat kind: '{other}'")),
        }
    }
}

/// A conversation container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub kind: ChatKind,
    /// Display name (the character's name for single chats).
    pub name: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Data required to create a chat. The repository assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewChat {
    pub kind: ChatKind,
    pub name: String,
    pub created_by: Uuid,
}

/// Partial update for a chat.
#[derive(Debug, Clone, Default)]
pub struct UpdateChatRequest {
    pub name: Option<String>,
}

impl UpdateChatRequest {
    /// Merge this patch into `chat`.
    pub fn apply(self, chat: &mut Chat) {
        if let Some(name) = self.name {
            chat.name = name;
        }
    }
}

/// Whether a chat member is a person or an AI character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    User,
    Ai,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::User => write!(f, "user"),
            MemberKind::Ai => write!(f, "ai"),
        }
    }
}

impl FromStr for MemberKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MemberKind::User),
            "ai" => Ok(MemberKind::Ai),
            other => Err(format!("invalid member kind: '{other}'")),
        }
    }
}

/// Membership relation linking a chat to one participant.
///
/// `(chat_id, member_id)` is unique: a participant joins a chat at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMember {
    pub id: Uuid,
    pub chat_id: Uuid,
    /// A user id or a character id, depending on `member_kind`.
    pub member_id: Uuid,
    pub member_kind: MemberKind,
    pub created_at: DateTime<Utc>,
}

/// A participant to attach to a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRef {
    pub member_id: Uuid,
    pub member_kind: MemberKind,
}

impl MemberRef {
    pub fn user(id: Uuid) -> Self {
        Self {
            member_id: id,
            member_kind: MemberKind::User,
        }
    }

    pub fn ai(id: Uuid) -> Self {
        Self {
            member_id: id,
            member_kind: MemberKind::Ai,
        }
    }
}

/// A membership relation resolved to the record it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Member {
    User(User),
    Ai(Character),
}

impl Member {
    pub fn id(&self) -> Uuid {
        match self {
            Member::User(user) => user.id,
            Member::Ai(character) => character.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Member::User(user) => user.label(),
            Member::Ai(character) => &character.name,
        }
    }

    pub fn kind(&self) -> MemberKind {
        match self {
            Member::User(_) => MemberKind::User,
            Member::Ai(_) => MemberKind::Ai,
        }
    }

    /// The character behind an AI member.
    pub fn as_character(&self) -> Option<&Character> {
        match self {
            Member::Ai(character) => Some(character),
            Member::User(_) => None,
        }
    }
}

/// A single message within a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    /// Author: a user id or a character id.
    pub created_by: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Data required to create a message. The repository assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: Uuid,
    pub created_by: Uuid,
    pub content: String,
}

/// Partial update for a message.
#[derive(Debug, Clone, Default)]
pub struct UpdateMessageRequest {
    pub content: Option<String>,
}

impl UpdateMessageRequest {
    /// Merge this patch into `message`.
    pub fn apply(self, message: &mut ChatMessage) {
        if let Some(content) = self.content {
            message.content = content;
        }
    }
}

/// A chat joined with its resolved members and its last message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub chat: Chat,
    pub members: Vec<Member>,
    pub last_message: Option<ChatMessage>,
}

impl ChatSummary {
    /// Last message time if any, else the chat's creation time.
    pub fn activity_time(&self) -> DateTime<Utc> {
        self.last_message
            .as_ref()
            .map(|m| m.created_at)
            .unwrap_or(self.chat.created_at)
    }

    /// AI members in membership order.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.members.iter().filter_map(Member::as_character)
    }
}

/// Sort summaries by activity time, most recent first.
///
/// The sort is stable, so chats with equal activity keep their relative order.
pub fn sort_by_activity(summaries: &mut [ChatSummary]) {
    summaries.sort_by_key(|s| Reverse(s.activity_time()));
}
