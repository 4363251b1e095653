//! Composite chat queries built only on the repository ports.
//!
//! `ChatDirectory` joins chats, membership relations, users, characters and
//! messages into the shapes the front end lists: chat summaries with
//! resolved members and last message, and the characters a chat could add.

use std::collections::HashSet;

use futures_util::future::try_join_all;
use futures_util::try_join;
use parlor_types::character::Character;
use parlor_types::chat::{ChatMember, ChatSummary, Member, MemberKind, sort_by_activity};
use parlor_types::error::RepositoryError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::repository::character::CharacterRepository;
use crate::repository::chat::ChatRepository;
use crate::repository::message::MessageRepository;
use crate::repository::user::UserRepository;

/// Read-side view over the four repositories.
///
/// Generic over every repository trait so parlor-core never depends on
/// parlor-infra.
pub struct ChatDirectory<U, A, C, M>
where
    U: UserRepository,
    A: CharacterRepository,
    C: ChatRepository,
    M: MessageRepository,
{
    users: U,
    characters: A,
    chats: C,
    messages: M,
}

impl<U, A, C, M> ChatDirectory<U, A, C, M>
where
    U: UserRepository,
    A: CharacterRepository,
    C: ChatRepository,
    M: MessageRepository,
{
    pub fn new(users: U, characters: A, chats: C, messages: M) -> Self {
        Self {
            users,
            characters,
            chats,
            messages,
        }
    }

    pub fn users(&self) -> &U {
        &self.users
    }

    pub fn characters(&self) -> &A {
        &self.characters
    }

    pub fn chats(&self) -> &C {
        &self.chats
    }

    pub fn messages(&self) -> &M {
        &self.messages
    }

    /// Every chat the user belongs to, most recently active first.
    ///
    /// Chats, membership lists and last messages are fetched concurrently,
    /// then all member lists are resolved in one concurrent pass.
    pub async fn user_chats(&self, user_id: &Uuid) -> Result<Vec<ChatSummary>, RepositoryError> {
        let memberships = self.chats.list_memberships(user_id).await?;
        let chat_ids: Vec<Uuid> = memberships.iter().map(|m| m.chat_id).collect();

        let (chats, member_lists, last_messages) = try_join!(
            try_join_all(chat_ids.iter().map(|id| self.chats.get_by_id(id))),
            try_join_all(chat_ids.iter().map(|id| self.chats.list_members(id))),
            try_join_all(chat_ids.iter().map(|id| self.messages.last_for_chat(id))),
        )?;

        let members = self.resolve_members(&member_lists).await?;

        let mut summaries = Vec::with_capacity(chat_ids.len());
        for (((chat_id, chat), members), last_message) in chat_ids
            .iter()
            .zip(chats)
            .zip(members)
            .zip(last_messages)
        {
            let Some(chat) = chat else {
                warn!(chat_id = %chat_id, user_id = %user_id, "Skipping membership of missing chat");
                continue;
            };
            summaries.push(ChatSummary {
                chat,
                members,
                last_message,
            });
        }

        sort_by_activity(&mut summaries);
        debug!(user_id = %user_id, count = summaries.len(), "Loaded user chats");
        Ok(summaries)
    }

    /// Resolve several relation lists to their users and characters.
    ///
    /// The result has one entry per input group, in input order, and each
    /// group keeps relation order. `ai` relations resolve against characters,
    /// `user` relations against users. Relations whose target no longer
    /// exists are dropped.
    pub async fn resolve_members(
        &self,
        groups: &[Vec<ChatMember>],
    ) -> Result<Vec<Vec<Member>>, RepositoryError> {
        try_join_all(groups.iter().map(|group| async move {
            let resolved = try_join_all(group.iter().map(|relation| self.resolve_member(relation)))
                .await?;
            Ok::<_, RepositoryError>(resolved.into_iter().flatten().collect::<Vec<_>>())
        }))
        .await
    }

    async fn resolve_member(&self, relation: &ChatMember) -> Result<Option<Member>, RepositoryError> {
        let member = match relation.member_kind {
            MemberKind::Ai => self
                .characters
                .get_by_id(&relation.member_id)
                .await?
                .map(Member::Ai),
            MemberKind::User => self
                .users
                .get_by_id(&relation.member_id)
                .await?
                .map(Member::User),
        };

        if member.is_none() {
            warn!(
                chat_id = %relation.chat_id,
                member_id = %relation.member_id,
                member_kind = %relation.member_kind,
                "Dropping membership whose target no longer exists"
            );
        }
        Ok(member)
    }

    /// All characters (any owner) that are not yet members of the chat, in
    /// creation order.
    pub async fn available_characters(
        &self,
        chat_id: &Uuid,
    ) -> Result<Vec<Character>, RepositoryError> {
        let (all, members) = try_join!(self.characters.get_all(), self.chats.list_members(chat_id))?;

        let taken: HashSet<Uuid> = members.iter().map(|m| m.member_id).collect();
        Ok(all.into_iter().filter(|c| !taken.contains(&c.id)).collect())
    }

    /// One chat with its resolved members and last message.
    pub async fn chat_summary(&self, chat_id: &Uuid) -> Result<Option<ChatSummary>, RepositoryError> {
        let Some(chat) = self.chats.get_by_id(chat_id).await? else {
            return Ok(None);
        };

        let (relations, last_message) = try_join!(
            self.chats.list_members(chat_id),
            self.messages.last_for_chat(chat_id),
        )?;
        let members = self
            .resolve_members(std::slice::from_ref(&relations))
            .await?
            .pop()
            .unwrap_or_default();

        Ok(Some(ChatSummary {
            chat,
            members,
            last_message,
        }))
    }
}
