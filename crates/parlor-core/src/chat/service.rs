//! Conversation service orchestrating chats, messages and AI replies.
//!
//! ConversationService owns the signed-in user's `ChatCache` and coordinates
//! the repositories (through `ChatDirectory`) with a `CompletionProvider`:
//! starting single and group conversations, loading transcripts, and sending
//! a message followed by one reply per AI participant.

use std::collections::HashSet;
use std::sync::RwLock;
use std::time::Duration;

use futures_util::future::try_join_all;
use parlor_types::character::{Character, CharacterSpec, NewCharacter};
use parlor_types::chat::{
    Chat, ChatKind, ChatMember, ChatMessage, ChatSummary, MemberRef, NewChat, NewMessage,
};
use parlor_types::config::{ConversationConfig, ReplyFailurePolicy};
use parlor_types::error::ConversationError;
use parlor_types::llm::{CompletionError, PromptMessage};
use parlor_types::user::User;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::chat::cache::ChatCache;
use crate::chat::directory::ChatDirectory;
use crate::chat::prompt;
use crate::llm::provider::CompletionProvider;
use crate::repository::character::CharacterRepository;
use crate::repository::chat::ChatRepository;
use crate::repository::message::MessageRepository;
use crate::repository::user::UserRepository;

/// One AI participant that did not reply during a send.
#[derive(Debug)]
pub struct ReplyFailure {
    pub character_id: Uuid,
    pub character_name: String,
    pub error: CompletionError,
}

/// Result of [`ConversationService::send_message`].
#[derive(Debug)]
pub struct SendOutcome {
    /// The persisted user message.
    pub user_message: ChatMessage,
    /// Persisted AI replies, in membership order.
    pub replies: Vec<ChatMessage>,
    /// Participants that failed to reply (only under `ReplyFailurePolicy::Isolate`).
    pub failures: Vec<ReplyFailure>,
}

impl SendOutcome {
    /// True when participants were asked to reply and every one of them failed.
    pub fn nobody_replied(&self) -> bool {
        self.replies.is_empty() && !self.failures.is_empty()
    }
}

/// Orchestrates conversations for the signed-in user.
///
/// Generic over every repository trait and the completion provider to
/// maintain clean architecture (parlor-core never depends on parlor-infra).
pub struct ConversationService<U, A, C, M, P>
where
    U: UserRepository,
    A: CharacterRepository,
    C: ChatRepository,
    M: MessageRepository,
    P: CompletionProvider,
{
    directory: ChatDirectory<U, A, C, M>,
    provider: P,
    config: ConversationConfig,
    cache: RwLock<ChatCache>,
}

impl<U, A, C, M, P> ConversationService<U, A, C, M, P>
where
    U: UserRepository,
    A: CharacterRepository,
    C: ChatRepository,
    M: MessageRepository,
    P: CompletionProvider,
{
    pub fn new(directory: ChatDirectory<U, A, C, M>, provider: P, config: ConversationConfig) -> Self {
        Self {
            directory,
            provider,
            config,
            cache: RwLock::new(ChatCache::default()),
        }
    }

    /// Access the underlying chat directory (and through it, the repositories).
    pub fn directory(&self) -> &ChatDirectory<U, A, C, M> {
        &self.directory
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    // --- Cache lifecycle ---

    /// Load the user's chats into the cache, replacing anything cached.
    pub async fn init(&self, user: &User) -> Result<Vec<ChatSummary>, ConversationError> {
        let chats = self.directory.user_chats(&user.id).await?;
        self.cache
            .write()
            .expect("chat cache lock poisoned")
            .init(user.id, chats.clone());
        info!(user_id = %user.id, chats = chats.len(), "Chat cache initialized");
        Ok(chats)
    }

    /// Drop every cached chat and transcript (called on logout).
    pub fn clear(&self) {
        self.cache.write().expect("chat cache lock poisoned").clear();
        debug!("Chat cache cleared");
    }

    /// Cached chat summaries, most recently active first.
    pub fn chats(&self) -> Vec<ChatSummary> {
        self.cache.read().expect("chat cache lock poisoned").chats().to_vec()
    }

    /// Cached transcript of a chat, if loaded.
    pub fn transcript(&self, chat_id: &Uuid) -> Option<Vec<ChatMessage>> {
        self.cache
            .read()
            .expect("chat cache lock poisoned")
            .transcript(chat_id)
            .map(<[ChatMessage]>::to_vec)
    }

    // --- Starting conversations ---

    /// Create a character and a `single` chat between it and `user`.
    ///
    /// If the chat cannot be created, the new character is deleted again and
    /// the error is returned. Returns the new chat's id.
    pub async fn start_single_conversation(
        &self,
        user: &User,
        spec: CharacterSpec,
    ) -> Result<Uuid, ConversationError> {
        if spec.name.trim().is_empty() {
            return Err(ConversationError::InvalidInput(
                "character name cannot be empty".to_string(),
            ));
        }

        let character = self
            .directory
            .characters()
            .create(&NewCharacter {
                spec,
                created_by: user.id,
            })
            .await?;

        let new_chat = NewChat {
            kind: ChatKind::Single,
            name: character.name.clone(),
            created_by: user.id,
        };
        let members = [MemberRef::user(user.id), MemberRef::ai(character.id)];

        let (chat, relations) = match self
            .directory
            .chats()
            .create_with_members(&new_chat, &members)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                warn!(character_id = %character.id, error = %e, "Chat creation failed, removing new character");
                if let Err(cleanup) = self.directory.characters().delete(&character.id).await {
                    warn!(character_id = %character.id, error = %cleanup, "Failed to remove orphaned character");
                }
                return Err(e.into());
            }
        };

        let chat_id = chat.id;
        self.cache_new_chat(chat, relations).await?;
        info!(chat_id = %chat_id, character = %character.name, "Single conversation started");
        Ok(chat_id)
    }

    /// Create a `group` chat with `user` and the given characters, in order.
    ///
    /// Every character must exist. Returns the new chat's id.
    pub async fn start_group_conversation(
        &self,
        user: &User,
        name: &str,
        character_ids: &[Uuid],
    ) -> Result<Uuid, ConversationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConversationError::InvalidInput(
                "group name cannot be empty".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(character_ids.len());
        if let Some(duplicate) = character_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(ConversationError::InvalidInput(format!(
                "character '{duplicate}' listed more than once"
            )));
        }

        let characters = self.directory.characters();
        let found = try_join_all(character_ids.iter().map(|id| characters.get_by_id(id))).await?;
        if let Some((id, _)) = character_ids.iter().zip(&found).find(|(_, c)| c.is_none()) {
            return Err(ConversationError::CharacterNotFound(*id));
        }

        let new_chat = NewChat {
            kind: ChatKind::Group,
            name: name.to_string(),
            created_by: user.id,
        };
        let members: Vec<MemberRef> = std::iter::once(MemberRef::user(user.id))
            .chain(character_ids.iter().copied().map(MemberRef::ai))
            .collect();

        let (chat, relations) = self
            .directory
            .chats()
            .create_with_members(&new_chat, &members)
            .await?;

        let chat_id = chat.id;
        self.cache_new_chat(chat, relations).await?;
        info!(chat_id = %chat_id, members = members.len(), "Group conversation started");
        Ok(chat_id)
    }

    async fn cache_new_chat(
        &self,
        chat: Chat,
        relations: Vec<ChatMember>,
    ) -> Result<(), ConversationError> {
        let members = self
            .directory
            .resolve_members(std::slice::from_ref(&relations))
            .await?
            .pop()
            .unwrap_or_default();

        let chat_id = chat.id;
        let mut cache = self.cache.write().expect("chat cache lock poisoned");
        cache.put_front(ChatSummary {
            chat,
            members,
            last_message: None,
        });
        cache.set_transcript(chat_id, Vec::new());
        Ok(())
    }

    // --- Messages ---

    /// Load the full transcript of a chat into the cache.
    pub async fn load_messages(&self, chat_id: &Uuid) -> Result<Vec<ChatMessage>, ConversationError> {
        let messages = self.directory.messages().list_for_chat(chat_id).await?;
        self.cache
            .write()
            .expect("chat cache lock poisoned")
            .set_transcript(*chat_id, messages.clone());
        debug!(chat_id = %chat_id, count = messages.len(), "Transcript loaded");
        Ok(messages)
    }

    /// Summary of a chat the user belongs to, from the cache or the store.
    async fn ensure_chat(&self, user: &User, chat_id: &Uuid) -> Result<ChatSummary, ConversationError> {
        let cached = self
            .cache
            .read()
            .expect("chat cache lock poisoned")
            .summary(chat_id)
            .cloned();

        let summary = match cached {
            Some(summary) => summary,
            None => {
                let summary = self
                    .directory
                    .chat_summary(chat_id)
                    .await?
                    .ok_or(ConversationError::ChatNotFound(*chat_id))?;
                if summary.members.iter().any(|m| m.id() == user.id) {
                    self.cache
                        .write()
                        .expect("chat cache lock poisoned")
                        .put_front(summary.clone());
                }
                summary
            }
        };

        if !summary.members.iter().any(|m| m.id() == user.id) {
            return Err(ConversationError::ChatNotFound(*chat_id));
        }

        let has_transcript = self
            .cache
            .read()
            .expect("chat cache lock poisoned")
            .transcript(chat_id)
            .is_some();
        if !has_transcript {
            self.load_messages(chat_id).await?;
        }

        Ok(summary)
    }

    /// Persist a message from `user`, then collect one reply from every AI
    /// member in membership order.
    ///
    /// Replies are strictly sequential: each character sees the replies
    /// written before it in the same send. Messages already persisted are
    /// kept even when a later reply fails.
    pub async fn send_message(
        &self,
        user: &User,
        chat_id: &Uuid,
        text: &str,
    ) -> Result<SendOutcome, ConversationError> {
        if text.trim().is_empty() {
            return Err(ConversationError::EmptyMessage);
        }

        let summary = self.ensure_chat(user, chat_id).await?;

        let user_message = self
            .directory
            .messages()
            .create(&NewMessage {
                chat_id: *chat_id,
                created_by: user.id,
                content: text.to_string(),
            })
            .await?;
        self.cache
            .write()
            .expect("chat cache lock poisoned")
            .record_message(&user_message);

        let characters: Vec<Character> = summary.characters().cloned().collect();
        let mut replies = Vec::with_capacity(characters.len());
        let mut failures = Vec::new();

        for character in characters {
            let context = self
                .cache
                .read()
                .expect("chat cache lock poisoned")
                .recent(chat_id, self.config.context_window);
            let messages =
                prompt::build_messages(&character, &context, user.id, self.config.context_window);

            let content = match self.complete_as(&character, &messages).await {
                Ok(content) => content,
                Err(error) => match self.config.failure_policy {
                    ReplyFailurePolicy::Isolate => {
                        warn!(
                            chat_id = %chat_id,
                            character = %character.name,
                            error = %error,
                            "Character failed to reply, continuing"
                        );
                        failures.push(ReplyFailure {
                            character_id: character.id,
                            character_name: character.name.clone(),
                            error,
                        });
                        continue;
                    }
                    ReplyFailurePolicy::Abort => {
                        return Err(ConversationError::Completion {
                            character: character.name.clone(),
                            source: error,
                        });
                    }
                },
            };

            let reply = self
                .directory
                .messages()
                .create(&NewMessage {
                    chat_id: *chat_id,
                    created_by: character.id,
                    content,
                })
                .await?;
            self.cache
                .write()
                .expect("chat cache lock poisoned")
                .record_message(&reply);
            replies.push(reply);
        }

        info!(
            chat_id = %chat_id,
            replies = replies.len(),
            failures = failures.len(),
            "Message sent"
        );
        Ok(SendOutcome {
            user_message,
            replies,
            failures,
        })
    }

    /// Call the provider on behalf of `character`, bounded by the reply timeout.
    async fn complete_as(
        &self,
        character: &Character,
        messages: &[PromptMessage],
    ) -> Result<String, CompletionError> {
        let secs = self.config.reply_timeout_secs;
        let span = info_span!(
            "gen_ai.chat",
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = self.provider.name(),
            gen_ai.request.model = %self.provider.model(),
            gen_ai.agent.id = %character.id,
            gen_ai.agent.name = %character.name,
        );

        match tokio::time::timeout(Duration::from_secs(secs), self.provider.complete(messages))
            .instrument(span)
            .await
        {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout { secs }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify ConversationService is generic over the right traits
    fn _assert_service_generic<U, A, C, M, P>()
    where
        U: UserRepository,
        A: CharacterRepository,
        C: ChatRepository,
        M: MessageRepository,
        P: CompletionProvider,
    {
        fn _takes_service<U, A, C, M, P>(_s: &ConversationService<U, A, C, M, P>)
        where
            U: UserRepository,
            A: CharacterRepository,
            C: ChatRepository,
            M: MessageRepository,
            P: CompletionProvider,
        {
        }
    }

    #[test]
    fn test_reply_failure_carries_completion_error() {
        let failure = ReplyFailure {
            character_id: Uuid::now_v7(),
            character_name: "Mika".to_string(),
            error: CompletionError::Timeout { secs: 1 },
        };
        assert_eq!(failure.error.to_string(), "completion timed out after 1s");
    }

    fn message(content: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::now_v7(),
            chat_id: Uuid::now_v7(),
            created_by: Uuid::now_v7(),
            content: content.to_string(),
            created_at: chrono::Utc::now(),
            updated_at: None,
        }
    }

    fn failure(name: &str) -> ReplyFailure {
        ReplyFailure {
            character_id: Uuid::now_v7(),
            character_name: name.to_string(),
            error: CompletionError::NotConfigured("PARLOR_API_KEY is not set".to_string()),
        }
    }

    #[test]
    fn test_nobody_replied() {
        let all_failed = SendOutcome {
            user_message: message("hi"),
            replies: vec![],
            failures: vec![failure("Mika"), failure("Ren")],
        };
        assert!(all_failed.nobody_replied());

        let partial = SendOutcome {
            user_message: message("hi"),
            replies: vec![message("hello")],
            failures: vec![failure("Ren")],
        };
        assert!(!partial.nobody_replied());

        let quiet = SendOutcome {
            user_message: message("hi"),
            replies: vec![],
            failures: vec![],
        };
        assert!(!quiet.nobody_replied());
    }
}
