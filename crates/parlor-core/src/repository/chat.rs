//! Chat and membership repository trait definition.
//!
//! A chat and its membership relations are written together: memberships
//! reference their chat through a foreign key, and `create_with_members`
//! inserts both in one transaction.

use parlor_types::chat::{Chat, ChatKind, ChatMember, MemberRef, NewChat, UpdateChatRequest};
use parlor_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for chats and their membership relations.
///
/// Implementations live in parlor-infra (e.g., `SqliteChatRepository`).
pub trait ChatRepository: Send + Sync {
    /// Create a chat with no members.
    fn create(
        &self,
        chat: &NewChat,
    ) -> impl std::future::Future<Output = Result<Chat, RepositoryError>> + Send;

    /// Create a chat and one membership per entry of `members`, atomically.
    ///
    /// Each member must reference an existing user or character (according to
    /// its kind); otherwise `RepositoryError::NotFound` is returned and nothing
    /// is written. Memberships are stored in the given order.
    fn create_with_members(
        &self,
        chat: &NewChat,
        members: &[MemberRef],
    ) -> impl std::future::Future<Output = Result<(Chat, Vec<ChatMember>), RepositoryError>> + Send;

    fn get_by_id(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Chat>, RepositoryError>> + Send;

    /// All chats in creation order.
    fn get_all(&self) -> impl std::future::Future<Output = Result<Vec<Chat>, RepositoryError>> + Send;

    fn list_by_creator(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Chat>, RepositoryError>> + Send;

    fn list_by_kind(
        &self,
        kind: ChatKind,
    ) -> impl std::future::Future<Output = Result<Vec<Chat>, RepositoryError>> + Send;

    /// Merge `patch` into the stored chat. `None` if the id does not exist.
    fn update(
        &self,
        id: &Uuid,
        patch: UpdateChatRequest,
    ) -> impl std::future::Future<Output = Result<Option<Chat>, RepositoryError>> + Send;

    /// Delete a chat together with its memberships and messages. Idempotent.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    // --- Memberships ---

    /// Attach one participant to an existing chat.
    ///
    /// Fails with `Conflict` if the participant is already a member.
    fn add_member(
        &self,
        chat_id: &Uuid,
        member: MemberRef,
    ) -> impl std::future::Future<Output = Result<ChatMember, RepositoryError>> + Send;

    /// Membership relations of a chat, in the order they were added.
    fn list_members(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMember>, RepositoryError>> + Send;

    /// Every membership relation naming `member_id`, oldest first.
    fn list_memberships(
        &self,
        member_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMember>, RepositoryError>> + Send;

    /// Look up one relation through the composite `(chat_id, member_id)` index.
    fn get_membership(
        &self,
        chat_id: &Uuid,
        member_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ChatMember>, RepositoryError>> + Send;

    /// Remove a participant. Returns whether a relation was removed.
    fn remove_member(
        &self,
        chat_id: &Uuid,
        member_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
