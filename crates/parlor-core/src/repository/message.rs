//! Message repository trait definition.

use parlor_types::chat::{ChatMessage, NewMessage, UpdateMessageRequest};
use parlor_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for chat message persistence.
///
/// Messages are ordered by `created_at` ascending; messages created in the
/// same instant keep insertion order.
pub trait MessageRepository: Send + Sync {
    /// Append a message. Fails with `NotFound` if the chat does not exist.
    fn create(
        &self,
        message: &NewMessage,
    ) -> impl std::future::Future<Output = Result<ChatMessage, RepositoryError>> + Send;

    fn get_by_id(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ChatMessage>, RepositoryError>> + Send;

    fn get_all(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// Full transcript of a chat, oldest first.
    fn list_for_chat(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// Most recent message of a chat, if any.
    fn last_for_chat(
        &self,
        chat_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ChatMessage>, RepositoryError>> + Send;

    /// The `limit` most recent messages of a chat, returned oldest first.
    fn recent_for_chat(
        &self,
        chat_id: &Uuid,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// Messages written by a user or character, oldest first.
    fn list_by_author(
        &self,
        author_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;

    /// Merge `patch` into the stored message. `None` if the id does not exist.
    fn update(
        &self,
        id: &Uuid,
        patch: UpdateMessageRequest,
    ) -> impl std::future::Future<Output = Result<Option<ChatMessage>, RepositoryError>> + Send;

    /// Delete a message. Idempotent.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
