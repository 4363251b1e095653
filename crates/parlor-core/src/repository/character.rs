//! Character repository trait definition.

use parlor_types::character::{Character, NewCharacter, UpdateCharacterRequest};
use parlor_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for AI character persistence.
///
/// Implementations live in parlor-infra (e.g., `SqliteCharacterRepository`).
pub trait CharacterRepository: Send + Sync {
    /// Create a new character. Returns the stored record.
    fn create(
        &self,
        character: &NewCharacter,
    ) -> impl std::future::Future<Output = Result<Character, RepositoryError>> + Send;

    fn get_by_id(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Character>, RepositoryError>> + Send;

    /// All characters, any owner, in creation order.
    fn get_all(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Character>, RepositoryError>> + Send;

    /// Characters owned by a user, in creation order.
    fn list_by_creator(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Character>, RepositoryError>> + Send;

    /// Characters with exactly this name, in creation order.
    fn list_by_name(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Character>, RepositoryError>> + Send;

    /// Merge `patch` into the stored character. `None` if the id does not exist.
    fn update(
        &self,
        id: &Uuid,
        patch: UpdateCharacterRequest,
    ) -> impl std::future::Future<Output = Result<Option<Character>, RepositoryError>> + Send;

    /// Delete a character. Idempotent.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
