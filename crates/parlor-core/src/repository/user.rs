//! User repository trait definition.

use parlor_types::error::RepositoryError;
use parlor_types::user::{NewUser, UpdateUserRequest, User};
use uuid::Uuid;

/// Repository trait for user persistence.
///
/// Implementations live in parlor-infra (e.g., `SqliteUserRepository`).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait UserRepository: Send + Sync {
    /// Create a new user with a fresh id. Fails with `Conflict` if the
    /// username is already taken.
    fn create(
        &self,
        user: &NewUser,
    ) -> impl std::future::Future<Output = Result<User, RepositoryError>> + Send;

    fn get_by_id(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Look up a user through the unique username index.
    fn get_by_username(
        &self,
        username: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// All users in creation order.
    fn get_all(&self) -> impl std::future::Future<Output = Result<Vec<User>, RepositoryError>> + Send;

    /// Merge `patch` into the stored user and stamp `updated_at`.
    ///
    /// Returns `None` if no user has this id.
    fn update(
        &self,
        id: &Uuid,
        patch: UpdateUserRequest,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Delete a user. Deleting a missing id is not an error.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
