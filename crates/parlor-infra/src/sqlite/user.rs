//! SQLite user repository implementation.
//!
//! Implements `UserRepository` from `parlor-core` on top of
//! `DatabasePool::run`: raw queries, a private Row struct, and the generic
//! index helpers for lookups.

use parlor_core::repository::user::UserRepository;
use parlor_types::error::RepositoryError;
use parlor_types::user::{NewUser, UpdateUserRequest, User};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::debug;
use uuid::Uuid;

use super::pool::{
    Collection, DatabasePool, Index, TxMode, db_error, delete_by_id, fetch_all, fetch_by_id,
    fetch_one_by_index, format_datetime, now, parse_datetime, parse_uuid, row_error,
};

const USERS: Collection = Collection::Users;

/// SQLite-backed implementation of `UserRepository`.
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain User.
struct UserRow {
    id: String,
    username: String,
    password_hash: String,
    display_name: Option<String>,
    created_at: String,
    updated_at: Option<String>,
}

impl UserRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            display_name: row.try_get("display_name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_user(self) -> Result<User, RepositoryError> {
        Ok(User {
            id: parse_uuid(USERS, "id", &self.id)?,
            username: self.username,
            password_hash: self.password_hash,
            display_name: self.display_name,
            created_at: parse_datetime(USERS, &self.created_at)?,
            updated_at: self
                .updated_at
                .as_deref()
                .map(|s| parse_datetime(USERS, s))
                .transpose()?,
        })
    }
}

pub(crate) fn decode_user(row: &SqliteRow) -> Result<User, RepositoryError> {
    UserRow::from_row(row)
        .map_err(|e| row_error(USERS, e))?
        .into_user()
}

impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let user = User {
            id: Uuid::now_v7(),
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            display_name: user.display_name.clone(),
            created_at: now(),
            updated_at: None,
        };

        let created = self
            .pool
            .run(USERS, TxMode::ReadWrite, move |conn| {
                Box::pin(async move {
                    sqlx::query(
                        r#"INSERT INTO users (id, username, password_hash, display_name, created_at, updated_at)
                           VALUES (?, ?, ?, ?, ?, NULL)"#,
                    )
                    .bind(user.id.to_string())
                    .bind(&user.username)
                    .bind(&user.password_hash)
                    .bind(&user.display_name)
                    .bind(format_datetime(&user.created_at))
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| match db_error(USERS, e) {
                        RepositoryError::Conflict(_) => RepositoryError::Conflict(format!(
                            "username '{}' already exists",
                            user.username
                        )),
                        other => other,
                    })?;
                    Ok(user)
                })
            })
            .await?;

        debug!(user_id = %created.id, "User created");
        Ok(created)
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<User>, RepositoryError> {
        let id = *id;
        self.pool
            .run(USERS, TxMode::ReadOnly, move |conn| {
                Box::pin(async move {
                    fetch_by_id(conn, USERS, id)
                        .await?
                        .as_ref()
                        .map(decode_user)
                        .transpose()
                })
            })
            .await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let username = username.to_string();
        self.pool
            .run(USERS, TxMode::ReadOnly, move |conn| {
                Box::pin(async move {
                    fetch_one_by_index(conn, Index::UserUsername, &[username.as_str()])
                        .await?
                        .as_ref()
                        .map(decode_user)
                        .transpose()
                })
            })
            .await
    }

    async fn get_all(&self) -> Result<Vec<User>, RepositoryError> {
        self.pool
            .run(USERS, TxMode::ReadOnly, |conn| {
                Box::pin(async move {
                    fetch_all(conn, USERS)
                        .await?
                        .iter()
                        .map(decode_user)
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .await
    }

    async fn update(
        &self,
        id: &Uuid,
        patch: UpdateUserRequest,
    ) -> Result<Option<User>, RepositoryError> {
        let id = *id;
        self.pool
            .run(USERS, TxMode::ReadWrite, move |conn| {
                Box::pin(async move {
                    let Some(row) = fetch_by_id(&mut *conn, USERS, id).await? else {
                        return Ok(None);
                    };
                    let mut user = decode_user(&row)?;
                    patch.apply(&mut user);
                    user.updated_at = Some(now());

                    sqlx::query(
                        "UPDATE users SET username = ?, password_hash = ?, display_name = ?, updated_at = ? WHERE id = ?",
                    )
                    .bind(&user.username)
                    .bind(&user.password_hash)
                    .bind(&user.display_name)
                    .bind(user.updated_at.as_ref().map(format_datetime))
                    .bind(user.id.to_string())
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| db_error(USERS, e))?;

                    Ok(Some(user))
                })
            })
            .await
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let id = *id;
        let removed = self
            .pool
            .run(USERS, TxMode::ReadWrite, move |conn| {
                Box::pin(async move { delete_by_id(conn, USERS, id).await })
            })
            .await?;
        debug!(user_id = %id, removed, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::open(&url).await.unwrap()
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            display_name: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_by_id() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let created = repo.create(&new_user("alice")).await.unwrap();

        let fetched = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(fetched.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_get_by_username() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let created = repo.create(&new_user("alice")).await.unwrap();

        let found = repo.get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(repo.get_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let repo = SqliteUserRepository::new(test_pool().await);
        repo.create(&new_user("alice")).await.unwrap();

        let err = repo.create(&new_user("alice")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let repo = SqliteUserRepository::new(test_pool().await);
        assert!(repo.get_by_id(&Uuid::now_v7()).await.unwrap().is_none());
        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_and_stamps() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let created = repo.create(&new_user("alice")).await.unwrap();

        let updated = repo
            .update(
                &created.id,
                UpdateUserRequest {
                    display_name: Some(Some("Alice".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.display_name.as_deref(), Some("Alice"));
        assert_eq!(updated.username, "alice");
        assert!(updated.updated_at.is_some());

        let fetched = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched, updated);

        let missing = repo
            .update(&Uuid::now_v7(), UpdateUserRequest::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let created = repo.create(&new_user("alice")).await.unwrap();

        repo.delete(&created.id).await.unwrap();
        repo.delete(&created.id).await.unwrap();
        assert!(repo.get_by_id(&created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_all_in_creation_order() {
        let repo = SqliteUserRepository::new(test_pool().await);
        for name in ["carol", "alice", "bob"] {
            repo.create(&new_user(name)).await.unwrap();
        }
        let names: Vec<String> = repo
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["carol", "alice", "bob"]);
    }
}
