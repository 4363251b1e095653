//! SQLite message repository implementation.
//!
//! Messages are append-only from the application's point of view and always
//! read in creation order. `rowid` breaks ties between messages stamped in the
//! same microsecond.

use parlor_core::repository::message::MessageRepository;
use parlor_types::chat::{ChatMessage, NewMessage, UpdateMessageRequest};
use parlor_types::error::RepositoryError;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::debug;
use uuid::Uuid;

use super::pool::{
    Collection, DatabasePool, Index, TxMode, db_error, delete_by_id, fetch_all,
    fetch_all_by_index, fetch_by_id, format_datetime, is_foreign_key_violation, now,
    parse_datetime, parse_uuid, row_error,
};

const MESSAGES: Collection = Collection::Messages;

/// SQLite-backed implementation of `MessageRepository`.
#[derive(Clone)]
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn list_by(&self, index: Index, key: String) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.pool
            .run(MESSAGES, TxMode::ReadOnly, move |conn| {
                Box::pin(async move {
                    fetch_all_by_index(conn, index, &[key.as_str()])
                        .await?
                        .iter()
                        .map(decode_message)
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .await
    }

    /// Newest-first page of a chat's messages.
    async fn latest(&self, chat_id: Uuid, limit: u32) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.pool
            .run(MESSAGES, TxMode::ReadOnly, move |conn| {
                Box::pin(async move {
                    sqlx::query(
                        r#"SELECT * FROM messages WHERE chat_id = ?
                           ORDER BY rowid DESC
                           LIMIT ?"#,
                    )
                    .bind(chat_id.to_string())
                    .bind(i64::from(limit))
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(|e| db_error(MESSAGES, e))?
                    .iter()
                    .map(decode_message)
                    .collect::<Result<Vec<_>, _>>()
                })
            })
            .await
    }
}

/// Internal row type for mapping SQLite rows to domain ChatMessage.
struct MessageRow {
    id: String,
    chat_id: String,
    created_by: String,
    content: String,
    created_at: String,
    updated_at: Option<String>,
}

impl MessageRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            created_by: row.try_get("created_by")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        Ok(ChatMessage {
            id: parse_uuid(MESSAGES, "id", &self.id)?,
            chat_id: parse_uuid(MESSAGES, "chat_id", &self.chat_id)?,
            created_by: parse_uuid(MESSAGES, "created_by", &self.created_by)?,
            content: self.content,
            created_at: parse_datetime(MESSAGES, &self.created_at)?,
            updated_at: self
                .updated_at
                .as_deref()
                .map(|s| parse_datetime(MESSAGES, s))
                .transpose()?,
        })
    }
}

fn decode_message(row: &SqliteRow) -> Result<ChatMessage, RepositoryError> {
    MessageRow::from_row(row)
        .map_err(|e| row_error(MESSAGES, e))?
        .into_message()
}

impl MessageRepository for SqliteMessageRepository {
    async fn create(&self, message: &NewMessage) -> Result<ChatMessage, RepositoryError> {
        let message = ChatMessage {
            id: Uuid::now_v7(),
            chat_id: message.chat_id,
            created_by: message.created_by,
            content: message.content.clone(),
            created_at: now(),
            updated_at: None,
        };

        let created = self
            .pool
            .run(MESSAGES, TxMode::ReadWrite, move |conn| {
                Box::pin(async move {
                    sqlx::query(
                        r#"INSERT INTO messages (id, chat_id, created_by, content, created_at, updated_at)
                           VALUES (?, ?, ?, ?, ?, NULL)"#,
                    )
                    .bind(message.id.to_string())
                    .bind(message.chat_id.to_string())
                    .bind(message.created_by.to_string())
                    .bind(&message.content)
                    .bind(format_datetime(&message.created_at))
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| {
                        if is_foreign_key_violation(&e) {
                            RepositoryError::NotFound {
                                collection: Collection::Chats.record(),
                                id: message.chat_id,
                            }
                        } else {
                            db_error(MESSAGES, e)
                        }
                    })?;
                    Ok(message)
                })
            })
            .await?;

        debug!(
            message_id = %created.id,
            chat_id = %created.chat_id,
            len = created.content.len(),
            "Message created"
        );
        Ok(created)
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<ChatMessage>, RepositoryError> {
        let id = *id;
        self.pool
            .run(MESSAGES, TxMode::ReadOnly, move |conn| {
                Box::pin(async move {
                    fetch_by_id(conn, MESSAGES, id)
                        .await?
                        .as_ref()
                        .map(decode_message)
                        .transpose()
                })
            })
            .await
    }

    async fn get_all(&self) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.pool
            .run(MESSAGES, TxMode::ReadOnly, |conn| {
                Box::pin(async move {
                    fetch_all(conn, MESSAGES)
                        .await?
                        .iter()
                        .map(decode_message)
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .await
    }

    async fn list_for_chat(&self, chat_id: &Uuid) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.list_by(Index::MessageChat, chat_id.to_string()).await
    }

    async fn last_for_chat(&self, chat_id: &Uuid) -> Result<Option<ChatMessage>, RepositoryError> {
        Ok(self.latest(*chat_id, 1).await?.into_iter().next())
    }

    async fn recent_for_chat(
        &self,
        chat_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let mut messages = self.latest(*chat_id, limit).await?;
        messages.reverse();
        Ok(messages)
    }

    async fn list_by_author(&self, author_id: &Uuid) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.list_by(Index::MessageCreatedBy, author_id.to_string())
            .await
    }

    async fn update(
        &self,
        id: &Uuid,
        patch: UpdateMessageRequest,
    ) -> Result<Option<ChatMessage>, RepositoryError> {
        let id = *id;
        self.pool
            .run(MESSAGES, TxMode::ReadWrite, move |conn| {
                Box::pin(async move {
                    let Some(row) = fetch_by_id(&mut *conn, MESSAGES, id).await? else {
                        return Ok(None);
                    };
                    let mut message = decode_message(&row)?;
                    patch.apply(&mut message);
                    message.updated_at = Some(now());

                    sqlx::query("UPDATE messages SET content = ?, updated_at = ? WHERE id = ?")
                        .bind(&message.content)
                        .bind(message.updated_at.as_ref().map(format_datetime))
                        .bind(message.id.to_string())
                        .execute(&mut *conn)
                        .await
                        .map_err(|e| db_error(MESSAGES, e))?;

                    Ok(Some(message))
                })
            })
            .await
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let id = *id;
        let removed = self
            .pool
            .run(MESSAGES, TxMode::ReadWrite, move |conn| {
                Box::pin(async move { delete_by_id(conn, MESSAGES, id).await })
            })
            .await?;
        debug!(message_id = %id, removed, "Message deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::chat::SqliteChatRepository;
    use crate::sqlite::user::SqliteUserRepository;
    use parlor_core::repository::chat::ChatRepository;
    use parlor_core::repository::user::UserRepository;
    use parlor_types::chat::{ChatKind, NewChat};
    use parlor_types::user::NewUser;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::open(&url).await.unwrap()
    }

    /// A user and a chat they created.
    async fn setup(pool: &DatabasePool) -> (Uuid, Uuid) {
        let user = SqliteUserRepository::new(pool.clone())
            .create(&NewUser {
                username: "alice".to_string(),
                password_hash: "hash".to_string(),
                display_name: None,
            })
            .await
            .unwrap();
        let chat = SqliteChatRepository::new(pool.clone())
            .create(&NewChat {
                kind: ChatKind::Single,
                name: "Mika".to_string(),
                created_by: user.id,
            })
            .await
            .unwrap();
        (user.id, chat.id)
    }

    fn text(chat_id: Uuid, author: Uuid, content: &str) -> NewMessage {
        NewMessage {
            chat_id,
            created_by: author,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_transcript_keeps_insertion_order() {
        let pool = test_pool().await;
        let (user, chat) = setup(&pool).await;
        let repo = SqliteMessageRepository::new(pool);

        for content in ["one", "two", "three", "four"] {
            repo.create(&text(chat, user, content)).await.unwrap();
        }

        let contents: Vec<String> = repo
            .list_for_chat(&chat)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["one", "two", "three", "four"]);

        let last = repo.last_for_chat(&chat).await.unwrap().unwrap();
        assert_eq!(last.content, "four");
    }

    #[tokio::test]
    async fn test_recent_returns_tail_oldest_first() {
        let pool = test_pool().await;
        let (user, chat) = setup(&pool).await;
        let repo = SqliteMessageRepository::new(pool);

        for i in 0..5 {
            repo.create(&text(chat, user, &format!("m{i}"))).await.unwrap();
        }

        let recent: Vec<String> = repo
            .recent_for_chat(&chat, 3)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(recent, vec!["m2", "m3", "m4"]);
        assert_eq!(repo.recent_for_chat(&chat, 50).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_empty_chat_has_no_last_message() {
        let pool = test_pool().await;
        let (_, chat) = setup(&pool).await;
        let repo = SqliteMessageRepository::new(pool);

        assert!(repo.last_for_chat(&chat).await.unwrap().is_none());
        assert!(repo.list_for_chat(&chat).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_in_missing_chat_is_not_found() {
        let pool = test_pool().await;
        let (user, _) = setup(&pool).await;
        let repo = SqliteMessageRepository::new(pool);
        let ghost = Uuid::now_v7();

        let err = repo.create(&text(ghost, user, "hi")).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::NotFound { collection: "chat", id } if id == ghost
        ));
    }

    #[tokio::test]
    async fn test_list_by_author() {
        let pool = test_pool().await;
        let (user, chat) = setup(&pool).await;
        let repo = SqliteMessageRepository::new(pool);
        let character = Uuid::now_v7();

        repo.create(&text(chat, user, "hello")).await.unwrap();
        repo.create(&text(chat, character, "hi there")).await.unwrap();

        let by_character = repo.list_by_author(&character).await.unwrap();
        assert_eq!(by_character.len(), 1);
        assert_eq!(by_character[0].content, "hi there");
    }

    #[tokio::test]
    async fn test_chat_delete_removes_messages() {
        let pool = test_pool().await;
        let (user, chat) = setup(&pool).await;
        let repo = SqliteMessageRepository::new(pool.clone());
        repo.create(&text(chat, user, "bye")).await.unwrap();

        SqliteChatRepository::new(pool).delete(&chat).await.unwrap();
        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let pool = test_pool().await;
        let (user, chat) = setup(&pool).await;
        let repo = SqliteMessageRepository::new(pool);
        let created = repo.create(&text(chat, user, "typo")).await.unwrap();

        let updated = repo
            .update(
                &created.id,
                UpdateMessageRequest {
                    content: Some("fixed".to_string()),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.content, "fixed");
        assert_eq!(updated.created_at, created.created_at);

        repo.delete(&created.id).await.unwrap();
        assert!(repo.get_by_id(&created.id).await.unwrap().is_none());
    }
}
