//! SQLite chat repository implementation.
//!
//! Implements `ChatRepository` from `parlor-core`: chats and their
//! membership relations. A membership's `member_id` points at a user or a
//! character depending on `member_kind`, so the schema cannot enforce it
//! with a foreign key; writes check the target inside the same transaction.

use parlor_core::repository::chat::ChatRepository;
use parlor_types::chat::{
    Chat, ChatKind, ChatMember, MemberKind, MemberRef, NewChat, UpdateChatRequest,
};
use parlor_types::error::RepositoryError;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use tracing::debug;
use uuid::Uuid;

use super::pool::{
    Collection, DatabasePool, Index, TxMode, db_error, delete_by_id, fetch_all,
    fetch_all_by_index, fetch_by_id, fetch_one_by_index, format_datetime,
    is_foreign_key_violation, now, parse_datetime, parse_uuid, row_error,
};

const CHATS: Collection = Collection::Chats;
const MEMBERS: Collection = Collection::ChatMembers;

/// SQLite-backed implementation of `ChatRepository`.
#[derive(Clone)]
pub struct SqliteChatRepository {
    pool: DatabasePool,
}

impl SqliteChatRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn list_chats_by(&self, index: Index, key: String) -> Result<Vec<Chat>, RepositoryError> {
        self.pool
            .run(CHATS, TxMode::ReadOnly, move |conn| {
                Box::pin(async move {
                    fetch_all_by_index(conn, index, &[key.as_str()])
                        .await?
                        .iter()
                        .map(decode_chat)
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .await
    }

    async fn list_members_by(
        &self,
        index: Index,
        key: String,
    ) -> Result<Vec<ChatMember>, RepositoryError> {
        self.pool
            .run(MEMBERS, TxMode::ReadOnly, move |conn| {
                Box::pin(async move {
                    fetch_all_by_index(conn, index, &[key.as_str()])
                        .await?
                        .iter()
                        .map(decode_member)
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .await
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

/// Internal row type for mapping SQLite rows to domain Chat.
struct ChatRow {
    id: String,
    kind: String,
    name: String,
    created_by: String,
    created_at: String,
    updated_at: Option<String>,
}

impl ChatRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            kind: row.try_get("kind")?,
            name: row.try_get("name")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_chat(self) -> Result<Chat, RepositoryError> {
        let kind: ChatKind = self.kind.parse().map_err(|reason| RepositoryError::Corrupt {
            collection: CHATS.table(),
            reason,
        })?;

        Ok(Chat {
            id: parse_uuid(CHATS, "id", &self.id)?,
            kind,
            name: self.name,
            created_by: parse_uuid(CHATS, "created_by", &self.created_by)?,
            created_at: parse_datetime(CHATS, &self.created_at)?,
            updated_at: self
                .updated_at
                .as_deref()
                .map(|s| parse_datetime(CHATS, s))
                .transpose()?,
        })
    }
}

/// Internal row type for mapping SQLite rows to domain ChatMember.
struct ChatMemberRow {
    id: String,
    chat_id: String,
    member_id: String,
    member_kind: String,
    created_at: String,
}

impl ChatMemberRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            member_id: row.try_get("member_id")?,
            member_kind: row.try_get("member_kind")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_member(self) -> Result<ChatMember, RepositoryError> {
        let member_kind: MemberKind =
            self.member_kind
                .parse()
                .map_err(|reason| RepositoryError::Corrupt {
                    collection: MEMBERS.table(),
                    reason,
                })?;

        Ok(ChatMember {
            id: parse_uuid(MEMBERS, "id", &self.id)?,
            chat_id: parse_uuid(MEMBERS, "chat_id", &self.chat_id)?,
            member_id: parse_uuid(MEMBERS, "member_id", &self.member_id)?,
            member_kind,
            created_at: parse_datetime(MEMBERS, &self.created_at)?,
        })
    }
}

fn decode_chat(row: &SqliteRow) -> Result<Chat, RepositoryError> {
    ChatRow::from_row(row)
        .map_err(|e| row_error(CHATS, e))?
        .into_chat()
}

fn decode_member(row: &SqliteRow) -> Result<ChatMember, RepositoryError> {
    ChatMemberRow::from_row(row)
        .map_err(|e| row_error(MEMBERS, e))?
        .into_member()
}

// ---------------------------------------------------------------------------
// Helpers shared by the transactional writes
// ---------------------------------------------------------------------------

fn target_collection(kind: MemberKind) -> Collection {
    match kind {
        MemberKind::User => Collection::Users,
        MemberKind::Ai => Collection::Characters,
    }
}

async fn insert_chat(conn: &mut SqliteConnection, chat: &Chat) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"INSERT INTO chats (id, kind, name, created_by, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, NULL)"#,
    )
    .bind(chat.id.to_string())
    .bind(chat.kind.to_string())
    .bind(&chat.name)
    .bind(chat.created_by.to_string())
    .bind(format_datetime(&chat.created_at))
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            RepositoryError::NotFound {
                collection: Collection::Users.record(),
                id: chat.created_by,
            }
        } else {
            db_error(CHATS, e)
        }
    })?;
    Ok(())
}

/// Check the member's target exists, then insert the relation.
async fn insert_member(
    conn: &mut SqliteConnection,
    chat_id: Uuid,
    member: MemberRef,
) -> Result<ChatMember, RepositoryError> {
    let target = target_collection(member.member_kind);
    if fetch_by_id(&mut *conn, target, member.member_id)
        .await?
        .is_none()
    {
        return Err(RepositoryError::NotFound {
            collection: target.record(),
            id: member.member_id,
        });
    }

    let relation = ChatMember {
        id: Uuid::now_v7(),
        chat_id,
        member_id: member.member_id,
        member_kind: member.member_kind,
        created_at: now(),
    };

    sqlx::query(
        r#"INSERT INTO chat_members (id, chat_id, member_id, member_kind, created_at)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(relation.id.to_string())
    .bind(relation.chat_id.to_string())
    .bind(relation.member_id.to_string())
    .bind(relation.member_kind.to_string())
    .bind(format_datetime(&relation.created_at))
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if is_foreign_key_violation(&e) {
            RepositoryError::NotFound {
                collection: CHATS.record(),
                id: chat_id,
            }
        } else {
            match db_error(MEMBERS, e) {
                RepositoryError::Conflict(_) => RepositoryError::Conflict(format!(
                    "'{}' is already a member of chat '{chat_id}'",
                    member.member_id
                )),
                other => other,
            }
        }
    })?;

    Ok(relation)
}

fn new_chat_record(chat: &NewChat) -> Chat {
    Chat {
        id: Uuid::now_v7(),
        kind: chat.kind,
        name: chat.name.clone(),
        created_by: chat.created_by,
        created_at: now(),
        updated_at: None,
    }
}

// ---------------------------------------------------------------------------
// ChatRepository implementation
// ---------------------------------------------------------------------------

impl ChatRepository for SqliteChatRepository {
    async fn create(&self, chat: &NewChat) -> Result<Chat, RepositoryError> {
        let chat = new_chat_record(chat);
        let created = self
            .pool
            .run(CHATS, TxMode::ReadWrite, move |conn| {
                Box::pin(async move {
                    insert_chat(conn, &chat).await?;
                    Ok(chat)
                })
            })
            .await?;

        debug!(chat_id = %created.id, kind = %created.kind, "Chat created");
        Ok(created)
    }

    async fn create_with_members(
        &self,
        chat: &NewChat,
        members: &[MemberRef],
    ) -> Result<(Chat, Vec<ChatMember>), RepositoryError> {
        let chat = new_chat_record(chat);
        let members = members.to_vec();

        let (created, relations) = self
            .pool
            .run(CHATS, TxMode::ReadWrite, move |conn| {
                Box::pin(async move {
                    insert_chat(&mut *conn, &chat).await?;
                    let mut relations = Vec::with_capacity(members.len());
                    for member in members {
                        relations.push(insert_member(&mut *conn, chat.id, member).await?);
                    }
                    Ok((chat, relations))
                })
            })
            .await?;

        debug!(
            chat_id = %created.id,
            kind = %created.kind,
            members = relations.len(),
            "Chat created with members"
        );
        Ok((created, relations))
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<Chat>, RepositoryError> {
        let id = *id;
        self.pool
            .run(CHATS, TxMode::ReadOnly, move |conn| {
                Box::pin(async move {
                    fetch_by_id(conn, CHATS, id)
                        .await?
                        .as_ref()
                        .map(decode_chat)
                        .transpose()
                })
            })
            .await
    }

    async fn get_all(&self) -> Result<Vec<Chat>, RepositoryError> {
        self.pool
            .run(CHATS, TxMode::ReadOnly, |conn| {
                Box::pin(async move {
                    fetch_all(conn, CHATS)
                        .await?
                        .iter()
                        .map(decode_chat)
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .await
    }

    async fn list_by_creator(&self, user_id: &Uuid) -> Result<Vec<Chat>, RepositoryError> {
        self.list_chats_by(Index::ChatCreatedBy, user_id.to_string())
            .await
    }

    async fn list_by_kind(&self, kind: ChatKind) -> Result<Vec<Chat>, RepositoryError> {
        self.list_chats_by(Index::ChatKind, kind.to_string()).await
    }

    async fn update(
        &self,
        id: &Uuid,
        patch: UpdateChatRequest,
    ) -> Result<Option<Chat>, RepositoryError> {
        let id = *id;
        self.pool
            .run(CHATS, TxMode::ReadWrite, move |conn| {
                Box::pin(async move {
                    let Some(row) = fetch_by_id(&mut *conn, CHATS, id).await? else {
                        return Ok(None);
                    };
                    let mut chat = decode_chat(&row)?;
                    patch.apply(&mut chat);
                    chat.updated_at = Some(now());

                    sqlx::query("UPDATE chats SET name = ?, updated_at = ? WHERE id = ?")
                        .bind(&chat.name)
                        .bind(chat.updated_at.as_ref().map(format_datetime))
                        .bind(chat.id.to_string())
                        .execute(&mut *conn)
                        .await
                        .map_err(|e| db_error(CHATS, e))?;

                    Ok(Some(chat))
                })
            })
            .await
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let id = *id;
        // Memberships and messages go with the chat (ON DELETE CASCADE).
        let removed = self
            .pool
            .run(CHATS, TxMode::ReadWrite, move |conn| {
                Box::pin(async move { delete_by_id(conn, CHATS, id).await })
            })
            .await?;
        debug!(chat_id = %id, removed, "Chat deleted");
        Ok(())
    }

    // --- Memberships ---

    async fn add_member(
        &self,
        chat_id: &Uuid,
        member: MemberRef,
    ) -> Result<ChatMember, RepositoryError> {
        let chat_id = *chat_id;
        let relation = self
            .pool
            .run(MEMBERS, TxMode::ReadWrite, move |conn| {
                Box::pin(async move { insert_member(conn, chat_id, member).await })
            })
            .await?;

        debug!(chat_id = %chat_id, member_id = %relation.member_id, "Member added");
        Ok(relation)
    }

    async fn list_members(&self, chat_id: &Uuid) -> Result<Vec<ChatMember>, RepositoryError> {
        self.list_members_by(Index::MemberChat, chat_id.to_string())
            .await
    }

    async fn list_memberships(
        &self,
        member_id: &Uuid,
    ) -> Result<Vec<ChatMember>, RepositoryError> {
        self.list_members_by(Index::MemberMember, member_id.to_string())
            .await
    }

    async fn get_membership(
        &self,
        chat_id: &Uuid,
        member_id: &Uuid,
    ) -> Result<Option<ChatMember>, RepositoryError> {
        let chat_key = chat_id.to_string();
        let member_key = member_id.to_string();
        self.pool
            .run(MEMBERS, TxMode::ReadOnly, move |conn| {
                Box::pin(async move {
                    fetch_one_by_index(
                        conn,
                        Index::MemberChatMember,
                        &[chat_key.as_str(), member_key.as_str()],
                    )
                    .await?
                    .as_ref()
                    .map(decode_member)
                    .transpose()
                })
            })
            .await
    }

    async fn remove_member(&self, chat_id: &Uuid, member_id: &Uuid) -> Result<bool, RepositoryError> {
        let chat_key = chat_id.to_string();
        let member_key = member_id.to_string();
        let removed = self
            .pool
            .run(MEMBERS, TxMode::ReadWrite, move |conn| {
                Box::pin(async move {
                    sqlx::query("DELETE FROM chat_members WHERE chat_id = ? AND member_id = ?")
                        .bind(&chat_key)
                        .bind(&member_key)
                        .execute(&mut *conn)
                        .await
                        .map(|result| result.rows_affected() > 0)
                        .map_err(|e| db_error(MEMBERS, e))
                })
            })
            .await?;

        debug!(chat_id = %chat_id, member_id = %member_id, removed, "Member removed");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::character::SqliteCharacterRepository;
    use crate::sqlite::user::SqliteUserRepository;
    use parlor_core::repository::character::CharacterRepository;
    use parlor_core::repository::user::UserRepository;
    use parlor_types::character::{CharacterSpec, NewCharacter};
    use parlor_types::user::NewUser;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::open(&url).await.unwrap()
    }

    async fn make_user(pool: &DatabasePool, username: &str) -> Uuid {
        SqliteUserRepository::new(pool.clone())
            .create(&NewUser {
                username: username.to_string(),
                password_hash: "hash".to_string(),
                display_name: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn make_character(pool: &DatabasePool, name: &str, owner: Uuid) -> Uuid {
        SqliteCharacterRepository::new(pool.clone())
            .create(&NewCharacter {
                spec: CharacterSpec {
                    name: name.to_string(),
                    ..Default::default()
                },
                created_by: owner,
            })
            .await
            .unwrap()
            .id
    }

    fn group(name: &str, owner: Uuid) -> NewChat {
        NewChat {
            kind: ChatKind::Group,
            name: name.to_string(),
            created_by: owner,
        }
    }

    #[tokio::test]
    async fn test_create_with_members_keeps_order() {
        let pool = test_pool().await;
        let alice = make_user(&pool, "alice").await;
        let a = make_character(&pool, "A", alice).await;
        let b = make_character(&pool, "B", alice).await;
        let repo = SqliteChatRepository::new(pool);

        let (chat, relations) = repo
            .create_with_members(
                &group("friends", alice),
                &[MemberRef::user(alice), MemberRef::ai(b), MemberRef::ai(a)],
            )
            .await
            .unwrap();
        assert_eq!(relations.len(), 3);

        let listed: Vec<Uuid> = repo
            .list_members(&chat.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.member_id)
            .collect();
        assert_eq!(listed, vec![alice, b, a]);
        assert_eq!(repo.get_by_id(&chat.id).await.unwrap().unwrap(), chat);
    }

    #[tokio::test]
    async fn test_member_order_ignores_clock_steps() {
        let pool = test_pool().await;
        let alice = make_user(&pool, "alice").await;
        let a = make_character(&pool, "A", alice).await;
        let b = make_character(&pool, "B", alice).await;
        let repo = SqliteChatRepository::new(pool.clone());

        let (chat, relations) = repo
            .create_with_members(
                &group("friends", alice),
                &[MemberRef::user(alice), MemberRef::ai(a), MemberRef::ai(b)],
            )
            .await
            .unwrap();

        // Later inserts carry earlier stamps, as after the clock steps back.
        let stamps = [
            "2030-01-01T00:00:00.000000Z",
            "2029-01-01T00:00:00.000000Z",
            "2028-01-01T00:00:00.000000Z",
        ];
        let rewrites: Vec<(String, &str)> = relations
            .iter()
            .map(|r| r.id.to_string())
            .zip(stamps)
            .collect();
        pool.run(MEMBERS, TxMode::ReadWrite, move |conn| {
            Box::pin(async move {
                for (id, stamp) in &rewrites {
                    sqlx::query("UPDATE chat_members SET created_at = ? WHERE id = ?")
                        .bind(*stamp)
                        .bind(id.as_str())
                        .execute(&mut *conn)
                        .await
                        .map_err(|e| db_error(MEMBERS, e))?;
                }
                Ok::<_, RepositoryError>(())
            })
        })
        .await
        .unwrap();

        let listed: Vec<Uuid> = repo
            .list_members(&chat.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.member_id)
            .collect();
        assert_eq!(listed, vec![alice, a, b]);
    }

    #[tokio::test]
    async fn test_create_with_missing_member_writes_nothing() {
        let pool = test_pool().await;
        let alice = make_user(&pool, "alice").await;
        let repo = SqliteChatRepository::new(pool);
        let ghost = Uuid::now_v7();

        let err = repo
            .create_with_members(
                &group("friends", alice),
                &[MemberRef::user(alice), MemberRef::ai(ghost)],
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::NotFound { collection: "character", id } if id == ghost
        ));
        assert!(repo.get_all().await.unwrap().is_empty());
        assert!(repo.list_memberships(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_member_conflicts() {
        let pool = test_pool().await;
        let alice = make_user(&pool, "alice").await;
        let a = make_character(&pool, "A", alice).await;
        let repo = SqliteChatRepository::new(pool);

        let (chat, _) = repo
            .create_with_members(&group("g", alice), &[MemberRef::user(alice)])
            .await
            .unwrap();
        repo.add_member(&chat.id, MemberRef::ai(a)).await.unwrap();

        let err = repo.add_member(&chat.id, MemberRef::ai(a)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(repo.list_members(&chat.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_add_member_to_missing_chat() {
        let pool = test_pool().await;
        let alice = make_user(&pool, "alice").await;
        let repo = SqliteChatRepository::new(pool);

        let err = repo
            .add_member(&Uuid::now_v7(), MemberRef::user(alice))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { collection: "chat", .. }));
    }

    #[tokio::test]
    async fn test_membership_lookup_and_removal() {
        let pool = test_pool().await;
        let alice = make_user(&pool, "alice").await;
        let a = make_character(&pool, "A", alice).await;
        let repo = SqliteChatRepository::new(pool);

        let (chat, _) = repo
            .create_with_members(
                &group("g", alice),
                &[MemberRef::user(alice), MemberRef::ai(a)],
            )
            .await
            .unwrap();

        let membership = repo.get_membership(&chat.id, &a).await.unwrap().unwrap();
        assert_eq!(membership.member_kind, MemberKind::Ai);

        assert!(repo.remove_member(&chat.id, &a).await.unwrap());
        assert!(!repo.remove_member(&chat.id, &a).await.unwrap());
        assert!(repo.get_membership(&chat.id, &a).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_creator_and_kind() {
        let pool = test_pool().await;
        let alice = make_user(&pool, "alice").await;
        let bob = make_user(&pool, "bob").await;
        let repo = SqliteChatRepository::new(pool);

        repo.create(&group("g1", alice)).await.unwrap();
        repo.create(&NewChat {
            kind: ChatKind::Single,
            name: "Mika".to_string(),
            created_by: alice,
        })
        .await
        .unwrap();
        repo.create(&group("g2", bob)).await.unwrap();

        assert_eq!(repo.list_by_creator(&alice).await.unwrap().len(), 2);
        let groups: Vec<String> = repo
            .list_by_kind(ChatKind::Group)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(groups, vec!["g1", "g2"]);
    }

    #[tokio::test]
    async fn test_delete_cascades_memberships() {
        let pool = test_pool().await;
        let alice = make_user(&pool, "alice").await;
        let repo = SqliteChatRepository::new(pool);

        let (chat, _) = repo
            .create_with_members(&group("g", alice), &[MemberRef::user(alice)])
            .await
            .unwrap();
        repo.delete(&chat.id).await.unwrap();
        repo.delete(&chat.id).await.unwrap();

        assert!(repo.get_by_id(&chat.id).await.unwrap().is_none());
        assert!(repo.list_memberships(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_renames_chat() {
        let pool = test_pool().await;
        let alice = make_user(&pool, "alice").await;
        let repo = SqliteChatRepository::new(pool);
        let chat = repo.create(&group("old", alice)).await.unwrap();

        let updated = repo
            .update(
                &chat.id,
                UpdateChatRequest {
                    name: Some("new".to_string()),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "new");
        assert!(updated.updated_at.is_some());
    }
}
