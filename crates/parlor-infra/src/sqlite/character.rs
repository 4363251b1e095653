//! SQLite character repository implementation.
//!
//! Implements `CharacterRepository` from `parlor-core`. Follows the same
//! patterns as `SqliteUserRepository`: raw queries inside `DatabasePool::run`
//! and a private Row struct.

use parlor_core::repository::character::CharacterRepository;
use parlor_types::character::{Character, NewCharacter, UpdateCharacterRequest};
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

const CHARACTERS: Collection = Collection::Characters;

/// SQLite-backed implementation of `CharacterRepository`.
#[derive(Clone)]
pub struct SqliteCharacterRepository {
    pool: DatabasePool,
}

impl SqliteCharacterRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn list_by(&self, index: Index, key: String) -> Result<Vec<Character>, RepositoryError> {
        self.pool
            .run(CHARACTERS, TxMode::ReadOnly, move |conn| {
                Box::pin(async move {
                    fetch_all_by_index(conn, index, &[key.as_str()])
                        .await?
                        .iter()
                        .map(decode_character)
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .await
    }
}

/// Internal row type for mapping SQLite rows to domain Character.
struct CharacterRow {
    id: String,
    name: String,
    gender: String,
    personality: String,
    background: String,
    description: String,
    created_by: String,
    created_at: String,
    updated_at: Option<String>,
}

impl CharacterRow {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            gender: row.try_get("gender")?,
            personality: row.try_get("personality")?,
            background: row.try_get("background")?,
            description: row.try_get("description")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_character(self) -> Result<Character, RepositoryError> {
        Ok(Character {
            id: parse_uuid(CHARACTERS, "id", &self.id)?,
            name: self.name,
            gender: self.gender,
            personality: self.personality,
            background: self.background,
            description: self.description,
            created_by: parse_uuid(CHARACTERS, "created_by", &self.created_by)?,
            created_at: parse_datetime(CHARACTERS, &self.created_at)?,
            updated_at: self
                .updated_at
                .as_deref()
                .map(|s| parse_datetime(CHARACTERS, s))
                .transpose()?,
        })
    }
}

pub(crate) fn decode_character(row: &SqliteRow) -> Result<Character, RepositoryError> {
    CharacterRow::from_row(row)
        .map_err(|e| row_error(CHARACTERS, e))?
        .into_character()
}

impl CharacterRepository for SqliteCharacterRepository {
    async fn create(&self, character: &NewCharacter) -> Result<Character, RepositoryError> {
        let spec = &character.spec;
        let character = Character {
            id: Uuid::now_v7(),
            name: spec.name.clone(),
            gender: spec.gender.clone(),
            personality: spec.personality.clone(),
            background: spec.background.clone(),
            description: spec.description.clone(),
            created_by: character.created_by,
            created_at: now(),
            updated_at: None,
        };

        let created = self
            .pool
            .run(CHARACTERS, TxMode::ReadWrite, move |conn| {
                Box::pin(async move {
                    sqlx::query(
                        r#"INSERT INTO characters (id, name, gender, personality, background, description, created_by, created_at, updated_at)
                           VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL)"#,
                    )
                    .bind(character.id.to_string())
                    .bind(&character.name)
                    .bind(&character.gender)
                    .bind(&character.personality)
                    .bind(&character.background)
                    .bind(&character.description)
                    .bind(character.created_by.to_string())
                    .bind(format_datetime(&character.created_at))
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| {
                        if is_foreign_key_violation(&e) {
                            RepositoryError::NotFound {
                                collection: Collection::Users.record(),
                                id: character.created_by,
                            }
                        } else {
                            db_error(CHARACTERS, e)
                        }
                    })?;
                    Ok(character)
                })
            })
            .await?;

        debug!(character_id = %created.id, name = %created.name, "Character created");
        Ok(created)
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<Character>, RepositoryError> {
        let id = *id;
        self.pool
            .run(CHARACTERS, TxMode::ReadOnly, move |conn| {
                Box::pin(async move {
                    fetch_by_id(conn, CHARACTERS, id)
                        .await?
                        .as_ref()
                        .map(decode_character)
                        .transpose()
                })
            })
            .await
    }

    async fn get_all(&self) -> Result<Vec<Character>, RepositoryError> {
        self.pool
            .run(CHARACTERS, TxMode::ReadOnly, |conn| {
                Box::pin(async move {
                    fetch_all(conn, CHARACTERS)
                        .await?
                        .iter()
                        .map(decode_character)
                        .collect::<Result<Vec<_>, _>>()
                })
            })
            .await
    }

    async fn list_by_creator(&self, user_id: &Uuid) -> Result<Vec<Character>, RepositoryError> {
        self.list_by(Index::CharacterCreatedBy, user_id.to_string())
            .await
    }

    async fn list_by_name(&self, name: &str) -> Result<Vec<Character>, RepositoryError> {
        self.list_by(Index::CharacterName, name.to_string()).await
    }

    async fn update(
        &self,
        id: &Uuid,
        patch: UpdateCharacterRequest,
    ) -> Result<Option<Character>, RepositoryError> {
        let id = *id;
        self.pool
            .run(CHARACTERS, TxMode::ReadWrite, move |conn| {
                Box::pin(async move {
                    let Some(row) = fetch_by_id(&mut *conn, CHARACTERS, id).await? else {
                        return Ok(None);
                    };
                    let mut character = decode_character(&row)?;
                    patch.apply(&mut character);
                    character.updated_at = Some(now());

                    sqlx::query(
                        r#"UPDATE characters
                           SET name = ?, gender = ?, personality = ?, background = ?, description = ?, updated_at = ?
                           WHERE id = ?"#,
                    )
                    .bind(&character.name)
                    .bind(&character.gender)
                    .bind(&character.personality)
                    .bind(&character.background)
                    .bind(&character.description)
                    .bind(character.updated_at.as_ref().map(format_datetime))
                    .bind(character.id.to_string())
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| db_error(CHARACTERS, e))?;

                    Ok(Some(character))
                })
            })
            .await
    }

    async fn delete(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let id = *id;
        let removed = self
            .pool
            .run(CHARACTERS, TxMode::ReadWrite, move |conn| {
                Box::pin(async move { delete_by_id(conn, CHARACTERS, id).await })
            })
            .await?;
        debug!(character_id = %id, removed, "Character deleted");
        Ok(())
    }
}
