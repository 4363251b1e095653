//! Database pool with split reader/writer connections in WAL mode.
//!
//! SQLite allows only one writer at a time. This module provides a `DatabasePool`
//! with a multi-connection reader pool for concurrent reads and a single-connection
//! writer pool for serialized writes. Both use WAL journal mode and enforce foreign keys.
//!
//! Every table and secondary index is also described here (`Collection`,
//! `Index`), so generic lookups can only target indexes the schema declares.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use futures_util::future::BoxFuture;
use parlor_types::error::RepositoryError;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use tracing::{debug, warn};
use uuid::Uuid;

/// Split read/write pool for SQLite with WAL mode.
///
/// - `reader`: Multi-connection pool (up to 8) for concurrent SELECT queries.
/// - `writer`: Single-connection pool for serialized INSERT/UPDATE/DELETE.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

/// Whether a unit of work only reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    ReadOnly,
    ReadWrite,
}

impl DatabasePool {
    /// Open (creating if missing) the database and apply pending migrations.
    ///
    /// Idempotent: re-opening an up-to-date database only connects.
    /// Both pools use WAL journal mode, foreign key enforcement, and 5-second busy timeout.
    pub async fn open(database_url: &str) -> Result<Self, RepositoryError> {
        let base_opts = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| RepositoryError::Connection(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);
        let write_opts = base_opts;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(write_opts)
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;

        // Run migrations on writer before opening reader pool
        sqlx::migrate!("../../migrations")
            .run(&writer)
            .await
            .map_err(|e| RepositoryError::Connection(format!("migration failed: {e}")))?;

        let reader = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(read_opts)
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;

        debug!(url = %database_url, "Database opened");
        Ok(Self { reader, writer })
    }

    /// Run one operation inside a transaction.
    ///
    /// `ReadOnly` work runs on the reader pool, `ReadWrite` work on the single
    /// writer connection. The transaction commits when the operation returns
    /// `Ok` and rolls back otherwise.
    pub async fn run<T, F>(
        &self,
        collection: Collection,
        mode: TxMode,
        operation: F,
    ) -> Result<T, RepositoryError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, RepositoryError>>
            + Send,
    {
        let pool = match mode {
            TxMode::ReadOnly => &self.reader,
            TxMode::ReadWrite => &self.writer,
        };

        let mut tx = pool
            .begin()
            .await
            .map_err(|e| db_error(collection, e))?;

        match operation(&mut *tx).await {
            Ok(value) => {
                tx.commit().await.map_err(|e| db_error(collection, e))?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(collection = collection.table(), error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}

/// Returns the default database URL for a data directory.
pub fn database_url(data_dir: &std::path::Path) -> String {
    format!("sqlite://{}/parlor.db", data_dir.display())
}

// ---------------------------------------------------------------------------
// Schema metadata
// ---------------------------------------------------------------------------

/// A table of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Characters,
    Chats,
    ChatMembers,
    Messages,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Users,
        Collection::Characters,
        Collection::Chats,
        Collection::ChatMembers,
        Collection::Messages,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Characters => "characters",
            Collection::Chats => "chats",
            Collection::ChatMembers => "chat_members",
            Collection::Messages => "messages",
        }
    }

    /// Singular record name used in error messages.
    pub fn record(self) -> &'static str {
        match self {
            Collection::Users => "user",
            Collection::Characters => "character",
            Collection::Chats => "chat",
            Collection::ChatMembers => "chat member",
            Collection::Messages => "message",
        }
    }

    pub fn indexes(self) -> impl Iterator<Item = Index> {
        Index::ALL.into_iter().filter(move |i| i.collection() == self)
    }
}

/// A declared secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    UserUsername,
    CharacterCreatedBy,
    CharacterName,
    ChatKind,
    ChatCreatedBy,
    ChatCreatedAt,
    MemberChat,
    MemberMember,
    MemberChatMember,
    MessageChat,
    MessageCreatedBy,
    MessageCreatedAt,
}

impl Index {
    pub const ALL: [Index; 12] = [
        Index::UserUsername,
        Index::CharacterCreatedBy,
        Index::CharacterName,
        Index::ChatKind,
        Index::ChatCreatedBy,
        Index::ChatCreatedAt,
        Index::MemberChat,
        Index::MemberMember,
        Index::MemberChatMember,
        Index::MessageChat,
        Index::MessageCreatedBy,
        Index::MessageCreatedAt,
    ];

    pub fn collection(self) -> Collection {
        match self {
            Index::UserUsername => Collection::Users,
            Index::CharacterCreatedBy | Index::CharacterName => Collection::Characters,
            Index::ChatKind | Index::ChatCreatedBy | Index::ChatCreatedAt => Collection::Chats,
            Index::MemberChat | Index::MemberMember | Index::MemberChatMember => {
                Collection::ChatMembers
            }
            Index::MessageChat | Index::MessageCreatedBy | Index::MessageCreatedAt => {
                Collection::Messages
            }
        }
    }

    /// Index name in the SQLite schema.
    pub fn name(self) -> &'static str {
        match self {
            Index::UserUsername => "idx_users_username",
            Index::CharacterCreatedBy => "idx_characters_created_by",
            Index::CharacterName => "idx_characters_name",
            Index::ChatKind => "idx_chats_kind",
            Index::ChatCreatedBy => "idx_chats_created_by",
            Index::ChatCreatedAt => "idx_chats_created_at",
            Index::MemberChat => "idx_chat_members_chat_id",
            Index::MemberMember => "idx_chat_members_member_id",
            Index::MemberChatMember => "idx_chat_members_chat_member",
            Index::MessageChat => "idx_messages_chat_id",
            Index::MessageCreatedBy => "idx_messages_created_by",
            Index::MessageCreatedAt => "idx_messages_created_at",
        }
    }

    /// Key columns, in key order.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Index::UserUsername => &["username"],
            Index::CharacterCreatedBy | Index::ChatCreatedBy | Index::MessageCreatedBy => {
                &["created_by"]
            }
            Index::CharacterName => &["name"],
            Index::ChatKind => &["kind"],
            Index::ChatCreatedAt | Index::MessageCreatedAt => &["created_at"],
            Index::MemberChat | Index::MessageChat => &["chat_id"],
            Index::MemberMember => &["member_id"],
            Index::MemberChatMember => &["chat_id", "member_id"],
        }
    }

    pub fn unique(self) -> bool {
        matches!(self, Index::UserUsername | Index::MemberChatMember)
    }

    fn where_clause(self) -> String {
        self.columns()
            .iter()
            .map(|c| format!("{c} = ?"))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

// ---------------------------------------------------------------------------
// Generic helpers (run inside `DatabasePool::run`)
// ---------------------------------------------------------------------------

/// Map a sqlx error to the repository taxonomy.
pub(crate) fn db_error(collection: Collection, e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.message().contains("UNIQUE") {
            return RepositoryError::Conflict(format!(
                "{} already exists: {}",
                collection.record(),
                db_err.message()
            ));
        }
    }
    RepositoryError::Query(e.to_string())
}

/// Whether a sqlx error is a foreign key violation.
pub(crate) fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.message().contains("FOREIGN KEY"))
}

pub async fn fetch_by_id(
    conn: &mut SqliteConnection,
    collection: Collection,
    id: Uuid,
) -> Result<Option<SqliteRow>, RepositoryError> {
    let sql = format!("SELECT * FROM {} WHERE id = ?", collection.table());
    sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| db_error(collection, e))
}

/// All rows of a collection, in insertion order.
pub async fn fetch_all(
    conn: &mut SqliteConnection,
    collection: Collection,
) -> Result<Vec<SqliteRow>, RepositoryError> {
    let sql = format!(
        "SELECT * FROM {} ORDER BY rowid",
        collection.table()
    );
    sqlx::query(&sql)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| db_error(collection, e))
}

/// All rows matching `key` on a declared index, in insertion order.
pub async fn fetch_all_by_index(
    conn: &mut SqliteConnection,
    index: Index,
    key: &[&str],
) -> Result<Vec<SqliteRow>, RepositoryError> {
    let collection = index.collection();
    let sql = format!(
        "SELECT * FROM {} WHERE {} ORDER BY rowid",
        collection.table(),
        index.where_clause()
    );
    check_key(index, key)?;

    let mut query = sqlx::query(&sql);
    for value in key {
        query = query.bind(*value);
    }
    query
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| db_error(collection, e))
}

/// The first inserted row matching `key` on a declared index.
pub async fn fetch_one_by_index(
    conn: &mut SqliteConnection,
    index: Index,
    key: &[&str],
) -> Result<Option<SqliteRow>, RepositoryError> {
    let collection = index.collection();
    let sql = format!(
        "SELECT * FROM {} WHERE {} ORDER BY rowid LIMIT 1",
        collection.table(),
        index.where_clause()
    );
    check_key(index, key)?;

    let mut query = sqlx::query(&sql);
    for value in key {
        query = query.bind(*value);
    }
    query
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| db_error(collection, e))
}

/// Delete a row by id. Returns the number of rows removed (0 or 1).
pub async fn delete_by_id(
    conn: &mut SqliteConnection,
    collection: Collection,
    id: Uuid,
) -> Result<u64, RepositoryError> {
    let sql = format!("DELETE FROM {} WHERE id = ?", collection.table());
    let result = sqlx::query(&sql)
        .bind(id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(|e| db_error(collection, e))?;
    Ok(result.rows_affected())
}

fn check_key(index: Index, key: &[&str]) -> Result<(), RepositoryError> {
    if key.len() != index.columns().len() {
        return Err(RepositoryError::Query(format!(
            "index {} expects {} key values, got {}",
            index.name(),
            index.columns().len(),
            key.len()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Row decoding helpers
// ---------------------------------------------------------------------------

/// Current time at the precision the store keeps.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_datetime(
    collection: Collection,
    s: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Corrupt {
            collection: collection.table(),
            reason: format!("invalid datetime '{s}': {e}"),
        })
}

pub(crate) fn parse_uuid(
    collection: Collection,
    field: &str,
    s: &str,
) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::Corrupt {
        collection: collection.table(),
        reason: format!("invalid {field} '{s}': {e}"),
    })
}

pub(crate) fn row_error(collection: Collection, e: sqlx::Error) -> RepositoryError {
    RepositoryError::Corrupt {
        collection: collection.table(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::open(&url).await.unwrap()
    }

    #[tokio::test]
    async fn test_pool_creates_tables() {
        let pool = test_pool().await;

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(&pool.reader)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        for collection in Collection::ALL {
            assert!(
                table_names.contains(&collection.table()),
                "{} table missing",
                collection.table()
            );
        }
    }

    #[tokio::test]
    async fn test_declared_indexes_match_schema() {
        let pool = test_pool().await;

        for index in Index::ALL {
            let rows = sqlx::query(&format!("PRAGMA index_list({})", index.collection().table()))
                .fetch_all(&pool.reader)
                .await
                .unwrap();
            let entry = rows
                .iter()
                .find(|r| r.get::<String, _>("name") == index.name())
                .unwrap_or_else(|| panic!("{} missing from schema", index.name()));
            assert_eq!(entry.get::<i64, _>("unique") == 1, index.unique(), "{}", index.name());

            let info = sqlx::query(&format!("PRAGMA index_info({})", index.name()))
                .fetch_all(&pool.reader)
                .await
                .unwrap();
            let columns: Vec<String> = info.iter().map(|r| r.get::<String, _>("name")).collect();
            assert_eq!(columns, index.columns(), "{}", index.name());
        }
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("again.db").display());

        let first = DatabasePool::open(&url).await.unwrap();
        drop(first);
        let second = DatabasePool::open(&url).await.unwrap();

        let (applied,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM _sqlx_migrations")
            .fetch_one(&second.reader)
            .await
            .unwrap();
        assert_eq!(applied, 2);
    }

    #[tokio::test]
    async fn test_pool_wal_mode() {
        let pool = test_pool().await;

        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool.writer)
            .await
            .unwrap();

        assert_eq!(result.0.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_pool_foreign_keys_enforced() {
        let pool = test_pool().await;

        let result: (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool.writer)
            .await
            .unwrap();

        assert_eq!(result.0, 1, "foreign keys should be enabled");
    }

    #[tokio::test]
    async fn test_run_rolls_back_on_error() {
        let pool = test_pool().await;

        let err = pool
            .run(Collection::Users, TxMode::ReadWrite, |conn| {
                Box::pin(async move {
                    sqlx::query(
                        "INSERT INTO users (id, username, password_hash, created_at) VALUES (?, 'ghost', 'x', ?)",
                    )
                    .bind(Uuid::now_v7().to_string())
                    .bind(format_datetime(&now()))
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| db_error(Collection::Users, e))?;
                    Err::<(), _>(RepositoryError::Query("abort".to_string()))
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Query(_)));

        let rows = pool
            .run(Collection::Users, TxMode::ReadOnly, |conn| {
                Box::pin(async move { fetch_all(conn, Collection::Users).await })
            })
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_index_lookup_rejects_wrong_key_arity() {
        let pool = test_pool().await;

        let err = pool
            .run(Collection::ChatMembers, TxMode::ReadOnly, |conn| {
                Box::pin(async move {
                    fetch_one_by_index(conn, Index::MemberChatMember, &["only-one"]).await
                })
            })
            .await
            .err()
            .expect("key arity mismatch should fail");
        assert!(matches!(err, RepositoryError::Query(_)));
    }

    #[test]
    fn test_datetime_format_is_fixed_width() {
        let a = format_datetime(&"2026-01-02T03:04:05Z".parse().unwrap());
        let b = format_datetime(&"2026-01-02T03:04:05.123456Z".parse().unwrap());
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert_eq!(a, "2026-01-02T03:04:05.000000Z");
    }

    #[test]
    fn test_collection_indexes() {
        let member_indexes: Vec<Index> = Collection::ChatMembers.indexes().collect();
        assert_eq!(
            member_indexes,
            vec![Index::MemberChat, Index::MemberMember, Index::MemberChatMember]
        );
    }

    #[test]
    fn test_database_url() {
        let url = database_url(std::path::Path::new("/tmp/parlor"));
        assert_eq!(url, "sqlite:///tmp/parlor/parlor.db");
    }
}
