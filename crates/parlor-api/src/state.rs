//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by the CLI. Services
//! are generic over repository/store/hasher/provider traits, but AppState
//! pins them to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use parlor_core::chat::directory::ChatDirectory;
use parlor_core::chat::service::ConversationService;
use parlor_core::session::SessionService;
use parlor_infra::config::load_global_config;
use parlor_infra::crypto::password::Argon2CredentialHasher;
use parlor_infra::filesystem::session::FileSessionStore;
use parlor_infra::filesystem::{resolve_data_dir, session_path};
use parlor_infra::llm::ConfiguredProvider;
use parlor_infra::sqlite::character::SqliteCharacterRepository;
use parlor_infra::sqlite::chat::SqliteChatRepository;
use parlor_infra::sqlite::message::SqliteMessageRepository;
use parlor_infra::sqlite::pool::{DatabasePool, database_url};
use parlor_infra::sqlite::user::SqliteUserRepository;
use parlor_types::config::GlobalConfig;
use parlor_types::user::User;
use tracing::debug;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteSessionService =
    SessionService<SqliteUserRepository, FileSessionStore, Argon2CredentialHasher>;

pub type ConcreteChatDirectory = ChatDirectory<
    SqliteUserRepository,
    SqliteCharacterRepository,
    SqliteChatRepository,
    SqliteMessageRepository,
>;

pub type ConcreteConversationService = ConversationService<
    SqliteUserRepository,
    SqliteCharacterRepository,
    SqliteChatRepository,
    SqliteMessageRepository,
    ConfiguredProvider,
>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<ConcreteSessionService>,
    pub conversations: Arc<ConcreteConversationService>,
    pub config: GlobalConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: open the DB, wire services, restore
    /// the persisted session and load its chats.
    pub async fn init() -> Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_global_config(&data_dir).await;
        let db_pool = DatabasePool::open(&database_url(&data_dir)).await?;

        let sessions = SessionService::new(
            SqliteUserRepository::new(db_pool.clone()),
            FileSessionStore::new(session_path(&data_dir)),
            Argon2CredentialHasher::new(),
        );

        let directory = ChatDirectory::new(
            SqliteUserRepository::new(db_pool.clone()),
            SqliteCharacterRepository::new(db_pool.clone()),
            SqliteChatRepository::new(db_pool.clone()),
            SqliteMessageRepository::new(db_pool.clone()),
        );
        let provider = ConfiguredProvider::from_config(&config.completion);
        let conversations =
            ConversationService::new(directory, provider, config.conversation.clone());

        let state = Self {
            sessions: Arc::new(sessions),
            conversations: Arc::new(conversations),
            config,
            data_dir,
        };

        if let Some(user) = state.sessions.restore().await? {
            state.conversations.init(&user).await?;
        }
        debug!(
            data_dir = %state.data_dir.display(),
            authenticated = state.sessions.is_authenticated(),
            "Application state ready"
        );

        Ok(state)
    }

    /// The signed-in user.
    pub fn user(&self) -> Result<User> {
        Ok(self.sessions.require_user()?)
    }

    pub fn directory(&self) -> &ConcreteChatDirectory {
        self.conversations.directory()
    }
}
