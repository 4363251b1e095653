//! Authentication and the current session.
//!
//! `SessionService` holds the signed-in identity behind a lock and mirrors it
//! into a `SessionStore` slot so it survives restarts. Passwords go through a
//! `CredentialHasher`; the persisted payload never contains the hash.

pub mod guard;
pub mod hasher;
pub mod store;

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use parlor_types::error::{RepositoryError, SessionError};
use parlor_types::user::{NewUser, User};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::repository::user::UserRepository;
use hasher::CredentialHasher;
use store::SessionStore;

/// Payload written to the session slot.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    user: User,
    signed_in_at: DateTime<Utc>,
}

/// Manages registration, login, logout and the persisted session.
///
/// Generic over the user repository, session store and hasher so tests can
/// swap in in-memory doubles.
pub struct SessionService<U: UserRepository, S: SessionStore, H: CredentialHasher> {
    users: U,
    store: S,
    hasher: H,
    current: RwLock<Option<User>>,
}

impl<U: UserRepository, S: SessionStore, H: CredentialHasher> SessionService<U, S, H> {
    pub fn new(users: U, store: S, hasher: H) -> Self {
        Self {
            users,
            store,
            hasher,
            current: RwLock::new(None),
        }
    }

    pub fn users(&self) -> &U {
        &self.users
    }

    /// The signed-in user, if any.
    pub fn current_user(&self) -> Option<User> {
        self.current.read().expect("session lock poisoned").clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().expect("session lock poisoned").is_some()
    }

    /// The signed-in user, or `SessionError::NotAuthenticated`.
    pub fn require_user(&self) -> Result<User, SessionError> {
        self.current_user().ok_or(SessionError::NotAuthenticated)
    }

    /// Create an account and sign it in.
    ///
    /// Fails with `Conflict` when the username is taken; nothing is written
    /// in that case.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, SessionError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(SessionError::InvalidInput(
                "username cannot be empty".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(SessionError::InvalidInput(
                "password cannot be empty".to_string(),
            ));
        }

        if self.users.get_by_username(username).await?.is_some() {
            return Err(SessionError::Conflict(username.to_string()));
        }

        let password_hash = self.hasher.hash_password(password)?;
        let user = self
            .users
            .create(&NewUser {
                username: username.to_string(),
                password_hash,
                display_name: None,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => SessionError::Conflict(username.to_string()),
                other => SessionError::Storage(other),
            })?;

        if let Err(e) = self.set_session(&user).await {
            warn!(user_id = %user.id, error = %e, "Could not persist new session, rolling back registration");
            if let Err(cleanup) = self.users.delete(&user.id).await {
                warn!(user_id = %user.id, error = %cleanup, "Failed to remove user after session error");
            }
            return Err(e);
        }

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Verify credentials and sign the user in.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, SessionError> {
        let Some(user) = self.users.get_by_username(username.trim()).await? else {
            debug!(username = %username, "Login for unknown username");
            return Err(SessionError::InvalidCredentials);
        };

        if !self.hasher.verify_password(password, &user.password_hash) {
            debug!(user_id = %user.id, "Login with wrong password");
            return Err(SessionError::InvalidCredentials);
        }

        self.set_session(&user).await?;
        info!(user_id = %user.id, "User logged in");
        Ok(user)
    }

    /// Sign out and clear the persisted slot. Idempotent.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let previous = self.current.write().expect("session lock poisoned").take();
        self.store
            .clear()
            .await
            .map_err(|e| SessionError::Persist(e.to_string()))?;

        if let Some(user) = previous {
            info!(user_id = %user.id, "User logged out");
        }
        Ok(())
    }

    /// Load the persisted session, if any.
    ///
    /// Unreadable payloads, and payloads naming a user that no longer exists,
    /// are discarded and yield no session.
    pub async fn restore(&self) -> Result<Option<User>, SessionError> {
        let raw = match self.store.load().await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(error = %e, "Session slot unreadable, discarding");
                self.discard().await;
                return Ok(None);
            }
        };

        let persisted: PersistedSession = match serde_json::from_str(&raw) {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(error = %e, "Corrupt session payload, discarding");
                self.discard().await;
                return Ok(None);
            }
        };

        let Some(user) = self.users.get_by_id(&persisted.user.id).await? else {
            warn!(user_id = %persisted.user.id, "Session names a user that no longer exists, discarding");
            self.discard().await;
            return Ok(None);
        };

        *self.current.write().expect("session lock poisoned") = Some(user.clone());
        debug!(user_id = %user.id, signed_in_at = %persisted.signed_in_at, "Session restored");
        Ok(Some(user))
    }

    async fn set_session(&self, user: &User) -> Result<(), SessionError> {
        let payload = serde_json::to_string(&PersistedSession {
            user: user.clone(),
            signed_in_at: Utc::now(),
        })
        .map_err(|e| SessionError::Persist(e.to_string()))?;

        self.store
            .save(&payload)
            .await
            .map_err(|e| SessionError::Persist(e.to_string()))?;

        *self.current.write().expect("session lock poisoned") = Some(user.clone());
        Ok(())
    }

    async fn discard(&self) {
        *self.current.write().expect("session lock poisoned") = None;
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "Failed to clear session slot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_types::user::UpdateUserRequest;
    use std::future::Future;
    use std::sync::Mutex;
    use uuid::Uuid;

    // --- In-memory doubles ---

    #[derive(Default)]
    struct MemoryUsers {
        rows: Mutex<Vec<User>>,
    }

    impl UserRepository for MemoryUsers {
        fn create(&self, user: &NewUser) -> impl Future<Output = Result<User, RepositoryError>> + Send {
            let mut rows = self.rows.lock().unwrap();
            let result = if rows.iter().any(|u| u.username == user.username) {
                Err(RepositoryError::Conflict("UNIQUE constraint failed: users.username".into()))
            } else {
                let created = User {
                    id: Uuid::now_v7(),
                    username: user.username.clone(),
                    password_hash: user.password_hash.clone(),
                    display_name: user.display_name.clone(),
                    created_at: Utc::now(),
                    updated_at: None,
                };
                rows.push(created.clone());
                Ok(created)
            };
            async move { result }
        }

        fn get_by_id(&self, id: &Uuid) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send {
            let found = self.rows.lock().unwrap().iter().find(|u| u.id == *id).cloned();
            async move { Ok(found) }
        }

        fn get_by_username(
            &self,
            username: &str,
        ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send {
            let found = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.username == username)
                .cloned();
            async move { Ok(found) }
        }

        fn get_all(&self) -> impl Future<Output = Result<Vec<User>, RepositoryError>> + Send {
            let rows = self.rows.lock().unwrap().clone();
            async move { Ok(rows) }
        }

        fn update(
            &self,
            _id: &Uuid,
            _patch: UpdateUserRequest,
        ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send {
            async move { Ok(None) }
        }

        fn delete(&self, id: &Uuid) -> impl Future<Output = Result<(), RepositoryError>> + Send {
            self.rows.lock().unwrap().retain(|u| u.id != *id);
            async move { Ok(()) }
        }
    }

    #[derive(Default)]
    struct MemorySlot {
        payload: Mutex<Option<String>>,
    }

    impl SessionStore for MemorySlot {
        fn load(&self) -> impl Future<Output = Result<Option<String>, std::io::Error>> + Send {
            let payload = self.payload.lock().unwrap().clone();
            async move { Ok(payload) }
        }

        fn save(&self, payload: &str) -> impl Future<Output = Result<(), std::io::Error>> + Send {
            *self.payload.lock().unwrap() = Some(payload.to_string());
            async move { Ok(()) }
        }

        fn clear(&self) -> impl Future<Output = Result<(), std::io::Error>> + Send {
            *self.payload.lock().unwrap() = None;
            async move { Ok(()) }
        }
    }

    struct PrefixHasher;

    impl CredentialHasher for PrefixHasher {
        fn hash_password(&self, password: &str) -> Result<String, SessionError> {
            Ok(format!("hashed:{password}"))
        }

        fn verify_password(&self, password: &str, hash: &str) -> bool {
            hash.strip_prefix("hashed:") == Some(password)
        }
    }

    fn service() -> SessionService<MemoryUsers, MemorySlot, PrefixHasher> {
        SessionService::new(MemoryUsers::default(), MemorySlot::default(), PrefixHasher)
    }

    #[tokio::test]
    async fn test_register_sets_and_persists_session() {
        let svc = service();
        let user = svc.register("alice", "pw1").await.unwrap();

        assert_eq!(svc.current_user().unwrap().id, user.id);
        let payload = svc.store.payload.lock().unwrap().clone().unwrap();
        assert!(payload.contains("alice"));
        assert!(!payload.contains("hashed:"));
    }

    #[tokio::test]
    async fn test_register_twice_conflicts() {
        let svc = service();
        svc.register("alice", "pw1").await.unwrap();

        let err = svc.register("alice", "other").await.unwrap_err();
        assert!(matches!(err, SessionError::Conflict(ref name) if name == "alice"));
        assert_eq!(svc.users.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_rejects_blank_input() {
        let svc = service();
        assert!(matches!(
            svc.register("  ", "pw").await,
            Err(SessionError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.register("bob", "").await,
            Err(SessionError::InvalidInput(_))
        ));
        assert!(svc.users.rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_checks_password() {
        let svc = service();
        let alice = svc.register("alice", "pw1").await.unwrap();
        svc.logout().await.unwrap();

        let err = svc.login("alice", "pw2").await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidCredentials));
        assert!(svc.current_user().is_none());

        let err = svc.login("nobody", "pw1").await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidCredentials));

        let user = svc.login("alice", "pw1").await.unwrap();
        assert_eq!(user.id, alice.id);
        assert!(svc.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let svc = service();
        svc.register("alice", "pw1").await.unwrap();

        svc.logout().await.unwrap();
        svc.logout().await.unwrap();
        assert!(svc.current_user().is_none());
        assert!(svc.store.payload.lock().unwrap().is_none());
        assert!(matches!(
            svc.require_user(),
            Err(SessionError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_restore_round_trip() {
        let svc = service();
        let alice = svc.register("alice", "pw1").await.unwrap();
        *svc.current.write().unwrap() = None;

        let restored = svc.restore().await.unwrap().unwrap();
        assert_eq!(restored.id, alice.id);
        // The restored record comes from the repository, hash included.
        assert_eq!(restored.password_hash, "hashed:pw1");
    }

    #[tokio::test]
    async fn test_restore_discards_corrupt_payload() {
        let svc = service();
        *svc.store.payload.lock().unwrap() = Some("{not json".to_string());

        assert!(svc.restore().await.unwrap().is_none());
        assert!(svc.store.payload.lock().unwrap().is_none());
        assert!(!svc.is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_discards_deleted_user() {
        let svc = service();
        let alice = svc.register("alice", "pw1").await.unwrap();
        svc.users.rows.lock().unwrap().retain(|u| u.id != alice.id);
        *svc.current.write().unwrap() = None;

        assert!(svc.restore().await.unwrap().is_none());
        assert!(svc.store.payload.lock().unwrap().is_none());
    }
}
