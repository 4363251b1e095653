use thiserror::Error;
use uuid::Uuid;

use crate::llm::CompletionError;

/// Errors from repository operations (used by trait definitions in parlor-core).
///
/// Absence is never an error on read paths: lookups return `Option`/`Vec`.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    /// A write referenced a record that does not exist.
    #[error("referenced {collection} '{id}' not found")]
    NotFound { collection: &'static str, id: Uuid },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("corrupt {collection} record: {reason}")]
    Corrupt {
        collection: &'static str,
        reason: String,
    },
}

/// Errors related to authentication and the current session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("username '{0}' already exists")]
    Conflict(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not logged in")]
    NotAuthenticated,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("failed to persist session: {0}")]
    Persist(String),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// Errors related to starting conversations and exchanging messages.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("chat '{0}' not found")]
    ChatNotFound(Uuid),

    #[error("character '{0}' not found")]
    CharacterNotFound(Uuid),

    #[error("message cannot be empty")]
    EmptyMessage,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{character} failed to reply: {source}")]
    Completion {
        character: String,
        #[source]
        source: CompletionError,
    },

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::Conflict("alice".to_string());
        assert_eq!(err.to_string(), "username 'alice' already exists");
        assert_eq!(
            SessionError::InvalidCredentials.to_string(),
            "invalid username or password"
        );
    }

    #[test]
    fn test_conversation_error_wraps_completion() {
        let err = ConversationError::Completion {
            character: "Mika".to_string(),
            source: CompletionError::Timeout { secs: 60 },
        };
        assert_eq!(err.to_string(), "Mika failed to reply: completion timed out after 60s");
    }

    #[test]
    fn test_storage_error_from_repository() {
        let err: SessionError = RepositoryError::Conflict("dup".to_string()).into();
        assert!(matches!(err, SessionError::Storage(RepositoryError::Conflict(_))));
    }
}
