//! User account types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A locally registered person.
///
/// `password_hash` holds an Argon2id PHC string. It is never serialized, so the
/// persisted session payload and `--json` CLI output cannot leak it; records
/// deserialized from those payloads carry an empty hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Unique login name.
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Optional name shown instead of the username.
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Name to show in chat listings.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// Data required to create a user. The repository assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub display_name: Option<String>,
}

/// Partial update for a user. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub display_name: Option<Option<String>>,
}

impl UpdateUserRequest {
    /// Merge this patch into `user`.
    pub fn apply(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(hash) = self.password_hash {
            user.password_hash = hash;
        }
        if let Some(display_name) = self.display_name {
            user.display_name = display_name;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User {
            id: Uuid::now_v7(),
            username: "alice".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            display_name: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_string(&alice()).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));

        let back: User = serde_json::from_str(&json).unwrap();
        assert_eq!(back.username, "alice");
        assert!(back.password_hash.is_empty());
    }

    #[test]
    fn test_label_prefers_display_name() {
        let mut user = alice();
        assert_eq!(user.label(), "alice");
        user.display_name = Some("Alice L.".to_string());
        assert_eq!(user.label(), "Alice L.");
    }

    #[test]
    fn test_update_request_clears_display_name() {
        let mut user = alice();
        user.display_name = Some("A".to_string());
        UpdateUserRequest {
            display_name: Some(None),
            ..Default::default()
        }
        .apply(&mut user);
        assert!(user.display_name.is_none());
        assert_eq!(user.username, "alice");
    }
}
