//! Navigation routes.
//!
//! Every view of the application is a [`Route`]. All routes except
//! [`Route::Auth`] live in the protected area and require an active session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum Route {
    /// Default landing view of the protected area.
    Welcome,
    /// Create a new character, or edit an existing one.
    CreateCharacter { character_id: Option<Uuid> },
    CreateGroup,
    /// Chat list.
    Chats,
    /// A single chat's transcript.
    Chat { chat_id: Uuid },
    Preferences,
    /// Cover generation.
    Cover,
    /// Login/registration (the only unprotected view).
    Auth,
}

impl Route {
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Auth)
    }

    /// URL-style path of the route.
    pub fn path(&self) -> String {
        match self {
            Route::Welcome => "/".to_string(),
            Route::CreateCharacter { character_id: None } => "/ai".to_string(),
            Route::CreateCharacter {
                character_id: Some(id),
            } => format!("/ai/{id}"),
            Route::CreateGroup => "/group".to_string(),
            Route::Chats => "/chat".to_string(),
            Route::Chat { chat_id } => format!("/chat/{chat_id}"),
            Route::Preferences => "/preferences".to_string(),
            Route::Cover => "/cover".to_string(),
            Route::Auth => "/auth".to_string(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Outcome of a route guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(Route),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_auth_is_unprotected() {
        assert!(!Route::Auth.requires_auth());
        assert!(Route::Welcome.requires_auth());
        assert!(Route::Cover.requires_auth());
        assert!(
            Route::Chat {
                chat_id: Uuid::now_v7()
            }
            .requires_auth()
        );
    }

    #[test]
    fn test_paths() {
        assert_eq!(Route::Welcome.path(), "/");
        assert_eq!(Route::CreateCharacter { character_id: None }.path(), "/ai");
        let id = Uuid::now_v7();
        assert_eq!(Route::Chat { chat_id: id }.to_string(), format!("/chat/{id}"));
    }
}
