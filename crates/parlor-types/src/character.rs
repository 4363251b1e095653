//! AI character (persona) types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An AI persona that can take part in chats.
///
/// The persona fields are interpolated into the system prompt sent with every
/// completion request the character answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: Uuid,
    pub name: String,
    pub gender: String,
    pub personality: String,
    pub background: String,
    /// Free-text description appended to the persona prompt.
    pub description: String,
    /// Owning user.
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Persona fields supplied by the person creating a character.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterSpec {
    pub name: String,
    pub gender: String,
    pub personality: String,
    pub background: String,
    pub description: String,
}

/// Data required to create a character. The repository assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewCharacter {
    pub spec: CharacterSpec,
    pub created_by: Uuid,
}

/// Partial update for a character. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateCharacterRequest {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub personality: Option<String>,
    pub background: Option<String>,
    pub description: Option<String>,
}

impl UpdateCharacterRequest {
    /// Merge this patch into `character`.
    pub fn apply(self, character: &mut Character) {
        if let Some(name) = self.name {
            character.name = name;
        }
        if let Some(gender) = self.gender {
            character.gender = gender;
        }
        if let Some(personality) = self.personality {
            character.personality = personality;
        }
        if let Some(background) = self.background {
            character.background = background;
        }
        if let Some(description) = self.description {
            character.description = description;
        }
    }
}
