use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How this client proves ownership of the resources it creates.
/// Chosen once during onboarding and fixed for the lifetime of the record;
/// recreating the identity abandons authorship links made under the old one.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Posts carry this identity's id as `user_id`; edits require an id match.
    #[default]
    AnonymousId,
    /// Posts carry a per-post secret key; edits require re-entering that key.
    SecretKey,
}

/// The one client-local identity record, persisted as
/// `{id, createdAt, authMode, displayName?}` under a fixed storage key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub auth_mode: AuthMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Identity {
    /// True iff the resource carries an author id equal to this identity's id.
    /// A secret-key identity never claims authorship by id, whatever the
    /// resource says: in that mode the key is the sole proof of ownership.
    pub fn is_author(&self, author_id: Option<&str>) -> bool {
        if self.auth_mode == AuthMode::SecretKey {
            return false;
        }
        author_id.map(|a| a == self.id).unwrap_or(false)
    }
}
