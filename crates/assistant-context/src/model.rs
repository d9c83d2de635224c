//! Context Data Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Owner of a context state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Namespace partitioning a user's entries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeId(pub i64);

impl std::fmt::Display for ThemeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single key-value pair
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub key: String,
    pub value: serde_json::Value,
}

/// Entries of one theme, in insertion order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub theme_id: ThemeId,
    pub entries: Vec<ContextEntry>,
}

impl UserContext {
    pub const fn new(theme_id: ThemeId) -> Self {
        Self {
            theme_id,
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.value)
    }

    /// Replace in place, or append if the key is new
    pub fn upsert(&mut self, key: &str, value: serde_json::Value) {
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.value = value,
            None => self.entries.push(ContextEntry {
                key: key.to_string(),
                value,
            }),
        }
    }

    /// Returns whether anything was removed
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.key != key);
        self.entries.len() != before
    }
}

/// Everything stored for one user
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContextState {
    pub user_id: UserId,
    pub contexts: Vec<UserContext>,
    pub updated_at: DateTime<Utc>,
}

impl ContextState {
    /// Fresh state with an empty namespace per theme
    pub fn new(user_id: UserId, themes: &[ThemeId]) -> Self {
        Self {
            user_id,
            contexts: themes.iter().copied().map(UserContext::new).collect(),
            updated_at: Utc::now(),
        }
    }

    pub fn theme(&self, theme_id: ThemeId) -> Option<&UserContext> {
        self.contexts.iter().find(|c| c.theme_id == theme_id)
    }

    pub fn theme_mut(&mut self, theme_id: ThemeId) -> Option<&mut UserContext> {
        self.contexts.iter_mut().find(|c| c.theme_id == theme_id)
    }

    /// Add an empty namespace; no-op if it already exists
    pub fn add_theme(&mut self, theme_id: ThemeId) {
        if self.theme(theme_id).is_none() {
            self.contexts.push(UserContext::new(theme_id));
        }
    }
}

/// Kind of edit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditOperation {
    Upsert,
    Delete,
}

/// One edit in a batch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EditContextRequest {
    pub theme_id: ThemeId,
    pub operation: EditOperation,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl EditContextRequest {
    pub fn upsert(theme_id: ThemeId, key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            theme_id,
            operation: EditOperation::Upsert,
            key: key.into(),
            value: Some(value),
        }
    }

    pub fn delete(theme_id: ThemeId, key: impl Into<String>) -> Self {
        Self {
            theme_id,
            operation: EditOperation::Delete,
            key: key.into(),
            value: None,
        }
    }
}

/// Context as returned to callers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserContextDto {
    pub user_id: UserId,
    pub contexts: Vec<UserContext>,
}

impl From<ContextState> for UserContextDto {
    fn from(state: ContextState) -> Self {
        Self {
            user_id: state.user_id,
            contexts: state.contexts,
        }
    }
}
