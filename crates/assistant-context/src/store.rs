//! Context Storage
//!
//! Persistence seam for user context. Transactional isolation between
//! concurrent writers belongs to the implementation; the last committed save
//! wins.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{ContextError, Result};
use crate::model::{ContextState, ThemeId, UserId};

/// Context storage trait
pub trait ContextStore: Send + Sync {
    /// Load a user's state. Users never seen before get their default namespaces.
    fn load_user_context(&self, user_id: UserId) -> Result<ContextState>;

    /// Replace a user's state
    fn save_user_context(&self, state: &ContextState) -> Result<()>;
}

/// In-memory context store (for development)
pub struct MemoryContextStore {
    states: RwLock<HashMap<UserId, ContextState>>,
    default_themes: Vec<ThemeId>,
}

impl Default for MemoryContextStore {
    fn default() -> Self {
        Self::new(vec![ThemeId(1)])
    }
}

impl MemoryContextStore {
    pub fn new(default_themes: Vec<ThemeId>) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            default_themes,
        }
    }

    pub fn default_themes(&self) -> &[ThemeId] {
        &self.default_themes
    }

    /// Create a namespace for one user outside the defaults
    pub fn provision_theme(&self, user_id: UserId, theme_id: ThemeId) -> Result<()> {
        let mut states = self.states.write().map_err(poisoned)?;
        states
            .entry(user_id)
            .or_insert_with(|| ContextState::new(user_id, &self.default_themes))
            .add_theme(theme_id);
        Ok(())
    }
}

impl ContextStore for MemoryContextStore {
    fn load_user_context(&self, user_id: UserId) -> Result<ContextState> {
        let states = self.states.read().map_err(poisoned)?;
        Ok(states
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| ContextState::new(user_id, &self.default_themes)))
    }

    fn save_user_context(&self, state: &ContextState) -> Result<()> {
        let mut states = self.states.write().map_err(poisoned)?;
        let mut state = state.clone();
        state.updated_at = Utc::now();
        states.insert(state.user_id, state);
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> ContextError {
    ContextError::PersistenceUnavailable("context store lock poisoned".into())
}
