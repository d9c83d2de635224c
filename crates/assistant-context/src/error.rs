//! Context Error Types

use thiserror::Error;

use crate::model::ThemeId;

/// Result type alias
pub type Result<T> = std::result::Result<T, ContextError>;

/// Context-editing errors
#[derive(Error, Debug)]
pub enum ContextError {
    /// Edit targets a theme the user has no namespace for
    #[error("Unknown theme: {0}")]
    UnknownTheme(ThemeId),

    /// Edit is structurally invalid
    #[error("Invalid edit #{index} on key '{key}': {reason}")]
    InvalidEdit {
        index: usize,
        key: String,
        reason: String,
    },

    /// Persistence collaborator failed
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),
}

impl ContextError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceUnavailable(_))
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownTheme(theme) => format!("Theme {theme} does not exist."),
            Self::InvalidEdit { index, reason, .. } => format!("Edit {index} is invalid: {reason}"),
            Self::PersistenceUnavailable(_) => "Context storage is unavailable. Please try again.".into(),
        }
    }
}
