//! Error Types

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// No metadata registered under this capability name
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    /// Metadata configuration rejected at startup
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownCapability(name) => format!("The capability '{name}' is not available."),
            Self::Config(_) => "Service configuration error.".into(),
        }
    }
}
