//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Webhook body unparseable or missing required fields
    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),

    /// Event type has no handler
    #[error("Unrecognized event type: {0}")]
    UnrecognizedEventType(String),

    /// Event id already claimed by another delivery
    #[error("Duplicate event: {0}")]
    DuplicateEvent(String),

    /// Provider returned an unusable checkout session
    #[error("Invalid session response: {0}")]
    InvalidSessionResponse(String),

    /// Event refers to a session we never created
    #[error("Checkout session not found: {0}")]
    SessionNotFound(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Checkout provider API error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage collaborator failed
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),
}

impl PaymentError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::PersistenceUnavailable(_))
    }

    /// Whether the provider should be told the delivery succeeded anyway
    pub const fn should_acknowledge(&self) -> bool {
        matches!(self, Self::UnrecognizedEventType(_) | Self::DuplicateEvent(_))
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &str {
        match self {
            Self::MalformedPayload(_) => "The webhook payload could not be read.",
            Self::InvalidSessionResponse(_) | Self::Provider(_) => {
                "Payment processing failed. Please try again."
            }
            Self::WebhookSignature(_) => "Invalid webhook signature.",
            Self::SessionNotFound(_) => "Checkout session not found.",
            Self::Config(_) => "Service configuration error.",
            Self::PersistenceUnavailable(_) => "Storage is temporarily unavailable.",
            _ => "An error occurred processing your request.",
        }
    }
}
