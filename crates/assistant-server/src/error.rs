//! API Error Mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use assistant_context::ContextError;
use assistant_core::CoreError;
use assistant_payments::PaymentError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Handler error. Implements `IntoResponse` so handlers can return `Result<T, ApiError>`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payments not configured")]
    PaymentsDisabled,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::Payment(e) => {
                let (status, code) = match e {
                    PaymentError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, "MALFORMED_PAYLOAD"),
                    PaymentError::UnrecognizedEventType(_) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "UNRECOGNIZED_EVENT_TYPE")
                    }
                    PaymentError::DuplicateEvent(_) => (StatusCode::CONFLICT, "DUPLICATE_EVENT"),
                    PaymentError::InvalidSessionResponse(_) => {
                        (StatusCode::BAD_GATEWAY, "INVALID_SESSION_RESPONSE")
                    }
                    PaymentError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
                    PaymentError::WebhookSignature(_) => (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE"),
                    PaymentError::Provider(_) => (StatusCode::BAD_GATEWAY, "CHECKOUT_ERROR"),
                    PaymentError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
                    PaymentError::PersistenceUnavailable(_) => {
                        (StatusCode::SERVICE_UNAVAILABLE, "PERSISTENCE_UNAVAILABLE")
                    }
                };
                (status, code, e.user_message().to_string())
            }
            Self::Context(e) => {
                let (status, code) = match e {
                    ContextError::UnknownTheme(_) => (StatusCode::UNPROCESSABLE_ENTITY, "UNKNOWN_THEME"),
                    ContextError::InvalidEdit { .. } => (StatusCode::BAD_REQUEST, "INVALID_EDIT"),
                    ContextError::PersistenceUnavailable(_) => {
                        (StatusCode::SERVICE_UNAVAILABLE, "PERSISTENCE_UNAVAILABLE")
                    }
                };
                (status, code, e.user_message())
            }
            Self::Core(e) => {
                let (status, code) = match e {
                    CoreError::UnknownCapability(_) => (StatusCode::NOT_FOUND, "UNKNOWN_CAPABILITY"),
                    CoreError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
                };
                (status, code, e.user_message())
            }
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            Self::PaymentsDisabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "PAYMENTS_DISABLED",
                "Payments not configured".into(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, error) = self.parts();

        if status.is_server_error() {
            tracing::error!(code, error = %self, "Request failed");
        } else {
            tracing::debug!(code, error = %self, "Request rejected");
        }

        (
            status,
            Json(ErrorResponse {
                error,
                code: code.into(),
            }),
        )
            .into_response()
    }
}
