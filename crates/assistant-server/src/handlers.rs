//! HTTP Handlers

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use assistant_context::{ContextStore, EditContextRequest, ThemeId, UserContextDto, UserId};
use assistant_core::{classify, IntentKind};
use assistant_payments::{
    verify_signature, CheckoutRequest, CheckoutSession, EventOutcome, SessionStore, WebhookEvent,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the provider's webhook signature
pub const SIGNATURE_HEADER: &str = "checkout-signature";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub stripe_configured: bool,
    pub webhook_signing: bool,
}

#[derive(Debug, Deserialize)]
pub struct IntentRequest {
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct IntentResponse {
    pub intent: IntentKind,
    pub actionable: bool,
}

#[derive(Debug, Deserialize)]
pub struct ContextQuery {
    /// Comma-separated theme ids; all themes when absent
    #[serde(default)]
    pub themes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub status: &'static str,
}

impl WebhookAck {
    const fn new(status: &'static str) -> Self {
        Self {
            received: true,
            status,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        stripe_configured: state.stripe.is_some(),
        webhook_signing: state.webhook_secret.is_some(),
    })
}

/// Classify a message label
pub async fn classify_intent(Json(payload): Json<IntentRequest>) -> Json<IntentResponse> {
    let intent = classify(&payload.label);
    Json(IntentResponse {
        intent,
        actionable: intent.is_actionable(),
    })
}

/// All capability metadata, keyed by capability name
pub async fn list_metadata(State(state): State<AppState>) -> Json<Map<String, Value>> {
    let all = state
        .metadata
        .names()
        .into_iter()
        .filter_map(|name| {
            state
                .metadata
                .get(name)
                .ok()
                .map(|map| (name.to_string(), Value::Object(map.clone())))
        })
        .collect();
    Json(all)
}

/// One capability's metadata
pub async fn get_metadata(
    State(state): State<AppState>,
    Path(capability): Path<String>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    Ok(Json(state.metadata.get(&capability)?.clone()))
}

/// Read a user's context, optionally filtered by theme
pub async fn get_context(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(query): Query<ContextQuery>,
) -> Result<Json<UserContextDto>, ApiError> {
    let dto = match query.themes.as_deref() {
        Some(raw) => {
            let themes = parse_theme_filter(raw)?;
            state.contexts.get_context(user_id, &themes)?
        }
        None => state.contexts.store().load_user_context(user_id)?.into(),
    };
    Ok(Json(dto))
}

/// Apply an edit batch to a user's context
pub async fn edit_context(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(edits): Json<Vec<EditContextRequest>>,
) -> Result<Json<UserContextDto>, ApiError> {
    Ok(Json(state.contexts.edit_context(user_id, &edits)?))
}

/// Create a hosted checkout session
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutSession>, ApiError> {
    let stripe = state.stripe.as_ref().ok_or(ApiError::PaymentsDisabled)?;

    if payload.amount_cents <= 0 {
        return Err(ApiError::Validation("amount_cents must be positive".into()));
    }
    if let Some(user_id) = payload.user_id.as_deref() {
        user_id
            .parse::<UserId>()
            .map_err(|_| ApiError::Validation(format!("invalid user_id '{user_id}'")))?;
    }

    let session = stripe.create_checkout_session(payload).await?;
    state.sessions.save_session(&session)?;

    Ok(Json(session))
}

/// Current snapshot of a checkout session
pub async fn get_checkout(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<CheckoutSession>, ApiError> {
    state
        .sessions
        .load_session(&session_id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("checkout session {session_id}")))
}

/// Checkout provider webhook
pub async fn checkout_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookAck>, ApiError> {
    if let Some(secret) = state.webhook_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Validation("Missing webhook signature".into()))?;

        verify_signature(&body, signature, secret, chrono::Utc::now()).map_err(|e| {
            tracing::warn!("Webhook signature failed: {}", e);
            e
        })?;
    }

    let event = WebhookEvent::from_json(&body)?;

    match state.webhooks.handle_event(&event).await {
        Ok(EventOutcome::Applied(_)) => Ok(Json(WebhookAck::new("applied"))),
        Ok(EventOutcome::Duplicate { .. }) => Ok(Json(WebhookAck::new("duplicate"))),
        Ok(EventOutcome::Anomaly { .. }) => Ok(Json(WebhookAck::new("ignored"))),
        Err(e) if e.should_acknowledge() => {
            tracing::info!(error = %e, "Acknowledging webhook without processing");
            Ok(Json(WebhookAck::new("unrecognized")))
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_theme_filter(raw: &str) -> Result<Vec<ThemeId>, ApiError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map(ThemeId)
                .map_err(|_| ApiError::Validation(format!("invalid theme id '{s}'")))
        })
        .collect()
}
