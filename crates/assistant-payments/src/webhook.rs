//! Checkout Webhook Handling
//!
//! Decodes provider notifications, classifies them into a closed set of event
//! kinds, and drives each session's state machine:
//!
//! ```text
//!            ┌──▶ completed
//! pending ───┼──▶ expired
//!            └──▶ failed
//! ```
//!
//! Terminal states absorb later events; those are logged as anomalies and
//! acknowledged, since the provider may redeliver.
//!
//! When the observer fails with a retryable error after a transition, the
//! event's claim is released and the session is remembered as unnotified, so
//! the provider's redelivery re-runs only the notification.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::checkout::{CheckoutSession, CheckoutStatus};
use crate::dedup::EventDedupStore;
use crate::error::{PaymentError, Result};
use crate::store::SessionStore;

/// Inbound provider notification
#[derive(Clone, Debug, Serialize)]
pub struct WebhookEvent {
    pub event_type: String,
    pub payload: Map<String, Value>,
    pub received_at: DateTime<Utc>,
}

impl WebhookEvent {
    pub fn new(event_type: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            received_at: Utc::now(),
        }
    }

    /// Decode a raw body. The type is read from `event_type`, or `type` as sent
    /// by Stripe-shaped providers; every other field stays in the payload.
    pub fn from_json(body: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| PaymentError::MalformedPayload(e.to_string()))?;

        let Value::Object(mut payload) = value else {
            return Err(PaymentError::MalformedPayload("body is not a JSON object".into()));
        };

        let event_type = ["event_type", "type"]
            .iter()
            .find_map(|field| match payload.remove(*field) {
                Some(Value::String(s)) if !s.is_empty() => Some(s),
                _ => None,
            })
            .ok_or_else(|| PaymentError::MalformedPayload("missing event_type".into()))?;

        Ok(Self::new(event_type, payload))
    }

    /// Provider-assigned event identifier
    pub fn event_id(&self) -> Result<&str> {
        self.str_at(&[&["id"], &["event_id"]])
            .ok_or_else(|| PaymentError::MalformedPayload("missing event id".into()))
    }

    /// Session the event refers to
    pub fn session_id(&self) -> Result<&str> {
        self.str_at(&[&["session_id"], &["data", "object", "id"]])
            .ok_or_else(|| PaymentError::MalformedPayload("missing session_id".into()))
    }

    /// First non-empty string found along any of `paths`
    fn str_at(&self, paths: &[&[&str]]) -> Option<&str> {
        paths.iter().find_map(|path| {
            let (first, rest) = path.split_first()?;
            rest.iter()
                .try_fold(self.payload.get(*first)?, |value, segment| value.get(*segment))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
    }
}

/// Known event kinds
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    CheckoutCompleted,
    CheckoutExpired,
    CheckoutFailed,
    Unknown(String),
}

impl EventKind {
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "checkout.session.completed" => Self::CheckoutCompleted,
            "checkout.session.expired" => Self::CheckoutExpired,
            "checkout.session.async_payment_failed" | "payment_intent.payment_failed" => {
                Self::CheckoutFailed
            }
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Status the session moves to, `None` for unknown events
    pub const fn target_status(&self) -> Option<CheckoutStatus> {
        match self {
            Self::CheckoutCompleted => Some(CheckoutStatus::Completed),
            Self::CheckoutExpired => Some(CheckoutStatus::Expired),
            Self::CheckoutFailed => Some(CheckoutStatus::Failed),
            Self::Unknown(_) => None,
        }
    }
}

/// What handling an event did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    /// Session moved to a new status
    Applied(CheckoutSession),

    /// Event id already claimed; no side effects
    Duplicate { event_id: String },

    /// Session was already terminal; state left as is
    Anomaly {
        session: CheckoutSession,
        attempted: CheckoutStatus,
    },
}

/// Collaborators interested in session status changes (billing, user context)
#[async_trait]
pub trait SessionObserver: Send + Sync {
    async fn on_status_change(&self, session: &CheckoutSession, event: &WebhookEvent) -> Result<()>;
}

/// Observer that only logs
pub struct LoggingObserver;

#[async_trait]
impl SessionObserver for LoggingObserver {
    async fn on_status_change(&self, session: &CheckoutSession, _event: &WebhookEvent) -> Result<()> {
        tracing::info!(
            session_id = %session.session_id(),
            status = %session.status(),
            "Checkout session status changed"
        );
        Ok(())
    }
}

/// Webhook router
pub struct WebhookRouter<S: SessionStore, D: EventDedupStore> {
    sessions: Arc<S>,
    dedup: Arc<D>,
    observer: Arc<dyn SessionObserver>,
    /// Sessions whose transition committed but whose observer call failed
    unnotified: Mutex<HashSet<String>>,
}

impl<S: SessionStore, D: EventDedupStore> WebhookRouter<S, D> {
    pub fn new(sessions: Arc<S>, dedup: Arc<D>, observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            sessions,
            dedup,
            observer,
            unnotified: Mutex::new(HashSet::new()),
        }
    }

    /// Process one event.
    ///
    /// Fails with `UnrecognizedEventType` for unknown types and
    /// `MalformedPayload` when the event or session id is missing. Redelivered
    /// events yield [`EventOutcome::Duplicate`].
    pub async fn handle_event(&self, event: &WebhookEvent) -> Result<EventOutcome> {
        tracing::info!(
            event_type = %event.event_type,
            received_at = %event.received_at,
            "Processing checkout webhook"
        );

        let Some(target) = EventKind::from_type(&event.event_type).target_status() else {
            tracing::warn!(event_type = %event.event_type, "Unrecognized webhook event type");
            return Err(PaymentError::UnrecognizedEventType(event.event_type.clone()));
        };

        let event_id = event.event_id()?;
        let session_id = event.session_id()?;

        match self.dedup.claim(event_id) {
            Ok(()) => {}
            Err(PaymentError::DuplicateEvent(_)) => {
                tracing::info!(event_id = %event_id, "Duplicate webhook event, skipping");
                return Ok(EventOutcome::Duplicate {
                    event_id: event_id.to_string(),
                });
            }
            Err(e) => return Err(e),
        }

        match self.apply(event, session_id, target).await {
            Ok(outcome) => {
                self.dedup.mark_processed(event_id)?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(release_err) = self.dedup.release(event_id) {
                    tracing::error!(event_id = %event_id, error = %release_err, "Failed to release event claim");
                }
                Err(e)
            }
        }
    }

    async fn apply(
        &self,
        event: &WebhookEvent,
        session_id: &str,
        target: CheckoutStatus,
    ) -> Result<EventOutcome> {
        let session = self
            .sessions
            .load_session(session_id)?
            .ok_or_else(|| PaymentError::SessionNotFound(session_id.to_string()))?;

        if session.status().is_terminal() {
            if session.status() == target && self.take_unnotified(session_id)? {
                tracing::info!(session_id = %session_id, "Retrying session notification");
                self.notify(&session, event).await?;
                return Ok(EventOutcome::Applied(session));
            }
            return Ok(Self::anomaly(session, target));
        }

        let Some(updated) = self.sessions.transition(session_id, session.status(), target)? else {
            // Another event moved the session first
            let current = self
                .sessions
                .load_session(session_id)?
                .ok_or_else(|| PaymentError::SessionNotFound(session_id.to_string()))?;
            return Ok(Self::anomaly(current, target));
        };

        tracing::info!(
            session_id = %session_id,
            status = %updated.status(),
            "Checkout session updated"
        );

        self.notify(&updated, event).await?;
        Ok(EventOutcome::Applied(updated))
    }

    /// Run the observer. Retryable failures are returned and remembered so a
    /// redelivery can notify again; other failures are only logged.
    async fn notify(&self, session: &CheckoutSession, event: &WebhookEvent) -> Result<()> {
        match self.observer.on_status_change(session, event).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_retryable() => {
                tracing::warn!(session_id = %session.session_id(), error = %e, "Session observer failed, awaiting redelivery");
                self.unnotified
                    .lock()
                    .map_err(poisoned)?
                    .insert(session.session_id().to_string());
                Err(e)
            }
            Err(e) => {
                tracing::error!(session_id = %session.session_id(), error = %e, "Session observer failed");
                Ok(())
            }
        }
    }

    fn take_unnotified(&self, session_id: &str) -> Result<bool> {
        Ok(self.unnotified.lock().map_err(poisoned)?.remove(session_id))
    }

    fn anomaly(session: CheckoutSession, attempted: CheckoutStatus) -> EventOutcome {
        tracing::warn!(
            session_id = %session.session_id(),
            current = %session.status(),
            attempted = %attempted,
            "Event for terminal session ignored"
        );
        EventOutcome::Anomaly { session, attempted }
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> PaymentError {
    PaymentError::PersistenceUnavailable("notification tracking lock poisoned".into())
}
