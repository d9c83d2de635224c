//! Checkout -> User Context Bridge
//!
//! Records each checkout status change as a `checkout:<session id>` entry in
//! the owning user's billing theme.

use async_trait::async_trait;
use serde_json::json;

use assistant_context::{ContextEditor, ContextError, EditContextRequest, MemoryContextStore, ThemeId, UserId};
use assistant_payments::{CheckoutSession, PaymentError, SessionObserver, WebhookEvent};

pub struct BillingContextObserver {
    editor: ContextEditor<MemoryContextStore>,
    theme: ThemeId,
}

impl BillingContextObserver {
    pub fn new(editor: ContextEditor<MemoryContextStore>, theme: ThemeId) -> Self {
        Self { editor, theme }
    }

    pub fn entry_key(session_id: &str) -> String {
        format!("checkout:{session_id}")
    }
}

#[async_trait]
impl SessionObserver for BillingContextObserver {
    async fn on_status_change(
        &self,
        session: &CheckoutSession,
        event: &WebhookEvent,
    ) -> assistant_payments::Result<()> {
        let Some(user_id) = session.user_id().and_then(|id| id.parse::<UserId>().ok()) else {
            tracing::debug!(session_id = %session.session_id(), "Session has no user, skipping context update");
            return Ok(());
        };

        let edit = EditContextRequest::upsert(
            self.theme,
            Self::entry_key(session.session_id()),
            json!({
                "status": session.status(),
                "event_type": event.event_type,
                "updated_at": session.updated_at(),
            }),
        );

        self.editor
            .edit_context(user_id, &[edit])
            .map_err(|e| match e {
                ContextError::PersistenceUnavailable(msg) => PaymentError::PersistenceUnavailable(msg),
                other => PaymentError::Config(other.to_string()),
            })?;

        Ok(())
    }
}
