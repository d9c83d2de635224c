//! Application State

use std::sync::Arc;

use assistant_context::{ContextEditor, MemoryContextStore};
use assistant_core::MetadataRegistry;
use assistant_payments::{MemoryDedupStore, MemorySessionStore, StripeClient, WebhookRouter};

use crate::billing::BillingContextObserver;
use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Tool metadata served to the assistant host
    pub metadata: Arc<MetadataRegistry>,

    /// User context editing
    pub contexts: ContextEditor<MemoryContextStore>,

    /// Checkout session snapshots
    pub sessions: Arc<MemorySessionStore>,

    /// Webhook routing with dedup
    pub webhooks: Arc<WebhookRouter<MemorySessionStore, MemoryDedupStore>>,

    /// Stripe client (optional - None if not configured)
    pub stripe: Option<Arc<StripeClient>>,

    /// Webhook signing secret (optional - signatures unchecked if None)
    pub webhook_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let metadata = MetadataRegistry::from_config(&config.metadata)?;

        let mut themes = config.default_themes.clone();
        if !themes.contains(&config.billing_theme) {
            themes.push(config.billing_theme);
        }
        let contexts = ContextEditor::new(Arc::new(MemoryContextStore::new(themes)));

        let sessions = Arc::new(MemorySessionStore::new());
        let dedup = Arc::new(MemoryDedupStore::new(config.dedup_capacity, config.dedup_retention));
        let observer = Arc::new(BillingContextObserver::new(contexts.clone(), config.billing_theme));
        let webhooks = WebhookRouter::new(sessions.clone(), dedup, observer);

        Ok(Self {
            metadata: Arc::new(metadata),
            contexts,
            sessions,
            webhooks: Arc::new(webhooks),
            stripe: config
                .stripe_secret_key
                .as_deref()
                .map(|key| Arc::new(StripeClient::new(key))),
            webhook_secret: config.webhook_secret.as_deref().map(Arc::from),
        })
    }
}
