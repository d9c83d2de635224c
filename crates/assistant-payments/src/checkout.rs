//! Hosted Checkout Sessions
//!
//! [`CheckoutSession`] is an immutable snapshot: a status change produces a new
//! value for the same session id, never an in-place mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionMode, Client, CreateCheckoutSession,
    CreateCheckoutSessionLineItems, CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData, Currency,
};

use crate::error::{PaymentError, Result};

/// Lifecycle of a checkout session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStatus {
    Pending,
    Completed,
    Expired,
    Failed,
}

impl CheckoutStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }

    /// Strict parse. Accepts the provider's `open`/`complete` spellings.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" | "open" => Some(Self::Pending),
            "completed" | "complete" => Some(Self::Completed),
            "expired" => Some(Self::Expired),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal states absorb every later event
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for CheckoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a checkout session
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    session_id: String,
    checkout_url: String,
    status: CheckoutStatus,
    success_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    updated_at: DateTime<Utc>,
}

impl CheckoutSession {
    /// Validated constructor; `session_id` and `checkout_url` must be non-empty
    pub fn new(
        session_id: impl Into<String>,
        checkout_url: impl Into<String>,
        status: CheckoutStatus,
        success_url: impl Into<String>,
        user_id: Option<String>,
    ) -> Result<Self> {
        let session_id = session_id.into();
        let checkout_url = checkout_url.into();

        if session_id.trim().is_empty() {
            return Err(PaymentError::InvalidSessionResponse("missing session_id".into()));
        }
        if checkout_url.trim().is_empty() {
            return Err(PaymentError::InvalidSessionResponse(format!(
                "missing checkout_url for session {session_id}"
            )));
        }

        Ok(Self {
            session_id,
            checkout_url,
            status,
            success_url: success_url.into(),
            user_id,
            updated_at: Utc::now(),
        })
    }

    /// Decode a provider response body (`session_id`, `checkout_url`, `status`, `success_url`)
    pub fn from_response(body: &str) -> Result<Self> {
        let raw: SessionResponse = serde_json::from_str(body)
            .map_err(|e| PaymentError::InvalidSessionResponse(e.to_string()))?;
        raw.try_into()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn checkout_url(&self) -> &str {
        &self.checkout_url
    }

    pub const fn status(&self) -> CheckoutStatus {
        self.status
    }

    pub fn success_url(&self) -> &str {
        &self.success_url
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// New snapshot carrying `status`
    #[must_use]
    pub fn with_status(&self, status: CheckoutStatus) -> Self {
        Self {
            status,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}

/// Provider wire shape
#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(default)]
    session_id: String,
    #[serde(default)]
    checkout_url: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    success_url: String,
    #[serde(default)]
    user_id: Option<String>,
}

impl TryFrom<SessionResponse> for CheckoutSession {
    type Error = PaymentError;

    fn try_from(raw: SessionResponse) -> Result<Self> {
        let status = match raw.status.as_deref() {
            None => CheckoutStatus::Pending,
            Some(s) => CheckoutStatus::parse(s).ok_or_else(|| {
                PaymentError::InvalidSessionResponse(format!("unknown status '{s}'"))
            })?,
        };
        Self::new(raw.session_id, raw.checkout_url, status, raw.success_url, raw.user_id)
    }
}

/// Request to create a checkout session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Line item name shown on the hosted page
    pub product_name: String,

    /// Price in cents (USD)
    pub amount_cents: i64,

    /// Customer email
    #[serde(default)]
    pub customer_email: Option<String>,

    /// URL to redirect after successful payment
    pub success_url: String,

    /// URL to redirect if checkout is cancelled
    pub cancel_url: String,

    /// Owner of the session, echoed back in webhooks via metadata
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| PaymentError::Config("STRIPE_SECRET_KEY not set".into()))?;

        Ok(Self::new(&secret_key))
    }

    /// Create a hosted checkout session. The result starts out `pending`.
    pub async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        if request.amount_cents <= 0 {
            return Err(PaymentError::Config("amount must be positive".into()));
        }

        let mut params = CreateCheckoutSession::new();
        params.customer_email = request.customer_email.as_deref();
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);
        params.mode = Some(CheckoutSessionMode::Payment);

        if let Some(ref user_id) = request.user_id {
            let mut metadata = std::collections::HashMap::new();
            metadata.insert("user_id".to_string(), user_id.clone());
            params.metadata = Some(metadata);
        }

        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            quantity: Some(1),
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency: Currency::USD,
                unit_amount: Some(request.amount_cents),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: request.product_name.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]);

        let session = StripeCheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| PaymentError::Provider(e.to_string()))?;

        let created = CheckoutSession::new(
            session.id.to_string(),
            session.url.unwrap_or_default(),
            CheckoutStatus::Pending,
            request.success_url.clone(),
            request.user_id.clone(),
        )?;

        tracing::info!(session_id = %created.session_id(), "Created checkout session");

        Ok(created)
    }
}
