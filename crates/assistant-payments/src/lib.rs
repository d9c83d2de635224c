//! # assistant-payments
//!
//! Hosted checkout sessions and webhook processing.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌─────────────┐
//! │  Assistant  │────▶│ Provider Hosted │────▶│  Assistant  │
//! │  (widget)   │     │  Checkout Page  │     │  (success)  │
//! └─────────────┘     └────────┬────────┘     └─────────────┘
//!                              │ webhook
//!                              ▼
//!                  ┌──────────────────────┐
//!                  │ WebhookRouter        │
//!                  │  claim ─▶ apply ─▶   │
//!                  │  notify ─▶ mark      │
//!                  └──────────────────────┘
//! ```
//!
//! Deliveries are at-least-once. Every event id is claimed in an
//! [`EventDedupStore`] before any side effect, so redeliveries and concurrent
//! duplicates are skipped.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use assistant_payments::{
//!     LoggingObserver, MemoryDedupStore, MemorySessionStore, WebhookEvent, WebhookRouter,
//! };
//!
//! let router = WebhookRouter::new(
//!     Arc::new(MemorySessionStore::new()),
//!     Arc::new(MemoryDedupStore::default()),
//!     Arc::new(LoggingObserver),
//! );
//!
//! let event = WebhookEvent::from_json(&body)?;
//! let outcome = router.handle_event(&event).await?;
//! ```

mod checkout;
mod dedup;
mod error;
mod signature;
mod store;
mod webhook;

pub use checkout::{CheckoutRequest, CheckoutSession, CheckoutStatus, StripeClient};
pub use dedup::{EventDedupStore, MemoryDedupStore};
pub use error::{PaymentError, Result};
pub use signature::{compute_signature, verify_signature, SIGNATURE_TOLERANCE_SECS};
pub use store::{MemorySessionStore, SessionStore};
pub use webhook::{EventKind, EventOutcome, LoggingObserver, SessionObserver, WebhookEvent, WebhookRouter};
