//! # assistant-core
//!
//! Message triage and tool metadata for the chat-assistant integration.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     assistant-core                        │
//! │  ┌──────────────────┐        ┌────────────────────────┐  │
//! │  │ IntentKind       │        │ MetadataRegistry       │  │
//! │  │ (total classify) │        │ (capability -> map)    │  │
//! │  └──────────────────┘        └────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Classification never fails: anything that is not a known label becomes
//! [`IntentKind::Illegal`], which callers must treat as an explicit signal.

pub mod error;
pub mod intent;
pub mod metadata;

pub use error::{CoreError, Result};
pub use intent::{classify, IntentKind};
pub use metadata::{MetadataConfig, MetadataRegistry, OUTPUT_TEMPLATE, WIDGET};
