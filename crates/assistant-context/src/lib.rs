//! # assistant-context
//!
//! Per-user contextual key-value state, partitioned into themes.
//!
//! Edits arrive as ordered batches and are all-or-nothing: a batch that
//! targets an unknown theme or carries an upsert without a value is rejected
//! before anything reaches the store.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use assistant_context::{ContextEditor, EditContextRequest, MemoryContextStore, ThemeId, UserId};
//!
//! let editor = ContextEditor::new(Arc::new(MemoryContextStore::default()));
//! let user = UserId::new();
//!
//! editor.edit_context(user, &[
//!     EditContextRequest::upsert(ThemeId(1), "tone", json!("formal")),
//!     EditContextRequest::delete(ThemeId(1), "draft"),
//! ])?;
//!
//! let ctx = editor.get_context(user, &[ThemeId(1)])?;
//! ```

mod editor;
mod error;
mod model;
mod store;

pub use editor::ContextEditor;
pub use error::{ContextError, Result};
pub use model::{
    ContextEntry, ContextState, EditContextRequest, EditOperation, ThemeId, UserContext,
    UserContextDto, UserId,
};
pub use store::{ContextStore, MemoryContextStore};
