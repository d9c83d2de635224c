//! Context Editing
//!
//! Applies ordered edit batches to a user's context. A batch is validated and
//! applied on a working copy; nothing is saved unless every edit succeeds.

use std::sync::Arc;

use crate::error::{ContextError, Result};
use crate::model::{ContextState, EditContextRequest, EditOperation, ThemeId, UserContextDto, UserId};
use crate::store::ContextStore;

/// Batch editor over a context store
pub struct ContextEditor<S: ContextStore> {
    store: Arc<S>,
}

impl<S: ContextStore> Clone for ContextEditor<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ContextStore> ContextEditor<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply `edits` in order and persist the result.
    ///
    /// Later edits to the same key win. Deleting a missing key is a no-op.
    /// Returns the full resulting state.
    pub fn edit_context(&self, user_id: UserId, edits: &[EditContextRequest]) -> Result<UserContextDto> {
        let mut state = self.store.load_user_context(user_id)?;

        apply_edits(&mut state, edits)?;

        self.store.save_user_context(&state)?;

        tracing::info!(
            user_id = %user_id,
            edits = edits.len(),
            "Applied context edits"
        );

        Ok(state.into())
    }

    /// Current entries of the requested themes. Unknown themes are skipped.
    pub fn get_context(&self, user_id: UserId, theme_ids: &[ThemeId]) -> Result<UserContextDto> {
        let mut state = self.store.load_user_context(user_id)?;
        state.contexts.retain(|c| theme_ids.contains(&c.theme_id));
        Ok(state.into())
    }
}

fn apply_edits(state: &mut ContextState, edits: &[EditContextRequest]) -> Result<()> {
    for (index, edit) in edits.iter().enumerate() {
        let context = state
            .theme_mut(edit.theme_id)
            .ok_or(ContextError::UnknownTheme(edit.theme_id))?;

        match edit.operation {
            EditOperation::Upsert => {
                let value = edit.value.clone().ok_or_else(|| ContextError::InvalidEdit {
                    index,
                    key: edit.key.clone(),
                    reason: "upsert requires a value".into(),
                })?;
                context.upsert(&edit.key, value);
            }
            EditOperation::Delete => {
                if !context.remove(&edit.key) {
                    tracing::debug!(theme_id = %edit.theme_id, key = %edit.key, "Delete of missing key");
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryContextStore;
    use serde_json::json;

    const THEME_A: ThemeId = ThemeId(1);
    const THEME_B: ThemeId = ThemeId(2);
    const THEME_C: ThemeId = ThemeId(3);

    fn editor() -> ContextEditor<MemoryContextStore> {
        ContextEditor::new(Arc::new(MemoryContextStore::new(vec![THEME_A, THEME_B, THEME_C])))
    }

    fn keys(dto: &UserContextDto, theme: ThemeId) -> Vec<String> {
        dto.contexts
            .iter()
            .find(|c| c.theme_id == theme)
            .map(|c| c.entries.iter().map(|e| e.key.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_delete_missing_key_is_noop() {
        let editor = editor();
        let user = UserId::new();

        let dto = editor
            .edit_context(
                user,
                &[
                    EditContextRequest::upsert(THEME_A, "k1", json!("v1")),
                    EditContextRequest::delete(THEME_A, "k2"),
                ],
            )
            .unwrap();

        assert_eq!(keys(&dto, THEME_A), vec!["k1"]);
    }

    #[test]
    fn test_last_write_wins() {
        let editor = editor();
        let user = UserId::new();

        editor
            .edit_context(
                user,
                &[
                    EditContextRequest::upsert(THEME_A, "k", json!(1)),
                    EditContextRequest::upsert(THEME_A, "k", json!(2)),
                ],
            )
            .unwrap();

        let dto = editor.get_context(user, &[THEME_A]).unwrap();
        assert_eq!(dto.contexts[0].get("k"), Some(&json!(2)));
        assert_eq!(dto.contexts[0].entries.len(), 1);
    }

    #[test]
    fn test_upsert_without_value_leaves_state_unchanged() {
        let editor = editor();
        let user = UserId::new();
        editor
            .edit_context(user, &[EditContextRequest::upsert(THEME_A, "kept", json!(true))])
            .unwrap();

        let bad = EditContextRequest {
            value: None,
            ..EditContextRequest::upsert(THEME_A, "k", json!(null))
        };
        let err = editor
            .edit_context(
                user,
                &[EditContextRequest::upsert(THEME_A, "early", json!(1)), bad],
            )
            .unwrap_err();

        assert!(matches!(err, ContextError::InvalidEdit { index: 1, ref key, .. } if key == "k"));
        let dto = editor.get_context(user, &[THEME_A]).unwrap();
        assert_eq!(keys(&dto, THEME_A), vec!["kept"]);
    }

    #[test]
    fn test_unknown_theme_rejects_whole_batch() {
        let editor = editor();
        let user = UserId::new();

        let err = editor
            .edit_context(
                user,
                &[
                    EditContextRequest::upsert(THEME_A, "k", json!(1)),
                    EditContextRequest::upsert(ThemeId(42), "k", json!(1)),
                ],
            )
            .unwrap_err();

        assert!(matches!(err, ContextError::UnknownTheme(ThemeId(42))));
        assert!(keys(&editor.get_context(user, &[THEME_A]).unwrap(), THEME_A).is_empty());
    }

    #[test]
    fn test_get_context_filters_themes() {
        let editor = editor();
        let user = UserId::new();
        editor
            .edit_context(
                user,
                &[
                    EditContextRequest::upsert(THEME_B, "b1", json!("x")),
                    EditContextRequest::upsert(THEME_A, "a1", json!("x")),
                    EditContextRequest::upsert(THEME_C, "c1", json!("x")),
                    EditContextRequest::upsert(THEME_A, "a2", json!("x")),
                    EditContextRequest::upsert(THEME_B, "b2", json!("x")),
                ],
            )
            .unwrap();

        let dto = editor.get_context(user, &[THEME_A, THEME_B, ThemeId(99)]).unwrap();

        assert_eq!(dto.contexts.len(), 2);
        assert_eq!(keys(&dto, THEME_A), vec!["a1", "a2"]);
        assert_eq!(keys(&dto, THEME_B), vec!["b1", "b2"]);
        assert!(keys(&dto, THEME_C).is_empty());
    }

    #[test]
    fn test_users_are_isolated() {
        let editor = editor();
        let alice = UserId::new();
        let bob = UserId::new();

        editor
            .edit_context(alice, &[EditContextRequest::upsert(THEME_A, "k", json!(1))])
            .unwrap();

        assert!(keys(&editor.get_context(bob, &[THEME_A]).unwrap(), THEME_A).is_empty());
    }
}
