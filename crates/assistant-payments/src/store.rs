//! Checkout Session Storage

use std::collections::HashMap;
use std::sync::RwLock;

use crate::checkout::{CheckoutSession, CheckoutStatus};
use crate::error::{PaymentError, Result};

/// Session storage trait
pub trait SessionStore: Send + Sync {
    /// Latest snapshot for a session id
    fn load_session(&self, session_id: &str) -> Result<Option<CheckoutSession>>;

    /// Store a snapshot, replacing the previous one for the same id
    fn save_session(&self, session: &CheckoutSession) -> Result<()>;

    /// Atomically move a session from `expected` to `next`.
    ///
    /// Returns the new snapshot, or `None` when the stored status no longer
    /// equals `expected`. Fails with `SessionNotFound` for unknown ids.
    fn transition(
        &self,
        session_id: &str,
        expected: CheckoutStatus,
        next: CheckoutStatus,
    ) -> Result<Option<CheckoutSession>>;
}

/// In-memory session store (for development)
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, CheckoutSession>>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.sessions.read().map_err(poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl SessionStore for MemorySessionStore {
    fn load_session(&self, session_id: &str) -> Result<Option<CheckoutSession>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(session_id).cloned())
    }

    fn save_session(&self, session: &CheckoutSession) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.insert(session.session_id().to_string(), session.clone());
        Ok(())
    }

    fn transition(
        &self,
        session_id: &str,
        expected: CheckoutStatus,
        next: CheckoutStatus,
    ) -> Result<Option<CheckoutSession>> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let current = sessions
            .get_mut(session_id)
            .ok_or_else(|| PaymentError::SessionNotFound(session_id.to_string()))?;

        if current.status() != expected {
            return Ok(None);
        }

        *current = current.with_status(next);
        Ok(Some(current.clone()))
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> PaymentError {
    PaymentError::PersistenceUnavailable("session store lock poisoned".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(id: &str) -> CheckoutSession {
        CheckoutSession::new(
            id,
            format!("https://pay.example/{id}"),
            CheckoutStatus::Pending,
            "https://app.example/ok",
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySessionStore::new();
        let session = pending("cs_1");

        store.save_session(&session).unwrap();
        store.save_session(&session.with_status(CheckoutStatus::Expired)).unwrap();

        let loaded = store.load_session("cs_1").unwrap().unwrap();
        assert_eq!(loaded.status(), CheckoutStatus::Expired);
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.load_session("cs_2").unwrap().is_none());
    }

    #[test]
    fn test_transition_compares_status() {
        let store = MemorySessionStore::new();
        store.save_session(&pending("cs_1")).unwrap();

        let moved = store
            .transition("cs_1", CheckoutStatus::Pending, CheckoutStatus::Completed)
            .unwrap()
            .unwrap();
        assert_eq!(moved.status(), CheckoutStatus::Completed);

        let lost = store
            .transition("cs_1", CheckoutStatus::Pending, CheckoutStatus::Expired)
            .unwrap();
        assert!(lost.is_none());
        assert_eq!(
            store.load_session("cs_1").unwrap().unwrap().status(),
            CheckoutStatus::Completed
        );

        assert!(matches!(
            store.transition("cs_2", CheckoutStatus::Pending, CheckoutStatus::Expired),
            Err(PaymentError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_poisoned_lock_is_reported() {
        let store = std::sync::Arc::new(MemorySessionStore::new());
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.sessions.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(matches!(store.len(), Err(PaymentError::PersistenceUnavailable(_))));
        assert!(matches!(store.load_session("cs_1"), Err(PaymentError::PersistenceUnavailable(_))));
    }
}
