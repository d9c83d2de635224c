//! Processed-Event Tracking
//!
//! Providers redeliver webhooks at least once. Handlers claim an event id
//! before doing any work; a second claim for the same id fails with
//! [`PaymentError::DuplicateEvent`] and the caller skips its side effects.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::{PaymentError, Result};

/// Dedup storage trait
pub trait EventDedupStore: Send + Sync {
    /// Whether the event finished processing
    fn has_processed(&self, event_id: &str) -> Result<bool>;

    /// Record the event as fully processed
    fn mark_processed(&self, event_id: &str) -> Result<()>;

    /// Atomically claim the event. Fails with `DuplicateEvent` if it is already
    /// claimed or processed.
    fn claim(&self, event_id: &str) -> Result<()>;

    /// Drop an unfinished claim so a redelivery can retry
    fn release(&self, event_id: &str) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ClaimState {
    InFlight,
    Processed,
}

#[derive(Clone, Copy, Debug)]
struct Claim {
    state: ClaimState,
    at: DateTime<Utc>,
}

#[derive(Default)]
struct DedupState {
    claims: HashMap<String, Claim>,
    order: VecDeque<(String, DateTime<Utc>)>,
}

impl DedupState {
    /// Remove `id` if its live claim was recorded at `at`
    fn remove_current(&mut self, id: &str, at: DateTime<Utc>) -> bool {
        if self.claims.get(id).is_some_and(|c| c.at == at) {
            self.claims.remove(id);
            true
        } else {
            false
        }
    }
}

/// In-memory dedup store bounded by entry count and age
pub struct MemoryDedupStore {
    state: Mutex<DedupState>,
    capacity: usize,
    /// `None` disables age-based eviction
    retention: Option<Duration>,
}

impl Default for MemoryDedupStore {
    fn default() -> Self {
        Self::new(10_000, Duration::hours(72))
    }
}

impl MemoryDedupStore {
    pub fn new(capacity: usize, retention: Duration) -> Self {
        let retention = (retention > Duration::zero()).then_some(retention);
        if retention.is_none() {
            tracing::warn!("Non-positive dedup retention, entries expire by capacity only");
        }
        Self {
            state: Mutex::new(DedupState::default()),
            capacity: capacity.max(1),
            retention,
        }
    }

    /// Evict entries older than the retention window. Returns how many were dropped.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut state = self.state.lock().map_err(poisoned)?;
        Ok(self.evict(&mut state, now))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.state.lock().map_err(poisoned)?.claims.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn evict(&self, state: &mut DedupState, now: DateTime<Utc>) -> usize {
        let mut evicted = 0;

        if let Some(cutoff) = self.retention.and_then(|r| now.checked_sub_signed(r)) {
            while let Some((id, at)) = state.order.front().cloned() {
                if at >= cutoff {
                    break;
                }
                state.order.pop_front();
                // Stale order entries left behind by release + reclaim are skipped
                if state.remove_current(&id, at) {
                    evicted += 1;
                }
            }
        }

        // Capacity pressure only drops finished events; in-flight claims stay
        let mut idx = 0;
        while state.claims.len() > self.capacity && idx < state.order.len() {
            let (id, at) = state.order[idx].clone();
            match state.claims.get(&id).map(|c| (c.at == at, c.state)) {
                Some((true, ClaimState::InFlight)) => idx += 1,
                Some((true, ClaimState::Processed)) => {
                    state.order.remove(idx);
                    state.claims.remove(&id);
                    evicted += 1;
                }
                _ => {
                    state.order.remove(idx);
                }
            }
        }

        if evicted > 0 {
            tracing::debug!(evicted, remaining = state.claims.len(), "Evicted dedup entries");
        }
        evicted
    }
}

impl EventDedupStore for MemoryDedupStore {
    fn has_processed(&self, event_id: &str) -> Result<bool> {
        let state = self.state.lock().map_err(poisoned)?;
        Ok(state
            .claims
            .get(event_id)
            .is_some_and(|c| c.state == ClaimState::Processed))
    }

    fn mark_processed(&self, event_id: &str) -> Result<()> {
        let mut state = self.state.lock().map_err(poisoned)?;
        let now = Utc::now();
        match state.claims.get_mut(event_id) {
            Some(claim) => claim.state = ClaimState::Processed,
            None => {
                state.claims.insert(
                    event_id.to_string(),
                    Claim {
                        state: ClaimState::Processed,
                        at: now,
                    },
                );
                state.order.push_back((event_id.to_string(), now));
                self.evict(&mut state, now);
            }
        }
        Ok(())
    }

    fn claim(&self, event_id: &str) -> Result<()> {
        let mut state = self.state.lock().map_err(poisoned)?;
        let now = Utc::now();
        self.evict(&mut state, now);

        if state.claims.contains_key(event_id) {
            return Err(PaymentError::DuplicateEvent(event_id.to_string()));
        }

        state.claims.insert(
            event_id.to_string(),
            Claim {
                state: ClaimState::InFlight,
                at: now,
            },
        );
        state.order.push_back((event_id.to_string(), now));
        self.evict(&mut state, now);
        Ok(())
    }

    fn release(&self, event_id: &str) -> Result<()> {
        let mut state = self.state.lock().map_err(poisoned)?;
        if state
            .claims
            .get(event_id)
            .is_some_and(|c| c.state == ClaimState::InFlight)
        {
            state.claims.remove(event_id);
        }
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> PaymentError {
    PaymentError::PersistenceUnavailable("dedup store lock poisoned".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_is_duplicate() {
        let store = MemoryDedupStore::default();
        store.claim("evt_1").unwrap();
        assert!(matches!(store.claim("evt_1"), Err(PaymentError::DuplicateEvent(id)) if id == "evt_1"));
        assert!(!store.has_processed("evt_1").unwrap());

        store.mark_processed("evt_1").unwrap();
        assert!(store.has_processed("evt_1").unwrap());
        assert!(store.claim("evt_1").is_err());
    }

    #[test]
    fn test_release_allows_retry() {
        let store = MemoryDedupStore::default();
        store.claim("evt_1").unwrap();
        store.release("evt_1").unwrap();
        store.claim("evt_1").unwrap();

        store.mark_processed("evt_1").unwrap();
        store.release("evt_1").unwrap();
        assert!(store.has_processed("evt_1").unwrap());
    }

    #[test]
    fn test_capacity_bound() {
        let store = MemoryDedupStore::new(2, Duration::hours(1));
        for id in ["a", "b", "c"] {
            store.claim(id).unwrap();
            store.mark_processed(id).unwrap();
        }

        assert_eq!(store.len().unwrap(), 2);
        assert!(!store.has_processed("a").unwrap());
        assert!(store.has_processed("c").unwrap());
    }

    #[test]
    fn test_retention_sweep() {
        let store = MemoryDedupStore::new(100, Duration::minutes(1));
        store.claim("old").unwrap();
        store.mark_processed("old").unwrap();

        assert_eq!(store.sweep(Utc::now()).unwrap(), 0);
        assert_eq!(store.sweep(Utc::now() + Duration::minutes(5)).unwrap(), 1);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_stale_order_entry_does_not_evict_reclaim() {
        let store = MemoryDedupStore::new(100, Duration::minutes(1));
        store.claim("evt").unwrap();
        store.release("evt").unwrap();
        store.claim("evt").unwrap();

        assert_eq!(store.sweep(Utc::now()).unwrap(), 0);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_capacity_keeps_in_flight_claims() {
        let store = MemoryDedupStore::new(1, Duration::hours(1));
        store.claim("a").unwrap();
        store.claim("b").unwrap();

        assert_eq!(store.len().unwrap(), 2);
        assert!(matches!(store.claim("a"), Err(PaymentError::DuplicateEvent(_))));

        store.mark_processed("a").unwrap();
        store.claim("c").unwrap();

        assert!(!store.has_processed("a").unwrap());
        assert!(matches!(store.claim("b"), Err(PaymentError::DuplicateEvent(_))));
        assert!(matches!(store.claim("c"), Err(PaymentError::DuplicateEvent(_))));
    }

    #[test]
    fn test_extreme_retention_keeps_dedup() {
        for retention in [Duration::hours(10_000_000_000), Duration::hours(-1), Duration::zero()] {
            let store = MemoryDedupStore::new(10, retention);
            store.claim("evt_1").unwrap();
            store.mark_processed("evt_1").unwrap();

            assert!(matches!(store.claim("evt_1"), Err(PaymentError::DuplicateEvent(_))));
            assert_eq!(store.sweep(Utc::now() + Duration::days(365)).unwrap(), 0);
        }
    }

    #[test]
    fn test_poisoned_lock_is_reported() {
        let store = std::sync::Arc::new(MemoryDedupStore::default());
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(matches!(store.len(), Err(PaymentError::PersistenceUnavailable(_))));
        assert!(matches!(store.claim("evt_1"), Err(PaymentError::PersistenceUnavailable(_))));
    }

    #[test]
    fn test_concurrent_claims_single_winner() {
        let store = std::sync::Arc::new(MemoryDedupStore::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.claim("evt_race").is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
