use std::collections::HashMap;
use std::sync::RwLock;

use referral_core::{AggregateRoot, DomainResult, ExpectedVersion, UserId};
use referral_graph::{EdgeDecision, Referral};

use super::r#trait::{ReferralStore, StoreError};

/// In-memory referral store guarded by a single map-wide reader/writer lock.
///
/// Reads share the lock; `create`, `replace` and `update` hold it exclusively,
/// so at most one referral mutation runs at a time per store.
#[derive(Debug, Default)]
pub struct InMemoryReferralStore {
    referrals: RwLock<HashMap<UserId, Referral>>,
}

impl InMemoryReferralStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let referrals = self.referrals.read().map_err(poisoned)?;
        Ok(referrals.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

fn poisoned<E>(_: E) -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl ReferralStore for InMemoryReferralStore {
    fn create(&self, owner: UserId) -> Result<(), StoreError> {
        let mut referrals = self.referrals.write().map_err(poisoned)?;

        if referrals.contains_key(&owner) {
            return Err(StoreError::AlreadyExists(owner));
        }
        referrals.insert(owner, Referral::new(owner));
        tracing::debug!(%owner, "referral record created");
        Ok(())
    }

    fn get(&self, owner: UserId) -> Result<Referral, StoreError> {
        let referrals = self.referrals.read().map_err(poisoned)?;

        referrals
            .get(&owner)
            .cloned()
            .ok_or(StoreError::NotFound(owner))
    }

    fn replace(&self, referral: Referral, expected: ExpectedVersion) -> Result<(), StoreError> {
        let owner = referral.owner();
        let mut referrals = self.referrals.write().map_err(poisoned)?;

        let current = referrals.get_mut(&owner).ok_or(StoreError::NotFound(owner))?;
        let actual = current.version();
        if !expected.matches(actual) {
            return Err(StoreError::Conflict {
                owner,
                expected,
                actual,
            });
        }

        tracing::debug!(%owner, from = actual, to = referral.version(), "referral record replaced");
        *current = referral;
        Ok(())
    }

    fn update<F>(&self, owner: UserId, apply: F) -> Result<EdgeDecision, StoreError>
    where
        F: FnOnce(&mut Referral) -> DomainResult<EdgeDecision>,
    {
        let mut referrals = self.referrals.write().map_err(poisoned)?;

        let current = referrals.get_mut(&owner).ok_or(StoreError::NotFound(owner))?;
        // Work on a copy so a rejected change cannot leave a half-applied aggregate.
        let mut next = current.clone();
        let decision = apply(&mut next)?;
        if decision.is_appended() {
            tracing::debug!(%owner, from = current.version(), to = next.version(), "referral record updated");
            *current = next;
        }
        Ok(decision)
    }

    fn owners(&self) -> Result<Vec<UserId>, StoreError> {
        let referrals = self.referrals.read().map_err(poisoned)?;

        let mut owners: Vec<UserId> = referrals.keys().copied().collect();
        owners.sort_unstable();
        Ok(owners)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use chrono::Utc;
    use referral_core::EdgeId;
    use referral_graph::User;

    use super::*;

    fn owner() -> UserId {
        UserId::new(100)
    }

    fn with_edge(mut referral: Referral, to: i64) -> Referral {
        let from = User::new(referral.owner());
        referral
            .record_edge(EdgeId::new(), from, User::new(UserId::new(to)), Utc::now())
            .unwrap();
        referral
    }

    #[test]
    fn create_then_get_returns_empty_referral() {
        let store = InMemoryReferralStore::new();
        store.create(owner()).unwrap();

        let referral = store.get(owner()).unwrap();
        assert_eq!(referral, Referral::new(owner()));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn create_twice_fails_with_already_exists() {
        let store = InMemoryReferralStore::new();
        store.create(owner()).unwrap();

        let err = store.create(owner()).unwrap_err();
        assert_eq!(err, StoreError::AlreadyExists(owner()));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn get_missing_fails_with_not_found() {
        let store = InMemoryReferralStore::new();
        assert_eq!(store.get(owner()).unwrap_err(), StoreError::NotFound(owner()));
    }

    #[test]
    fn replace_is_not_an_upsert() {
        let store = InMemoryReferralStore::new();
        let err = store
            .replace(Referral::new(owner()), ExpectedVersion::Any)
            .unwrap_err();

        assert_eq!(err, StoreError::NotFound(owner()));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn replace_persists_new_state() {
        let store = InMemoryReferralStore::new();
        store.create(owner()).unwrap();

        let updated = with_edge(store.get(owner()).unwrap(), 200);
        store.replace(updated.clone(), ExpectedVersion::Exact(0)).unwrap();

        assert_eq!(store.get(owner()).unwrap(), updated);
    }

    #[test]
    fn replace_with_stale_version_conflicts() {
        let store = InMemoryReferralStore::new();
        store.create(owner()).unwrap();

        let first = with_edge(store.get(owner()).unwrap(), 200);
        let second = with_edge(store.get(owner()).unwrap(), 300);

        store.replace(first, ExpectedVersion::Exact(0)).unwrap();
        let err = store.replace(second, ExpectedVersion::Exact(0)).unwrap_err();

        assert_eq!(
            err,
            StoreError::Conflict {
                owner: owner(),
                expected: ExpectedVersion::Exact(0),
                actual: 1,
            }
        );
        let stored = store.get(owner()).unwrap();
        assert!(stored.has_edge_to(UserId::new(200)));
        assert!(!stored.has_edge_to(UserId::new(300)));
    }

    #[test]
    fn update_applies_appended_edge() {
        let store = InMemoryReferralStore::new();
        store.create(owner()).unwrap();

        let edge_id = EdgeId::new();
        let decision = store
            .update(owner(), |referral| {
                referral.record_edge(edge_id, User::new(owner()), User::new(UserId::new(200)), Utc::now())
            })
            .unwrap();

        assert_eq!(decision, EdgeDecision::Appended(edge_id));
        let stored = store.get(owner()).unwrap();
        assert!(stored.has_edge_to(UserId::new(200)));
        assert_eq!(stored.version(), 1);
    }

    #[test]
    fn rejected_update_leaves_record_untouched() {
        let store = InMemoryReferralStore::new();
        store.create(owner()).unwrap();

        let err = store
            .update(owner(), |referral| {
                referral.record_edge(
                    EdgeId::new(),
                    User::new(UserId::new(999)),
                    User::new(UserId::new(200)),
                    Utc::now(),
                )
            })
            .unwrap_err();

        assert!(matches!(err, StoreError::Rejected(_)));
        assert_eq!(store.get(owner()).unwrap(), Referral::new(owner()));
    }

    #[test]
    fn update_of_unknown_owner_is_not_found() {
        let store = InMemoryReferralStore::new();
        let err = store
            .update(owner(), |_| panic!("apply must not run without a record"))
            .unwrap_err();

        assert_eq!(err, StoreError::NotFound(owner()));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn poisoned_lock_reports_unavailable() {
        let store = Arc::new(InMemoryReferralStore::new());
        store.create(owner()).unwrap();

        let poisoner = store.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.referrals.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(matches!(store.len(), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.is_empty(), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.get(owner()), Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn concurrent_updates_keep_every_edge() {
        let store = Arc::new(InMemoryReferralStore::new());
        store.create(owner()).unwrap();
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let store = store.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    store.update(owner(), |referral| {
                        referral.record_edge(
                            EdgeId::new(),
                            User::new(owner()),
                            User::new(UserId::new(1000 + i as i64)),
                            Utc::now(),
                        )
                    })
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().unwrap().is_appended());
        }
        let stored = store.get(owner()).unwrap();
        assert_eq!(stored.len(), threads);
        assert_eq!(stored.version(), threads as u64);
    }

    #[test]
    fn snapshots_are_detached_from_the_store() {
        let store = InMemoryReferralStore::new();
        store.create(owner()).unwrap();

        let _local = with_edge(store.get(owner()).unwrap(), 200);
        assert!(store.get(owner()).unwrap().is_empty());
    }

    #[test]
    fn owners_are_sorted() {
        let store = InMemoryReferralStore::new();
        for id in [30, 10, 20] {
            store.create(UserId::new(id)).unwrap();
        }

        let owners: Vec<i64> = store.owners().unwrap().into_iter().map(UserId::get).collect();
        assert_eq!(owners, vec![10, 20, 30]);
    }

    #[test]
    fn concurrent_create_admits_exactly_one_winner() {
        let store = Arc::new(InMemoryReferralStore::new());
        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let store = store.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    store.create(owner())
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let created = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::AlreadyExists(_))))
            .count();

        assert_eq!(created, 1);
        assert_eq!(rejected, threads - 1);
        assert_eq!(store.len().unwrap(), 1);
    }
}
