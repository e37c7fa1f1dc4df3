use std::sync::Arc;

use thiserror::Error;

use referral_core::{DomainError, DomainResult, ExpectedVersion, UserId};
use referral_graph::{EdgeDecision, Referral};

/// Referral store operation error.
///
/// These are **infrastructure errors** (existence, concurrency, availability)
/// as opposed to domain errors (validation, invariants).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("no record for user {0}")]
    NotFound(UserId),

    #[error("record for user {0} already exists")]
    AlreadyExists(UserId),

    #[error("referral for owner {owner} changed concurrently (expected {expected:?}, found {actual})")]
    Conflict {
        owner: UserId,
        expected: ExpectedVersion,
        actual: u64,
    },

    /// The aggregate refused the change passed to `update`; nothing was stored.
    #[error(transparent)]
    Rejected(#[from] DomainError),

    #[error("referral store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed storage of referral aggregates, one per owner.
///
/// ## Contract
///
/// - `create` inserts an empty aggregate and fails with `AlreadyExists` when
///   the owner is already present. Callers needing idempotence check with `get` first.
/// - `get` returns a snapshot of the aggregate or `NotFound`.
/// - `replace` is not an upsert: it fails with `NotFound` when the owner was
///   never created, and with `Conflict` when the stored version does not
///   match `expected`.
/// - `update` loads, changes and stores one aggregate as a single step: no
///   other mutation of that owner can land between the read and the write.
///   The change is stored only when `apply` reports an appended edge; an
///   `Err` from `apply` leaves the stored aggregate untouched.
///
/// Mutations are exclusive with every other operation on the same key.
/// Backends doing I/O keep `update` atomic (row lock, transaction, or a
/// version-checked write retried until it lands).
pub trait ReferralStore: Send + Sync {
    fn create(&self, owner: UserId) -> Result<(), StoreError>;

    fn get(&self, owner: UserId) -> Result<Referral, StoreError>;

    fn replace(&self, referral: Referral, expected: ExpectedVersion) -> Result<(), StoreError>;

    fn update<F>(&self, owner: UserId, apply: F) -> Result<EdgeDecision, StoreError>
    where
        F: FnOnce(&mut Referral) -> DomainResult<EdgeDecision>;

    /// Registered owners, ascending.
    fn owners(&self) -> Result<Vec<UserId>, StoreError>;
}

impl<S> ReferralStore for Arc<S>
where
    S: ReferralStore + ?Sized,
{
    fn create(&self, owner: UserId) -> Result<(), StoreError> {
        (**self).create(owner)
    }

    fn get(&self, owner: UserId) -> Result<Referral, StoreError> {
        (**self).get(owner)
    }

    fn replace(&self, referral: Referral, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).replace(referral, expected)
    }

    fn update<F>(&self, owner: UserId, apply: F) -> Result<EdgeDecision, StoreError>
    where
        F: FnOnce(&mut Referral) -> DomainResult<EdgeDecision>,
    {
        (**self).update(owner, apply)
    }

    fn owners(&self) -> Result<Vec<UserId>, StoreError> {
        (**self).owners()
    }
}
