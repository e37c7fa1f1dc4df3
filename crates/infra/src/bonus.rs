//! Bonus award boundary.
//!
//! The coordinator calls a [`BonusNotifier`] after a new referral edge is
//! stored. How the bonus is computed and delivered lives behind the trait.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use referral_core::UserId;
use referral_graph::User;

/// Failure reported by a bonus notifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bonus award failed: {message}")]
pub struct BonusError {
    message: String,
    retryable: bool,
}

impl BonusError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    /// A failure the caller may retry (e.g. the reward backend timed out).
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

/// Awards a bonus to the referring user of a newly accepted edge.
///
/// `Ok(granted)` reports whether a bonus was actually granted; `Err` is
/// surfaced to the caller verbatim.
pub trait BonusNotifier: Send + Sync {
    fn award(&self, user: &User) -> Result<bool, BonusError>;
}

impl<N> BonusNotifier for Arc<N>
where
    N: BonusNotifier + ?Sized,
{
    fn award(&self, user: &User) -> Result<bool, BonusError> {
        (**self).award(user)
    }
}

impl<N> BonusNotifier for &N
where
    N: BonusNotifier + ?Sized,
{
    fn award(&self, user: &User) -> Result<bool, BonusError> {
        (**self).award(user)
    }
}

/// In-memory notifier that grants every award and remembers who received one.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryBonusLedger {
    awards: Mutex<HashMap<UserId, u32>>,
}

impl InMemoryBonusLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bonuses granted to `user`.
    pub fn awards_for(&self, user: UserId) -> u32 {
        self.awards
            .lock()
            .map(|m| m.get(&user).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total number of bonuses granted.
    pub fn total(&self) -> u32 {
        self.awards.lock().map(|m| m.values().sum()).unwrap_or(0)
    }
}

impl BonusNotifier for InMemoryBonusLedger {
    fn award(&self, user: &User) -> Result<bool, BonusError> {
        let mut awards = self
            .awards
            .lock()
            .map_err(|_| BonusError::new("bonus ledger lock poisoned"))?;
        *awards.entry(user.id_typed()).or_default() += 1;
        Ok(true)
    }
}
