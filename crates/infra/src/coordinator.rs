//! Referral coordination (application-level orchestration).
//!
//! The coordinator owns the rules that span the store and the bonus boundary:
//!
//! ```text
//! accept_referral(from, to)
//!   ↓
//! 1. Load the owner's aggregate (must already be registered)
//!   ↓
//! 2. Decide: existing edge to `to` → no-op, otherwise append
//!   ↓
//! 3. Store the appended edge (steps 1-3 are one `ReferralStore::update`)
//!   ↓
//! 4. Award the bonus to `from` (only after the edge is stored)
//! ```
//!
//! A bonus failure never rolls back the stored edge. It is returned as
//! [`ReferralError::BonusAwardFailed`] so the caller can compensate.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use referral_core::{DomainError, EdgeId, UserId};
use referral_graph::{EdgeDecision, Referral, User};

use crate::bonus::{BonusError, BonusNotifier};
use crate::config::ReferralConfig;
use crate::referral_store::{ReferralStore, StoreError};

#[derive(Debug, Error)]
pub enum ReferralError {
    /// The owner never entered the referral program.
    #[error("no referral record for owner {0}")]
    NotFound(UserId),

    /// A record for the owner already exists (direct store callers only).
    #[error("referral record for owner {0} already exists")]
    AlreadyExists(UserId),

    /// Referrer and recipient are the same user and self referrals are disabled.
    #[error("user {0} cannot refer themselves")]
    SelfReferral(UserId),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(StoreError),

    /// The edge was stored but the bonus award failed.
    #[error("referral {edge_id} by {owner} stored, but bonus award failed")]
    BonusAwardFailed {
        owner: UserId,
        edge_id: EdgeId,
        #[source]
        source: BonusError,
    },
}

impl From<StoreError> for ReferralError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(owner) => ReferralError::NotFound(owner),
            StoreError::AlreadyExists(owner) => ReferralError::AlreadyExists(owner),
            StoreError::Rejected(err) => ReferralError::Domain(err),
            other => ReferralError::Store(other),
        }
    }
}

/// Result of a successful [`ReferralCoordinator::accept_referral`] call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// A new edge was stored and the notifier answered.
    Accepted { edge_id: EdgeId, bonus_granted: bool },
    /// The owner had already referred this recipient; nothing changed.
    AlreadyReferred { edge_id: EdgeId },
}

impl AcceptOutcome {
    pub fn bonus_granted(&self) -> bool {
        match self {
            AcceptOutcome::Accepted { bonus_granted, .. } => *bonus_granted,
            AcceptOutcome::AlreadyReferred { .. } => false,
        }
    }

    pub fn edge_id(&self) -> EdgeId {
        match self {
            AcceptOutcome::Accepted { edge_id, .. } | AcceptOutcome::AlreadyReferred { edge_id } => {
                *edge_id
            }
        }
    }

    pub fn is_new_edge(&self) -> bool {
        matches!(self, AcceptOutcome::Accepted { .. })
    }
}

/// Service layer over a [`ReferralStore`].
///
/// Runs entirely on the caller's thread; the store's lock is the only
/// synchronisation. Nothing is retried.
#[derive(Debug)]
pub struct ReferralCoordinator<S> {
    store: S,
    config: ReferralConfig,
}

impl<S> ReferralCoordinator<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, ReferralConfig::default())
    }

    pub fn with_config(store: S, config: ReferralConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ReferralConfig {
        &self.config
    }
}

impl<S> ReferralCoordinator<S>
where
    S: ReferralStore,
{
    /// Make sure `owner` has a referral record.
    ///
    /// Idempotent: returns `true` only for the call that created the record.
    /// Losing a creation race to another caller counts as success.
    pub fn ensure_referral_record(&self, owner: UserId) -> Result<bool, ReferralError> {
        match self.store.get(owner) {
            Ok(_) => {
                debug!(%owner, "referral record already present");
                return Ok(false);
            }
            Err(StoreError::NotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }

        match self.store.create(owner) {
            Ok(()) => {
                info!(%owner, "referral record created");
                Ok(true)
            }
            Err(StoreError::AlreadyExists(_)) => {
                debug!(%owner, "referral record created concurrently");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Snapshot of the owner's referral record.
    pub fn get_referral_record(&self, owner: UserId) -> Result<Referral, ReferralError> {
        Ok(self.store.get(owner)?)
    }

    /// Accept that `from` referred `to`, then award `from` a bonus.
    ///
    /// - `NotFound` if `from` never went through [`Self::ensure_referral_record`].
    /// - A pair that already has an edge is a no-op: no write, no notifier call.
    /// - A notifier failure is returned after the edge is stored; the edge stays.
    pub fn accept_referral<N>(
        &self,
        from: User,
        to: User,
        notifier: &N,
    ) -> Result<AcceptOutcome, ReferralError>
    where
        N: BonusNotifier + ?Sized,
    {
        let owner = from.id_typed();
        let recipient = to.id_typed();

        if owner == recipient && !self.config.allow_self_referral {
            return Err(ReferralError::SelfReferral(owner));
        }

        let decision = self.store_edge(&from, &to)?;
        let edge_id = match decision {
            EdgeDecision::AlreadyPresent(edge_id) => {
                debug!(%owner, %recipient, "referral already accepted; skipping");
                return Ok(AcceptOutcome::AlreadyReferred { edge_id });
            }
            EdgeDecision::Appended(edge_id) => edge_id,
        };
        info!(%owner, %recipient, %edge_id, "referral accepted");

        match notifier.award(&from) {
            Ok(bonus_granted) => {
                debug!(%owner, bonus_granted, "bonus notifier answered");
                Ok(AcceptOutcome::Accepted {
                    edge_id,
                    bonus_granted,
                })
            }
            Err(source) => {
                warn!(%owner, %edge_id, error = %source, "bonus award failed; edge kept");
                Err(ReferralError::BonusAwardFailed {
                    owner,
                    edge_id,
                    source,
                })
            }
        }
    }

    /// Decide and append the edge inside one atomic store update.
    fn store_edge(&self, from: &User, to: &User) -> Result<EdgeDecision, ReferralError> {
        let owner = from.id_typed();
        let decision = self.store.update(owner, |referral| {
            referral.record_edge(EdgeId::new(), from.clone(), to.clone(), Utc::now())
        })?;
        Ok(decision)
    }
}
