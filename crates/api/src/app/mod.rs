//! Referral facade: the three operations a transport exposes.

pub mod dto;
pub mod errors;
pub mod services;

use tracing::{debug, warn};

use referral_core::UserId;
use referral_graph::User;
use referral_infra::{
    BonusNotifier, ReferralCoordinator, ReferralError, ReferralStore, UserDirectory,
};

use dto::{
    AcceptReferralRequest, AcceptReferralResponse, EnsureReferralRecordResponse, ReferralRecord,
    UserDescriptor,
};
use errors::ApiError;

/// Entry point for transports: maps DTOs onto the coordinator and records
/// referral participants in the user directory.
#[derive(Debug)]
pub struct ReferralApi<S, U, N> {
    coordinator: ReferralCoordinator<S>,
    users: U,
    notifier: N,
}

impl<S, U, N> ReferralApi<S, U, N> {
    pub fn new(coordinator: ReferralCoordinator<S>, users: U, notifier: N) -> Self {
        Self {
            coordinator,
            users,
            notifier,
        }
    }

    pub fn coordinator(&self) -> &ReferralCoordinator<S> {
        &self.coordinator
    }
}

impl<S, U, N> ReferralApi<S, U, N>
where
    S: ReferralStore,
    U: UserDirectory,
    N: BonusNotifier,
{
    /// A user entered the referral program (e.g. opened a referral link).
    pub fn ensure_referral_record(
        &self,
        owner: i64,
    ) -> Result<EnsureReferralRecordResponse, ApiError> {
        UserDescriptor::new(owner).validate()?;
        let created = self.coordinator.ensure_referral_record(UserId::new(owner))?;
        Ok(EnsureReferralRecordResponse {
            success: true,
            created,
        })
    }

    /// `from` referred `to`. Returns whether a bonus was granted.
    pub fn accept_referral(
        &self,
        request: AcceptReferralRequest,
    ) -> Result<AcceptReferralResponse, ApiError> {
        let from = request.from.into_user()?;
        let to = request.to.into_user()?;

        let result = self
            .coordinator
            .accept_referral(from.clone(), to.clone(), &self.notifier);

        // The edge exists whenever the coordinator got past the store write.
        if matches!(&result, Ok(_) | Err(ReferralError::BonusAwardFailed { .. })) {
            self.remember(&[from, to]);
        }

        let outcome = result?;
        Ok(AcceptReferralResponse {
            bonus_granted: outcome.bonus_granted(),
        })
    }

    pub fn get_referral_record(&self, owner: i64) -> Result<ReferralRecord, ApiError> {
        UserDescriptor::new(owner).validate()?;
        let referral = self.coordinator.get_referral_record(UserId::new(owner))?;
        Ok(ReferralRecord::from(&referral))
    }

    /// Last known description of a referral participant.
    pub fn get_user(&self, user_id: i64) -> Result<UserDescriptor, ApiError> {
        UserDescriptor::new(user_id).validate()?;
        let user = self
            .users
            .get(UserId::new(user_id))
            .map_err(ApiError::Directory)?;
        Ok(UserDescriptor::from(&user))
    }

    /// Best effort: the referral outcome stands even if the directory is down.
    fn remember(&self, users: &[User]) {
        for user in users {
            let id = user.id_typed();
            debug!(user = %id, "recording referral participant");
            if let Err(err) = self.users.save(user.clone()) {
                warn!(user = %id, error = %err, "could not record referral participant");
            }
        }
    }
}
