use std::sync::Arc;

use referral_infra::{
    InMemoryBonusLedger, InMemoryReferralStore, InMemoryUserDirectory, ReferralConfig,
    ReferralCoordinator,
};

use crate::app::ReferralApi;

/// Facade over the in-memory backends.
pub type InMemoryReferralApi =
    ReferralApi<Arc<InMemoryReferralStore>, Arc<InMemoryUserDirectory>, Arc<InMemoryBonusLedger>>;

/// In-memory wiring for tests/dev, with handles to every backend.
#[derive(Clone)]
pub struct InMemoryServices {
    pub api: Arc<InMemoryReferralApi>,
    pub store: Arc<InMemoryReferralStore>,
    pub users: Arc<InMemoryUserDirectory>,
    pub ledger: Arc<InMemoryBonusLedger>,
}

impl InMemoryServices {
    pub fn new(config: ReferralConfig) -> Self {
        let store = Arc::new(InMemoryReferralStore::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let ledger = Arc::new(InMemoryBonusLedger::new());

        let coordinator = ReferralCoordinator::with_config(store.clone(), config);
        let api = Arc::new(ReferralApi::new(coordinator, users.clone(), ledger.clone()));

        Self {
            api,
            store,
            users,
            ledger,
        }
    }

    /// Read configuration from the environment and initialise tracing.
    pub fn from_env() -> Self {
        let config = ReferralConfig::from_env();
        referral_observability::init_with_default(&config.log_filter);
        tracing::info!(
            allow_self_referral = config.allow_self_referral,
            "referral services configured"
        );
        Self::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::dto::{AcceptReferralRequest, UserDescriptor};
    use referral_core::UserId;

    #[test]
    fn handles_share_state_with_the_facade() {
        let services = InMemoryServices::new(ReferralConfig::default());

        services.api.ensure_referral_record(100).unwrap();
        services
            .api
            .accept_referral(AcceptReferralRequest {
                from: UserDescriptor::new(100),
                to: UserDescriptor::new(200),
            })
            .unwrap();

        assert_eq!(services.store.len().unwrap(), 1);
        assert_eq!(services.ledger.awards_for(UserId::new(100)), 1);
    }

    #[test]
    fn config_reaches_the_coordinator() {
        let services = InMemoryServices::new(ReferralConfig::default().with_self_referral(true));
        assert!(services.api.coordinator().config().allow_self_referral);

        services.api.ensure_referral_record(9).unwrap();
        let response = services
            .api
            .accept_referral(AcceptReferralRequest {
                from: UserDescriptor::new(9),
                to: UserDescriptor::new(9),
            })
            .unwrap();
        assert!(response.bonus_granted);
    }
}
