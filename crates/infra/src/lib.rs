//! Infrastructure layer: referral storage, bonus boundary, coordination, config.

pub mod bonus;
pub mod config;
pub mod coordinator;
pub mod referral_store;
pub mod user_directory;


pub use bonus::{BonusError, BonusNotifier, InMemoryBonusLedger};
pub use config::ReferralConfig;
pub use coordinator::{AcceptOutcome, ReferralCoordinator, ReferralError};
pub use referral_store::{InMemoryReferralStore, ReferralStore, StoreError};
pub use user_directory::{InMemoryUserDirectory, UserDirectory};
