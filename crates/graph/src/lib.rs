//! Referral graph domain module.
//!
//! This crate contains the referral aggregate and its participants,
//! implemented purely as deterministic domain logic (no IO, no locking, no storage).

pub mod referral;
pub mod user;

pub use referral::{EdgeDecision, Referral, ReferralEdge};
pub use user::User;
