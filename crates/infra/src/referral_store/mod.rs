//! Referral aggregate storage boundary.
//!
//! The coordinator only sees the [`ReferralStore`] trait; the in-memory
//! implementation is the reference backend. Durable backends must keep the
//! same create / get / compare-and-replace contract.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryReferralStore;
pub use r#trait::{ReferralStore, StoreError};
