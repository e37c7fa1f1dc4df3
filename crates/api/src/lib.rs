//! Transport-facing facade: request/response DTOs and the three referral operations.
//!
//! A network layer maps its requests onto [`app::ReferralApi`]; nothing in
//! this crate binds sockets or speaks a wire protocol.

pub mod app;

pub use app::dto::{
    AcceptReferralRequest, AcceptReferralResponse, EnsureReferralRecordResponse,
    ReferralEdgeRecord, ReferralRecord, UserDescriptor,
};
pub use app::errors::ApiError;
pub use app::services::{InMemoryReferralApi, InMemoryServices};
pub use app::ReferralApi;
