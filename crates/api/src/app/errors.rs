use serde_json::json;
use thiserror::Error;

use referral_core::DomainError;
use referral_infra::{ReferralError, StoreError};

/// Facade error: referral failures plus request validation.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Referral(#[from] ReferralError),

    /// User directory failure.
    #[error(transparent)]
    Directory(StoreError),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Stable machine-readable code for transports.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Referral(err) => referral_error_code(err),
            ApiError::Directory(err) => store_error_code(err),
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Referral(ReferralError::BonusAwardFailed { source, .. }) => {
                source.is_retryable()
            }
            ApiError::Referral(ReferralError::Store(StoreError::Unavailable(_)))
            | ApiError::Directory(StoreError::Unavailable(_)) => true,
            _ => false,
        }
    }

    /// JSON error body: `{"error": code, "message": text}`.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": self.code(),
            "message": self.to_string(),
        })
    }
}

fn referral_error_code(err: &ReferralError) -> &'static str {
    match err {
        ReferralError::NotFound(_) => "not_found",
        ReferralError::AlreadyExists(_) => "already_exists",
        ReferralError::SelfReferral(_) => "validation",
        ReferralError::Domain(domain) => domain_error_code(domain),
        ReferralError::Store(store) => store_error_code(store),
        ReferralError::BonusAwardFailed { .. } => "bonus_award_failed",
    }
}

fn store_error_code(err: &StoreError) -> &'static str {
    match err {
        StoreError::NotFound(_) => "not_found",
        StoreError::AlreadyExists(_) => "already_exists",
        StoreError::Conflict { .. } => "conflict",
        StoreError::Rejected(domain) => domain_error_code(domain),
        StoreError::Unavailable(_) => "unavailable",
    }
}

fn domain_error_code(err: &DomainError) -> &'static str {
    match err {
        DomainError::InvalidId(_) => "validation",
        DomainError::InvariantViolation(_) => "invariant_violation",
    }
}
