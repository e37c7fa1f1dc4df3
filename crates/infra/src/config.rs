//! Referral program configuration.

use std::str::FromStr;

/// Environment variable toggling self referrals (`true`/`false`).
pub const ALLOW_SELF_REFERRAL_ENV: &str = "REFERRAL_ALLOW_SELF";
/// Standard tracing filter variable.
pub const LOG_FILTER_ENV: &str = "RUST_LOG";

/// Coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralConfig {
    /// Accept edges where the referrer and the recipient are the same user.
    pub allow_self_referral: bool,
    /// Tracing filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            allow_self_referral: false,
            log_filter: "info".to_string(),
        }
    }
}

impl ReferralConfig {
    pub fn with_self_referral(mut self, allow: bool) -> Self {
        self.allow_self_referral = allow;
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Load configuration from the process environment.
    ///
    /// Unset variables keep their defaults; unparsable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            allow_self_referral: parse_or(
                &lookup,
                ALLOW_SELF_REFERRAL_ENV,
                defaults.allow_self_referral,
            ),
            log_filter: lookup(LOG_FILTER_ENV)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.log_filter),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + core::fmt::Debug,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("{key}={raw:?} is not valid; using default {default:?}");
                default
            }
        },
    }
}
