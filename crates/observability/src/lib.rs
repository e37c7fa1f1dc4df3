//! Tracing and logging setup shared by every referral binary and test harness.

/// Initialize process-wide tracing with the `info` default filter.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init("info");
}

/// Initialize process-wide tracing, using `default_filter` when `RUST_LOG` is unset.
pub fn init_with_default(default_filter: &str) {
    tracing::init(default_filter);
}

/// Subscriber construction (filters, formatting).
pub mod tracing;
