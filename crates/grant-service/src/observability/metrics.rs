//! Metric definitions for the access plane.
//!
//! All metrics follow Prometheus naming conventions with an `ag_` prefix
//! and `_total` suffixes for counters.
//!
//! # Cardinality
//!
//! Labels are bounded: `role` has three values and `status` two.

use metrics::counter;

/// Record an application (tenant) registration.
pub fn record_app_created() {
    counter!("ag_apps_created_total").increment(1);
}

/// Record a room creation.
pub fn record_room_created() {
    counter!("ag_rooms_created_total").increment(1);
}

/// Record a successfully issued grant.
///
/// Metric: `ag_tokens_issued_total`
/// Labels: `role` (host, participant, viewer)
pub fn record_token_issued(role: &'static str) {
    counter!("ag_tokens_issued_total", "role" => role).increment(1);
}

/// Record a failed tenant authentication attempt.
pub fn record_auth_failure() {
    counter!("ag_auth_failures_total").increment(1);
}
