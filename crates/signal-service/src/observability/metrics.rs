//! Metric definitions for the signaling service.
//!
//! Recorded through the `metrics` facade; the embedding binary decides
//! whether a recorder is installed. Naming follows Prometheus conventions
//! with an `sb_` prefix and `_total` suffixes for counters.
//!
//! # Cardinality
//!
//! Labels are bounded: `kind` is one of three relay frame types and
//! `reason` is a closed set of connection-close causes.

use metrics::{counter, gauge};

/// Record an accepted WebSocket connection.
pub fn record_connection_opened() {
    counter!("sb_connections_opened_total").increment(1);
}

/// Record a closed connection with its close reason.
///
/// Metric: `sb_connections_closed_total`
/// Labels: `reason` (client, server, heartbeat, stalled, error)
pub fn record_connection_closed(reason: &'static str) {
    counter!("sb_connections_closed_total", "reason" => reason).increment(1);
}

/// Record a successful room admission.
pub fn record_peer_admitted() {
    counter!("sb_admissions_total", "status" => "ok").increment(1);
}

/// Record a rejected room admission.
///
/// Labels: `code` — the stable signaling error code.
pub fn record_admission_rejected(code: &'static str) {
    counter!("sb_admissions_total", "status" => "error", "code" => code).increment(1);
}

/// Record a relayed negotiation frame.
///
/// Labels: `kind` (offer, answer, ice)
pub fn record_frame_relayed(kind: &'static str) {
    counter!("sb_frames_relayed_total", "kind" => kind).increment(1);
}

/// Update the live connection count gauge.
#[allow(clippy::cast_precision_loss)] // connection counts are far below 2^52
pub fn set_active_connections(count: usize) {
    gauge!("sb_active_connections").set(count as f64);
}

/// Update the live room count gauge.
#[allow(clippy::cast_precision_loss)] // room counts are far below 2^52
pub fn set_active_rooms(count: usize) {
    gauge!("sb_active_rooms").set(count as f64);
}
