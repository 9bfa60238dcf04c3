//! Observability: metric recording for the signaling plane.

pub mod metrics;
