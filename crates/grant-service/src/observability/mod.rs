//! Observability: metric recording for the access plane.

pub mod metrics;
