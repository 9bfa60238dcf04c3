//! Test harness for Switchboard E2E testing.
//!
//! Spawns real access-plane and signaling-plane servers in-process on
//! ephemeral ports, wired to one signing secret, plus a WebSocket client
//! wrapper for driving signaling scenarios. Helpers panic on failure;
//! they exist for tests, not production paths.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

pub mod server_harness;
pub mod ws_client;

pub use server_harness::{CreatedApp, TestAccessServer, TestSignalServer, TestStack};
pub use ws_client::SignalClient;

/// Signing secret shared by both harness servers.
pub const TEST_SIGNING_SECRET: &str = "test-signing-secret-0123456789abcdef-harness";
