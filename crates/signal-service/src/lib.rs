//! Switchboard signaling service.
//!
//! Stateful WebSocket signaling server for peer-to-peer call negotiation.
//! Admits connections against signed grants minted by the access plane,
//! tracks per-room presence, relays opaque SDP/ICE payloads between the
//! peers of a room, and reaps dead connections through a ping/pong
//! heartbeat. Media never traverses this service.

#![warn(clippy::pedantic)]

pub mod config;
pub mod connection;
pub mod errors;
pub mod observability;
pub mod protocol;
pub mod registry;
pub mod server;
